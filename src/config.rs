use std::net::SocketAddr;

/// The configuration parameters for the application.
///
/// These can either be passed on the command line, or pulled from environment variables.
/// The latter is preferred as environment variables are one of the recommended ways to
/// get configuration from Kubernetes Secrets in deployment.
///
/// For development convenience, these can also be read from a `.env` file in the working
/// directory where the application is started.
///
/// See `.env.sample` in the repository root for details.
#[derive(clap::Parser, Clone)]
pub struct Config {
    /// The connection URL for the database this application should use.
    ///
    /// Both `postgres://` and `sqlite:` URLs are accepted.
    #[arg(long, env)]
    pub database_url: String,

    /// Upper bound on pooled database connections.
    #[arg(long, env, default_value_t = 10)]
    pub max_connections: u32,

    /// The HMAC signing and verification key used for session cookies.
    ///
    /// Anyone holding this key can forge a login for any user.
    #[arg(long, env)]
    pub hmac_key: String,

    /// Address the HTTP server listens on.
    #[arg(long, env, default_value = "0.0.0.0:8080")]
    pub bind_addr: SocketAddr,

    /// How long a session cookie stays valid. Between one hour and one year.
    #[arg(
        long,
        env,
        default_value_t = 24 * 7,
        value_parser = clap::value_parser!(i64).range(1..=24 * 365)
    )]
    pub session_ttl_hours: i64,

    /// Mark the session cookie `Secure`. Enable when served over HTTPS.
    #[arg(long, env)]
    pub secure_cookies: bool,
}
