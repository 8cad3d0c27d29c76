use anyhow::Context;
use clap::Parser;

use feedback::commons;
use feedback::config::Config;
use feedback::http;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // This returns an error if the `.env` file doesn't exist, but that's not what we want
    // since we're not going to use a `.env` file if we deploy this application.
    dotenv::dotenv().ok();

    // Initialize the logger.
    env_logger::init();

    // Parse our configuration from the environment.
    // This will exit with a help message if something is wrong.
    let config = Config::parse();

    let db = commons::connect(&config.database_url, config.max_connections)
        .await
        .context("could not connect to database_url")?;

    // This embeds database migrations in the application binary so we can ensure the database
    // is migrated correctly on startup
    commons::migrate(&db, &config.database_url).await?;

    http::serve(config, db).await?;

    Ok(())
}
