use std::sync::Arc;

use anyhow::Context;
use axum::{Extension, Router};
use sqlx::AnyPool;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::Config;

// Utility modules.

/// Defines a common error type to use for all request handlers.
mod error;

/// Signed-cookie session and the `LoggedIn` extractor.
pub mod session;

/// HTML rendering.
pub mod views;

// Modules introducing API routes.
mod feedback;
mod users;

pub use error::{Error, FieldErrors, ResultExt};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The core type through which handler functions can access common API state.
///
/// This can be accessed by adding a parameter `Extension<ApiContext>` to a handler function's
/// parameters.
#[derive(Clone)]
pub struct ApiContext {
    pub config: Arc<Config>,
    pub db: AnyPool,
}

pub async fn serve(config: Config, db: AnyPool) -> anyhow::Result<()> {
    let addr = config.bind_addr;
    let api_context = ApiContext {
        config: Arc::new(config),
        db,
    };

    let app = api_router(api_context);

    log::info!("listening on {addr}");
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .context("error running HTTP server")
}

pub fn api_router(api_context: ApiContext) -> Router {
    users::router().merge(feedback::router()).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(Extension(api_context)),
    )
}
