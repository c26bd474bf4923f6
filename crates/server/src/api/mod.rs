//! HTTP surface.
//!
//! - `consent` - consent page and confirmation (/consent, /consent/confirm)
//! - `userinfo` - OpenID Connect UserInfo (/userinfo)
//! - `health` - health check (/healthz)
//! - `openapi` - OpenAPI/Utoipa configuration, served through Redoc at /api-docs

pub mod consent;
pub mod health;
pub mod openapi;
pub mod userinfo;

use crate::AppState;
use axum::Router;
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_axum::{router::OpenApiRouter, routes};
use utoipa_redoc::{Redoc, Servable};

/// Build the application router with all routes, middleware and API docs.
pub fn app(state: AppState) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(openapi::ApiDoc::openapi())
        .merge(consent::router())
        .merge(userinfo::router())
        .routes(routes!(health::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
        .split_for_parts();

    router.merge(Redoc::with_url("/api-docs", api))
}

/// Starts the web server with all configured routes.
#[tracing::instrument(skip(state))]
pub async fn start_webserver(state: AppState, addr: SocketAddr) -> color_eyre::Result<()> {
    let router = app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Server running on http://{addr}");
    axum::serve(listener, router.into_make_service())
        .await
        .map_err(|e| color_eyre::Report::msg(format!("Failed to start server: {e}")))?;

    Ok(())
}
