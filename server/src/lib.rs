//! Bookman HTTP server
//!
//! - Book catalog admin screens rendered on the server
//! - Request body size limits (64KB max)
//! - Request timeouts (30s)
//! - Security response headers on every page

pub mod cookies;
mod handlers;
mod state;
mod views;

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use axum::http::StatusCode;
use axum::middleware;
use axum::routing::get;
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

use bookman_core::{Config, CoreError};

pub use handlers::caller_key;
pub use state::AppState;

/// Maximum request body size (64KB)
pub const MAX_BODY_SIZE: usize = 65_536;
/// Request timeout (30s)
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

pub fn build_router(state: AppState) -> Router {
    use handlers::{auth, books};

    Router::new()
        .route("/", get(books::home))
        .route("/books", get(books::list))
        .route("/books/add", get(books::add_page).post(books::add_submit))
        .route("/books/{id}/edit", get(books::edit_page).post(books::edit_submit))
        .route(
            "/books/delete",
            get(books::delete_via_get).post(books::delete_submit),
        )
        .route("/login", get(auth::login_page).post(auth::login_submit))
        .route("/logout", get(auth::logout_page).post(auth::logout_submit))
        .with_state(state)
        .layer(middleware::map_response(handlers::security_headers))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        ))
}

/// Open the database and serve until Ctrl-C.
pub async fn serve(config: Config) -> Result<()> {
    let bind = config.bind_address.clone();
    let state = AppState::from_config(config)?;
    if !state.manager().is_installed()? {
        return Err(CoreError::NotInstalled.into());
    }

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!(address = %listener.local_addr()?, "Bookman listening");

    axum::serve(
        listener,
        build_router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("Shutting down");
    })
    .await?;

    Ok(())
}
