pub mod handlers;

use axum::{
    routing::get,
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::auth::{self, NonceConfig};
use crate::search::SearchService;
use handlers::{search_form, search_query, SearchState};

/// Path of the search action
pub const SEARCH_PATH: &str = "/api/search";

/// Build the API router
pub fn create_router(search: Option<SearchService>, nonce: NonceConfig, site_url: &str) -> Router {
    let ajax_url = format!("{}{}", site_url.trim_end_matches('/'), SEARCH_PATH);

    let search_state = SearchState {
        search,
        nonce: nonce.clone(),
    };

    Router::new()
        .route(SEARCH_PATH, get(search_query).post(search_form))
        .with_state(search_state)
        // Script data for widget pages
        .route("/api/nonce", get(auth::issue_nonce))
        .with_state((nonce, ajax_url))
        // CORS for development
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

/// Start the API server with graceful shutdown support
pub async fn start_server_with_shutdown(
    router: Router,
    port: u16,
    shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    let shutdown_signal = async {
        shutdown_signal.await;
        info!("Shutdown signal received, stopping server gracefully...");
    };

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("API server stopped gracefully");
    Ok(())
}
