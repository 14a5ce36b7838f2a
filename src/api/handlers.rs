use axum::{
    extract::{Query, State},
    http::StatusCode,
    Form, Json,
};
use tracing::warn;

use crate::auth::{self, NonceConfig, NONCE_ACTION};
use crate::search::{
    models::{Envelope, ErrorMessage, SearchParams, SearchResponse},
    SearchRequest, SearchService,
};

/// Shared state of the search action
#[derive(Clone)]
pub struct SearchState {
    /// None while the catalog is switched off
    pub search: Option<SearchService>,
    pub nonce: NonceConfig,
}

type SearchResult = Result<Json<Envelope<SearchResponse>>, (StatusCode, Json<Envelope<ErrorMessage>>)>;

/// Search action, form-encoded POST body
pub async fn search_form(
    State(state): State<SearchState>,
    Form(params): Form<SearchParams>,
) -> SearchResult {
    run_search(&state, params).await
}

/// Search action, query string
pub async fn search_query(
    State(state): State<SearchState>,
    Query(params): Query<SearchParams>,
) -> SearchResult {
    run_search(&state, params).await
}

async fn run_search(state: &SearchState, params: SearchParams) -> SearchResult {
    if let Err(e) = auth::verify_nonce(params.nonce.as_deref(), NONCE_ACTION, &state.nonce) {
        warn!("Rejected search request: {}", e);
        return Err((
            StatusCode::FORBIDDEN,
            Json(Envelope::error("Invalid or expired nonce")),
        ));
    }

    let Some(service) = &state.search else {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(Envelope::error("Catalog not active")),
        ));
    };

    let request = SearchRequest::from_params(&params);
    Ok(Json(Envelope::ok(service.search(&request).await)))
}
