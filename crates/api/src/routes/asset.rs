//! Route definitions for the `/assets` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::asset;
use crate::state::AppState;

/// Routes mounted at `/assets`.
///
/// ```text
/// GET /              -> list (?project_id)
/// GET /{id}          -> get_by_id
/// GET /{id}/stream   -> stream (Range-aware retrieval proxy)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(asset::list))
        .route("/{id}", get(asset::get_by_id))
        .route("/{id}/stream", get(asset::stream))
}
