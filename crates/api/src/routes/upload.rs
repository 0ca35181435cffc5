//! Route definitions for the `/uploads` resource.

use axum::routing::post;
use axum::Router;

use crate::handlers::upload;
use crate::state::AppState;

/// Routes mounted at `/uploads`.
///
/// ```text
/// POST /remote   -> register_remote_upload (reconciles finished outputs)
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/remote", post(upload::register_remote_upload))
}
