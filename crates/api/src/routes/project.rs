//! Route definitions for the `/projects` resource.
//!
//! Also nests track, placement, and generation routes under
//! `/projects/{project_id}/...`.

use axum::routing::get;
use axum::Router;

use crate::handlers::{generation, placement, project, track};
use crate::state::AppState;

/// Routes mounted at `/projects`.
///
/// ```text
/// GET    /                                    -> list (?owner_id)
/// POST   /                                    -> create
/// GET    /{id}                                -> get_by_id
///
/// GET    /{project_id}/tracks                 -> list_by_project
/// POST   /{project_id}/tracks                 -> create
///
/// GET    /{project_id}/placements             -> list_by_project
/// GET    /{project_id}/placements/{id}        -> get_by_id
///
/// GET    /{project_id}/generations            -> list_by_address (?address)
/// POST   /{project_id}/generations            -> dispatch_batch
/// GET    /{project_id}/generations/{id}       -> get_by_id
/// ```
pub fn router() -> Router<AppState> {
    let track_routes =
        Router::new().route("/", get(track::list_by_project).post(track::create));

    let placement_routes = Router::new()
        .route("/", get(placement::list_by_project))
        .route("/{id}", get(placement::get_by_id));

    let generation_routes = Router::new()
        .route(
            "/",
            get(generation::list_by_address).post(generation::dispatch_batch),
        )
        .route("/{id}", get(generation::get_by_id));

    Router::new()
        .route("/", get(project::list).post(project::create))
        .route("/{id}", get(project::get_by_id))
        .nest("/{project_id}/tracks", track_routes)
        .nest("/{project_id}/placements", placement_routes)
        .nest("/{project_id}/generations", generation_routes)
}
