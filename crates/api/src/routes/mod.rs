pub mod asset;
pub mod health;
pub mod project;
pub mod upload;

use axum::routing::post;
use axum::Router;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /ws                                          WebSocket event stream
///
/// /projects                                    list (?owner_id), create
/// /projects/{id}                               get
/// /projects/{project_id}/tracks                list, create
/// /projects/{project_id}/placements            list
/// /projects/{project_id}/placements/{id}       get
/// /projects/{project_id}/generations           audit list (?address), dispatch batch (POST)
/// /projects/{project_id}/generations/{id}      get dispatch record
///
/// /assets                                      list (?project_id)
/// /assets/{id}                                 get
/// /assets/{id}/stream                          proxy-stream media (GET, Range)
///
/// /uploads/remote                              register finished output (POST)
/// /media/remote-upload                         legacy alias of /uploads/remote
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // WebSocket event stream.
        .route("/ws", axum::routing::get(ws::ws_handler))
        // Projects and their timeline sub-resources.
        .nest("/projects", project::router())
        // Media asset registry and the streaming proxy.
        .nest("/assets", asset::router())
        // Completion notifications from the render backend.
        .nest("/uploads", upload::router())
        // Older save nodes still post to the original path.
        .route(
            "/media/remote-upload",
            post(handlers::upload::register_remote_upload),
        )
}
