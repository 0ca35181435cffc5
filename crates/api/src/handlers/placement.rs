//! Handlers for the `/projects/{project_id}/placements` resource.
//!
//! Placements are read-only over HTTP: they are created and filled by
//! the reconciliation engine, not by clients.

use axum::extract::{Path, State};
use axum::Json;
use shotforge_core::error::CoreError;
use shotforge_core::types::DbId;
use shotforge_db::models::placement::Placement;
use shotforge_db::repositories::PlacementRepo;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/projects/{project_id}/placements
pub async fn list_by_project(
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<Placement>>>> {
    let placements = PlacementRepo::list_by_project(&state.pool, project_id).await?;
    Ok(Json(DataResponse { data: placements }))
}

/// GET /api/v1/projects/{project_id}/placements/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path((project_id, id)): Path<(DbId, DbId)>,
) -> AppResult<Json<DataResponse<Placement>>> {
    let placement = PlacementRepo::find_by_id(&state.pool, id)
        .await?
        .filter(|p| p.project_id == project_id)
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Placement",
            id,
        }))?;
    Ok(Json(DataResponse { data: placement }))
}
