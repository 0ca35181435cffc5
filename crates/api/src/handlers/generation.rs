//! Handlers for the `/projects/{project_id}/generations` resource.
//!
//! POST dispatches a shot batch to the render backend; the GET routes
//! expose the durable dispatch audit rows.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use shotforge_comfyui::DispatchOutcome;
use shotforge_core::error::CoreError;
use shotforge_core::generation::ShotParameters;
use shotforge_core::types::DbId;
use shotforge_db::models::dispatch::GenerationDispatch;
use shotforge_db::repositories::{DispatchRepo, ProjectRepo};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Wire payload for dispatching a generation batch.
#[derive(Debug, Deserialize)]
pub struct CreateGenerationBatch {
    /// Acting owner; must match the project's owner.
    pub owner_id: DbId,
    pub shots: Vec<ShotParameters>,
}

#[derive(Debug, Deserialize)]
pub struct ListGenerationsParams {
    /// Full encoded shot address to audit.
    pub address: Option<String>,
}

/// POST /api/v1/projects/{project_id}/generations
///
/// Returns 202: acceptance by the backend is recorded per shot, but
/// results arrive later through the upload notification path.
pub async fn dispatch_batch(
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
    Json(input): Json<CreateGenerationBatch>,
) -> AppResult<(StatusCode, Json<DataResponse<DispatchOutcome>>)> {
    if !ProjectRepo::is_owned_by(&state.pool, project_id, input.owner_id).await? {
        // Distinguish a missing project from someone else's project.
        return match ProjectRepo::find_by_id(&state.pool, project_id).await? {
            Some(_) => Err(AppError::Core(CoreError::Forbidden(format!(
                "Project {project_id} is not owned by owner {}",
                input.owner_id
            )))),
            None => Err(AppError::Core(CoreError::NotFound {
                entity: "Project",
                id: project_id,
            })),
        };
    }

    let outcome = state
        .dispatcher
        .dispatch_batch(project_id, input.owner_id, &state.template, &input.shots)
        .await?;

    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: outcome })))
}

/// GET /api/v1/projects/{project_id}/generations?address={address}
///
/// Audit query: every dispatch of this project for one address, newest
/// first. Re-dispatches of the same window show up as multiple rows.
pub async fn list_by_address(
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
    Query(params): Query<ListGenerationsParams>,
) -> AppResult<Json<DataResponse<Vec<GenerationDispatch>>>> {
    let address = params
        .address
        .ok_or_else(|| AppError::BadRequest("address query parameter is required".into()))?;
    let rows =
        DispatchRepo::find_by_project_and_address(&state.pool, project_id, &address).await?;
    Ok(Json(DataResponse { data: rows }))
}

/// GET /api/v1/projects/{project_id}/generations/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path((project_id, id)): Path<(DbId, DbId)>,
) -> AppResult<Json<DataResponse<GenerationDispatch>>> {
    let dispatch = DispatchRepo::find_by_id(&state.pool, id)
        .await?
        .filter(|d| d.project_id == project_id)
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "GenerationDispatch",
            id,
        }))?;
    Ok(Json(DataResponse { data: dispatch }))
}
