//! Handlers for the `/projects/{project_id}/tracks` resource.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use shotforge_core::error::CoreError;
use shotforge_core::timeline::validate_track_kind;
use shotforge_core::types::DbId;
use shotforge_db::models::track::{CreateTrack, Track};
use shotforge_db::repositories::{ProjectRepo, TrackRepo};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/projects/{project_id}/tracks
pub async fn list_by_project(
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<Track>>>> {
    let tracks = TrackRepo::list_by_project(&state.pool, project_id).await?;
    Ok(Json(DataResponse { data: tracks }))
}

/// POST /api/v1/projects/{project_id}/tracks
pub async fn create(
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
    Json(input): Json<CreateTrack>,
) -> AppResult<(StatusCode, Json<DataResponse<Track>>)> {
    validate_track_kind(&input.kind)?;
    if input.name.trim().is_empty() {
        return Err(AppError::BadRequest("name must not be empty".into()));
    }

    ProjectRepo::find_by_id(&state.pool, project_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Project",
            id: project_id,
        }))?;

    let track = TrackRepo::create(&state.pool, project_id, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: track })))
}
