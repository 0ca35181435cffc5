//! Handler for completion notifications from the render backend.
//!
//! ComfyUI save nodes (or the storage relay in front of them) POST here
//! once an output lands in the object store. The heavy lifting happens
//! in [`engine::reconciler`](crate::engine::reconciler); this handler
//! only validates the payload and shapes the response.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use shotforge_core::types::DbId;

use crate::engine::reconciler::{self, ReconcileReport, UploadNotice};
use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Wire payload for `POST /uploads/remote` (and its legacy alias).
///
/// Only `filename` is required; everything else is recovered from the
/// address embedded in it or defaulted.
#[derive(Debug, Deserialize)]
pub struct RemoteUploadRequest {
    /// Object filename as written by the save node. Carries the shot
    /// address for generated outputs.
    pub filename: String,
    /// Object key in the configured bucket. Defaults to the outputs
    /// prefix plus the filename.
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub remote_url: Option<String>,
    /// Asset kind; the database defaults it to `video`.
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub size_bytes: Option<i64>,
    /// Explicit ids win over ids derived from the filename.
    #[serde(default)]
    pub owner_id: Option<DbId>,
    #[serde(default)]
    pub project_id: Option<DbId>,
}

/// POST /api/v1/uploads/remote
///
/// Registers a finished output and reconciles it onto the timeline.
/// Responds 201 with the created asset and the reconciliation outcome
/// (`replaced`, `inserted`, or `orphaned`).
pub async fn register_remote_upload(
    State(state): State<AppState>,
    Json(input): Json<RemoteUploadRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<ReconcileReport>>)> {
    if input.filename.trim().is_empty() {
        return Err(AppError::BadRequest("filename must not be empty".into()));
    }

    let report = reconciler::reconcile_upload(
        &state.pool,
        state.correlation.as_ref(),
        &state.event_bus,
        UploadNotice {
            filename: input.filename,
            storage_key: input.key,
            remote_url: input.remote_url,
            kind: input.kind,
            source: input.source,
            size_bytes: input.size_bytes,
            owner_id: input.owner_id,
            project_id: input.project_id,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: report })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_payload_deserializes_with_defaults() {
        let req: RemoteUploadRequest =
            serde_json::from_value(serde_json::json!({ "filename": "clip.mp4" }))
                .expect("minimal payload should parse");
        assert_eq!(req.filename, "clip.mp4");
        assert_eq!(req.key, None);
        assert_eq!(req.project_id, None);
        assert_eq!(req.owner_id, None);
    }

    #[test]
    fn full_payload_deserializes() {
        let req: RemoteUploadRequest = serde_json::from_value(serde_json::json!({
            "filename": "u1_p1_g7f3_s2_sf48_df60_fps24_00001.mp4",
            "key": "outputs/u1_p1_g7f3_s2_sf48_df60_fps24_00001.mp4",
            "remote_url": "https://cdn.example.com/clip.mp4",
            "kind": "video",
            "source": "comfyui",
            "size_bytes": 123456,
            "owner_id": 1,
            "project_id": 1
        }))
        .expect("full payload should parse");
        assert_eq!(req.size_bytes, Some(123456));
        assert_eq!(req.project_id, Some(1));
    }
}
