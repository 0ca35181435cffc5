//! Generation dispatch audit model and DTOs.
//!
//! One row per shot handed to the render backend. Rows are append-only:
//! status and reconciliation columns are updated in place, but a
//! dispatch row is never deleted, so the full submission history of a
//! project survives restarts and lost results.

use serde::{Deserialize, Serialize};
use shotforge_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `generation_dispatches` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GenerationDispatch {
    pub id: DbId,
    pub project_id: DbId,
    pub owner_id: DbId,
    /// Short shared id linking all shots of one submission.
    pub batch_id: String,
    pub shot_index: i32,
    /// The encoded correlation token carried through the render backend.
    pub address: String,
    pub target_placement_id: Option<DbId>,
    /// Job id reported by the render backend, when it reported one.
    pub remote_job_id: Option<String>,
    pub shot_params: Option<serde_json::Value>,
    /// One of `shotforge_core::generation::VALID_DISPATCH_STATUSES`.
    pub status: String,
    pub dispatched_at: Option<Timestamp>,
    pub reconciled_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for recording a new dispatch.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDispatch {
    pub project_id: DbId,
    pub owner_id: DbId,
    pub batch_id: String,
    pub shot_index: i32,
    pub address: String,
    pub target_placement_id: Option<DbId>,
    pub remote_job_id: Option<String>,
    pub shot_params: Option<serde_json::Value>,
}
