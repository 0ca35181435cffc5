//! Media asset entity model and DTOs.

use serde::{Deserialize, Serialize};
use shotforge_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `media_assets` table.
///
/// `project_id` is `NULL` for orphaned results that arrived without a
/// resolvable project. `settings_snapshot` carries the generation
/// parameters the asset was rendered with, for display only.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MediaAsset {
    pub id: DbId,
    pub project_id: Option<DbId>,
    pub filename: String,
    /// Object key inside the media bucket.
    pub storage_key: String,
    /// Upstream URL the asset was imported from, when known.
    pub remote_url: Option<String>,
    pub kind: String,
    pub source: Option<String>,
    pub size_bytes: Option<i64>,
    pub settings_snapshot: Option<serde_json::Value>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for registering a new media asset.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMediaAsset {
    pub project_id: Option<DbId>,
    pub filename: String,
    pub storage_key: String,
    pub remote_url: Option<String>,
    pub kind: Option<String>,
    pub source: Option<String>,
    pub size_bytes: Option<i64>,
    pub settings_snapshot: Option<serde_json::Value>,
}
