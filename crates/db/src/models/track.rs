//! Track entity model and DTOs.
//!
//! A track is a named lane on a project timeline. Generated shots land
//! on tracks of kind `generation`; source footage and audio live on
//! `video` and `audio` tracks.

use serde::{Deserialize, Serialize};
use shotforge_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `tracks` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Track {
    pub id: DbId,
    pub project_id: DbId,
    pub name: String,
    /// One of the kinds in `shotforge_core::timeline::VALID_TRACK_KINDS`.
    pub kind: String,
    pub sort_order: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a new track. The project comes from the route path.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTrack {
    pub name: String,
    pub kind: String,
    pub sort_order: Option<i32>,
}
