//! Placement entity model and DTOs.
//!
//! A placement is a clip occupying a frame window on a track. The window
//! is `[start_frame, start_frame + duration_frames)` at `fps`.
//! `generation_seq` counts how many times a generated result has been
//! assigned into the placement, so stale results can be recognised
//! downstream.

use serde::Serialize;
use shotforge_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `placements` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Placement {
    pub id: DbId,
    pub project_id: DbId,
    pub track_id: DbId,
    /// The media currently filling the window. `None` while a shot is
    /// still rendering.
    pub media_asset_id: Option<DbId>,
    pub label: Option<String>,
    pub start_frame: i64,
    pub duration_frames: i64,
    pub fps: i32,
    /// Last-assigned generation sequence number. Bumped on every asset
    /// assignment.
    pub generation_seq: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

