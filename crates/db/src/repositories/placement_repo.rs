//! Repository for the `placements` table.

use shotforge_core::timeline::TRACK_KIND_GENERATION;
use shotforge_core::types::DbId;
use sqlx::PgPool;

use crate::models::placement::Placement;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, project_id, track_id, media_asset_id, label, start_frame, \
                       duration_frames, fps, generation_seq, created_at, updated_at";

/// Provides CRUD operations for placements.
pub struct PlacementRepo;

impl PlacementRepo {
    /// Find a placement by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Placement>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM placements WHERE id = $1");
        sqlx::query_as::<_, Placement>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all placements of a project, ordered by track, then window start.
    pub async fn list_by_project(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Vec<Placement>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM placements \
             WHERE project_id = $1 \
             ORDER BY track_id, start_frame, id"
        );
        sqlx::query_as::<_, Placement>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    /// Assign a media asset into a placement, bumping its generation
    /// sequence number.
    ///
    /// Returns `None` if no row with the given `id` exists, so callers
    /// can fall through to their next candidate.
    pub async fn assign_asset(
        pool: &PgPool,
        id: DbId,
        media_asset_id: DbId,
    ) -> Result<Option<Placement>, sqlx::Error> {
        let query = format!(
            "UPDATE placements \
             SET media_asset_id = $2, generation_seq = generation_seq + 1 \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Placement>(&query)
            .bind(id)
            .bind(media_asset_id)
            .fetch_optional(pool)
            .await
    }

    /// Find a generation-track placement whose frame window matches
    /// exactly.
    ///
    /// Ordered by id so repeated lookups pick the same row.
    pub async fn find_window_match(
        pool: &PgPool,
        project_id: DbId,
        start_frame: i64,
        duration_frames: i64,
        fps: i32,
    ) -> Result<Option<Placement>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM placements \
             WHERE project_id = $1 \
               AND track_id IN (SELECT id FROM tracks WHERE project_id = $1 AND kind = $2) \
               AND start_frame = $3 \
               AND duration_frames = $4 \
               AND fps = $5 \
             ORDER BY id \
             LIMIT 1"
        );
        sqlx::query_as::<_, Placement>(&query)
            .bind(project_id)
            .bind(TRACK_KIND_GENERATION)
            .bind(start_frame)
            .bind(duration_frames)
            .bind(fps)
            .fetch_optional(pool)
            .await
    }

    /// Insert a placement already holding a generated asset.
    ///
    /// Seeds `generation_seq` at 1, counting this first assignment.
    #[allow(clippy::too_many_arguments)]
    pub async fn insert_generated(
        pool: &PgPool,
        project_id: DbId,
        track_id: DbId,
        media_asset_id: DbId,
        label: Option<&str>,
        start_frame: i64,
        duration_frames: i64,
        fps: i32,
    ) -> Result<Placement, sqlx::Error> {
        let query = format!(
            "INSERT INTO placements \
                (project_id, track_id, media_asset_id, label, start_frame, duration_frames, \
                 fps, generation_seq) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, 1) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Placement>(&query)
            .bind(project_id)
            .bind(track_id)
            .bind(media_asset_id)
            .bind(label)
            .bind(start_frame)
            .bind(duration_frames)
            .bind(fps)
            .fetch_one(pool)
            .await
    }
}
