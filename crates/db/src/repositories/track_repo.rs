//! Repository for the `tracks` table.

use shotforge_core::timeline::TRACK_KIND_GENERATION;
use shotforge_core::types::DbId;
use sqlx::PgPool;

use crate::models::track::{CreateTrack, Track};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, project_id, name, kind, sort_order, created_at, updated_at";

/// Provides CRUD operations for tracks.
pub struct TrackRepo;

impl TrackRepo {
    /// Insert a new track, returning the created row.
    pub async fn create(
        pool: &PgPool,
        project_id: DbId,
        input: &CreateTrack,
    ) -> Result<Track, sqlx::Error> {
        let query = format!(
            "INSERT INTO tracks (project_id, name, kind, sort_order) \
             VALUES ($1, $2, $3, COALESCE($4, 0)) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Track>(&query)
            .bind(project_id)
            .bind(&input.name)
            .bind(&input.kind)
            .bind(input.sort_order)
            .fetch_one(pool)
            .await
    }

    /// List all tracks of a project, ordered by sort_order, then name.
    pub async fn list_by_project(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Vec<Track>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM tracks WHERE project_id = $1 ORDER BY sort_order, name"
        );
        sqlx::query_as::<_, Track>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    /// First generation track of a project, if one exists.
    pub async fn find_generation_track(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Option<Track>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM tracks \
             WHERE project_id = $1 AND kind = $2 \
             ORDER BY sort_order, id \
             LIMIT 1"
        );
        sqlx::query_as::<_, Track>(&query)
            .bind(project_id)
            .bind(TRACK_KIND_GENERATION)
            .fetch_optional(pool)
            .await
    }
}
