//! Repository for the `media_assets` table.

use shotforge_core::types::DbId;
use sqlx::PgPool;

use crate::models::media_asset::{CreateMediaAsset, MediaAsset};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, project_id, filename, storage_key, remote_url, kind, source, \
                       size_bytes, settings_snapshot, created_at, updated_at";

/// Provides CRUD operations for media assets.
pub struct MediaAssetRepo;

impl MediaAssetRepo {
    /// Insert a new media asset, returning the created row.
    pub async fn create(
        pool: &PgPool,
        input: &CreateMediaAsset,
    ) -> Result<MediaAsset, sqlx::Error> {
        let query = format!(
            "INSERT INTO media_assets \
                (project_id, filename, storage_key, remote_url, kind, source, size_bytes, \
                 settings_snapshot) \
             VALUES ($1, $2, $3, $4, COALESCE($5, 'video'), $6, $7, $8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MediaAsset>(&query)
            .bind(input.project_id)
            .bind(&input.filename)
            .bind(&input.storage_key)
            .bind(&input.remote_url)
            .bind(&input.kind)
            .bind(&input.source)
            .bind(input.size_bytes)
            .bind(&input.settings_snapshot)
            .fetch_one(pool)
            .await
    }

    /// Find a media asset by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<MediaAsset>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM media_assets WHERE id = $1");
        sqlx::query_as::<_, MediaAsset>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all media assets of a project, newest first.
    pub async fn list_by_project(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Vec<MediaAsset>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM media_assets \
             WHERE project_id = $1 \
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, MediaAsset>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    /// Point an asset at a corrected storage location.
    ///
    /// Used after retrieval discovers the object under an alternate key.
    pub async fn update_storage_key(
        pool: &PgPool,
        id: DbId,
        storage_key: &str,
    ) -> Result<Option<MediaAsset>, sqlx::Error> {
        let query = format!(
            "UPDATE media_assets SET storage_key = $2 WHERE id = $1 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MediaAsset>(&query)
            .bind(id)
            .bind(storage_key)
            .fetch_optional(pool)
            .await
    }
}
