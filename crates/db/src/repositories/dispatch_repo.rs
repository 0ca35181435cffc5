//! Repository for the `generation_dispatches` table.
//!
//! Dispatch rows are the durable half of result correlation: they are
//! written before a shot leaves the process and updated as it moves
//! through its lifecycle, but never deleted.

use shotforge_core::generation::{DISPATCH_STATUS_AWAITING_RESULT, DISPATCH_STATUS_DISPATCHED};
use shotforge_core::types::DbId;
use sqlx::PgPool;

use crate::models::dispatch::{CreateDispatch, GenerationDispatch};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, project_id, owner_id, batch_id, shot_index, address, \
                       target_placement_id, remote_job_id, shot_params, status, \
                       dispatched_at, reconciled_at, created_at, updated_at";

/// Provides operations for dispatch audit rows.
pub struct DispatchRepo;

impl DispatchRepo {
    /// Insert a dispatch row in the current schema shape.
    pub async fn create(
        pool: &PgPool,
        input: &CreateDispatch,
    ) -> Result<GenerationDispatch, sqlx::Error> {
        let query = format!(
            "INSERT INTO generation_dispatches \
                (project_id, owner_id, batch_id, shot_index, address, target_placement_id, \
                 remote_job_id, shot_params, status, dispatched_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, now()) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GenerationDispatch>(&query)
            .bind(input.project_id)
            .bind(input.owner_id)
            .bind(&input.batch_id)
            .bind(input.shot_index)
            .bind(&input.address)
            .bind(input.target_placement_id)
            .bind(&input.remote_job_id)
            .bind(&input.shot_params)
            .bind(DISPATCH_STATUS_DISPATCHED)
            .fetch_one(pool)
            .await
    }

    /// Insert a dispatch row against the pre-snapshot schema.
    ///
    /// Databases migrated before the `shot_params` and
    /// `target_placement_id` columns existed reject the current insert;
    /// this writes only the columns that have been there from the start.
    pub async fn create_legacy(
        pool: &PgPool,
        input: &CreateDispatch,
    ) -> Result<GenerationDispatch, sqlx::Error> {
        let query = format!(
            "INSERT INTO generation_dispatches \
                (project_id, owner_id, batch_id, shot_index, address, remote_job_id, \
                 status, dispatched_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, now()) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GenerationDispatch>(&query)
            .bind(input.project_id)
            .bind(input.owner_id)
            .bind(&input.batch_id)
            .bind(input.shot_index)
            .bind(&input.address)
            .bind(&input.remote_job_id)
            .bind(DISPATCH_STATUS_DISPATCHED)
            .fetch_one(pool)
            .await
    }

    /// Find a dispatch row by its internal ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<GenerationDispatch>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM generation_dispatches WHERE id = $1");
        sqlx::query_as::<_, GenerationDispatch>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Audit query: all dispatches of a project for one address, newest
    /// first.
    pub async fn find_by_project_and_address(
        pool: &PgPool,
        project_id: DbId,
        address: &str,
    ) -> Result<Vec<GenerationDispatch>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM generation_dispatches \
             WHERE project_id = $1 AND address = $2 \
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, GenerationDispatch>(&query)
            .bind(project_id)
            .bind(address)
            .fetch_all(pool)
            .await
    }

    /// Most recent dispatch for an address that has not been reconciled
    /// yet.
    pub async fn find_latest_unreconciled(
        pool: &PgPool,
        project_id: DbId,
        address: &str,
    ) -> Result<Option<GenerationDispatch>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM generation_dispatches \
             WHERE project_id = $1 AND address = $2 AND status IN ($3, $4) \
             ORDER BY created_at DESC, id DESC \
             LIMIT 1"
        );
        sqlx::query_as::<_, GenerationDispatch>(&query)
            .bind(project_id)
            .bind(address)
            .bind(DISPATCH_STATUS_DISPATCHED)
            .bind(DISPATCH_STATUS_AWAITING_RESULT)
            .fetch_optional(pool)
            .await
    }

    /// Record backend acceptance: job id (when reported) and the switch
    /// to awaiting_result.
    pub async fn mark_awaiting(
        pool: &PgPool,
        id: DbId,
        remote_job_id: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE generation_dispatches \
             SET status = $2, remote_job_id = COALESCE($3, remote_job_id) \
             WHERE id = $1",
        )
        .bind(id)
        .bind(DISPATCH_STATUS_AWAITING_RESULT)
        .bind(remote_job_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record the reconciliation outcome for a dispatch row.
    pub async fn mark_reconciled(
        pool: &PgPool,
        id: DbId,
        status: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE generation_dispatches \
             SET status = $2, reconciled_at = now() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(status)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
