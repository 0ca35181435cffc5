//! Job dispatcher: walks a batch of shots from parameters to queued
//! render jobs.
//!
//! For each shot, in order: hydrate the workflow template, encode the
//! shot's Address into the output filename, park a correlation entry,
//! write a durable audit row, then submit. Submission is sequential so
//! the render queue preserves shot order.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use shotforge_core::address::{new_batch_id, Address};
use shotforge_core::error::CoreError;
use shotforge_core::generation::{validate_shot, ShotParameters};
use shotforge_core::hydrate::{hydrate, set_filename_prefix, JobSpec};
use shotforge_core::types::DbId;
use shotforge_db::models::dispatch::{CreateDispatch, GenerationDispatch};
use shotforge_db::repositories::dispatch_repo::DispatchRepo;
use shotforge_events::bus::EVENT_GENERATION_DISPATCHED;
use shotforge_events::{EventBus, ShotEvent};
use sqlx::PgPool;
use uuid::Uuid;

use crate::api::{extract_job_id, ComfyUIApi};
use crate::correlation::{CorrelationEntry, CorrelationStore};

// ---------------------------------------------------------------------------
// In-flight counter
// ---------------------------------------------------------------------------

/// Process-wide count of submissions currently on the wire to the
/// render backend.
///
/// Purely informational: dispatch never blocks on it. Cloneable handle
/// over a shared atomic.
#[derive(Clone, Default)]
pub struct InFlightCounter(Arc<AtomicUsize>);

impl InFlightCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more job in flight, returning the new count.
    pub fn increment(&self) -> usize {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Count one job as finished, returning the new count. Saturates at
    /// zero so an unmatched decrement cannot wrap.
    pub fn decrement(&self) -> usize {
        let mut current = self.0.load(Ordering::Relaxed);
        while current > 0 {
            match self.0.compare_exchange_weak(
                current,
                current - 1,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return current - 1,
                Err(actual) => current = actual,
            }
        }
        0
    }

    /// Current number of jobs in flight.
    pub fn current(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// Outcome types
// ---------------------------------------------------------------------------

/// Errors that abort a batch before anything is submitted.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("batch contains no shots")]
    EmptyBatch,

    /// A shot failed validation or hydration. Nothing has been
    /// dispatched when this is returned.
    #[error("shot {index}: {source}")]
    Shot {
        index: usize,
        #[source]
        source: CoreError,
    },
}

/// One successfully queued shot.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchedShot {
    pub shot_index: u32,
    pub address: String,
    /// Audit row id, absent when every write shape failed.
    pub dispatch_id: Option<DbId>,
    /// Job id the backend reported, absent when acceptance carried none.
    pub remote_job_id: Option<String>,
}

/// One shot the backend rejected at submission time.
#[derive(Debug, Clone, Serialize)]
pub struct ShotFailure {
    pub shot_index: u32,
    pub address: String,
    pub error: String,
}

/// Result of dispatching one batch.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchOutcome {
    pub batch_id: String,
    pub dispatched: Vec<DispatchedShot>,
    pub failures: Vec<ShotFailure>,
}

/// A shot that passed hydration and is ready to submit.
struct PreparedJob {
    shot_index: u32,
    address: String,
    spec: JobSpec,
    params: ShotParameters,
}

// ---------------------------------------------------------------------------
// Audit write strategies
// ---------------------------------------------------------------------------

/// Insert shapes tried in order until one sticks. `Current` matches the
/// bundled migrations; `Legacy` writes only the columns present before
/// the snapshot columns were added.
#[derive(Clone, Copy, Debug)]
enum AuditWriteStrategy {
    Current,
    Legacy,
}

const AUDIT_WRITE_ORDER: [AuditWriteStrategy; 2] =
    [AuditWriteStrategy::Current, AuditWriteStrategy::Legacy];

// ---------------------------------------------------------------------------
// JobDispatcher
// ---------------------------------------------------------------------------

/// Submits hydrated workflows to the render backend, leaving behind the
/// volatile and durable correlation state the reconciler needs later.
pub struct JobDispatcher {
    api: ComfyUIApi,
    pool: PgPool,
    correlation: Arc<dyn CorrelationStore>,
    bus: Arc<EventBus>,
    in_flight: InFlightCounter,
    /// Stable client id for this process, sent with every submission.
    client_id: String,
}

impl JobDispatcher {
    pub fn new(
        api: ComfyUIApi,
        pool: PgPool,
        correlation: Arc<dyn CorrelationStore>,
        bus: Arc<EventBus>,
        in_flight: InFlightCounter,
    ) -> Self {
        Self {
            api,
            pool,
            correlation,
            bus,
            in_flight,
            client_id: Uuid::new_v4().to_string(),
        }
    }

    /// Handle to the shared in-flight counter.
    pub fn in_flight(&self) -> &InFlightCounter {
        &self.in_flight
    }

    /// Dispatch every shot of a batch, in order.
    ///
    /// All shots are validated and hydrated before the first submission,
    /// so a bad template or bad parameters fail the whole batch without
    /// side effects. Submission failures after that point are collected
    /// per shot; audit writes are best-effort and never fail a shot.
    pub async fn dispatch_batch(
        &self,
        project_id: DbId,
        owner_id: DbId,
        template: &Value,
        shots: &[ShotParameters],
    ) -> Result<DispatchOutcome, DispatchError> {
        if shots.is_empty() {
            return Err(DispatchError::EmptyBatch);
        }

        let batch_id = new_batch_id();
        let jobs = prepare_jobs(template, owner_id, project_id, &batch_id, shots)?;

        let mut dispatched = Vec::new();
        let mut failures = Vec::new();

        for job in jobs {
            self.correlation
                .put(
                    &job.address,
                    CorrelationEntry {
                        project_id,
                        target_placement_id: job.params.target_placement_id,
                        params: job.params.clone(),
                    },
                )
                .await;

            let audit_row = self.write_audit_row(project_id, owner_id, &batch_id, &job).await;

            self.in_flight.increment();
            let submission = self
                .api
                .submit_workflow(&job.spec.clone().into_value(), &self.client_id)
                .await;
            self.in_flight.decrement();

            match submission {
                Ok(body) => {
                    let remote_job_id = extract_job_id(&body);
                    if remote_job_id.is_none() {
                        tracing::warn!(
                            address = %job.address,
                            "Backend accepted the job without reporting a job id",
                        );
                    }
                    if let Some(row) = &audit_row {
                        if let Err(e) = DispatchRepo::mark_awaiting(
                            &self.pool,
                            row.id,
                            remote_job_id.as_deref(),
                        )
                        .await
                        {
                            tracing::warn!(
                                error = %e,
                                dispatch_id = row.id,
                                "Failed to record backend acceptance",
                            );
                        }
                    }
                    tracing::info!(
                        address = %job.address,
                        remote_job_id = ?remote_job_id,
                        "Shot queued on render backend",
                    );
                    dispatched.push(DispatchedShot {
                        shot_index: job.shot_index,
                        address: job.address,
                        dispatch_id: audit_row.map(|r| r.id),
                        remote_job_id,
                    });
                }
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        address = %job.address,
                        "Workflow submission failed",
                    );
                    // The result will never arrive; reclaim the entry.
                    let _ = self.correlation.take(&job.address).await;
                    failures.push(ShotFailure {
                        shot_index: job.shot_index,
                        address: job.address,
                        error: e.to_string(),
                    });
                }
            }
        }

        self.bus.publish(
            ShotEvent::new(EVENT_GENERATION_DISPATCHED)
                .in_project(project_id)
                .with_payload(serde_json::json!({
                    "batch_id": batch_id,
                    "dispatched": dispatched.len(),
                    "failed": failures.len(),
                })),
        );

        Ok(DispatchOutcome {
            batch_id,
            dispatched,
            failures,
        })
    }

    /// Write the audit row, trying each insert shape in order.
    ///
    /// Returns `None` when every shape failed; the dispatch itself
    /// proceeds regardless.
    async fn write_audit_row(
        &self,
        project_id: DbId,
        owner_id: DbId,
        batch_id: &str,
        job: &PreparedJob,
    ) -> Option<GenerationDispatch> {
        let input = CreateDispatch {
            project_id,
            owner_id,
            batch_id: batch_id.to_string(),
            shot_index: job.shot_index as i32,
            address: job.address.clone(),
            target_placement_id: job.params.target_placement_id,
            remote_job_id: None,
            shot_params: serde_json::to_value(&job.params).ok(),
        };

        for strategy in AUDIT_WRITE_ORDER {
            let attempt = match strategy {
                AuditWriteStrategy::Current => DispatchRepo::create(&self.pool, &input).await,
                AuditWriteStrategy::Legacy => {
                    DispatchRepo::create_legacy(&self.pool, &input).await
                }
            };
            match attempt {
                Ok(row) => return Some(row),
                Err(e) => tracing::warn!(
                    error = %e,
                    strategy = ?strategy,
                    address = %job.address,
                    "Dispatch audit insert failed",
                ),
            }
        }
        tracing::error!(
            address = %job.address,
            "Dispatch audit row could not be written in any shape; continuing without audit",
        );
        None
    }
}

/// Validate, hydrate, and address every shot of a batch.
///
/// Fails on the first bad shot, before anything has been submitted.
fn prepare_jobs(
    template: &Value,
    owner_id: DbId,
    project_id: DbId,
    batch_id: &str,
    shots: &[ShotParameters],
) -> Result<Vec<PreparedJob>, DispatchError> {
    let mut jobs = Vec::with_capacity(shots.len());
    for (index, params) in shots.iter().enumerate() {
        let build = || -> Result<PreparedJob, CoreError> {
            validate_shot(params)?;
            let address = Address {
                owner_id: owner_id.to_string(),
                project_id: project_id.to_string(),
                batch_id: batch_id.to_string(),
                shot_index: index as u32,
                start_frame: params.start_frame,
                duration_frames: params.duration_frames,
                fps: params.fps,
            }
            .encode();
            let mut spec = hydrate(template, params)?;
            set_filename_prefix(&mut spec, &address)?;
            Ok(PreparedJob {
                shot_index: index as u32,
                address,
                spec,
                params: params.clone(),
            })
        };
        jobs.push(build().map_err(|source| DispatchError::Shot { index, source })?);
    }
    Ok(jobs)
}
