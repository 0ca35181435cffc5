//! Routes uploaded generation outputs back onto the timeline.
//!
//! A completion notification carries little more than a filename. The
//! reconciler decodes the shot address embedded in it, claims the
//! volatile correlation entry the dispatcher parked, enriches from the
//! durable audit row, and then walks a chain of placement strategies:
//!
//! 1. the placement the volatile entry targeted,
//! 2. the placement the audit row targeted,
//! 3. an existing generation-track placement with the same frame window,
//! 4. a new placement inserted at the shot's window,
//!
//! falling back to an orphaned asset record when the notification gives
//! no usable project or address. A placement update that touches zero
//! rows (the target vanished since dispatch) falls through to the next
//! strategy instead of failing the upload, and a volatile entry parked
//! for another project is ignored.

use serde::Serialize;
use serde_json::json;
use shotforge_cloud::storage::OUTPUT_KEY_PREFIX;
use shotforge_comfyui::{CorrelationEntry, CorrelationStore};
use shotforge_core::address::{decode_owner_project, Address};
use shotforge_core::generation::{
    DISPATCH_STATUS_ORPHANED, DISPATCH_STATUS_RECONCILED_INSERTED,
    DISPATCH_STATUS_RECONCILED_REPLACED,
};
use shotforge_core::timeline::TRACK_KIND_GENERATION;
use shotforge_core::types::DbId;
use shotforge_db::models::dispatch::GenerationDispatch;
use shotforge_db::models::media_asset::{CreateMediaAsset, MediaAsset};
use shotforge_db::models::placement::Placement;
use shotforge_db::models::track::{CreateTrack, Track};
use shotforge_db::repositories::{DispatchRepo, MediaAssetRepo, PlacementRepo, TrackRepo};
use shotforge_db::DbPool;
use shotforge_events::bus::{
    EVENT_ASSET_CREATED, EVENT_ASSET_ORPHANED, EVENT_PLACEMENT_INSERTED, EVENT_PLACEMENT_UPDATED,
};
use shotforge_events::{EventBus, ShotEvent};

/// Name given to an auto-created generation track.
const GENERATION_TRACK_NAME: &str = "Generated";

/// Source recorded on assets whose filename carried a shot address.
const SOURCE_GENERATED: &str = "comfyui";

// ---------------------------------------------------------------------------
// Inputs and outputs
// ---------------------------------------------------------------------------

/// An upload notification reduced to what reconciliation needs.
#[derive(Debug, Clone)]
pub struct UploadNotice {
    pub filename: String,
    /// Object key; defaults to the outputs prefix plus the filename.
    pub storage_key: Option<String>,
    pub remote_url: Option<String>,
    pub kind: Option<String>,
    pub source: Option<String>,
    pub size_bytes: Option<i64>,
    /// Explicit ids win over ids derived from the filename.
    pub owner_id: Option<DbId>,
    pub project_id: Option<DbId>,
}

/// How an upload was routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// Assigned into an existing placement.
    Replaced,
    /// A new placement was created at the shot's window.
    Inserted,
    /// Stored without any placement.
    Orphaned,
}

impl ReconcileOutcome {
    /// Dispatch-row status this outcome advances to.
    pub fn dispatch_status(self) -> &'static str {
        match self {
            ReconcileOutcome::Replaced => DISPATCH_STATUS_RECONCILED_REPLACED,
            ReconcileOutcome::Inserted => DISPATCH_STATUS_RECONCILED_INSERTED,
            ReconcileOutcome::Orphaned => DISPATCH_STATUS_ORPHANED,
        }
    }
}

/// Everything the notification response reports back.
#[derive(Debug, Serialize)]
pub struct ReconcileReport {
    pub outcome: ReconcileOutcome,
    /// The asset record created for this upload.
    pub asset: MediaAsset,
    /// The placement that received the asset, when one did.
    pub placement: Option<Placement>,
    /// Normalized address token decoded from the filename.
    pub address: Option<String>,
}

/// Owner, project, and address recovered from a notification.
#[derive(Debug)]
struct ResolvedIdentity {
    owner_id: Option<DbId>,
    project_id: Option<DbId>,
    address: Option<Address>,
}

enum Placed {
    Replaced(Placement),
    Inserted(Placement),
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

/// Reconcile one uploaded output.
///
/// Database failures on the asset insert and on placement writes are
/// fatal; status updates and event publishing are best-effort.
pub async fn reconcile_upload(
    pool: &DbPool,
    correlation: &dyn CorrelationStore,
    bus: &EventBus,
    notice: UploadNotice,
) -> Result<ReconcileReport, sqlx::Error> {
    let identity = resolve_identity(&notice);
    // Re-encoding normalizes away the save-node suffix (`_00001.mp4`),
    // yielding the exact token the dispatcher used as correlation key.
    let token = identity.address.as_ref().map(Address::encode);

    // Volatile context: claim-once, so a duplicate notification for the
    // same address cannot re-use it.
    let entry = match token.as_deref() {
        Some(token) => correlation.take(token).await,
        None => None,
    };

    // Durable context: the newest audit row still waiting on a result.
    let dispatch_row = match (identity.project_id, token.as_deref()) {
        (Some(project_id), Some(token)) => {
            DispatchRepo::find_latest_unreconciled(pool, project_id, token).await?
        }
        _ => None,
    };

    if let (Some(claimed), Some(row)) = (identity.owner_id, dispatch_row.as_ref()) {
        if claimed != row.owner_id {
            tracing::warn!(
                claimed_owner = claimed,
                dispatch_owner = row.owner_id,
                address = token.as_deref().unwrap_or_default(),
                "Upload owner does not match the dispatch record"
            );
        }
    }

    let was_tracked = entry.is_some() || dispatch_row.is_some();

    let settings_snapshot = entry
        .as_ref()
        .and_then(|e| serde_json::to_value(&e.params).ok())
        .or_else(|| dispatch_row.as_ref().and_then(|d| d.shot_params.clone()));

    let storage_key = notice
        .storage_key
        .clone()
        .unwrap_or_else(|| format!("{OUTPUT_KEY_PREFIX}{}", notice.filename));

    let source = notice
        .source
        .clone()
        .or_else(|| identity.address.is_some().then(|| SOURCE_GENERATED.to_string()));

    let asset = MediaAssetRepo::create(
        pool,
        &CreateMediaAsset {
            project_id: identity.project_id,
            filename: notice.filename.clone(),
            storage_key,
            remote_url: notice.remote_url.clone(),
            kind: notice.kind.clone(),
            source,
            size_bytes: notice.size_bytes,
            settings_snapshot,
        },
    )
    .await?;

    let placed = match (identity.project_id, identity.address.as_ref()) {
        (Some(project_id), Some(addr)) => Some(
            place_result(
                pool,
                project_id,
                addr,
                asset.id,
                entry.as_ref(),
                dispatch_row.as_ref(),
            )
            .await?,
        ),
        _ => None,
    };

    let (outcome, placement) = match placed {
        Some(Placed::Replaced(p)) => (ReconcileOutcome::Replaced, Some(p)),
        Some(Placed::Inserted(p)) => (ReconcileOutcome::Inserted, Some(p)),
        None => (ReconcileOutcome::Orphaned, None),
    };

    // Advance the audit row. Failure here loses a status transition,
    // not the asset, so log and keep going.
    if let Some(row) = &dispatch_row {
        let status = outcome.dispatch_status();
        if let Err(e) = DispatchRepo::mark_reconciled(pool, row.id, status).await {
            tracing::error!(
                dispatch_id = row.id,
                status,
                error = %e,
                "Failed to update dispatch status"
            );
        }
    }

    publish_outcome_events(bus, outcome, &asset, placement.as_ref(), &identity, token.as_deref());

    tracing::info!(
        asset_id = asset.id,
        outcome = ?outcome,
        address = token.as_deref().unwrap_or("-"),
        was_tracked,
        "Reconciled uploaded output"
    );

    Ok(ReconcileReport {
        outcome,
        asset,
        placement,
        address: token,
    })
}

/// Recover owner, project, and address from a notification.
///
/// Explicit ids always win. Otherwise the filename is tried against the
/// full address pattern, then the coarse `u<owner>_p<project>` pattern.
/// Non-numeric segments yield `None` rather than a guess.
fn resolve_identity(notice: &UploadNotice) -> ResolvedIdentity {
    let address = Address::decode(&notice.filename);

    let (derived_owner, derived_project) = match &address {
        Some(addr) => (parse_db_id(&addr.owner_id), parse_db_id(&addr.project_id)),
        None => match decode_owner_project(&notice.filename) {
            Some((owner, project)) => (parse_db_id(&owner), parse_db_id(&project)),
            None => (None, None),
        },
    };

    ResolvedIdentity {
        owner_id: notice.owner_id.or(derived_owner),
        project_id: notice.project_id.or(derived_project),
        address,
    }
}

fn parse_db_id(segment: &str) -> Option<DbId> {
    segment.parse().ok()
}

/// Why an upload ended up orphaned.
fn orphan_reason(identity: &ResolvedIdentity) -> &'static str {
    if identity.address.is_none() {
        "no_address"
    } else {
        "no_project"
    }
}

/// Placement-resolution strategies, tried in [`RESOLVE_ORDER`]. Each
/// proposes at most one candidate placement; a candidate whose update
/// touches zero rows falls through to the next strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ResolveStrategy {
    /// Target parked in the volatile correlation entry.
    VolatileTarget,
    /// Target recorded on the durable audit row.
    DurableTarget,
    /// Existing generation-track placement with the shot's frame window.
    WindowMatch,
}

const RESOLVE_ORDER: [ResolveStrategy; 3] = [
    ResolveStrategy::VolatileTarget,
    ResolveStrategy::DurableTarget,
    ResolveStrategy::WindowMatch,
];

/// Volatile target, honored only when the entry was parked for the same
/// project the notification resolved to.
fn volatile_target(project_id: DbId, entry: Option<&CorrelationEntry>) -> Option<DbId> {
    let entry = entry?;
    if entry.project_id != project_id {
        tracing::warn!(
            entry_project = entry.project_id,
            resolved_project = project_id,
            "Correlation entry belongs to another project, ignoring its target"
        );
        return None;
    }
    entry.target_placement_id
}

/// Walk the resolution strategies for a routable upload; insert a new
/// placement at the shot's window when none of them lands.
async fn place_result(
    pool: &DbPool,
    project_id: DbId,
    addr: &Address,
    asset_id: DbId,
    entry: Option<&CorrelationEntry>,
    dispatch: Option<&GenerationDispatch>,
) -> Result<Placed, sqlx::Error> {
    let mut tried: Vec<DbId> = Vec::new();
    for strategy in RESOLVE_ORDER {
        let candidate = match strategy {
            ResolveStrategy::VolatileTarget => volatile_target(project_id, entry),
            ResolveStrategy::DurableTarget => dispatch.and_then(|d| d.target_placement_id),
            ResolveStrategy::WindowMatch => PlacementRepo::find_window_match(
                pool,
                project_id,
                addr.start_frame,
                addr.duration_frames,
                addr.fps,
            )
            .await?
            .map(|p| p.id),
        };
        let Some(target) = candidate else { continue };
        // Both tiers usually point at the same placement.
        if tried.contains(&target) {
            continue;
        }
        tried.push(target);

        match PlacementRepo::assign_asset(pool, target, asset_id).await? {
            Some(placement) => {
                tracing::debug!(
                    placement_id = target,
                    strategy = ?strategy,
                    "Routed upload into existing placement"
                );
                return Ok(Placed::Replaced(placement));
            }
            None => {
                // Deleted since dispatch; fall through.
                tracing::warn!(
                    placement_id = target,
                    strategy = ?strategy,
                    "Target placement vanished, falling through"
                );
            }
        }
    }

    // Nothing to replace: insert at the shot's window.
    let track = ensure_generation_track(pool, project_id).await?;
    let token = addr.encode();
    let placement = PlacementRepo::insert_generated(
        pool,
        project_id,
        track.id,
        asset_id,
        Some(&token),
        addr.start_frame,
        addr.duration_frames,
        addr.fps,
    )
    .await?;
    Ok(Placed::Inserted(placement))
}

/// Find the project's generation track, creating one if it has none.
async fn ensure_generation_track(pool: &DbPool, project_id: DbId) -> Result<Track, sqlx::Error> {
    if let Some(track) = TrackRepo::find_generation_track(pool, project_id).await? {
        return Ok(track);
    }

    tracing::info!(project_id, "Project has no generation track, creating one");
    let input = CreateTrack {
        name: GENERATION_TRACK_NAME.to_string(),
        kind: TRACK_KIND_GENERATION.to_string(),
        sort_order: None,
    };
    match TrackRepo::create(pool, project_id, &input).await {
        Ok(track) => Ok(track),
        Err(e) => {
            // Lost a concurrent create; any generation track will do.
            if let Some(track) = TrackRepo::find_generation_track(pool, project_id).await? {
                Ok(track)
            } else {
                Err(e)
            }
        }
    }
}

fn publish_outcome_events(
    bus: &EventBus,
    outcome: ReconcileOutcome,
    asset: &MediaAsset,
    placement: Option<&Placement>,
    identity: &ResolvedIdentity,
    token: Option<&str>,
) {
    match (outcome, placement) {
        (ReconcileOutcome::Orphaned, _) => {
            let mut event = ShotEvent::new(EVENT_ASSET_ORPHANED)
                .with_entity("media_asset", asset.id)
                .with_payload(json!({
                    "filename": asset.filename,
                    "reason": orphan_reason(identity),
                }));
            if let Some(project_id) = asset.project_id {
                event = event.in_project(project_id);
            }
            bus.publish(event);
        }
        (outcome, Some(placement)) => {
            let event_type = match outcome {
                ReconcileOutcome::Replaced => EVENT_PLACEMENT_UPDATED,
                _ => EVENT_PLACEMENT_INSERTED,
            };
            bus.publish(
                ShotEvent::new(event_type)
                    .in_project(placement.project_id)
                    .with_entity("placement", placement.id)
                    .with_payload(json!({
                        "media_asset_id": asset.id,
                        "track_id": placement.track_id,
                        "generation_seq": placement.generation_seq,
                        "address": token,
                    })),
            );
            bus.publish(
                ShotEvent::new(EVENT_ASSET_CREATED)
                    .in_project(placement.project_id)
                    .with_entity("media_asset", asset.id)
                    .with_payload(json!({
                        "filename": asset.filename,
                        "storage_key": asset.storage_key,
                        "kind": asset.kind,
                    })),
            );
        }
        // Replaced/Inserted always carry a placement; nothing to do.
        (_, None) => {}
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use shotforge_core::generation::ShotParameters;

    use super::*;

    fn shot_params() -> ShotParameters {
        ShotParameters {
            prompt: "wide shot of the harbor at dusk".into(),
            negative_prompt: None,
            width: 720,
            height: 480,
            length_frames: 60,
            seed: 3,
            fps: 24,
            start_frame: 0,
            duration_frames: 60,
            target_placement_id: None,
        }
    }

    fn notice(filename: &str) -> UploadNotice {
        UploadNotice {
            filename: filename.to_string(),
            storage_key: None,
            remote_url: None,
            kind: None,
            source: None,
            size_bytes: None,
            owner_id: None,
            project_id: None,
        }
    }

    #[test]
    fn full_address_filename_resolves_everything() {
        let identity = resolve_identity(&notice("u1_p1_g7f3_s2_sf48_df60_fps24_00001.mp4"));
        assert_eq!(identity.owner_id, Some(1));
        assert_eq!(identity.project_id, Some(1));
        let addr = identity.address.expect("address should decode");
        assert_eq!(addr.shot_index, 2);
        assert_eq!(addr.start_frame, 48);
        assert_eq!(addr.duration_frames, 60);
        assert_eq!(addr.fps, 24);
    }

    #[test]
    fn coarse_pattern_recovers_ids_without_address() {
        let identity = resolve_identity(&notice("u3_p9_final_take.mp4"));
        assert_eq!(identity.owner_id, Some(3));
        assert_eq!(identity.project_id, Some(9));
        assert!(identity.address.is_none());
    }

    #[test]
    fn explicit_ids_override_derived_ones() {
        let mut n = notice("u1_p1_g7f3_s2_sf48_df60_fps24.mp4");
        n.owner_id = Some(42);
        n.project_id = Some(43);
        let identity = resolve_identity(&n);
        assert_eq!(identity.owner_id, Some(42));
        assert_eq!(identity.project_id, Some(43));
        assert_matches!(identity.address, Some(_));
    }

    #[test]
    fn non_numeric_segments_yield_no_ids() {
        let identity = resolve_identity(&notice("uabc_pdef_render.mp4"));
        assert_eq!(identity.owner_id, None);
        assert_eq!(identity.project_id, None);
        assert!(identity.address.is_none());
    }

    #[test]
    fn unrelated_filename_resolves_nothing() {
        let identity = resolve_identity(&notice("holiday_footage.mp4"));
        assert_eq!(identity.owner_id, None);
        assert_eq!(identity.project_id, None);
        assert!(identity.address.is_none());
        assert_eq!(orphan_reason(&identity), "no_address");
    }

    #[test]
    fn decoded_address_without_project_orphans_for_missing_project() {
        // Numeric-looking pattern is required for ids; the address
        // itself tolerates any alphanumeric segment.
        let identity = resolve_identity(&notice("ux_py_gab12cd_s0_sf0_df60_fps24.mp4"));
        assert_matches!(identity.address, Some(_));
        assert_eq!(identity.project_id, None);
        assert_eq!(orphan_reason(&identity), "no_project");
    }

    #[test]
    fn resolution_tries_volatile_then_durable_then_window() {
        assert_eq!(
            RESOLVE_ORDER,
            [
                ResolveStrategy::VolatileTarget,
                ResolveStrategy::DurableTarget,
                ResolveStrategy::WindowMatch,
            ]
        );
    }

    #[test]
    fn volatile_target_requires_matching_project() {
        let mut entry = CorrelationEntry {
            project_id: 4,
            target_placement_id: Some(9),
            params: shot_params(),
        };
        assert_eq!(volatile_target(4, Some(&entry)), Some(9));

        entry.project_id = 5;
        assert_eq!(volatile_target(4, Some(&entry)), None);
    }

    #[test]
    fn volatile_target_is_absent_without_an_entry() {
        assert_eq!(volatile_target(4, None), None);
    }

    #[test]
    fn outcomes_map_to_dispatch_statuses() {
        assert_eq!(
            ReconcileOutcome::Replaced.dispatch_status(),
            DISPATCH_STATUS_RECONCILED_REPLACED
        );
        assert_eq!(
            ReconcileOutcome::Inserted.dispatch_status(),
            DISPATCH_STATUS_RECONCILED_INSERTED
        );
        assert_eq!(
            ReconcileOutcome::Orphaned.dispatch_status(),
            DISPATCH_STATUS_ORPHANED
        );
    }

    #[test]
    fn outcome_serializes_snake_case() {
        assert_eq!(
            serde_json::to_value(ReconcileOutcome::Replaced).unwrap(),
            serde_json::json!("replaced")
        );
        assert_eq!(
            serde_json::to_value(ReconcileOutcome::Orphaned).unwrap(),
            serde_json::json!("orphaned")
        );
    }
}
