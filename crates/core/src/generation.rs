//! Shot parameter types, dispatch-status vocabulary, and validation.
//!
//! A [`ShotParameters`] value is produced once per requested shot and
//! travels the whole pipeline: it feeds the template hydrator, is cached
//! in the correlation tiers, and is persisted as the settings snapshot on
//! the resulting media asset.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Dispatch status vocabulary
// ---------------------------------------------------------------------------

/// Job accepted locally; no remote id yet.
pub const DISPATCH_STATUS_DISPATCHED: &str = "dispatched";
/// Remote endpoint acknowledged the job; completion pending.
pub const DISPATCH_STATUS_AWAITING_RESULT: &str = "awaiting_result";
/// Completion replaced an existing placement's asset.
pub const DISPATCH_STATUS_RECONCILED_REPLACED: &str = "reconciled_replaced";
/// Completion inserted a fresh placement at the declared window.
pub const DISPATCH_STATUS_RECONCILED_INSERTED: &str = "reconciled_inserted";
/// Completion could not be matched to any placement.
pub const DISPATCH_STATUS_ORPHANED: &str = "orphaned";

/// All valid dispatch statuses, in lifecycle order.
pub const VALID_DISPATCH_STATUSES: &[&str] = &[
    DISPATCH_STATUS_DISPATCHED,
    DISPATCH_STATUS_AWAITING_RESULT,
    DISPATCH_STATUS_RECONCILED_REPLACED,
    DISPATCH_STATUS_RECONCILED_INSERTED,
    DISPATCH_STATUS_ORPHANED,
];

// ---------------------------------------------------------------------------
// Shot defaults and limits
// ---------------------------------------------------------------------------

/// Default render width in pixels.
pub const DEFAULT_WIDTH: i32 = 720;
/// Default render height in pixels.
pub const DEFAULT_HEIGHT: i32 = 480;
/// Default frame rate for generated clips.
pub const DEFAULT_FPS: i32 = 24;
/// Maximum prompt length in characters.
pub const MAX_PROMPT_LENGTH: usize = 10_000;
/// Hard ceiling on frames per shot to keep remote jobs bounded.
pub const MAX_SHOT_FRAMES: i32 = 3_000;

// ---------------------------------------------------------------------------
// ShotParameters
// ---------------------------------------------------------------------------

/// Concrete parameters for a single shot render.
///
/// `start_frame`/`duration_frames` double as the placement hint: they
/// name the timeline window this shot is destined for.
/// `target_placement_id` is set only on regenerate requests, where the
/// caller already knows which placement the result must replace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShotParameters {
    pub prompt: String,
    #[serde(default)]
    pub negative_prompt: Option<String>,
    pub width: i32,
    pub height: i32,
    pub length_frames: i32,
    pub seed: i64,
    pub fps: i32,
    pub start_frame: i64,
    pub duration_frames: i64,
    #[serde(default)]
    pub target_placement_id: Option<DbId>,
}

/// Validate a shot before any template work happens.
///
/// Hydration errors are fatal per shot and must surface before dispatch,
/// so the cheap checks run first.
pub fn validate_shot(params: &ShotParameters) -> Result<(), CoreError> {
    if params.prompt.trim().is_empty() {
        return Err(CoreError::Validation("Prompt must not be empty".to_string()));
    }
    if params.prompt.len() > MAX_PROMPT_LENGTH {
        return Err(CoreError::Validation(format!(
            "Prompt exceeds maximum length of {MAX_PROMPT_LENGTH} characters (got {})",
            params.prompt.len()
        )));
    }
    if params.width <= 0 || params.height <= 0 {
        return Err(CoreError::Validation(format!(
            "Dimensions must be positive (got {}x{})",
            params.width, params.height
        )));
    }
    if params.length_frames <= 0 || params.length_frames > MAX_SHOT_FRAMES {
        return Err(CoreError::Validation(format!(
            "length_frames must be in 1..={MAX_SHOT_FRAMES} (got {})",
            params.length_frames
        )));
    }
    if params.fps <= 0 {
        return Err(CoreError::Validation(format!(
            "fps must be positive (got {})",
            params.fps
        )));
    }
    if params.start_frame < 0 || params.duration_frames <= 0 {
        return Err(CoreError::Validation(format!(
            "Placement window invalid (start_frame {}, duration_frames {})",
            params.start_frame, params.duration_frames
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> ShotParameters {
        ShotParameters {
            prompt: "a slow pan across a neon city at night".into(),
            negative_prompt: Some("blurry, low quality".into()),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            length_frames: 81,
            seed: 123456789,
            fps: DEFAULT_FPS,
            start_frame: 48,
            duration_frames: 60,
            target_placement_id: None,
        }
    }

    #[test]
    fn valid_shot_passes() {
        assert!(validate_shot(&valid()).is_ok());
    }

    #[test]
    fn empty_prompt_rejected() {
        let params = ShotParameters {
            prompt: "   ".into(),
            ..valid()
        };
        let err = validate_shot(&params).unwrap_err();
        assert!(err.to_string().contains("Prompt must not be empty"));
    }

    #[test]
    fn oversized_prompt_rejected() {
        let params = ShotParameters {
            prompt: "x".repeat(MAX_PROMPT_LENGTH + 1),
            ..valid()
        };
        assert!(validate_shot(&params).is_err());
    }

    #[test]
    fn non_positive_dimensions_rejected() {
        let params = ShotParameters {
            width: 0,
            ..valid()
        };
        assert!(validate_shot(&params).is_err());
    }

    #[test]
    fn frame_count_out_of_range_rejected() {
        let too_long = ShotParameters {
            length_frames: MAX_SHOT_FRAMES + 1,
            ..valid()
        };
        assert!(validate_shot(&too_long).is_err());

        let zero = ShotParameters {
            length_frames: 0,
            ..valid()
        };
        assert!(validate_shot(&zero).is_err());
    }

    #[test]
    fn negative_window_rejected() {
        let params = ShotParameters {
            start_frame: -1,
            ..valid()
        };
        assert!(validate_shot(&params).is_err());
    }

    #[test]
    fn statuses_cover_lifecycle() {
        assert_eq!(VALID_DISPATCH_STATUSES.len(), 5);
        assert!(VALID_DISPATCH_STATUSES.contains(&DISPATCH_STATUS_ORPHANED));
    }
}
