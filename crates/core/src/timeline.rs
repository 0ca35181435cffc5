//! Track kind constants.
//!
//! The reconciler cares about exactly one distinction: generation tracks
//! are where auto-placed AI clips land; everything else is user-managed.

use crate::error::CoreError;

/// A user-managed video track.
pub const TRACK_KIND_VIDEO: &str = "video";

/// The track AI-generated clips are auto-placed on.
pub const TRACK_KIND_GENERATION: &str = "generation";

/// An audio track (never a reconciliation target).
pub const TRACK_KIND_AUDIO: &str = "audio";

/// All valid track kind values.
pub const VALID_TRACK_KINDS: &[&str] = &[TRACK_KIND_VIDEO, TRACK_KIND_GENERATION, TRACK_KIND_AUDIO];

/// Returns `true` if the given string is a valid track kind.
pub fn is_valid_track_kind(s: &str) -> bool {
    VALID_TRACK_KINDS.contains(&s)
}

/// Validate a track kind, for create/update paths.
pub fn validate_track_kind(kind: &str) -> Result<(), CoreError> {
    if is_valid_track_kind(kind) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid track kind '{kind}'. Expected one of: {VALID_TRACK_KINDS:?}"
        )))
    }
}
