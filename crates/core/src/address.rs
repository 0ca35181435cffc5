//! Filename Address codec.
//!
//! Every dispatched render job declares its output name as an encoded
//! Address token. The remote renderer has no richer callback channel, so
//! the token later comes back as a substring of the produced asset's
//! filename and is the only reliable link between a completion
//! notification and the request that caused it. Parse failures are a
//! normal outcome here, not an exception: callers get `Option` and decide.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Token shape embedded in output filenames (ASCII, filename-safe).
///
/// `u<owner>_p<project>_g<batch>_s<shot>_sf<start>_df<duration>_fps<fps>`
pub const ADDRESS_PATTERN: &str =
    r"u([A-Za-z0-9]+)_p([A-Za-z0-9]+)_g([A-Za-z0-9]+)_s(\d+)_sf(\d+)_df(\d+)_fps(\d+)";

/// Coarser "who made this" prefix: owner and project only. Used as a
/// last-resort identity check on filenames that carry no full Address.
pub const OWNER_PROJECT_PATTERN: &str = r"u([A-Za-z0-9]+)_p([A-Za-z0-9]+)";

/// Length of the random per-batch id.
pub const BATCH_ID_LEN: usize = 6;

static ADDRESS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(ADDRESS_PATTERN).expect("valid regex"));

static OWNER_PROJECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(OWNER_PROJECT_PATTERN).expect("valid regex"));

/// Structured identity carried by one dispatched shot.
///
/// `owner_id` / `project_id` are opaque identifier strings at this layer;
/// the persistence boundary parses them into database ids. `batch_id` is
/// shared by all shots of one generation request, so sibling shots can be
/// grouped after the fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub owner_id: String,
    pub project_id: String,
    pub batch_id: String,
    pub shot_index: u32,
    pub start_frame: i64,
    pub duration_frames: i64,
    pub fps: i32,
}

impl Address {
    /// Encode into the filename token.
    ///
    /// Lossless under [`Address::decode`] as long as the id fields are
    /// alphanumeric, which is all this system ever produces (database
    /// ids stringified, batch ids from [`new_batch_id`]).
    pub fn encode(&self) -> String {
        format!(
            "u{}_p{}_g{}_s{}_sf{}_df{}_fps{}",
            self.owner_id,
            self.project_id,
            self.batch_id,
            self.shot_index,
            self.start_frame,
            self.duration_frames,
            self.fps,
        )
    }

    /// Extract an Address from any string containing the token.
    ///
    /// The remote side prepends counters and path fragments, so this is a
    /// tolerant substring match. Returns `None` when no token is present
    /// or a numeric field overflows; callers must treat that as "no
    /// address found", never as a crash.
    pub fn decode(input: &str) -> Option<Address> {
        let caps = ADDRESS_RE.captures(input)?;
        Some(Address {
            owner_id: caps[1].to_string(),
            project_id: caps[2].to_string(),
            batch_id: caps[3].to_string(),
            shot_index: caps[4].parse().ok()?,
            start_frame: caps[5].parse().ok()?,
            duration_frames: caps[6].parse().ok()?,
            fps: caps[7].parse().ok()?,
        })
    }
}

/// Extract just the `u<owner>_p<project>` prefix from a filename.
///
/// Deliberately broader than the full Address pattern: it also matches
/// filenames from older pipelines that tagged ownership without the full
/// placement window.
pub fn decode_owner_project(input: &str) -> Option<(String, String)> {
    let caps = OWNER_PROJECT_RE.captures(input)?;
    Some((caps[1].to_string(), caps[2].to_string()))
}

/// Generate a short random batch id (lowercase alphanumeric).
///
/// Uniqueness of a full token comes from this id plus the shot index;
/// collisions between concurrently dispatched batches are what the
/// randomness is for.
pub fn new_batch_id() -> String {
    use rand::distr::Alphanumeric;
    use rand::Rng;

    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(BATCH_ID_LEN)
        .map(char::from)
        .collect::<String>()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn sample() -> Address {
        Address {
            owner_id: "1".into(),
            project_id: "1".into(),
            batch_id: "7f3".into(),
            shot_index: 2,
            start_frame: 48,
            duration_frames: 60,
            fps: 24,
        }
    }

    // -- encode --

    #[test]
    fn encode_produces_expected_token() {
        assert_eq!(sample().encode(), "u1_p1_g7f3_s2_sf48_df60_fps24");
    }

    #[test]
    fn encode_with_alphanumeric_ids() {
        let addr = Address {
            owner_id: "abc123".into(),
            project_id: "XY9".into(),
            ..sample()
        };
        assert_eq!(addr.encode(), "uabc123_pXY9_g7f3_s2_sf48_df60_fps24");
    }

    // -- decode --

    #[test]
    fn decode_round_trips_losslessly() {
        let cases = [
            sample(),
            Address {
                owner_id: "42".into(),
                project_id: "9001".into(),
                batch_id: "a0b1c2".into(),
                shot_index: 0,
                start_frame: 0,
                duration_frames: 1,
                fps: 60,
            },
            Address {
                owner_id: "u".into(),
                project_id: "p".into(),
                batch_id: "z".into(),
                shot_index: 999,
                start_frame: 8_640_000,
                duration_frames: 144_000,
                fps: 120,
            },
        ];
        for addr in cases {
            let token = addr.encode();
            assert_eq!(Address::decode(&token), Some(addr.clone()), "token {token}");
        }
    }

    #[test]
    fn decode_tolerates_prefix_and_suffix() {
        let decoded =
            Address::decode("ComfyUI_00012_u9_p12_gab1cd2_s0_sf0_df120_fps30_00001.mp4")
                .expect("address expected");
        assert_eq!(decoded.owner_id, "9");
        assert_eq!(decoded.project_id, "12");
        assert_eq!(decoded.batch_id, "ab1cd2");
        assert_eq!(decoded.shot_index, 0);
        assert_eq!(decoded.start_frame, 0);
        assert_eq!(decoded.duration_frames, 120);
        assert_eq!(decoded.fps, 30);
    }

    #[test]
    fn decode_without_pattern_returns_none() {
        assert_eq!(Address::decode("holiday_footage.mp4"), None);
        assert_eq!(Address::decode(""), None);
    }

    #[test]
    fn decode_partial_pattern_returns_none() {
        // Owner/project prefix alone is not a full Address.
        assert_eq!(Address::decode("u1_p1_g7f3_s2.mp4"), None);
    }

    #[test]
    fn decode_does_not_panic_on_huge_numbers() {
        // 30 digits overflow i64; fail closed instead of panicking.
        let input = "u1_p1_gabc_s1_sf999999999999999999999999999999_df60_fps24";
        assert_eq!(Address::decode(input), None);
    }

    // -- decode_owner_project --

    #[test]
    fn owner_project_from_full_address() {
        let (owner, project) =
            decode_owner_project("u7_p31_gqqq_s1_sf0_df48_fps24_x.mp4").expect("prefix");
        assert_eq!(owner, "7");
        assert_eq!(project, "31");
    }

    #[test]
    fn owner_project_from_bare_prefix() {
        let (owner, project) = decode_owner_project("u42_p7_final_cut.mp4").expect("prefix");
        assert_eq!(owner, "42");
        assert_eq!(project, "7");
    }

    #[test]
    fn owner_project_absent_returns_none() {
        assert_eq!(decode_owner_project("render_final.mp4"), None);
    }

    // -- batch ids --

    #[test]
    fn batch_id_is_short_lowercase_alphanumeric() {
        for _ in 0..50 {
            let id = new_batch_id();
            assert_eq!(id.len(), BATCH_ID_LEN);
            assert!(id.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        }
    }

    #[test]
    fn batch_of_shots_yields_distinct_tokens_sharing_batch_id() {
        let batch_id = new_batch_id();
        let tokens: HashSet<String> = (0..8)
            .map(|i| {
                Address {
                    batch_id: batch_id.clone(),
                    shot_index: i,
                    start_frame: i64::from(i) * 60,
                    ..sample()
                }
                .encode()
            })
            .collect();
        assert_eq!(tokens.len(), 8);
        for token in &tokens {
            assert!(token.contains(&format!("_g{batch_id}_")));
        }
    }
}
