//! Difficulty retargeting.
//!
//! The difficulty target is the number of leading hex zero digits a block
//! hash must have; there is no compact "bits" encoding. Retargeting runs
//! every `difficulty_adjustment_interval` blocks, comparing the actual time
//! taken for that window against the expected time and clamping the
//! adjustment factor to `[0.25, 4.0]`.

/// True if `hash` has at least `difficulty` leading hex zero digits.
pub fn meets_target(hash: &str, difficulty: u32) -> bool {
    let prefix: String = "0".repeat(difficulty as usize);
    hash.starts_with(&prefix)
}

/// Computes the difficulty for the block at `height`, given the previous
/// block's difficulty and the timestamps bracketing the just-completed
/// adjustment window. Returns `previous_difficulty` unchanged outside of an
/// adjustment boundary.
pub fn next_difficulty_target(
    previous_difficulty: u32,
    height: u64,
    difficulty_adjustment_interval: u64,
    target_block_time_secs: u64,
    interval_start_timestamp: u64,
    previous_timestamp: u64,
) -> u32 {
    if height % difficulty_adjustment_interval != 0 {
        return previous_difficulty;
    }

    let actual_time = previous_timestamp.saturating_sub(interval_start_timestamp).max(1);
    let expected_time = difficulty_adjustment_interval * target_block_time_secs;

    let ratio = actual_time as f64 / expected_time as f64;
    let ratio = ratio.max(0.25).min(4.0);

    let new_difficulty = (previous_difficulty as f64 / ratio).round() as i64;
    new_difficulty.max(1) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meets_target_checks_leading_zeros() {
        assert!(meets_target("00ab", 2));
        assert!(!meets_target("0abc", 2));
    }

    #[test]
    fn no_adjustment_outside_window_boundary() {
        let d = next_difficulty_target(4, 7, 10, 15, 0, 1000);
        assert_eq!(d, 4);
    }

    #[test]
    fn difficulty_rises_when_blocks_come_too_fast() {
        // Window of 10 blocks at 15s target = 150s expected; actual 10s is
        // faster than 1/4 of that, so the clamp caps the increase at 4x.
        let d = next_difficulty_target(4, 10, 10, 15, 0, 10);
        assert_eq!(d, 16);
    }

    #[test]
    fn difficulty_falls_when_blocks_come_too_slow() {
        // Actual 900s is 6x the 150s expectation, clamped to 4x slower.
        let d = next_difficulty_target(4, 10, 10, 15, 0, 900);
        assert_eq!(d, 1);
    }

    #[test]
    fn difficulty_never_drops_below_one() {
        let d = next_difficulty_target(1, 10, 10, 15, 0, 900);
        assert_eq!(d, 1);
    }
}
