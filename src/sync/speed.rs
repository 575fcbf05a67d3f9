// src/sync/speed.rs

//! Per-action speed model

use crate::funscript::Action;

/// Lowest speed sent for any action so small moves stay perceptible.
pub const MIN_SPEED: u8 = 20;
/// Transport limit, also used for the final action of a script.
pub const MAX_SPEED: u8 = 100;

/// Speed for the action at `index`, derived from the stroke to its successor.
///
/// `|next.pos - pos| / (next.at - at) * 100`, clamped to
/// [`MIN_SPEED`]..=[`MAX_SPEED`]. The last action has no successor and runs
/// at [`MAX_SPEED`].
pub fn action_speed(actions: &[Action], index: usize) -> u8 {
    let (Some(current), Some(next)) = (actions.get(index), actions.get(index + 1)) else {
        return MAX_SPEED;
    };

    // Timelines are validated strictly increasing before playback.
    let span = next.at.saturating_sub(current.at);
    if span == 0 {
        return MAX_SPEED;
    }

    let distance = f64::from(current.pos.abs_diff(next.pos));
    let speed = distance / span as f64 * 100.0;
    speed.clamp(f64::from(MIN_SPEED), f64::from(MAX_SPEED)).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actions(points: &[(u64, u8)]) -> Vec<Action> {
        points.iter().map(|&(at, pos)| Action { at, pos }).collect()
    }

    #[test]
    fn speed_is_stroke_per_time() {
        let script = actions(&[(0, 0), (100, 50), (300, 100)]);
        assert_eq!(action_speed(&script, 0), 50);
        assert_eq!(action_speed(&script, 1), 25);
    }

    #[test]
    fn last_action_runs_at_full_speed() {
        let script = actions(&[(0, 0), (100, 50), (300, 100)]);
        assert_eq!(action_speed(&script, 2), MAX_SPEED);
        assert_eq!(action_speed(&[], 0), MAX_SPEED);
    }

    #[test]
    fn speed_is_floored_and_capped() {
        // no movement
        assert_eq!(action_speed(&actions(&[(0, 40), (100, 40)]), 0), MIN_SPEED);
        // long, slow move
        assert_eq!(action_speed(&actions(&[(0, 0), (60_000, 100)]), 0), MIN_SPEED);
        // full stroke in 10ms
        assert_eq!(action_speed(&actions(&[(0, 0), (10, 100)]), 0), MAX_SPEED);
    }

    #[test]
    fn speed_stays_in_bounds_for_any_pair() {
        for gap in [1u64, 7, 33, 100, 999, 10_000] {
            for from in (0..=100u8).step_by(10) {
                for to in (0..=100u8).step_by(25) {
                    let speed = action_speed(&actions(&[(500, from), (500 + gap, to)]), 0);
                    assert!((MIN_SPEED..=MAX_SPEED).contains(&speed), "gap={gap} {from}->{to}: {speed}");
                }
            }
        }
    }
}
