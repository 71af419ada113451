//! Angle math for landing the wheel on an outcome the client did not choose.
//!
//! The wheel is drawn with segment `i` starting at `i * 360 / n` degrees and turns clockwise
//! under a pointer fixed at 0 degrees. A rotation of `r` degrees therefore leaves wheel position
//! `(-r) mod 360` under the pointer.

use std::time::Duration;

use rand::Rng;
use thiserror::Error;

use crate::shared_spin_game::{Outcome, MAX_EXTRA_TURNS, MIN_EXTRA_TURNS};

/// Per-segment correction, in degrees, for the shear the renderer applies to every segment.
/// Changing the renderer's shear without changing this value moves the visual stop position.
pub const SEGMENT_SKEW_CORRECTION: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    #[error("winning outcome {winner_id} is not among the {segments} outcomes on the wheel")]
    WinnerNotOnWheel { winner_id: i64, segments: usize },
}

/// Degrees covered by one segment of an `n`-segment wheel.
pub fn segment_span(segments: usize) -> f64 {
    360.0 / segments as f64
}

/// Wheel position under the pointer after rotating by `rotation` degrees.
pub fn pointer_position(rotation: f64) -> f64 {
    (-rotation).rem_euclid(360.0)
}

/// Index of the segment under the pointer after rotating an `n`-segment wheel by `rotation`.
pub fn segment_under_pointer(rotation: f64, segments: usize) -> usize {
    let index = (pointer_position(rotation) / segment_span(segments)).floor() as usize;
    index.min(segments.saturating_sub(1))
}

/// Deceleration curve for the spin animation: `1 - (1 - t)^4`.
pub fn ease_out_quart(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(4)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelLayout {
    pub skew_correction: f64,
}

impl Default for WheelLayout {
    fn default() -> Self {
        Self {
            skew_correction: SEGMENT_SKEW_CORRECTION,
        }
    }
}

impl WheelLayout {
    pub fn new(skew_correction: f64) -> Self {
        Self { skew_correction }
    }

    /// Correction applied per segment index. Capped at `span / n` so the accumulated offset of
    /// the last segment stays inside that segment on crowded wheels.
    pub fn effective_skew(&self, segments: usize) -> f64 {
        self.skew_correction
            .max(0.0)
            .min(segment_span(segments) / segments as f64)
    }

    /// Final rotation for landing on the segment at `index` after `extra_turns` full turns.
    pub fn stop_angle_for_index(&self, index: usize, segments: usize, extra_turns: u32) -> f64 {
        let span = segment_span(segments);
        let winning_segment_angle = index as f64 * (span + self.effective_skew(segments)) + 360.0;
        extra_turns as f64 * 360.0 + (360.0 - winning_segment_angle)
    }

    pub fn compute_stop_angle<R: Rng + ?Sized>(
        &self,
        winner_id: i64,
        outcomes: &[Outcome],
        rng: &mut R,
    ) -> Result<f64, GeometryError> {
        let index = outcomes
            .iter()
            .position(|outcome| outcome.id == winner_id)
            .ok_or(GeometryError::WinnerNotOnWheel {
                winner_id,
                segments: outcomes.len(),
            })?;
        let extra_turns = rng.gen_range(MIN_EXTRA_TURNS..=MAX_EXTRA_TURNS);
        Ok(self.stop_angle_for_index(index, outcomes.len(), extra_turns))
    }
}

/// `angle` as whole degrees, when it is one. Stop angles are whole for wheels whose segment
/// count divides 360 and whose correction is whole; other wheels need fractional degrees to
/// stay on the winning segment, so they get `None` rather than a rounded angle.
pub fn whole_degrees(angle: f64) -> Option<i64> {
    let rounded = angle.round();
    if angle.is_finite() && (angle - rounded).abs() < 1e-9 {
        Some(rounded as i64)
    } else {
        None
    }
}

/// Stop angle using the default layout.
pub fn compute_stop_angle<R: Rng + ?Sized>(
    winner_id: i64,
    outcomes: &[Outcome],
    rng: &mut R,
) -> Result<f64, GeometryError> {
    WheelLayout::default().compute_stop_angle(winner_id, outcomes, rng)
}

/// A one-shot rotation command handed to the wheel renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelRotation {
    pub from: f64,
    pub to: f64,
    pub duration: Duration,
}

impl WheelRotation {
    /// Eased rotation `elapsed` into the animation; settles exactly on `to`.
    pub fn angle_at(&self, elapsed: Duration) -> f64 {
        if self.duration.is_zero() || elapsed >= self.duration {
            return self.to;
        }
        let progress = elapsed.as_secs_f64() / self.duration.as_secs_f64();
        self.from + (self.to - self.from) * ease_out_quart(progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;
    use rand::SeedableRng;

    fn outcomes(ids: &[i64]) -> Vec<Outcome> {
        ids.iter()
            .map(|&id| Outcome {
                id,
                label: format!("prize {}", id),
                payout_multiplier: "1".to_string(),
                declared_win_probability: 0.0,
            })
            .collect()
    }

    #[test]
    fn test_lands_on_winner_for_every_wheel_size() {
        let layout = WheelLayout::default();
        for n in 1..=48 {
            for i in 0..n {
                for turns in [MIN_EXTRA_TURNS, 27, MAX_EXTRA_TURNS] {
                    let angle = layout.stop_angle_for_index(i, n, turns);
                    let position = pointer_position(angle);
                    let span = segment_span(n);
                    assert!(
                        position >= i as f64 * span && position < (i + 1) as f64 * span,
                        "n={} i={} angle={} landed at {}",
                        n,
                        i,
                        angle,
                        position
                    );
                    assert_eq!(segment_under_pointer(angle, n), i);
                }
            }
        }
    }

    #[test]
    fn test_literal_formula_for_small_wheels() {
        let layout = WheelLayout::default();
        // i = 1, n = 3: winning segment angle 1 * (120 + 10) + 360 = 490
        assert_eq!(layout.stop_angle_for_index(1, 3, 20), 20.0 * 360.0 + (360.0 - 490.0));
        assert_eq!(layout.stop_angle_for_index(5, 6, 34), 34.0 * 360.0 + (360.0 - (5.0 * 70.0 + 360.0)));
        assert_eq!(layout.stop_angle_for_index(0, 1, 25), 25.0 * 360.0);
    }

    #[test]
    fn test_whole_degrees_only_for_exact_angles() {
        let layout = WheelLayout::default();
        assert_eq!(whole_degrees(layout.stop_angle_for_index(1, 3, 20)), Some(20 * 360 - 130));
        assert_eq!(whole_degrees(layout.stop_angle_for_index(3, 6, 25)), Some(25 * 360 - 210));
        // 360 / 7 is fractional
        assert_eq!(whole_degrees(layout.stop_angle_for_index(2, 7, 20)), None);
        assert_eq!(whole_degrees(f64::NAN), None);
    }

    #[test]
    fn test_skew_is_capped_on_crowded_wheels() {
        let layout = WheelLayout::default();
        assert_eq!(layout.effective_skew(6), 10.0);
        assert_eq!(layout.effective_skew(12), 30.0 / 12.0);
        assert_eq!(WheelLayout::new(4.0).effective_skew(3), 4.0);
    }

    #[test]
    fn test_extra_turns_stay_in_range() {
        let wheel = outcomes(&[1, 2, 3]);
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let angle = compute_stop_angle(2, &wheel, &mut rng).unwrap();
            let turns = ((angle + 130.0) / 360.0).round() as u32;
            assert!((MIN_EXTRA_TURNS..=MAX_EXTRA_TURNS).contains(&turns));
            assert_eq!(segment_under_pointer(angle, 3), 1);
        }
    }

    #[test]
    fn test_missing_winner_fails_loudly() {
        let mut rng = StepRng::new(0, 1);
        assert_eq!(
            compute_stop_angle(9, &outcomes(&[1, 2, 3]), &mut rng),
            Err(GeometryError::WinnerNotOnWheel { winner_id: 9, segments: 3 })
        );
        assert_eq!(
            compute_stop_angle(1, &[], &mut rng),
            Err(GeometryError::WinnerNotOnWheel { winner_id: 1, segments: 0 })
        );
    }

    #[test]
    fn test_rotation_eases_onto_target() {
        let rotation = WheelRotation {
            from: 90.0,
            to: 7330.0,
            duration: Duration::from_secs(5),
        };
        assert_eq!(rotation.angle_at(Duration::ZERO), 90.0);
        assert_eq!(rotation.angle_at(Duration::from_secs(5)), 7330.0);
        assert_eq!(rotation.angle_at(Duration::from_secs(9)), 7330.0);
        let halfway = rotation.angle_at(Duration::from_millis(2500));
        assert!(halfway > 90.0 + (7330.0 - 90.0) * 0.5);
        assert!(halfway < 7330.0);
    }
}
