//! Difficulty-derived pattern sizing and spacing
//!
//! Sizes are authored against a 600px reference field and scaled to the
//! actual field's shorter side.

use crate::types::Rect;

/// Reference field size for all pixel constants below
const REFERENCE_FIELD: f32 = 600.0;

const BASE_RADIUS: f32 = 48.0;
const RADIUS_PER_DIFFICULTY: f32 = 3.2;
const MIN_RADIUS: f32 = 14.0;
const MIN_STROKE: f32 = 2.0;
const MIN_LIFETIME: u32 = 8;

/// Approach lead time in milliseconds for an approach rate
///
/// Standard approach-rate curve: 1800ms at AR 0, 1200ms at AR 5, 450ms at AR 10.
pub fn preempt_ms(approach_rate: f32) -> f32 {
    if approach_rate <= 5.0 {
        1200.0 + 600.0 * (5.0 - approach_rate) / 5.0
    } else {
        1200.0 - 750.0 * (approach_rate - 5.0) / 5.0
    }
}

/// Shared geometry for every pattern of one beatmap
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DifficultyProfile {
    pub radius: f32,
    pub stroke_width: f32,
    /// Fade-in plus fade-out span in steps
    pub lifetime: u32,
    /// Spacing between consecutive patterns within a bar
    pub circle_distance: f32,
    /// Spacing for the first pattern of a bar
    pub pattern_distance: f32,
    /// Field inset by the pattern's outer extent
    pub playable: Rect,
}

impl DifficultyProfile {
    /// Derive sizes for a difficulty in `(0, 10]` and approach rate in `[1, 10]`
    ///
    /// Radius and lifetime both shrink as difficulty rises; lifetime also
    /// shrinks with approach rate.
    pub fn new(difficulty: f32, approach_rate: f32, fps: f64, field_width: f32, field_height: f32) -> Self {
        let scale = field_width.min(field_height).max(1.0) / REFERENCE_FIELD;

        let radius = (BASE_RADIUS - RADIUS_PER_DIFFICULTY * difficulty).max(MIN_RADIUS) * scale;
        let stroke_width = (0.15 * radius).max(MIN_STROKE);

        let lead_secs = preempt_ms(approach_rate) as f64 / 1000.0;
        let lifetime = (2.0 * lead_secs * fps * (1.0 - 0.02 * difficulty as f64)).round() as u32;

        let circle_distance = 2.0 * radius + 8.0 * difficulty * scale;
        let pattern_distance = circle_distance * (1.8 + 0.08 * difficulty);

        let margin = 2.0 * (radius + stroke_width);
        Self {
            radius,
            stroke_width,
            lifetime: lifetime.max(MIN_LIFETIME),
            circle_distance,
            pattern_distance,
            playable: Rect::inset(field_width, field_height, margin),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preempt_curve() {
        assert_eq!(preempt_ms(5.0), 1200.0);
        assert_eq!(preempt_ms(0.0), 1800.0);
        assert_eq!(preempt_ms(10.0), 450.0);
    }

    #[test]
    fn test_harder_means_smaller_and_faster() {
        let easy = DifficultyProfile::new(2.0, 5.0, 60.0, 1280.0, 720.0);
        let hard = DifficultyProfile::new(9.0, 5.0, 60.0, 1280.0, 720.0);
        assert!(hard.radius < easy.radius);
        assert!(hard.lifetime < easy.lifetime);

        let slow = DifficultyProfile::new(5.0, 3.0, 60.0, 1280.0, 720.0);
        let fast = DifficultyProfile::new(5.0, 9.0, 60.0, 1280.0, 720.0);
        assert!(fast.lifetime < slow.lifetime);
    }

    #[test]
    fn test_pattern_distance_exceeds_circle_distance() {
        let profile = DifficultyProfile::new(5.0, 8.0, 60.0, 1280.0, 720.0);
        assert!(profile.pattern_distance > profile.circle_distance);
        assert!(profile.playable.contains(profile.playable.center()));
        assert!(profile.playable.min.x > profile.radius);
    }

    #[test]
    fn test_default_lifetime() {
        // AR 8: 750ms lead, difficulty 5 shortens by 10%
        let profile = DifficultyProfile::new(5.0, 8.0, 60.0, 1280.0, 720.0);
        assert_eq!(profile.lifetime, 81);
    }
}
