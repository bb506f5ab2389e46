//! Randomized slider paths that fit the playable rectangle

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::f32::consts::{PI, TAU};

use crate::pattern::{PathShape, PatternKind, SliderPath};
use crate::types::{Point, Rect};

/// Attempts per length before shrinking
const ATTEMPTS_PER_LENGTH: usize = 12;

/// Times the target length is halved before giving up
const MAX_SHRINKS: u32 = 4;

/// Arc sweep bounds in radians
const MIN_SWEEP: f32 = PI / 3.0;
const MAX_SWEEP: f32 = 0.9 * PI;

/// Build a slider of `kind` starting at `start` with arclength `length`
///
/// # Returns
/// `None` if no attempt fits `rect` even after shrinking, or `kind` is a tap
pub fn build_slider(
    rng: &mut ChaCha8Rng,
    kind: PatternKind,
    start: Point,
    length: f32,
    rect: &Rect,
) -> Option<SliderPath> {
    let mut target = length;
    for shrink in 0..=MAX_SHRINKS {
        for _ in 0..ATTEMPTS_PER_LENGTH {
            let path = random_path(rng, kind, start, target)?;
            if path.fits_in(rect) {
                if shrink > 0 {
                    log::debug!(
                        "build_slider: {} shrunk {}x to {:.1}px",
                        kind.name(),
                        1u32 << shrink,
                        path.length()
                    );
                }
                return Some(path);
            }
        }
        target /= 2.0;
    }
    None
}

fn random_path(rng: &mut ChaCha8Rng, kind: PatternKind, start: Point, length: f32) -> Option<SliderPath> {
    let shape = match kind {
        PatternKind::Tap => return None,
        PatternKind::Line => PathShape::Line {
            start,
            end: start + Point::from_angle(rng.gen_range(0.0..TAU)) * length,
        },
        PatternKind::Curve => {
            // Control points spread roughly along a random heading, then rescaled
            let heading = rng.gen_range(0.0..TAU);
            let mut points = [start; 4];
            for (i, p) in points.iter_mut().enumerate().skip(1) {
                let along = Point::from_angle(heading) * (length * i as f32 / 3.0);
                let bend = Point::from_angle(rng.gen_range(0.0..TAU)) * (length * rng.gen_range(0.1..0.5));
                *p = start + along + bend;
            }
            let path = SliderPath::new(PathShape::Bezier { points });
            return Some(path.with_length(length));
        }
        PatternKind::Arc => {
            let sweep = rng.gen_range(MIN_SWEEP..=MAX_SWEEP);
            let sweep = if rng.gen_bool(0.5) { sweep } else { -sweep };
            let radius = length / sweep.abs();
            let start_angle = rng.gen_range(0.0..TAU);
            PathShape::Arc {
                center: start - Point::from_angle(start_angle) * radius,
                radius,
                start_angle,
                sweep,
            }
        }
    };
    Some(SliderPath::new(shape))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_sliders_start_at_start_and_fit() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let rect = Rect::inset(1280.0, 720.0, 80.0);
        let start = rect.center();
        for kind in [PatternKind::Line, PatternKind::Curve, PatternKind::Arc] {
            for _ in 0..20 {
                let path = build_slider(&mut rng, kind, start, 250.0, &rect).unwrap();
                assert!(path.start().distance(start) < 1e-2, "{:?}", kind);
                assert!(path.fits_in(&rect));
                assert!(path.length() <= 251.0);
                assert!(path.length() >= 250.0 / 16.0 - 1.0);
            }
        }
    }

    #[test]
    fn test_unshrunk_length_matches_target() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        // Large field so the first attempt always fits
        let rect = Rect::inset(10_000.0, 10_000.0, 0.0);
        for kind in [PatternKind::Line, PatternKind::Curve, PatternKind::Arc] {
            let path = build_slider(&mut rng, kind, rect.center(), 300.0, &rect).unwrap();
            assert!((path.length() - 300.0).abs() < 3.0, "{:?} {}", kind, path.length());
        }
    }

    #[test]
    fn test_impossible_fit_gives_none() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let rect = Rect::inset(100.0, 100.0, 50.0);
        assert!(build_slider(&mut rng, PatternKind::Line, rect.center(), 400.0, &rect).is_none());
        assert!(build_slider(&mut rng, PatternKind::Tap, rect.center(), 40.0, &rect).is_none());
    }
}
