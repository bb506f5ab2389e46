//! Cursor-relative placement inside the playable rectangle

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::f32::consts::TAU;

use crate::types::{Point, Rect};

/// Random directions tried before the exhaustive scan
const RANDOM_ATTEMPTS: usize = 16;

/// Directions in the exhaustive scan (one per degree)
const SCAN_DIRECTIONS: usize = 360;

/// Where the next pattern goes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub point: Point,
    /// Distance actually moved from the cursor
    pub distance: f32,
    /// No direction fit the requested distance
    pub fallback: bool,
}

/// Move `distance` from `cursor` in a random direction that stays in `rect`
///
/// Tries random directions first, then scans every degree from a random
/// offset. If nothing fits, moves half the rectangle's diagonal toward the
/// farthest corner, which always lands inside.
pub fn place_next(rng: &mut ChaCha8Rng, cursor: Point, distance: f32, rect: &Rect) -> Placement {
    let cursor = rect.clamp(cursor);

    for _ in 0..RANDOM_ATTEMPTS {
        let candidate = cursor + Point::from_angle(rng.gen_range(0.0..TAU)) * distance;
        if rect.contains(candidate) {
            return Placement {
                point: rect.clamp(candidate),
                distance,
                fallback: false,
            };
        }
    }

    let offset = rng.gen_range(0.0..TAU);
    for i in 0..SCAN_DIRECTIONS {
        let angle = offset + TAU * i as f32 / SCAN_DIRECTIONS as f32;
        let candidate = cursor + Point::from_angle(angle) * distance;
        if rect.contains(candidate) {
            return Placement {
                point: rect.clamp(candidate),
                distance,
                fallback: false,
            };
        }
    }

    // The farthest corner is at least half the diagonal away from any
    // interior point, and the segment toward it stays inside
    let reach = rect.diagonal() / 2.0;
    let corner = rect
        .corners()
        .into_iter()
        .max_by(|a, b| cursor.distance(*a).total_cmp(&cursor.distance(*b)))
        .unwrap_or(rect.max);
    let point = rect.clamp(cursor + (corner - cursor).normalized() * reach);
    log::warn!(
        "place_next: no direction fits distance {:.1} from ({:.0}, {:.0}), moved {:.1} toward corner",
        distance,
        cursor.x,
        cursor.y,
        reach
    );
    Placement {
        point,
        distance: cursor.distance(point),
        fallback: true,
    }
}
