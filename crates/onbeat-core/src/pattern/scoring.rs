//! Press timing and hold scoring

/// Maximum score for a single press
pub const MAX_PRESS_SCORE: u32 = 100;

/// Score per step while a pressed slider is held on track
pub const HOLD_SCORE: u32 = 2;

/// Hold tracking radius relative to the hit radius
pub const HOLD_RADIUS_FACTOR: f32 = 2.0;

/// Half-width of the press window in steps
///
/// `tolerance` is a fraction of half the pattern lifetime.
#[inline]
pub fn press_window(lifetime: u32, tolerance: f32) -> f32 {
    tolerance * lifetime as f32 / 2.0
}

/// Score for pressing `offset` steps away from the hit time
///
/// # Returns
/// `None` outside the window, otherwise `100 * (1 - |offset| / window)`
/// rounded to the nearest ten
pub fn press_score(offset: i64, window: f32) -> Option<u32> {
    let distance = offset.unsigned_abs() as f32;
    if !(window > 0.0) || distance > window {
        return None;
    }
    let raw = MAX_PRESS_SCORE as f32 * (1.0 - distance / window);
    Some(round_to_ten(raw))
}

/// Round to the nearest multiple of ten within `0..=100`
#[inline]
pub fn round_to_ten(value: f32) -> u32 {
    ((value / 10.0).round() * 10.0).clamp(0.0, MAX_PRESS_SCORE as f32) as u32
}
