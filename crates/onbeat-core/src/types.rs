//! Common types for Onbeat
//!
//! Fundamental types shared by analysis, generation and gameplay: screen-space
//! points, pattern colors and the onset events handed from the analyzer to the
//! beatmap generator.

use serde::{Deserialize, Serialize};

/// Nominal simulation rate (steps per second)
pub const TARGET_FPS: f64 = 60.0;

/// Beats per bar used for bar assignment and bar-grouped placement
pub const BEATS_PER_BAR: u32 = 4;

/// Default size of the active pattern window
pub const QUEUE_LENGTH: usize = 12;

/// Fallback tempo when none can be estimated
pub const DEFAULT_TEMPO: f64 = 120.0;

/// Simulation step index (frames since track start)
pub type Step = u64;

/// A point (or vector) in playfield coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Unit vector for an angle in radians
    #[inline]
    pub fn from_angle(angle: f32) -> Self {
        Self::new(angle.cos(), angle.sin())
    }

    #[inline]
    pub fn length(&self) -> f32 {
        self.x.hypot(self.y)
    }

    #[inline]
    pub fn distance(&self, other: Point) -> f32 {
        (*self - other).length()
    }

    #[inline]
    pub fn dot(&self, other: Point) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// Counter-clockwise perpendicular
    #[inline]
    pub fn perp(&self) -> Self {
        Self::new(-self.y, self.x)
    }

    /// Normalized copy, or zero for a zero-length vector
    #[inline]
    pub fn normalized(&self) -> Self {
        let len = self.length();
        if len > f32::EPSILON {
            Self::new(self.x / len, self.y / len)
        } else {
            Self::default()
        }
    }

    #[inline]
    pub fn lerp(&self, other: Point, t: f32) -> Self {
        *self + (other - *self) * t
    }

    /// Angle of this vector in radians
    #[inline]
    pub fn angle(&self) -> f32 {
        self.y.atan2(self.x)
    }
}

impl std::ops::Add for Point {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

impl std::ops::Sub for Point {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }
}

impl std::ops::Mul<f32> for Point {
    type Output = Self;

    #[inline]
    fn mul(self, factor: f32) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }
}

impl std::ops::Neg for Point {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

/// Axis-aligned rectangle in playfield coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min: Point,
    pub max: Point,
}

impl Rect {
    pub fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    /// Field rectangle inset by `margin` on every side
    ///
    /// A margin larger than half the field collapses to the center line.
    pub fn inset(width: f32, height: f32, margin: f32) -> Self {
        let mx = margin.min(width / 2.0);
        let my = margin.min(height / 2.0);
        Self::new(Point::new(mx, my), Point::new(width - mx, height - my))
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Point {
        self.min.lerp(self.max, 0.5)
    }

    pub fn diagonal(&self) -> f32 {
        self.min.distance(self.max)
    }

    /// Inclusive containment with a small epsilon for float round-off
    pub fn contains(&self, p: Point) -> bool {
        const EPS: f32 = 1e-3;
        p.x >= self.min.x - EPS
            && p.x <= self.max.x + EPS
            && p.y >= self.min.y - EPS
            && p.y <= self.max.y + EPS
    }

    pub fn clamp(&self, p: Point) -> Point {
        Point::new(
            p.x.clamp(self.min.x, self.max.x),
            p.y.clamp(self.min.y, self.max.y),
        )
    }

    pub fn corners(&self) -> [Point; 4] {
        [
            self.min,
            Point::new(self.max.x, self.min.y),
            self.max,
            Point::new(self.min.x, self.max.y),
        ]
    }
}

/// 8-bit RGB color
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Convert HSV (hue in degrees, saturation/value in 0..=1) to RGB
    pub fn from_hsv(hue: f32, saturation: f32, value: f32) -> Self {
        let h = hue.rem_euclid(360.0) / 60.0;
        let c = value * saturation;
        let x = c * (1.0 - (h % 2.0 - 1.0).abs());
        let m = value - c;
        let (r, g, b) = match h as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        let to_u8 = |v: f32| ((v + m).clamp(0.0, 1.0) * 255.0).round() as u8;
        Self::new(to_u8(r), to_u8(g), to_u8(b))
    }

    /// HSV value component (max channel) in 0..=1
    pub fn value(&self) -> f32 {
        self.r.max(self.g).max(self.b) as f32 / 255.0
    }
}

/// A detected, quantized rhythmic event
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OnsetEvent {
    /// Onset time in seconds
    pub time: f64,
    /// Sustain length in seconds (at least one grid unit)
    pub duration: f64,
    /// 1-based bar index
    pub bar: u32,
}

/// Seconds per beat for a tempo, falling back to the default tempo for
/// non-positive or non-finite input
#[inline]
pub fn seconds_per_beat(tempo: f64) -> f64 {
    if tempo.is_finite() && tempo > 0.0 {
        60.0 / tempo
    } else {
        60.0 / DEFAULT_TEMPO
    }
}

/// 1-based bar index for a time in seconds
#[inline]
pub fn bar_for_time(time: f64, tempo: f64) -> u32 {
    let bar_len = seconds_per_beat(tempo) * BEATS_PER_BAR as f64;
    (time.max(0.0) / bar_len).floor() as u32 + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_for_time() {
        // 120 BPM: 2 seconds per bar
        assert_eq!(bar_for_time(0.0, 120.0), 1);
        assert_eq!(bar_for_time(1.99, 120.0), 1);
        assert_eq!(bar_for_time(2.0, 120.0), 2);
        assert_eq!(bar_for_time(9.5, 120.0), 5);
    }

    #[test]
    fn test_seconds_per_beat_guards_bad_tempo() {
        assert!((seconds_per_beat(120.0) - 0.5).abs() < 1e-12);
        assert!((seconds_per_beat(0.0) - 0.5).abs() < 1e-12);
        assert!((seconds_per_beat(f64::NAN) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_hsv_conversion() {
        assert_eq!(Color::from_hsv(0.0, 1.0, 1.0), Color::new(255, 0, 0));
        assert_eq!(Color::from_hsv(120.0, 1.0, 1.0), Color::new(0, 255, 0));
        assert_eq!(Color::from_hsv(240.0, 1.0, 1.0), Color::new(0, 0, 255));
        assert_eq!(Color::from_hsv(0.0, 0.0, 1.0), Color::WHITE);
    }

    #[test]
    fn test_rect_inset_and_contains() {
        let rect = Rect::inset(800.0, 600.0, 50.0);
        assert_eq!(rect.min, Point::new(50.0, 50.0));
        assert_eq!(rect.max, Point::new(750.0, 550.0));
        assert!(rect.contains(rect.center()));
        assert!(!rect.contains(Point::new(10.0, 300.0)));
    }

    #[test]
    fn test_point_ops() {
        let a = Point::new(3.0, 4.0);
        assert_eq!(a.length(), 5.0);
        assert_eq!(a.perp(), Point::new(-4.0, 3.0));
        assert!((a.normalized().length() - 1.0).abs() < 1e-6);
        assert_eq!(Point::default().normalized(), Point::default());
    }
}
