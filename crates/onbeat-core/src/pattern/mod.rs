//! Playable patterns
//!
//! A [`Pattern`] is immutable once generated; everything that changes during
//! play lives in a [`PatternState`] owned by the active window slot.
//!
//! Lifecycle per pattern:
//!
//! ```text
//! Approaching ──press in window──> Hit ──┐
//!      │                                 ├──> Expired (miss = !pressed || score == 0)
//!      └──window passes──────────> Missed┘
//! ```
//!
//! A pattern is visible while `start - lifetime/2 < step < end + lifetime/2`
//! and expires at `step >= end + lifetime/2`.

mod geometry;
pub mod scoring;

pub use geometry::{PathShape, SliderPath};

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::engine::InputState;
use crate::types::{Color, Point, Step};
use scoring::{press_score, press_window, HOLD_RADIUS_FACTOR, HOLD_SCORE};

/// Extra approach ring size at the start of the fade-in (1.0 = double radius)
pub const APPROACH_SCALE: f32 = 2.0;

/// Alpha above which the active marker is drawn
pub const ACTIVE_MARKER_ALPHA: f32 = 200.0 / 255.0;

/// Steps after a press during which the press marker is shown
pub const PRESS_MARKER_STEPS: u64 = 8;

/// Pattern variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatternKind {
    Tap,
    Line,
    Curve,
    Arc,
}

impl PatternKind {
    pub fn is_slider(&self) -> bool {
        !matches!(self, PatternKind::Tap)
    }

    pub fn name(&self) -> &'static str {
        match self {
            PatternKind::Tap => "tap",
            PatternKind::Line => "line",
            PatternKind::Curve => "curve",
            PatternKind::Arc => "arc",
        }
    }
}

/// Where a pattern sits on the field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    Tap { point: Point },
    Slider(SliderPath),
}

/// Precomputed slider band polygons
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliderOutline {
    /// Band at the pattern radius
    pub inner: Vec<Point>,
    /// Band at radius plus stroke width
    pub outer: Vec<Point>,
}

/// A single playable target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    /// Hit step
    pub start_time: Step,
    /// Release step (equal to `start_time` for taps)
    pub end_time: Step,
    /// Fade-in plus fade-out span in steps
    pub lifetime: u32,
    pub radius: f32,
    pub stroke_width: f32,
    pub color: Color,
    pub approach_rate: f32,
    pub geometry: Geometry,
    /// Slider band polygons, `None` for taps
    pub outline: Option<Arc<SliderOutline>>,
}

impl Pattern {
    /// Build a tap at `point`
    pub fn tap(point: Point, start_time: Step, style: PatternStyle) -> Self {
        Self {
            start_time,
            end_time: start_time,
            lifetime: style.lifetime.max(2),
            radius: style.radius,
            stroke_width: style.stroke_width,
            color: style.color,
            approach_rate: style.approach_rate,
            geometry: Geometry::Tap { point },
            outline: None,
        }
    }

    /// Build a slider along `path`
    ///
    /// An `end_time` before `start_time` is clamped to `start_time + 1`.
    pub fn slider(path: SliderPath, start_time: Step, end_time: Step, style: PatternStyle) -> Self {
        let end_time = end_time.max(start_time + 1);
        let outline = SliderOutline {
            inner: path.outline(style.radius),
            outer: path.outline(style.radius + style.stroke_width),
        };
        Self {
            start_time,
            end_time,
            lifetime: style.lifetime.max(2),
            radius: style.radius,
            stroke_width: style.stroke_width,
            color: style.color,
            approach_rate: style.approach_rate,
            geometry: Geometry::Slider(path),
            outline: Some(Arc::new(outline)),
        }
    }

    pub fn kind(&self) -> PatternKind {
        match &self.geometry {
            Geometry::Tap { .. } => PatternKind::Tap,
            Geometry::Slider(path) => match path.shape() {
                PathShape::Line { .. } => PatternKind::Line,
                PathShape::Bezier { .. } => PatternKind::Curve,
                PathShape::Arc { .. } => PatternKind::Arc,
            },
        }
    }

    /// Placement point (tap center or slider start)
    pub fn reference_point(&self) -> Point {
        match &self.geometry {
            Geometry::Tap { point } => *point,
            Geometry::Slider(path) => path.start(),
        }
    }

    /// Slider end point, `None` for taps
    pub fn end_point(&self) -> Option<Point> {
        match &self.geometry {
            Geometry::Tap { .. } => None,
            Geometry::Slider(path) => Some(path.end()),
        }
    }

    /// Outer hit radius (ring including stroke)
    pub fn hit_radius(&self) -> f32 {
        self.radius + self.stroke_width
    }

    #[inline]
    fn half_life(&self) -> f64 {
        self.lifetime as f64 / 2.0
    }

    pub fn is_visible(&self, step: Step) -> bool {
        let s = step as f64;
        s > self.start_time as f64 - self.half_life() && s < self.end_time as f64 + self.half_life()
    }

    pub fn is_expired(&self, step: Step) -> bool {
        step as f64 >= self.end_time as f64 + self.half_life()
    }

    /// Opacity in `0..=1`: ramps in before the start, holds through the
    /// active span, ramps out after the end
    pub fn alpha(&self, step: Step) -> f32 {
        if (self.start_time..=self.end_time).contains(&step) {
            return 1.0;
        }
        let distance = if step < self.start_time {
            self.start_time - step
        } else {
            step - self.end_time
        };
        (1.0 - (distance as f64 / self.half_life()).min(1.0)) as f32
    }

    /// Approach ring scale: `1 + APPROACH_SCALE` at the start of the fade-in,
    /// shrinking to 1 at the hit step
    pub fn approach_scale(&self, step: Step) -> f32 {
        if step >= self.start_time {
            return 1.0;
        }
        let remaining = ((self.start_time - step) as f64 / self.half_life()).min(1.0) as f32;
        1.0 + APPROACH_SCALE * remaining
    }

    /// Position the player should be at on `step`
    ///
    /// Sliders are traversed at constant speed between start and end.
    pub fn traversal_point(&self, step: Step) -> Point {
        match &self.geometry {
            Geometry::Tap { point } => *point,
            Geometry::Slider(path) => {
                let span = (self.end_time - self.start_time) as f32;
                let elapsed = step.saturating_sub(self.start_time) as f32;
                path.position_at(elapsed / span)
            }
        }
    }

    /// Lifecycle phase at `step`
    pub fn phase(&self, state: &PatternState, step: Step, tolerance: f32) -> PatternPhase {
        if self.is_expired(step) {
            PatternPhase::Expired
        } else if state.pressed {
            PatternPhase::Hit
        } else if (step as f64) > self.start_time as f64 + press_window(self.lifetime, tolerance) as f64 {
            PatternPhase::Missed
        } else {
            PatternPhase::Approaching
        }
    }

    /// Advance this pattern by one step of input
    ///
    /// # Arguments
    /// * `state` - Mutable per-pattern state
    /// * `step` - Current simulation step
    /// * `input` - Current input snapshot
    /// * `press_available` - Whether a press this step is still unclaimed
    /// * `tolerance` - Press window as a fraction of half the lifetime
    ///
    /// # Returns
    /// Score gained this step and whether this pattern took the press
    pub fn update(
        &self,
        state: &mut PatternState,
        step: Step,
        input: &InputState,
        press_available: bool,
        tolerance: f32,
    ) -> PatternUpdate {
        if state.resolved || self.is_expired(step) {
            return PatternUpdate::default();
        }

        if state.pressed {
            let holding = self.kind().is_slider()
                && (self.start_time..=self.end_time).contains(&step)
                && state.press_time.is_some_and(|t| t < step)
                && input.is_held()
                && input.pointer().distance(self.traversal_point(step))
                    <= HOLD_RADIUS_FACTOR * self.hit_radius();
            if holding {
                state.score += HOLD_SCORE;
                return PatternUpdate {
                    delta: HOLD_SCORE,
                    pressed: false,
                };
            }
            return PatternUpdate::default();
        }

        if !press_available || !input.is_activated() {
            return PatternUpdate::default();
        }

        let offset = step as i64 - self.start_time as i64;
        let Some(score) = press_score(offset, press_window(self.lifetime, tolerance)) else {
            return PatternUpdate::default();
        };
        if input.pointer().distance(self.traversal_point(step)) > self.hit_radius() {
            return PatternUpdate::default();
        }

        state.pressed = true;
        state.press_time = Some(step);
        state.score += score;
        PatternUpdate {
            delta: score,
            pressed: true,
        }
    }

    /// Visual state at `step`
    pub fn visual(&self, state: &PatternState, step: Step) -> PatternVisual {
        let alpha = self.alpha(step);
        let active = alpha >= ACTIVE_MARKER_ALPHA
            && (!self.kind().is_slider() || (self.start_time..=self.end_time).contains(&step));
        PatternVisual {
            alpha,
            approach_scale: self.approach_scale(step),
            traversal: self.traversal_point(step),
            active_marker: active,
            just_pressed: state
                .press_time
                .is_some_and(|t| step >= t && step - t < PRESS_MARKER_STEPS),
        }
    }
}

/// Visual parameters shared by every pattern of a beatmap
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternStyle {
    pub radius: f32,
    pub stroke_width: f32,
    pub lifetime: u32,
    pub approach_rate: f32,
    pub color: Color,
}

/// Lifecycle phase of a pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternPhase {
    Approaching,
    Hit,
    Missed,
    Expired,
}

/// Mutable per-pattern play state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatternState {
    /// Set once by a successful press, never cleared
    pub pressed: bool,
    pub press_time: Option<Step>,
    /// Accumulated press and hold score
    pub score: u32,
    /// Set when the pattern's expiry has been reported
    pub resolved: bool,
}

impl PatternState {
    /// Whether the resolved pattern counts as a miss
    pub fn is_miss(&self) -> bool {
        !self.pressed || self.score == 0
    }
}

/// Result of one [`Pattern::update`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatternUpdate {
    pub delta: u32,
    /// This pattern took a new press this step
    pub pressed: bool,
}

/// Per-step visual parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternVisual {
    pub alpha: f32,
    pub approach_scale: f32,
    pub traversal: Point,
    /// Inner marker while the pattern is fully lit
    pub active_marker: bool,
    /// Pressed within the last few steps
    pub just_pressed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::InputSource;

    fn style(lifetime: u32) -> PatternStyle {
        PatternStyle {
            radius: 30.0,
            stroke_width: 5.0,
            lifetime,
            approach_rate: 8.0,
            color: Color::WHITE,
        }
    }

    fn tap_at(start: Step, lifetime: u32) -> Pattern {
        Pattern::tap(Point::new(400.0, 300.0), start, style(lifetime))
    }

    fn click(at: Point) -> InputState {
        let mut input = InputState::new();
        input.set_pointer(at);
        input.set(InputSource::Pointer, true);
        input
    }

    fn line_slider() -> Pattern {
        let path = SliderPath::new(PathShape::Line {
            start: Point::new(100.0, 100.0),
            end: Point::new(300.0, 100.0),
        });
        Pattern::slider(path, 100, 200, style(60))
    }

    #[test]
    fn test_tap_visibility_and_expiry() {
        let tap = tap_at(100, 60);
        assert!(!tap.is_visible(70));
        assert!(tap.is_visible(71));
        assert!(tap.is_visible(129));
        assert!(!tap.is_expired(129));
        assert!(tap.is_expired(130));
    }

    #[test]
    fn test_alpha_ramps() {
        let tap = tap_at(100, 60);
        assert_eq!(tap.alpha(100), 1.0);
        assert!((tap.alpha(85) - 0.5).abs() < 1e-6);
        assert_eq!(tap.alpha(60), 0.0);
        assert!((tap.alpha(115) - 0.5).abs() < 1e-6);

        let slider = line_slider();
        assert_eq!(slider.alpha(150), 1.0);
        assert!((slider.alpha(215) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_approach_scale_shrinks_to_one() {
        let tap = tap_at(100, 60);
        assert!((tap.approach_scale(70) - (1.0 + APPROACH_SCALE)).abs() < 1e-6);
        assert!((tap.approach_scale(85) - (1.0 + APPROACH_SCALE / 2.0)).abs() < 1e-6);
        assert_eq!(tap.approach_scale(100), 1.0);
    }

    #[test]
    fn test_perfect_press_scores_100() {
        let tap = tap_at(100, 60);
        let mut state = PatternState::default();
        let update = tap.update(&mut state, 100, &click(Point::new(405.0, 300.0)), true, 0.3);
        assert_eq!(update, PatternUpdate { delta: 100, pressed: true });
        assert!(state.pressed);
        assert_eq!(state.press_time, Some(100));
        assert_eq!(tap.phase(&state, 100, 0.3), PatternPhase::Hit);
    }

    #[test]
    fn test_press_outside_radius_is_ignored() {
        let tap = tap_at(100, 60);
        let mut state = PatternState::default();
        let update = tap.update(&mut state, 100, &click(Point::new(500.0, 300.0)), true, 0.3);
        assert_eq!(update, PatternUpdate::default());
        assert!(!state.pressed);
    }

    #[test]
    fn test_press_outside_window_is_ignored() {
        let tap = tap_at(100, 60);
        let mut state = PatternState::default();
        // Window is 0.3 * 30 = 9 steps
        let update = tap.update(&mut state, 88, &click(Point::new(400.0, 300.0)), true, 0.3);
        assert!(!update.pressed);
        assert_eq!(tap.phase(&state, 88, 0.3), PatternPhase::Approaching);
        assert_eq!(tap.phase(&state, 110, 0.3), PatternPhase::Missed);
        assert_eq!(tap.phase(&state, 130, 0.3), PatternPhase::Expired);
    }

    #[test]
    fn test_claimed_press_is_not_reused() {
        let tap = tap_at(100, 60);
        let mut state = PatternState::default();
        let update = tap.update(&mut state, 100, &click(Point::new(400.0, 300.0)), false, 0.3);
        assert!(!update.pressed);
    }

    #[test]
    fn test_pressed_state_never_reverts() {
        let tap = tap_at(100, 60);
        let mut state = PatternState::default();
        tap.update(&mut state, 98, &click(Point::new(400.0, 300.0)), true, 0.3);
        assert!(state.pressed);
        let first = state.score;

        // A second press does not re-score or clear the press
        let mut input = click(Point::new(400.0, 300.0));
        input.begin_frame();
        input.set(InputSource::KeyPrimary, true);
        tap.update(&mut state, 100, &input, true, 0.3);
        assert!(state.pressed);
        assert_eq!(state.score, first);
    }

    #[test]
    fn test_slider_traversal_and_hold_score() {
        let slider = line_slider();
        assert_eq!(slider.kind(), PatternKind::Line);
        assert!(slider.traversal_point(150).distance(Point::new(200.0, 100.0)) < 1e-3);
        assert!(slider.traversal_point(50).distance(Point::new(100.0, 100.0)) < 1e-3);

        let mut state = PatternState::default();
        let update = slider.update(&mut state, 100, &click(Point::new(100.0, 100.0)), true, 0.3);
        assert_eq!(update.delta, 100);

        let mut last = state.score;
        for step in 101..=200 {
            let mut input = InputState::new();
            input.set_pointer(slider.traversal_point(step));
            input.set(InputSource::Pointer, true);
            input.begin_frame();
            input.set(InputSource::Pointer, true);
            let update = slider.update(&mut state, step, &input, true, 0.3);
            assert_eq!(update.delta, HOLD_SCORE);
            assert!(state.score > last);
            last = state.score;
        }
        assert_eq!(state.score, 100 + 100 * HOLD_SCORE);

        // Past the end nothing more accrues
        let mut input = InputState::new();
        input.set(InputSource::Pointer, true);
        assert_eq!(slider.update(&mut state, 201, &input, true, 0.3).delta, 0);
    }

    #[test]
    fn test_slider_hold_requires_proximity() {
        let slider = line_slider();
        let mut state = PatternState::default();
        slider.update(&mut state, 100, &click(Point::new(100.0, 100.0)), true, 0.3);

        let mut input = InputState::new();
        input.set_pointer(Point::new(700.0, 500.0));
        input.set(InputSource::Pointer, true);
        let update = slider.update(&mut state, 120, &input, true, 0.3);
        assert_eq!(update.delta, 0);
    }

    #[test]
    fn test_slider_end_clamped_after_start() {
        let path = SliderPath::new(PathShape::Line {
            start: Point::new(0.0, 0.0),
            end: Point::new(10.0, 0.0),
        });
        let slider = Pattern::slider(path, 50, 20, style(30));
        assert!(slider.start_time < slider.end_time);
    }

    #[test]
    fn test_visual_markers() {
        let tap = tap_at(100, 60);
        let mut state = PatternState::default();
        assert!(!tap.visual(&state, 75).active_marker);
        assert!(tap.visual(&state, 100).active_marker);

        state.pressed = true;
        state.press_time = Some(100);
        assert!(tap.visual(&state, 102).just_pressed);
        assert!(!tap.visual(&state, 100 + PRESS_MARKER_STEPS).just_pressed);
    }

    #[test]
    fn test_miss_rule() {
        let mut state = PatternState::default();
        assert!(state.is_miss());
        state.pressed = true;
        assert!(state.is_miss());
        state.score = 10;
        assert!(!state.is_miss());
    }
}
