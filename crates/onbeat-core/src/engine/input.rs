//! Player input snapshot
//!
//! Input collaborators (window events, autoplay, scripted tests) write into an
//! [`InputState`] once per frame through an [`InputProvider`]. The engine only
//! reads the unioned edge and level predicates.

use crate::types::{Point, Step};

/// Number of distinct activation sources
pub const NUM_SOURCES: usize = 3;

/// Activation source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum InputSource {
    /// Pointer button
    Pointer = 0,
    /// First tap key
    KeyPrimary = 1,
    /// Second tap key
    KeySecondary = 2,
}

impl InputSource {
    pub const ALL: [InputSource; NUM_SOURCES] = [
        InputSource::Pointer,
        InputSource::KeyPrimary,
        InputSource::KeySecondary,
    ];
}

/// Pointer position plus current and previous frame state per source
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputState {
    pointer: Point,
    current: [bool; NUM_SOURCES],
    previous: [bool; NUM_SOURCES],
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new frame: the current state becomes the previous state
    pub fn begin_frame(&mut self) {
        self.previous = self.current;
    }

    pub fn set_pointer(&mut self, position: Point) {
        self.pointer = position;
    }

    pub fn set(&mut self, source: InputSource, down: bool) {
        self.current[source as usize] = down;
    }

    pub fn pointer(&self) -> Point {
        self.pointer
    }

    /// Whether `source` went down this frame
    pub fn is_source_activated(&self, source: InputSource) -> bool {
        let i = source as usize;
        self.current[i] && !self.previous[i]
    }

    /// A fresh press on any source
    pub fn is_activated(&self) -> bool {
        InputSource::ALL.iter().any(|&s| self.is_source_activated(s))
    }

    /// Any source held down
    pub fn is_held(&self) -> bool {
        self.current.iter().any(|&down| down)
    }
}

/// Source of per-frame input
pub trait InputProvider {
    /// Update `state` for simulation step `step`
    ///
    /// Called once per frame after [`InputState::begin_frame`].
    fn poll(&mut self, step: Step, state: &mut InputState);
}

/// Replays a fixed list of `(step, source, down, pointer)` events
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    events: Vec<(Step, InputSource, bool, Point)>,
    cursor: usize,
}

impl ScriptedInput {
    /// Events must be sorted by step
    pub fn new(events: Vec<(Step, InputSource, bool, Point)>) -> Self {
        Self { events, cursor: 0 }
    }
}

impl InputProvider for ScriptedInput {
    fn poll(&mut self, step: Step, state: &mut InputState) {
        while let Some(&(at, source, down, pointer)) = self.events.get(self.cursor) {
            if at > step {
                break;
            }
            state.set_pointer(pointer);
            state.set(source, down);
            self.cursor += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_press_edge_lasts_one_frame() {
        let mut input = InputState::new();
        input.set(InputSource::KeyPrimary, true);
        assert!(input.is_activated());
        assert!(input.is_held());

        input.begin_frame();
        assert!(!input.is_activated());
        assert!(input.is_held());

        input.begin_frame();
        input.set(InputSource::KeyPrimary, false);
        assert!(!input.is_held());
    }

    #[test]
    fn test_sources_are_unioned() {
        let mut input = InputState::new();
        input.set(InputSource::Pointer, true);
        input.begin_frame();
        // Pointer held, second key newly pressed
        input.set(InputSource::KeySecondary, true);
        assert!(input.is_activated());
        assert!(!input.is_source_activated(InputSource::Pointer));
        assert!(input.is_source_activated(InputSource::KeySecondary));
    }

    #[test]
    fn test_scripted_input_replays_in_order() {
        let at = Point::new(10.0, 20.0);
        let mut script = ScriptedInput::new(vec![
            (5, InputSource::Pointer, true, at),
            (6, InputSource::Pointer, false, at),
        ]);
        let mut input = InputState::new();

        for step in 0..5 {
            input.begin_frame();
            script.poll(step, &mut input);
            assert!(!input.is_held());
        }

        input.begin_frame();
        script.poll(5, &mut input);
        assert!(input.is_activated());
        assert_eq!(input.pointer(), at);

        input.begin_frame();
        script.poll(6, &mut input);
        assert!(!input.is_held());
    }
}
