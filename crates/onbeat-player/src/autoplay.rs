//! Autoplay input
//!
//! Presses every pattern exactly on its hit step at its reference point and
//! follows sliders to their end. Consecutive presses alternate between the two
//! tap keys so each one is a fresh edge even while a slider is still held.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;

use onbeat_core::engine::{InputProvider, InputSource, InputState};
use onbeat_core::pattern::Pattern;
use onbeat_core::Step;

pub struct Autoplay {
    patterns: Arc<[Pattern]>,
    next: usize,
    /// Pattern currently pressed and the step to release it after
    active: Option<(usize, Step)>,
    source: InputSource,
    /// Probability of deliberately skipping a press
    miss_rate: f64,
    rng: ChaCha8Rng,
    skipped: usize,
}

impl Autoplay {
    pub fn new(patterns: Arc<[Pattern]>, miss_rate: f64, seed: u64) -> Self {
        Self {
            patterns,
            next: 0,
            active: None,
            source: InputSource::KeySecondary,
            miss_rate: miss_rate.clamp(0.0, 1.0),
            rng: ChaCha8Rng::seed_from_u64(seed),
            skipped: 0,
        }
    }

    /// Presses deliberately skipped so far
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    fn other_key(source: InputSource) -> InputSource {
        match source {
            InputSource::KeyPrimary => InputSource::KeySecondary,
            _ => InputSource::KeyPrimary,
        }
    }
}

impl InputProvider for Autoplay {
    fn poll(&mut self, step: Step, state: &mut InputState) {
        if let Some((index, release_after)) = self.active {
            if step > release_after {
                state.set(self.source, false);
                self.active = None;
            } else {
                state.set_pointer(self.patterns[index].traversal_point(step));
            }
        }

        while self.next < self.patterns.len() && self.patterns[self.next].start_time < step {
            self.next += 1;
        }
        let Some(pattern) = self.patterns.get(self.next) else {
            return;
        };
        if pattern.start_time != step {
            return;
        }

        let index = self.next;
        self.next += 1;
        if self.miss_rate > 0.0 && self.rng.gen_bool(self.miss_rate) {
            self.skipped += 1;
            return;
        }

        state.set(self.source, false);
        self.source = Self::other_key(self.source);
        state.set(self.source, true);
        state.set_pointer(pattern.reference_point());
        self.active = Some((index, pattern.end_time));
    }
}
