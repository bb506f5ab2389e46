//! Active pattern window
//!
//! A fixed-capacity ring over the base list. Patterns enter from a monotonic
//! cursor and leave from the front once resolved, so the smallest active base
//! index never decreases.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::pattern::{Pattern, PatternState};

/// One slot of the active window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivePattern {
    /// Index into the base list
    pub index: usize,
    pub state: PatternState,
}

pub struct PatternQueue {
    patterns: Arc<[Pattern]>,
    window: VecDeque<ActivePattern>,
    /// Next base index to admit
    next: usize,
    capacity: usize,
}

impl PatternQueue {
    pub fn new(patterns: Arc<[Pattern]>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let mut queue = Self {
            patterns,
            window: VecDeque::with_capacity(capacity),
            next: 0,
            capacity,
        };
        queue.refill();
        queue
    }

    fn refill(&mut self) {
        while self.window.len() < self.capacity && self.next < self.patterns.len() {
            self.window.push_back(ActivePattern {
                index: self.next,
                state: PatternState::default(),
            });
            self.next += 1;
        }
    }

    pub fn patterns(&self) -> &Arc<[Pattern]> {
        &self.patterns
    }

    /// Active slots, oldest first
    pub fn iter(&self) -> impl Iterator<Item = (&Pattern, &ActivePattern)> {
        self.window.iter().map(|slot| (&self.patterns[slot.index], slot))
    }

    /// Active slots, oldest first, with mutable state
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&Pattern, &mut ActivePattern)> {
        let patterns = &self.patterns;
        self.window.iter_mut().map(move |slot| (&patterns[slot.index], slot))
    }

    /// Drop resolved slots from the front and admit unseen patterns
    ///
    /// # Returns
    /// Number of slots evicted
    pub fn evict_resolved(&mut self) -> usize {
        let mut evicted = 0;
        while self.window.front().is_some_and(|slot| slot.state.resolved) {
            self.window.pop_front();
            evicted += 1;
        }
        if evicted > 0 {
            self.refill();
        }
        evicted
    }

    /// Smallest active base index, or the base length once drained
    pub fn window_start(&self) -> usize {
        self.window.front().map_or(self.next, |slot| slot.index)
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Every base pattern admitted and evicted
    pub fn is_complete(&self) -> bool {
        self.window.is_empty() && self.next >= self.patterns.len()
    }
}
