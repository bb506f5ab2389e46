//! Pattern gameplay engine
//!
//! Drives the active window of a generated beatmap one simulation step at a
//! time. The frame loop calls [`PatternEngine::update`] with the step's input
//! and then [`PatternEngine::render`] to collect resolutions and draw intents.
//!
//! ```text
//! base list (Arc<[Pattern]>)
//!   │  monotonic cursor
//!   ▼
//! ┌──────────── active window (ring, oldest first) ────────────┐
//! │ update: per-pattern score, first new press wins            │
//! │ render: resolve expired once, evict front, build intents   │
//! └────────────────────────────────────────────────────────────┘
//! ```

mod cache;
mod input;
mod particles;
mod queue;

pub use cache::{RenderCache, RingMesh};
pub use input::{InputProvider, InputSource, InputState, ScriptedInput, NUM_SOURCES};
pub use particles::{Particle, ParticleSystem};
pub use queue::{ActivePattern, PatternQueue};

use std::sync::Arc;
use std::time::Instant;

use crate::config::{Config, RenderConfig};
use crate::pattern::{Pattern, PatternKind, PatternState, SliderOutline};
use crate::types::{Color, Point, Step, QUEUE_LENGTH};

// ────────────────────────────────────────────────────────────────────────────
// Parameters and per-frame outputs
// ────────────────────────────────────────────────────────────────────────────

/// Engine tuning taken from the gameplay and render config sections
#[derive(Debug, Clone, PartialEq)]
pub struct EngineParams {
    pub queue_length: usize,
    pub hit_tolerance: f32,
    pub particle_seed: u64,
    pub render: RenderConfig,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            queue_length: QUEUE_LENGTH,
            hit_tolerance: 0.3,
            particle_seed: 777,
            render: RenderConfig::default(),
        }
    }
}

impl EngineParams {
    pub fn from_config(config: &Config) -> Self {
        Self {
            queue_length: config.gameplay.queue_length,
            hit_tolerance: config.gameplay.hit_tolerance,
            particle_seed: config.gameplay.seed,
            render: config.render.clone(),
        }
    }
}

/// Result of one [`PatternEngine::update`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepScore {
    /// Sum of every active pattern's score gain this step
    pub delta: u32,
    /// Base index of the pattern that took this step's press
    pub new_press: Option<usize>,
}

/// A pattern reported as expired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub index: usize,
    pub miss: bool,
}

/// Everything the renderer needs to draw one visible pattern
#[derive(Debug, Clone)]
pub struct RenderIntent {
    /// Base list index
    pub index: usize,
    pub kind: PatternKind,
    pub reference: Point,
    pub end_point: Option<Point>,
    pub traversal: Point,
    pub alpha: f32,
    pub approach_scale: f32,
    pub radius: f32,
    pub stroke_width: f32,
    pub color: Color,
    pub active_marker: bool,
    pub just_pressed: bool,
    pub pressed: bool,
    pub outline: Option<Arc<SliderOutline>>,
    /// Approach ring at the current scale
    pub ring: Arc<RingMesh>,
}

/// Output of one [`PatternEngine::render`]
#[derive(Debug, Clone)]
pub struct RenderFrame {
    /// False if any pattern resolved as a miss this frame
    pub no_miss: bool,
    pub resolved: Vec<Resolution>,
    pub intents: Vec<RenderIntent>,
    pub particles: Vec<Particle>,
}

/// Running totals for a play session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreBoard {
    pub total: u64,
    pub combo: u32,
    pub max_combo: u32,
    pub hits: u32,
    pub misses: u32,
}

impl ScoreBoard {
    fn record(&mut self, miss: bool) {
        if miss {
            self.misses += 1;
            self.combo = 0;
        } else {
            self.hits += 1;
            self.combo += 1;
            self.max_combo = self.max_combo.max(self.combo);
        }
    }

    /// Fraction of resolved patterns that were hit
    pub fn accuracy(&self) -> f32 {
        let resolved = self.hits + self.misses;
        if resolved == 0 {
            return 1.0;
        }
        self.hits as f32 / resolved as f32
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Engine
// ────────────────────────────────────────────────────────────────────────────

pub struct PatternEngine {
    queue: PatternQueue,
    cache: RenderCache,
    particles: ParticleSystem,
    scoreboard: ScoreBoard,
    hit_tolerance: f32,
}

impl PatternEngine {
    /// Create an engine over a generated beatmap
    ///
    /// # Arguments
    /// * `patterns` - Base list in onset-time order
    /// * `params` - Window size, hit tolerance, particle seed and cache sizing
    pub fn new(patterns: Arc<[Pattern]>, params: EngineParams) -> Self {
        log::info!(
            "PatternEngine::new: {} patterns, window {}, tolerance {:.2}",
            patterns.len(),
            params.queue_length,
            params.hit_tolerance
        );
        Self {
            queue: PatternQueue::new(patterns, params.queue_length),
            cache: RenderCache::new(&params.render),
            particles: ParticleSystem::new(
                params.particle_seed,
                params.render.particles_per_hit,
                params.render.particle_lifetime,
            ),
            scoreboard: ScoreBoard::default(),
            hit_tolerance: params.hit_tolerance,
        }
    }

    /// Advance every active pattern by one step
    ///
    /// Patterns are visited oldest first; only the first one to register a
    /// new press is credited for it.
    pub fn update(&mut self, step: Step, input: &InputState) -> StepScore {
        let press_down = input.is_activated();
        let mut score = StepScore::default();

        for (pattern, slot) in self.queue.iter_mut() {
            let available = press_down && score.new_press.is_none();
            let update = pattern.update(&mut slot.state, step, input, available, self.hit_tolerance);
            score.delta += update.delta;
            if update.pressed {
                score.new_press = Some(slot.index);
                self.particles.emit(pattern.traversal_point(step), pattern.color);
                log::debug!(
                    "update: step {} pressed pattern {} ({}) for {}",
                    step,
                    slot.index,
                    pattern.kind().name(),
                    update.delta
                );
            }
        }

        self.scoreboard.total += score.delta as u64;
        self.particles.step();
        score
    }

    /// Resolve expired patterns and collect draw intents for `step`
    pub fn render(&mut self, step: Step) -> RenderFrame {
        let mut resolved = Vec::new();
        // Admitted patterns may already be past expiry when the window was saturated
        loop {
            for (pattern, slot) in self.queue.iter_mut() {
                if !slot.state.resolved && pattern.is_expired(step) {
                    slot.state.resolved = true;
                    let miss = slot.state.is_miss();
                    self.scoreboard.record(miss);
                    resolved.push(Resolution {
                        index: slot.index,
                        miss,
                    });
                }
            }
            if self.queue.evict_resolved() == 0 {
                break;
            }
        }

        let mut intents = Vec::with_capacity(self.queue.len());
        for (pattern, slot) in self.queue.iter() {
            if !slot.state.resolved && pattern.is_visible(step) {
                intents.push(build_intent(&mut self.cache, pattern, slot.index, &slot.state, step));
            }
        }

        RenderFrame {
            no_miss: resolved.iter().all(|r| !r.miss),
            resolved,
            intents,
            particles: self.particles.particles().to_vec(),
        }
    }

    /// Warm the ring cache by walking every pattern's visible range
    ///
    /// Uses a fresh state per pattern; the window, scores and particles are
    /// left untouched.
    pub fn prerender_caches(&mut self) {
        let start = Instant::now();
        let patterns = Arc::clone(self.queue.patterns());
        let fresh = PatternState::default();
        let mut intents = 0usize;

        for (index, pattern) in patterns.iter().enumerate() {
            let half = pattern.lifetime as Step / 2;
            let first = pattern.start_time.saturating_sub(half);
            for step in first..=pattern.end_time + half {
                if pattern.is_visible(step) {
                    build_intent(&mut self.cache, pattern, index, &fresh, step);
                    intents += 1;
                }
            }
        }

        log::info!(
            "[PERF] prerender_caches: {} intents, {} meshes cached in {:.1}ms",
            intents,
            self.cache.len(),
            start.elapsed().as_secs_f64() * 1000.0
        );
    }

    pub fn is_complete(&self) -> bool {
        self.queue.is_complete()
    }

    pub fn scoreboard(&self) -> &ScoreBoard {
        &self.scoreboard
    }

    /// Smallest base index still in the active window
    pub fn window_start(&self) -> usize {
        self.queue.window_start()
    }

    pub fn cache(&self) -> &RenderCache {
        &self.cache
    }

    pub fn patterns(&self) -> &Arc<[Pattern]> {
        self.queue.patterns()
    }
}

fn build_intent(
    cache: &mut RenderCache,
    pattern: &Pattern,
    index: usize,
    state: &PatternState,
    step: Step,
) -> RenderIntent {
    let visual = pattern.visual(state, step);
    let ring = cache.ring(pattern.radius, pattern.stroke_width, visual.approach_scale);
    RenderIntent {
        index,
        kind: pattern.kind(),
        reference: pattern.reference_point(),
        end_point: pattern.end_point(),
        traversal: visual.traversal,
        alpha: visual.alpha,
        approach_scale: visual.approach_scale,
        radius: pattern.radius,
        stroke_width: pattern.stroke_width,
        color: pattern.color,
        active_marker: visual.active_marker,
        just_pressed: visual.just_pressed,
        pressed: state.pressed,
        outline: pattern.outline.clone(),
        ring,
    }
}
