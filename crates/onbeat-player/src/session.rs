//! Headless play session
//!
//! Runs the frame loop the way a windowed client would: the synchronizer
//! decides how many simulation steps this frame covers, each step gets fresh
//! input and an engine update, and the frame ends with one render. Frame
//! times are jittered around the target rate so drift correction is exercised.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::time::Instant;

use onbeat_core::config::Config;
use onbeat_core::engine::{EngineParams, InputProvider, InputState, PatternEngine, ScoreBoard};
use onbeat_core::loader::Beatmap;
use onbeat_core::sync::{PlaybackClock, SyncAction, TimingSynchronizer};
use onbeat_core::Step;

use crate::autoplay::Autoplay;

/// Relative frame-time jitter (0.1 = ±10%)
const FRAME_JITTER: f64 = 0.1;

/// Steps played past the last pattern's end before giving up
const TAIL_STEPS: Step = 600;

/// Audio position advanced by real frame time
#[derive(Debug, Default)]
pub struct SimulatedPlayback {
    position: f64,
    seeks: u32,
}

impl SimulatedPlayback {
    fn advance(&mut self, secs: f64) {
        self.position += secs;
    }
}

impl PlaybackClock for SimulatedPlayback {
    fn position_secs(&self) -> f64 {
        self.position
    }

    fn seek(&mut self, secs: f64) {
        self.position = secs;
        self.seeks += 1;
    }
}

/// Summary of a finished session
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub scoreboard: ScoreBoard,
    pub patterns: usize,
    pub frames: u64,
    pub steps: Step,
    pub speedups: u64,
    pub slowdowns: u64,
    pub resyncs: u64,
    /// Frames whose render reported a combo break
    pub combo_breaks: u64,
    pub skipped: usize,
}

/// Play `beatmap` to completion with autoplay input
///
/// # Arguments
/// * `beatmap` - Generated beatmap
/// * `config` - Gameplay, sync and render settings
/// * `miss_rate` - Probability that autoplay skips a press
/// * `seed` - Seed for frame jitter and autoplay misses
pub fn run_session(beatmap: &Beatmap, config: &Config, miss_rate: f64, seed: u64) -> SessionReport {
    let start = Instant::now();
    let patterns = beatmap.patterns.clone();
    let last_end = patterns.iter().map(|p| p.end_time + p.lifetime as Step).max().unwrap_or(0);

    let mut engine = PatternEngine::new(patterns.clone(), EngineParams::from_config(config));
    engine.prerender_caches();

    let mut sync = TimingSynchronizer::new(&config.sync);
    let mut playback = SimulatedPlayback::default();
    let mut autoplay = Autoplay::new(patterns.clone(), miss_rate, seed);
    let mut input = InputState::new();
    let mut jitter = ChaCha8Rng::seed_from_u64(seed ^ 0x5eed);
    let target_fps = config.sync.target_fps;

    let mut report = SessionReport {
        scoreboard: ScoreBoard::default(),
        patterns: patterns.len(),
        frames: 0,
        steps: 0,
        speedups: 0,
        slowdowns: 0,
        resyncs: 0,
        combo_breaks: 0,
        skipped: 0,
    };

    let mut step = 0;
    while !engine.is_complete() && step <= last_end + TAIL_STEPS {
        let measured_fps = target_fps * (1.0 + jitter.gen_range(-FRAME_JITTER..=FRAME_JITTER));
        playback.advance(1.0 / measured_fps);

        match sync.tick(measured_fps, &mut playback) {
            SyncAction::InSync => {}
            SyncAction::SpeedUp => report.speedups += 1,
            SyncAction::SlowDown => report.slowdowns += 1,
            SyncAction::HardResync => report.resyncs += 1,
        }

        // A speed-up covers two steps, a slow-down none
        let target = sync.step();
        while step < target {
            step += 1;
            input.begin_frame();
            autoplay.poll(step, &mut input);
            engine.update(step, &input);
        }

        let frame = engine.render(step);
        if !frame.no_miss {
            report.combo_breaks += 1;
            log::debug!("run_session: combo break at step {}", step);
        }
        report.frames += 1;
    }

    report.scoreboard = *engine.scoreboard();
    report.steps = step;
    report.skipped = autoplay.skipped();
    let (hits, misses) = engine.cache().stats();
    log::info!(
        "[PERF] run_session: {} frames, {} steps in {:?} (ring cache {} hits / {} misses, {} audio seeks)",
        report.frames,
        report.steps,
        start.elapsed(),
        hits,
        misses,
        playback.seeks
    );
    report
}
