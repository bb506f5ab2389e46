//! Beatmap generation
//!
//! Turns quantized onset events into a list of placed patterns. Generation is
//! a pure function of the events, the tempo and [`GenerationParams`]: the RNG
//! is seeded from the configured seed mixed with a checksum of the onset
//! durations and threaded explicitly through placement and slider shaping.
//!
//! Layout walks a cursor across the field. The first pattern of each bar jumps
//! the larger pattern distance; the rest of the bar follows at circle distance.

mod difficulty;
mod placement;
mod sliders;

pub use difficulty::{preempt_ms, DifficultyProfile};
pub use placement::{place_next, Placement};
pub use sliders::build_slider;

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::Instant;

use crate::config::{Config, GameplayConfig};
use crate::pattern::{Pattern, PatternKind, PatternStyle};
use crate::types::{seconds_per_beat, Color, OnsetEvent, Step, TARGET_FPS};

/// Longest onset (in beats) that still becomes a tap
pub const TAP_MAX_BEATS: f64 = 1.0;

/// Minimum spacing between kept onsets, and between a slider end and the next onset
pub const MIN_GAP_STEPS: Step = 10;

/// Slider length cap as a fraction of the playable diagonal
const MAX_SLIDER_FRACTION: f32 = 0.6;

const SLIDER_KINDS: [PatternKind; 3] = [PatternKind::Line, PatternKind::Curve, PatternKind::Arc];

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0001_0000_01b3;

/// Inputs that shape a beatmap besides the onsets themselves
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub seed: u64,
    pub difficulty: f32,
    pub approach_rate: f32,
    pub field_width: f32,
    pub field_height: f32,
    /// Simulation steps per second
    pub fps: f64,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self::from_gameplay(&GameplayConfig::default(), TARGET_FPS)
    }
}

impl GenerationParams {
    pub fn from_config(config: &Config) -> Self {
        Self::from_gameplay(&config.gameplay, config.sync.target_fps)
    }

    fn from_gameplay(gameplay: &GameplayConfig, fps: f64) -> Self {
        Self {
            seed: gameplay.seed,
            difficulty: gameplay.difficulty,
            approach_rate: gameplay.approach_rate,
            field_width: gameplay.field_width,
            field_height: gameplay.field_height,
            fps,
        }
    }
}

/// How one pattern was placed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementInfo {
    pub bar: u32,
    pub first_in_bar: bool,
    /// Distance from the previous pattern's reference point
    pub distance: f32,
    pub fallback: bool,
}

/// Generated patterns with per-pattern placement details
#[derive(Debug, Clone)]
pub struct Generated {
    pub patterns: Vec<Pattern>,
    pub placements: Vec<PlacementInfo>,
    pub profile: DifficultyProfile,
}

/// Generate patterns for `events` at `tempo` BPM
pub fn generate(events: &[OnsetEvent], tempo: f64, params: &GenerationParams) -> Vec<Pattern> {
    generate_detailed(events, tempo, params).patterns
}

/// [`generate`] plus placement details
pub fn generate_detailed(events: &[OnsetEvent], tempo: f64, params: &GenerationParams) -> Generated {
    let start = Instant::now();
    let fps = if params.fps.is_finite() && params.fps > 0.0 {
        params.fps
    } else {
        TARGET_FPS
    };
    let profile = DifficultyProfile::new(
        params.difficulty,
        params.approach_rate,
        fps,
        params.field_width,
        params.field_height,
    );
    let rect = profile.playable;
    let beat_secs = seconds_per_beat(tempo);
    let max_slider_len = MAX_SLIDER_FRACTION * rect.diagonal();

    let mut rng = ChaCha8Rng::seed_from_u64(params.seed ^ duration_checksum(events));

    let timed = schedule(events, fps, beat_secs);

    let mut patterns = Vec::with_capacity(timed.len());
    let mut placements = Vec::with_capacity(timed.len());
    let mut cursor = rect.center();
    let mut current_bar = None;
    let mut fallbacks = 0usize;

    for (i, onset) in timed.iter().enumerate() {
        let first_in_bar = current_bar != Some(onset.bar);
        current_bar = Some(onset.bar);

        let distance = if first_in_bar {
            profile.pattern_distance
        } else {
            profile.circle_distance
        };
        let placement = place_next(&mut rng, cursor, distance, &rect);
        if placement.fallback {
            fallbacks += 1;
        }

        let style = PatternStyle {
            radius: profile.radius,
            stroke_width: profile.stroke_width,
            lifetime: profile.lifetime,
            approach_rate: params.approach_rate,
            color: random_color(&mut rng),
        };

        // Sliders end at least MIN_GAP_STEPS before the next onset
        let mut end = onset.end;
        if let Some(next) = timed.get(i + 1) {
            end = end.min(next.start.saturating_sub(MIN_GAP_STEPS));
        }
        let span_beats = end.saturating_sub(onset.start) as f64 / fps / beat_secs;

        let mut pattern = None;
        if onset.beats > TAP_MAX_BEATS && end >= onset.start + MIN_GAP_STEPS {
            let kind = SLIDER_KINDS[rng.gen_range(0..SLIDER_KINDS.len())];
            let length = (span_beats as f32 * profile.circle_distance).min(max_slider_len);
            match build_slider(&mut rng, kind, placement.point, length, &rect) {
                Some(path) => pattern = Some(Pattern::slider(path, onset.start, end, style)),
                None => log::debug!(
                    "generate: {} at step {} does not fit, placing a tap",
                    kind.name(),
                    onset.start
                ),
            }
        }
        let pattern = pattern.unwrap_or_else(|| Pattern::tap(placement.point, onset.start, style));

        placements.push(PlacementInfo {
            bar: onset.bar,
            first_in_bar,
            distance: placement.distance,
            fallback: placement.fallback,
        });
        cursor = pattern.reference_point();
        patterns.push(pattern);
    }

    let sliders = patterns.iter().filter(|p| p.kind().is_slider()).count();
    log::info!(
        "generate: {} patterns ({} taps, {} sliders) from {} onsets, {} placement fallbacks",
        patterns.len(),
        patterns.len() - sliders,
        sliders,
        events.len(),
        fallbacks
    );
    log::info!(
        "[PERF] generate: {:.1}ms (radius {:.1}, lifetime {} steps)",
        start.elapsed().as_secs_f64() * 1000.0,
        profile.radius,
        profile.lifetime
    );

    Generated {
        patterns,
        placements,
        profile,
    }
}

/// An onset converted to steps
#[derive(Debug, Clone, Copy)]
struct TimedOnset {
    start: Step,
    end: Step,
    beats: f64,
    bar: u32,
}

/// Sort, convert to steps and drop onsets crowding the previous one
fn schedule(events: &[OnsetEvent], fps: f64, beat_secs: f64) -> Vec<TimedOnset> {
    let mut sorted: Vec<&OnsetEvent> = events
        .iter()
        .filter(|e| e.time.is_finite() && e.time >= 0.0)
        .collect();
    sorted.sort_by(|a, b| a.time.total_cmp(&b.time));

    let mut timed: Vec<TimedOnset> = Vec::with_capacity(sorted.len());
    let mut dropped = 0usize;
    for event in sorted {
        let duration = if event.duration.is_finite() {
            event.duration.max(0.0)
        } else {
            0.0
        };
        let start = (event.time * fps).round() as Step;
        if timed.last().is_some_and(|prev| start < prev.start + MIN_GAP_STEPS) {
            dropped += 1;
            continue;
        }
        timed.push(TimedOnset {
            start,
            end: ((event.time + duration) * fps).round() as Step,
            beats: duration / beat_secs,
            bar: event.bar,
        });
    }
    if dropped > 0 {
        log::debug!("schedule: dropped {} onsets closer than {} steps", dropped, MIN_GAP_STEPS);
    }
    timed
}

/// FNV-1a over the bit patterns of every onset duration
fn duration_checksum(events: &[OnsetEvent]) -> u64 {
    events.iter().fold(FNV_OFFSET_BASIS, |hash, event| {
        fnv1a(hash, &event.duration.to_bits().to_le_bytes())
    })
}

fn fnv1a(mut state: u64, bytes: &[u8]) -> u64 {
    for byte in bytes {
        state ^= u64::from(*byte);
        state = state.wrapping_mul(FNV_PRIME);
    }
    state
}

/// Random hue and saturation at HSV value in `[0.75, 1]`
fn random_color(rng: &mut ChaCha8Rng) -> Color {
    Color::from_hsv(
        rng.gen_range(0.0..360.0),
        rng.gen_range(0.5..=1.0),
        rng.gen_range(0.75..=1.0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::Geometry;
    use crate::types::bar_for_time;

    /// Eighth notes at 120 BPM with a note held across beat three of every bar
    fn events(bars: u32) -> Vec<OnsetEvent> {
        let mut events = Vec::new();
        for bar in 0..bars {
            for eighth in [0, 1, 2, 3, 4, 7] {
                let time = bar as f64 * 2.0 + eighth as f64 * 0.25;
                let duration = if eighth == 4 { 0.75 } else { 0.25 };
                events.push(OnsetEvent {
                    time,
                    duration,
                    bar: bar_for_time(time, 120.0),
                });
            }
        }
        events
    }

    #[test]
    fn test_generation_is_deterministic() {
        let events = events(8);
        let params = GenerationParams::default();
        let a = generate(&events, 120.0, &params);
        let b = generate(&events, 120.0, &params);
        assert_eq!(a, b);

        let other = generate(&events, 120.0, &GenerationParams { seed: 1, ..params });
        assert_ne!(a, other);
    }

    #[test]
    fn test_empty_events_give_empty_beatmap() {
        assert!(generate(&[], 120.0, &GenerationParams::default()).is_empty());
    }

    #[test]
    fn test_patterns_stay_in_bounds_and_order() {
        let generated = generate_detailed(&events(16), 120.0, &GenerationParams::default());
        let rect = generated.profile.playable;
        assert!(!generated.patterns.is_empty());
        for pair in generated.patterns.windows(2) {
            assert!(pair[0].start_time < pair[1].start_time);
        }
        for pattern in &generated.patterns {
            assert!(rect.contains(pattern.reference_point()));
            if let Geometry::Slider(path) = &pattern.geometry {
                assert!(path.fits_in(&rect));
                assert!(pattern.end_time > pattern.start_time);
            }
        }
    }

    #[test]
    fn test_in_bar_spacing_is_circle_distance() {
        let generated = generate_detailed(&events(16), 120.0, &GenerationParams::default());
        let diagonal = generated.profile.playable.diagonal();
        let circle = generated.profile.circle_distance;

        for (i, pair) in generated.patterns.windows(2).enumerate() {
            let info = generated.placements[i + 1];
            let gap = pair[0].reference_point().distance(pair[1].reference_point());
            if info.fallback {
                assert!(gap <= diagonal);
            } else if !info.first_in_bar {
                assert!((gap - circle).abs() < 0.05, "pattern {} gap {} vs {}", i + 1, gap, circle);
            }
        }
    }

    #[test]
    fn test_held_notes_become_sliders_that_end_early() {
        let patterns = generate(&events(8), 120.0, &GenerationParams::default());
        let sliders: Vec<&Pattern> = patterns.iter().filter(|p| p.kind().is_slider()).collect();
        assert!(!sliders.is_empty());

        for (i, pattern) in patterns.iter().enumerate() {
            if let Some(next) = patterns.get(i + 1) {
                if pattern.kind().is_slider() {
                    assert!(pattern.end_time + MIN_GAP_STEPS <= next.start_time);
                }
            }
        }
    }

    #[test]
    fn test_crowded_onsets_are_dropped() {
        let events = [
            OnsetEvent { time: 1.0, duration: 0.25, bar: 1 },
            OnsetEvent { time: 1.05, duration: 0.25, bar: 1 },
            OnsetEvent { time: 1.5, duration: 0.25, bar: 1 },
        ];
        let patterns = generate(&events, 120.0, &GenerationParams::default());
        let starts: Vec<Step> = patterns.iter().map(|p| p.start_time).collect();
        assert_eq!(starts, vec![60, 90]);
    }

    #[test]
    fn test_malformed_durations_become_taps() {
        let events = [
            OnsetEvent { time: 1.0, duration: f64::NAN, bar: 1 },
            OnsetEvent { time: 2.0, duration: -3.0, bar: 2 },
            OnsetEvent { time: f64::INFINITY, duration: 1.0, bar: 2 },
        ];
        let patterns = generate(&events, 120.0, &GenerationParams::default());
        assert_eq!(patterns.len(), 2);
        assert!(patterns.iter().all(|p| p.kind() == PatternKind::Tap));
    }

    #[test]
    fn test_colors_stay_bright() {
        let patterns = generate(&events(4), 120.0, &GenerationParams::default());
        for pattern in patterns {
            assert!(pattern.color.value() >= 0.74);
        }
    }
}
