//! Configuration for Onbeat
//!
//! Configuration is stored as YAML. Default location:
//! `~/.config/onbeat/config.yaml` (platform config dir via `dirs`).
//!
//! Every section uses `#[serde(default)]`, so partial files are fine: missing
//! keys take their defaults and out-of-range values are clamped on load.

mod io;

pub use io::{load_config, save_config, Validate};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::types::{QUEUE_LENGTH, TARGET_FPS};

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Difficulty, seed and playfield
    pub gameplay: GameplayConfig,
    /// Onset analysis tuning
    pub analysis: AnalysisConfig,
    /// Clock synchronization
    pub sync: SyncConfig,
    /// Render-intent caching and effects
    pub render: RenderConfig,
}

impl Validate for Config {
    fn validate(&mut self) {
        self.gameplay.validate();
        self.analysis.validate();
        self.sync.validate();
        self.render.validate();
    }
}

// ────────────────────────────────────────────────────────────────────────────────
// Gameplay
// ────────────────────────────────────────────────────────────────────────────────

/// Gameplay configuration section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameplayConfig {
    /// Difficulty in (0, 10]; shrinks targets and spreads them further apart
    pub difficulty: f32,
    /// Approach rate in [1, 10]; shortens the lead time before each hit
    pub approach_rate: f32,
    /// Layout seed (mixed with the track's onset checksum)
    pub seed: u64,
    /// Tempo override in BPM; estimated from the audio when absent
    pub tempo: Option<f64>,
    /// Playfield width in pixels
    pub field_width: f32,
    /// Playfield height in pixels
    pub field_height: f32,
    /// Number of patterns eligible for display and scoring at once
    pub queue_length: usize,
    /// Press window as a fraction of half the pattern lifetime
    pub hit_tolerance: f32,
}

impl Default for GameplayConfig {
    fn default() -> Self {
        Self {
            difficulty: 5.0,
            approach_rate: 8.0,
            seed: 777,
            tempo: None,
            field_width: 1280.0,
            field_height: 720.0,
            queue_length: QUEUE_LENGTH,
            hit_tolerance: 0.3,
        }
    }
}

impl Validate for GameplayConfig {
    fn validate(&mut self) {
        self.difficulty = if self.difficulty.is_finite() {
            self.difficulty.clamp(0.1, 10.0)
        } else {
            5.0
        };
        self.approach_rate = if self.approach_rate.is_finite() {
            self.approach_rate.clamp(1.0, 10.0)
        } else {
            8.0
        };
        self.tempo = self.tempo.filter(|t| t.is_finite() && *t > 0.0);
        self.field_width = self.field_width.max(64.0);
        self.field_height = self.field_height.max(64.0);
        self.queue_length = self.queue_length.clamp(1, 64);
        self.hit_tolerance = self.hit_tolerance.clamp(0.05, 1.0);
    }
}

// ────────────────────────────────────────────────────────────────────────────────
// Analysis
// ────────────────────────────────────────────────────────────────────────────────

/// Onset analysis configuration section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// STFT frame size (power of two)
    pub n_fft: usize,
    /// STFT hop size in samples
    pub hop: usize,
    /// Repetition-based foreground/background separation
    pub separation: SeparationConfig,
    /// Peak picking on the onset strength envelope
    pub peaks: PeakPickConfig,
    /// Sustain length estimation
    pub duration: DurationConfig,
    /// Slowest tempo considered by the estimator
    pub min_bpm: f64,
    /// Fastest tempo considered by the estimator
    pub max_bpm: f64,
    /// Quantization grid as a fraction of a beat (0.5 = eighth notes)
    pub grid_division: f64,
    /// Number of phase offsets tried when aligning onsets to the grid
    pub phase_steps: usize,
    /// Onsets quieter than this fraction of the mean onset level are dropped
    pub noise_ratio: f32,
    /// Half-width in samples of the amplitude window around each onset
    pub amplitude_window: usize,
    /// Onsets closer than this are merged
    pub merge_threshold_secs: f64,
    /// Insert beat-spaced onsets into loud gaps
    pub fill_gaps: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            n_fft: 2048,
            hop: 512,
            separation: SeparationConfig::default(),
            peaks: PeakPickConfig::default(),
            duration: DurationConfig::default(),
            min_bpm: 60.0,
            max_bpm: 200.0,
            grid_division: 0.5,
            phase_steps: 8,
            noise_ratio: 1.0 / 12.0,
            amplitude_window: 100,
            merge_threshold_secs: 0.06,
            fill_gaps: true,
        }
    }
}

impl Validate for AnalysisConfig {
    fn validate(&mut self) {
        self.n_fft = self.n_fft.clamp(256, 16384).next_power_of_two();
        self.hop = self.hop.clamp(32, self.n_fft);
        self.separation.validate();
        self.peaks.validate();
        self.duration.validate();
        self.min_bpm = self.min_bpm.clamp(30.0, 300.0);
        self.max_bpm = self.max_bpm.clamp(30.0, 300.0);
        if self.min_bpm + 10.0 > self.max_bpm {
            self.max_bpm = (self.min_bpm + 10.0).min(310.0);
        }
        self.grid_division = self.grid_division.clamp(0.125, 1.0);
        self.phase_steps = self.phase_steps.clamp(1, 64);
        self.noise_ratio = self.noise_ratio.clamp(0.0, 1.0);
        self.amplitude_window = self.amplitude_window.clamp(1, 4096);
        self.merge_threshold_secs = self.merge_threshold_secs.clamp(0.0, 1.0);
    }
}

/// Separation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeparationConfig {
    /// Run the repetition filter; when disabled onsets come from the raw mix
    pub enabled: bool,
    /// Number of log-frequency bands used for frame similarity
    pub similarity_bands: usize,
    /// Maximum distance between compared frames in seconds
    pub search_radius_secs: f32,
    /// Frames closer than this are never treated as repetitions
    pub min_separation_secs: f32,
    /// Number of most-similar frames aggregated by the median
    pub top_k: usize,
    /// Soft mask margin for the background estimate
    pub margin_background: f32,
    /// Soft mask margin for the foreground estimate
    pub margin_foreground: f32,
    /// Soft mask exponent
    pub mask_power: f32,
}

impl Default for SeparationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            similarity_bands: 32,
            search_radius_secs: 4.0,
            min_separation_secs: 0.25,
            top_k: 7,
            margin_background: 2.0,
            margin_foreground: 10.0,
            mask_power: 2.0,
        }
    }
}

impl Validate for SeparationConfig {
    fn validate(&mut self) {
        self.similarity_bands = self.similarity_bands.clamp(4, 128);
        self.search_radius_secs = self.search_radius_secs.clamp(0.5, 30.0);
        self.min_separation_secs = self.min_separation_secs.clamp(0.0, self.search_radius_secs / 2.0);
        self.top_k = self.top_k.clamp(1, 64);
        self.margin_background = self.margin_background.max(0.0);
        self.margin_foreground = self.margin_foreground.max(0.0);
        self.mask_power = self.mask_power.clamp(0.5, 4.0);
    }
}

/// Peak picking configuration (frame counts at the analysis hop)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeakPickConfig {
    /// Frames on each side a peak must dominate
    pub max_window: usize,
    /// Frames on each side averaged for the adaptive threshold
    pub avg_window: usize,
    /// Offset above the local mean a peak must clear (envelope is in 0..=1)
    pub delta: f32,
    /// Minimum frames between picked peaks
    pub wait: usize,
}

impl Default for PeakPickConfig {
    fn default() -> Self {
        Self {
            max_window: 1,
            avg_window: 10,
            delta: 0.07,
            wait: 4,
        }
    }
}

impl Validate for PeakPickConfig {
    fn validate(&mut self) {
        self.max_window = self.max_window.clamp(1, 32);
        self.avg_window = self.avg_window.clamp(1, 128);
        self.delta = self.delta.clamp(0.0, 1.0);
        self.wait = self.wait.min(128);
    }
}

/// Duration estimation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DurationConfig {
    /// Relative entropy between successive frames above which a note ends
    pub divergence_threshold: f32,
    /// Maximum dominant-bin movement between frames before a note ends
    pub peak_tolerance: usize,
    /// Ceiling on a single note's sustain
    pub max_duration_secs: f32,
}

impl Default for DurationConfig {
    fn default() -> Self {
        Self {
            divergence_threshold: 0.5,
            peak_tolerance: 3,
            max_duration_secs: 4.0,
        }
    }
}

impl Validate for DurationConfig {
    fn validate(&mut self) {
        self.divergence_threshold = self.divergence_threshold.clamp(0.01, 10.0);
        self.peak_tolerance = self.peak_tolerance.min(64);
        self.max_duration_secs = self.max_duration_secs.clamp(0.05, 30.0);
    }
}

// ────────────────────────────────────────────────────────────────────────────────
// Sync / Render
// ────────────────────────────────────────────────────────────────────────────────

/// Clock synchronization configuration section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Simulation steps per second
    pub target_fps: f64,
    /// Drift in steps tolerated before a hard resync
    pub max_drift: f64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            target_fps: TARGET_FPS,
            max_drift: 3.0,
        }
    }
}

impl Validate for SyncConfig {
    fn validate(&mut self) {
        self.target_fps = if self.target_fps.is_finite() {
            self.target_fps.clamp(10.0, 480.0)
        } else {
            TARGET_FPS
        };
        self.max_drift = self.max_drift.clamp(1.0, 60.0);
    }
}

/// Render-intent configuration section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Maximum number of cached ring meshes
    pub cache_capacity: usize,
    /// Approach scale buckets per unit of scale
    pub scale_buckets: u32,
    /// Segments per tessellated ring
    pub ring_segments: usize,
    /// Particles emitted per hit (0 disables)
    pub particles_per_hit: usize,
    /// Particle lifetime in frames
    pub particle_lifetime: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 256,
            scale_buckets: 32,
            ring_segments: 48,
            particles_per_hit: 12,
            particle_lifetime: 10,
        }
    }
}

impl Validate for RenderConfig {
    fn validate(&mut self) {
        self.cache_capacity = self.cache_capacity.clamp(1, 65536);
        self.scale_buckets = self.scale_buckets.clamp(1, 1024);
        self.ring_segments = self.ring_segments.clamp(8, 512);
        self.particles_per_hit = self.particles_per_hit.min(256);
        self.particle_lifetime = self.particle_lifetime.clamp(1, 600);
    }
}

/// Get the default config file path
///
/// Returns: `<config dir>/onbeat/config.yaml`
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("onbeat")
        .join("config.yaml")
}
