//! Onset analysis
//!
//! Turns a decoded waveform into quantized rhythmic events:
//!
//! 1. Magnitude STFT of the mix
//! 2. Repetition-based separation into foreground and background streams
//! 3. Onset detection on each stream (spectral flux + peak picking)
//! 4. Sustain length per onset from spectral stability
//! 5. Tempo from the hint, or estimated from the mix's onset envelope
//! 6. Grid quantization, noise rejection, merging and optional gap filling
//! 7. Bar assignment
//!
//! Silent or empty audio is not an error and yields no events.

mod duration;
mod error;
mod onset;
mod quantize;
mod separation;
mod stft;
mod tempo;

pub use error::{AnalysisError, Result};
pub use quantize::Candidate;
pub use stft::{magnitude_stft, Spectrogram};
pub use tempo::estimate_tempo;

use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::config::AnalysisConfig;
use crate::types::{bar_for_time, seconds_per_beat, OnsetEvent, DEFAULT_TEMPO};

/// Peak amplitude below which the input counts as silent
const SILENCE_FLOOR: f32 = 1e-5;

/// Output of [`analyze`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Quantized events in time order
    pub events: Vec<OnsetEvent>,
    /// Tempo used for quantization (BPM)
    pub tempo: f64,
    /// Whether `tempo` was estimated rather than supplied
    pub tempo_estimated: bool,
}

impl AnalysisResult {
    fn silent(tempo_hint: Option<f64>) -> Self {
        Self {
            events: Vec::new(),
            tempo: tempo_hint.unwrap_or(DEFAULT_TEMPO),
            tempo_estimated: tempo_hint.is_none(),
        }
    }
}

/// Average interleaved channels down to mono
pub fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Analyze a mono waveform into quantized onset events
///
/// # Arguments
/// * `samples` - Mono samples (see [`downmix`] for multichannel input)
/// * `sample_rate` - Sample rate in Hz
/// * `tempo_hint` - Known tempo in BPM; estimated when `None`
/// * `config` - Analysis tuning
///
/// # Returns
/// Events sorted by time plus the tempo used, or an error for a zero sample
/// rate, a non-positive tempo hint, or an FFT failure
pub fn analyze(
    samples: &[f32],
    sample_rate: u32,
    tempo_hint: Option<f64>,
    config: &AnalysisConfig,
) -> Result<AnalysisResult> {
    if sample_rate == 0 {
        return Err(AnalysisError::InvalidInput("sample rate is zero".to_string()));
    }
    if let Some(tempo) = tempo_hint {
        if !(tempo.is_finite() && tempo > 0.0) {
            return Err(AnalysisError::InvalidInput(format!(
                "tempo hint must be positive, got {}",
                tempo
            )));
        }
    }

    let peak = samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
    if samples.is_empty() || !(peak > SILENCE_FLOOR) {
        log::info!("analyze: Input is silent ({} samples), no events", samples.len());
        return Ok(AnalysisResult::silent(tempo_hint));
    }

    let total_start = Instant::now();
    log::info!(
        "analyze: {} samples @ {} Hz ({:.1}s), n_fft={}, hop={}",
        samples.len(),
        sample_rate,
        samples.len() as f64 / sample_rate as f64,
        config.n_fft,
        config.hop
    );

    let stft_start = Instant::now();
    let spectrogram = magnitude_stft(samples, config.n_fft, config.hop, sample_rate)?;
    let mix_envelope = onset::onset_strength(&spectrogram);
    log::info!(
        "[PERF] analyze: STFT ({} frames) took {:?}",
        spectrogram.num_frames(),
        stft_start.elapsed()
    );

    // Per-stream onset frames, unioned
    let detect_start = Instant::now();
    let mut frames = if config.separation.enabled {
        let streams = separation::separate(&spectrogram, &config.separation);
        let mut frames = onset::pick_peaks(&onset::onset_strength(&streams.foreground), &config.peaks);
        let background = onset::pick_peaks(&onset::onset_strength(&streams.background), &config.peaks);
        log::debug!(
            "analyze: {} foreground + {} background onset frames",
            frames.len(),
            background.len()
        );
        frames.extend(background);
        frames
    } else {
        onset::pick_peaks(&mix_envelope, &config.peaks)
    };
    // Flux peaks when an attack first enters a centered frame, half a frame early
    let lag = config.n_fft / (2 * config.hop);
    let last_frame = spectrogram.num_frames().saturating_sub(1);
    for frame in frames.iter_mut() {
        *frame = (*frame + lag).min(last_frame);
    }
    frames.sort_unstable();
    frames.dedup();
    log::info!(
        "[PERF] analyze: Separation + detection ({} onsets) took {:?}",
        frames.len(),
        detect_start.elapsed()
    );

    let (tempo, tempo_estimated) = match tempo_hint {
        Some(tempo) => (tempo, false),
        None => {
            let frame_rate = 1.0 / spectrogram.frame_duration();
            let estimated =
                estimate_tempo(&mix_envelope, frame_rate, config.min_bpm, config.max_bpm)
                    .unwrap_or_else(|| {
                        log::warn!("analyze: No periodicity found, assuming {} BPM", DEFAULT_TEMPO);
                        DEFAULT_TEMPO
                    });
            (estimated, true)
        }
    };

    let mut candidates: Vec<Candidate> = frames
        .iter()
        .map(|&frame| Candidate {
            time: spectrogram.frame_to_secs(frame),
            duration: duration::estimate_duration(&spectrogram, frame, &config.duration),
            rms: onset::window_rms(samples, spectrogram.frame_to_sample(frame), config.amplitude_window),
        })
        .collect();

    let beat = seconds_per_beat(tempo);
    let grid = beat * config.grid_division;
    let phase = quantize::quantize(&mut candidates, grid, config.phase_steps);
    let detected = candidates.len();

    let candidates = quantize::reject_noise(candidates, config.noise_ratio);
    let rejected = detected - candidates.len();
    let mut candidates = quantize::merge_close(candidates, config.merge_threshold_secs);

    if config.fill_gaps {
        let before = candidates.len();
        candidates = quantize::fill_gaps(&candidates, beat, |time| {
            let center = (time * sample_rate as f64).round() as usize;
            onset::window_peak(samples, center, config.amplitude_window)
        });
        log::debug!("analyze: Gap filling added {} onsets", candidates.len() - before);
    }

    let events: Vec<OnsetEvent> = candidates
        .iter()
        .map(|c| OnsetEvent {
            time: c.time,
            duration: c.duration,
            bar: bar_for_time(c.time, tempo),
        })
        .collect();

    log::info!(
        "analyze: {} events, tempo {:.2} BPM ({}), grid {:.3}s phase {:.3}s, {} rejected as noise",
        events.len(),
        tempo,
        if tempo_estimated { "estimated" } else { "given" },
        grid,
        phase,
        rejected
    );
    log::info!("[PERF] analyze: Total {:?}", total_start.elapsed());

    Ok(AnalysisResult {
        events,
        tempo,
        tempo_estimated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Decaying 150ms 1 kHz tones at `bpm`, starting at `offset` seconds
    fn click_track(sample_rate: u32, bpm: f64, secs: f64, offset: f64) -> Vec<f32> {
        let len = (secs * sample_rate as f64) as usize;
        let period = 60.0 / bpm;
        let click_len = (0.15 * sample_rate as f64) as usize;
        let mut samples = vec![0.0f32; len];
        let mut t = offset;
        while t < secs {
            let start = (t * sample_rate as f64) as usize;
            for i in 0..click_len {
                if start + i >= len {
                    break;
                }
                let phase = 2.0 * std::f32::consts::PI * 1000.0 * i as f32 / sample_rate as f32;
                let decay = (-(i as f32) / (click_len as f32 / 3.0)).exp();
                samples[start + i] += 0.8 * phase.sin() * decay;
            }
            t += period;
        }
        samples
    }

    #[test]
    fn test_empty_input_yields_no_events() {
        let result = analyze(&[], 22050, None, &AnalysisConfig::default()).unwrap();
        assert!(result.events.is_empty());
        assert_eq!(result.tempo, DEFAULT_TEMPO);
    }

    #[test]
    fn test_silent_input_yields_no_events() {
        let silence = vec![0.0f32; 22050 * 3];
        let result = analyze(&silence, 22050, Some(140.0), &AnalysisConfig::default()).unwrap();
        assert!(result.events.is_empty());
        assert_eq!(result.tempo, 140.0);
        assert!(!result.tempo_estimated);
    }

    #[test]
    fn test_invalid_input_is_rejected() {
        let samples = vec![0.5f32; 1024];
        assert!(analyze(&samples, 0, None, &AnalysisConfig::default()).is_err());
        assert!(analyze(&samples, 22050, Some(-3.0), &AnalysisConfig::default()).is_err());
    }

    #[test]
    fn test_downmix_stereo() {
        let mono = downmix(&[1.0, 0.0, 0.5, 0.5, -1.0, 1.0], 2);
        assert_eq!(mono, vec![0.5, 0.5, 0.0]);
    }

    #[test]
    fn test_click_track_onsets_on_grid() {
        let sr = 22050;
        let samples = click_track(sr, 120.0, 8.0, 0.5);
        let mut config = AnalysisConfig {
            fill_gaps: false,
            ..Default::default()
        };
        config.separation.enabled = false;
        let result = analyze(&samples, sr, Some(120.0), &config).unwrap();

        // 15 clicks at 0.5, 1.0, ..., 7.5
        assert!(
            result.events.len() >= 13 && result.events.len() <= 17,
            "got {} events",
            result.events.len()
        );
        for pair in result.events.windows(2) {
            let gap = pair[1].time - pair[0].time;
            assert!(gap > 0.0);
            // Every gap is a whole number of grid units (0.25s)
            let units = gap / 0.25;
            assert!((units - units.round()).abs() < 1e-6, "gap {}", gap);
        }
        for event in &result.events {
            assert!(event.duration >= 0.25 - 1e-9);
            assert_eq!(event.bar, bar_for_time(event.time, 120.0));
        }
    }

    #[test]
    fn test_zero_similarity_bands_still_analyzes() {
        let sr = 22050;
        let samples = click_track(sr, 120.0, 3.0, 0.25);
        let mut config = AnalysisConfig::default();
        config.separation.enabled = true;
        config.separation.similarity_bands = 0;

        let result = analyze(&samples, sr, Some(120.0), &config).unwrap();
        assert!(!result.events.is_empty());
    }

    #[test]
    fn test_separated_pipeline_stays_on_one_grid() {
        let sr = 22050;
        let samples = click_track(sr, 120.0, 6.0, 0.25);
        let result = analyze(&samples, sr, Some(120.0), &AnalysisConfig::default()).unwrap();

        assert!(!result.events.is_empty());
        for pair in result.events.windows(2) {
            let units = (pair[1].time - pair[0].time) / 0.25;
            assert!(units > 0.5);
            assert!((units - units.round()).abs() < 1e-6);
            assert!(pair[0].bar <= pair[1].bar);
        }
    }

    #[test]
    fn test_click_track_tempo_estimate() {
        // 24576 Hz / 512 hop = 48 frames per second, so a beat is exactly 24 frames
        let sr = 24576;
        let samples = click_track(sr, 120.0, 10.0, 0.0);
        let result = analyze(&samples, sr, None, &AnalysisConfig::default()).unwrap();
        assert!(result.tempo_estimated);
        assert!((result.tempo - 120.0).abs() < 3.0, "tempo {}", result.tempo);
    }
}
