//! Sustain length estimation
//!
//! Starting at the onset frame, successive spectra are compared. The note is
//! considered to continue while the spectral shape stays put (small relative
//! entropy) and the dominant bin does not wander. An empty frame has no
//! distribution to compare and ends the note.

use super::stft::Spectrogram;
use crate::config::DurationConfig;

/// Probability floor keeping the divergence finite for empty bins
const EPS: f32 = 1e-8;

/// Estimate how long the note starting at `onset_frame` sustains, in seconds
///
/// The result is at least one frame long.
pub fn estimate_duration(spectrogram: &Spectrogram, onset_frame: usize, config: &DurationConfig) -> f64 {
    let num_frames = spectrogram.num_frames();
    if onset_frame >= num_frames {
        return spectrogram.frame_duration();
    }

    let max_frames = spectrogram.frames_for_secs(config.max_duration_secs as f64);
    let last = (onset_frame + max_frames).min(num_frames);

    let mut length = 1usize;
    let Some(mut prev) = Distribution::from_frame(spectrogram.frame(onset_frame)) else {
        return spectrogram.frame_duration();
    };

    for frame in onset_frame + 1..last {
        let Some(cur) = Distribution::from_frame(spectrogram.frame(frame)) else {
            break;
        };
        if prev.divergence(&cur) > config.divergence_threshold {
            break;
        }
        if prev.peak.abs_diff(cur.peak) > config.peak_tolerance {
            break;
        }
        length += 1;
        prev = cur;
    }

    length as f64 * spectrogram.frame_duration()
}

/// A magnitude frame normalized to sum to one
struct Distribution {
    probs: Vec<f32>,
    peak: usize,
}

impl Distribution {
    /// `None` when the frame carries no energy
    fn from_frame(frame: &[f32]) -> Option<Self> {
        let total: f32 = frame.iter().sum();
        if !(total > f32::EPSILON) {
            return None;
        }
        let probs: Vec<f32> = frame.iter().map(|m| m / total).collect();
        let peak = probs
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap_or(0);
        Some(Self { probs, peak })
    }

    /// Relative entropy `D(self || other)` in nats
    fn divergence(&self, other: &Distribution) -> f32 {
        self.probs
            .iter()
            .zip(&other.probs)
            .map(|(&p, &q)| {
                if p <= 0.0 {
                    0.0
                } else {
                    p * ((p + EPS) / (q + EPS)).ln()
                }
            })
            .sum::<f32>()
            .max(0.0)
    }
}
