//! Onset strength envelope and peak picking

use super::stft::Spectrogram;
use crate::config::PeakPickConfig;

/// Log compression gain applied before differencing
const LOG_GAIN: f32 = 1000.0;

/// Log-compressed spectral flux per frame, normalized to `0..=1`
///
/// Frame 0 has zero strength. A spectrogram with no positive change yields an
/// all-zero envelope.
pub fn onset_strength(spectrogram: &Spectrogram) -> Vec<f32> {
    let num_frames = spectrogram.num_frames();
    if num_frames == 0 {
        return Vec::new();
    }

    let num_bins = spectrogram.num_bins() as f32;
    let mut envelope = Vec::with_capacity(num_frames);
    envelope.push(0.0);

    let mut prev: Vec<f32> = spectrogram.frame(0).iter().map(|m| (LOG_GAIN * m).ln_1p()).collect();
    let mut cur = vec![0.0f32; prev.len()];
    for frame in spectrogram.frames().skip(1) {
        for (c, m) in cur.iter_mut().zip(frame) {
            *c = (LOG_GAIN * m).ln_1p();
        }
        let flux: f32 = cur
            .iter()
            .zip(&prev)
            .map(|(c, p)| (c - p).max(0.0))
            .sum::<f32>()
            / num_bins;
        envelope.push(flux);
        std::mem::swap(&mut prev, &mut cur);
    }

    let peak = envelope.iter().copied().fold(0.0f32, f32::max);
    if peak > f32::EPSILON {
        envelope.iter_mut().for_each(|v| *v /= peak);
    } else {
        envelope.iter_mut().for_each(|v| *v = 0.0);
    }
    envelope
}

/// Pick onset frames from a strength envelope
///
/// A frame is an onset when it is the maximum within `max_window` frames on
/// either side, exceeds the local mean over `avg_window` frames by `delta`,
/// and comes more than `wait` frames after the previous onset.
pub fn pick_peaks(envelope: &[f32], config: &PeakPickConfig) -> Vec<usize> {
    let n = envelope.len();
    let mut peaks = Vec::new();
    let mut last: Option<usize> = None;

    for i in 0..n {
        let value = envelope[i];
        if value <= 0.0 {
            continue;
        }

        let lo = i.saturating_sub(config.max_window);
        let hi = (i + config.max_window + 1).min(n);
        if envelope[lo..hi].iter().any(|&v| v > value) {
            continue;
        }

        let lo = i.saturating_sub(config.avg_window);
        let hi = (i + config.avg_window + 1).min(n);
        let mean = envelope[lo..hi].iter().sum::<f32>() / (hi - lo) as f32;
        if value < mean + config.delta {
            continue;
        }

        if let Some(prev) = last {
            if i - prev <= config.wait {
                continue;
            }
        }

        peaks.push(i);
        last = Some(i);
    }

    peaks
}

/// Root-mean-square amplitude over `center ± half_width` samples
pub fn window_rms(samples: &[f32], center: usize, half_width: usize) -> f32 {
    let window = sample_window(samples, center, half_width);
    if window.is_empty() {
        return 0.0;
    }
    (window.iter().map(|s| s * s).sum::<f32>() / window.len() as f32).sqrt()
}

/// Peak absolute amplitude over `center ± half_width` samples
pub fn window_peak(samples: &[f32], center: usize, half_width: usize) -> f32 {
    sample_window(samples, center, half_width)
        .iter()
        .fold(0.0f32, |acc, s| acc.max(s.abs()))
}

fn sample_window(samples: &[f32], center: usize, half_width: usize) -> &[f32] {
    let lo = center.saturating_sub(half_width).min(samples.len());
    let hi = center.saturating_add(half_width).min(samples.len());
    &samples[lo..hi]
}
