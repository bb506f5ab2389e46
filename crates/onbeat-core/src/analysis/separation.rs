//! Repetition-based foreground/background separation
//!
//! Each frame is compared to the frames around it; the per-bin median over the
//! most similar frames estimates the repeating background. Soft masks with
//! asymmetric margins then split the magnitude spectrogram:
//!
//! ```text
//! filter     = min(median(S[nearest]), S)
//! background = softmask(filter,     margin_bg * (S - filter)) * S
//! foreground = softmask(S - filter, margin_fg * filter)       * S
//! ```
//!
//! Frames with no eligible neighbour (very short input) are all foreground.

use rayon::prelude::*;

use super::stft::Spectrogram;
use crate::config::SeparationConfig;

/// Result of separating a magnitude spectrogram
pub struct Separated {
    pub foreground: Spectrogram,
    pub background: Spectrogram,
}

/// Split a magnitude spectrogram into foreground and background
pub fn separate(spectrogram: &Spectrogram, config: &SeparationConfig) -> Separated {
    let num_frames = spectrogram.num_frames();
    let num_bins = spectrogram.num_bins();
    let frame_secs = spectrogram.frame_duration() as f32;

    let radius = ((config.search_radius_secs / frame_secs).round() as usize).max(1);
    let min_sep = (config.min_separation_secs / frame_secs).round() as usize;
    let top_k = config.top_k.max(1);

    let bands = config.similarity_bands.max(1);
    let features = similarity_features(spectrogram, bands);

    log::debug!(
        "separate: {} frames, radius={} frames, min_sep={} frames, k={}",
        num_frames,
        radius,
        min_sep,
        top_k
    );

    let mut fg_data = vec![0.0f32; num_frames * num_bins];
    let mut bg_data = vec![0.0f32; num_frames * num_bins];

    fg_data
        .par_chunks_mut(num_bins)
        .zip(bg_data.par_chunks_mut(num_bins))
        .enumerate()
        .for_each(|(i, (fg, bg))| {
            let lo = i.saturating_sub(radius);
            let hi = (i + radius).min(num_frames.saturating_sub(1));
            let feat_i = &features[i * bands..(i + 1) * bands];

            let mut neighbours: Vec<(f32, usize)> = (lo..=hi)
                .filter(|&j| j.abs_diff(i) >= min_sep.max(1))
                .map(|j| {
                    let feat_j = &features[j * bands..(j + 1) * bands];
                    let sim: f32 = feat_i.iter().zip(feat_j).map(|(a, b)| a * b).sum();
                    (sim, j)
                })
                .collect();

            let frame = spectrogram.frame(i);
            if neighbours.is_empty() {
                fg.copy_from_slice(frame);
                return;
            }

            if neighbours.len() > top_k {
                neighbours.select_nth_unstable_by(top_k - 1, |a, b| b.0.total_cmp(&a.0));
                neighbours.truncate(top_k);
            }

            let mut column = Vec::with_capacity(neighbours.len());
            for bin in 0..num_bins {
                column.clear();
                column.extend(neighbours.iter().map(|&(_, j)| spectrogram.frame(j)[bin]));
                let filter = median(&mut column).min(frame[bin]);
                let residual = frame[bin] - filter;

                let mask_bg = softmask(
                    filter,
                    config.margin_background * residual,
                    config.mask_power,
                );
                let mask_fg = softmask(
                    residual,
                    config.margin_foreground * filter,
                    config.mask_power,
                );
                bg[bin] = mask_bg * frame[bin];
                fg[bin] = mask_fg * frame[bin];
            }
        });

    let hop = spectrogram.hop();
    let sr = spectrogram.sample_rate();
    Separated {
        foreground: Spectrogram::from_data(fg_data, num_bins, hop, sr),
        background: Spectrogram::from_data(bg_data, num_bins, hop, sr),
    }
}

/// `x^p / (x^p + reference^p)`, zero when both are negligible
#[inline]
fn softmask(x: f32, reference: f32, power: f32) -> f32 {
    let z = x.max(reference);
    if z < f32::MIN_POSITIVE {
        return 0.0;
    }
    let m = (x / z).powf(power);
    let r = (reference / z).powf(power);
    m / (m + r)
}

/// Median of a small buffer (mean of the middle pair for even lengths)
fn median(values: &mut [f32]) -> f32 {
    values.sort_unstable_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

/// Unit-length log band energies per frame, used for cosine similarity
fn similarity_features(spectrogram: &Spectrogram, bands: usize) -> Vec<f32> {
    let edges = log_band_edges(spectrogram.num_bins(), bands);
    let mut features = vec![0.0f32; spectrogram.num_frames() * bands];

    features
        .par_chunks_mut(bands)
        .enumerate()
        .for_each(|(i, out)| {
            let frame = spectrogram.frame(i);
            for (b, window) in edges.windows(2).enumerate() {
                let energy: f32 = frame[window[0]..window[1]].iter().sum();
                out[b] = energy.ln_1p();
            }
            let norm = out.iter().map(|v| v * v).sum::<f32>().sqrt();
            if norm > f32::EPSILON {
                out.iter_mut().for_each(|v| *v /= norm);
            }
        });

    features
}

/// Log-spaced band edges over `[1, num_bins)`, non-decreasing, `bands + 1` entries
fn log_band_edges(num_bins: usize, bands: usize) -> Vec<usize> {
    let top = num_bins.max(2) as f32;
    let mut edges = Vec::with_capacity(bands + 1);
    let mut prev = 1usize;
    edges.push(prev);
    for b in 1..=bands {
        let edge = top.powf(b as f32 / bands as f32).round() as usize;
        let edge = edge.max(prev + 1).min(num_bins);
        edges.push(edge.max(prev));
        prev = edge.max(prev);
    }
    edges
}
