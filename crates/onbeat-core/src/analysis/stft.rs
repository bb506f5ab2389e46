//! Magnitude STFT
//!
//! Frames are centered: frame `f` covers samples
//! `[f * hop - n_fft / 2, f * hop + n_fft / 2)` with zero padding at both ends,
//! so frame times line up with `f * hop / sample_rate`.

use super::error::{AnalysisError, Result};
use realfft::RealFftPlanner;

/// Magnitude spectrogram stored frame-major in one flat buffer
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrogram {
    data: Vec<f32>,
    num_bins: usize,
    hop: usize,
    sample_rate: u32,
}

impl Spectrogram {
    /// Build from frame-major magnitudes (`data.len()` must be a multiple of `num_bins`)
    pub fn from_data(data: Vec<f32>, num_bins: usize, hop: usize, sample_rate: u32) -> Self {
        debug_assert!(num_bins > 0 && data.len() % num_bins == 0);
        Self {
            data,
            num_bins,
            hop,
            sample_rate,
        }
    }

    #[inline]
    pub fn num_frames(&self) -> usize {
        self.data.len() / self.num_bins
    }

    #[inline]
    pub fn num_bins(&self) -> usize {
        self.num_bins
    }

    #[inline]
    pub fn hop(&self) -> usize {
        self.hop
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[inline]
    pub fn frame(&self, index: usize) -> &[f32] {
        let start = index * self.num_bins;
        &self.data[start..start + self.num_bins]
    }

    /// Iterate over frames in time order
    pub fn frames(&self) -> std::slice::ChunksExact<'_, f32> {
        self.data.chunks_exact(self.num_bins)
    }

    /// Seconds per frame
    #[inline]
    pub fn frame_duration(&self) -> f64 {
        self.hop as f64 / self.sample_rate as f64
    }

    #[inline]
    pub fn frame_to_secs(&self, frame: usize) -> f64 {
        frame as f64 * self.frame_duration()
    }

    #[inline]
    pub fn frame_to_sample(&self, frame: usize) -> usize {
        frame * self.hop
    }

    /// Nearest frame for a time in seconds, clamped to the last frame
    pub fn secs_to_frame(&self, secs: f64) -> usize {
        let frame = (secs.max(0.0) / self.frame_duration()).round() as usize;
        frame.min(self.num_frames().saturating_sub(1))
    }

    /// Number of frames spanning a duration in seconds (at least one)
    pub fn frames_for_secs(&self, secs: f64) -> usize {
        ((secs / self.frame_duration()).round() as usize).max(1)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Periodic Hann window
pub fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            let phase = 2.0 * std::f32::consts::PI * i as f32 / size as f32;
            0.5 * (1.0 - phase.cos())
        })
        .collect()
}

/// Compute the magnitude STFT of a mono signal
///
/// # Arguments
/// * `signal` - Mono samples
/// * `n_fft` - Frame size
/// * `hop` - Hop size in samples
/// * `sample_rate` - Sample rate of `signal`
///
/// # Returns
/// A spectrogram with `1 + len / hop` frames of `n_fft / 2 + 1` bins, or an
/// empty spectrogram for an empty signal
pub fn magnitude_stft(
    signal: &[f32],
    n_fft: usize,
    hop: usize,
    sample_rate: u32,
) -> Result<Spectrogram> {
    if n_fft < 2 || hop == 0 {
        return Err(AnalysisError::InvalidInput(format!(
            "n_fft={} hop={} cannot frame a signal",
            n_fft, hop
        )));
    }

    let num_bins = n_fft / 2 + 1;
    if signal.is_empty() {
        return Ok(Spectrogram::from_data(Vec::new(), num_bins, hop, sample_rate));
    }

    // Center frames by padding half a frame on both sides
    let pad = n_fft / 2;
    let mut padded = vec![0.0f32; signal.len() + 2 * pad];
    padded[pad..pad + signal.len()].copy_from_slice(signal);

    let num_frames = 1 + signal.len() / hop;

    let mut planner = RealFftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(n_fft);
    let window = hann_window(n_fft);
    let norm_factor = 1.0 / (n_fft as f32).sqrt();

    let mut data = Vec::with_capacity(num_frames * num_bins);
    let mut scratch = fft.make_scratch_vec();
    let mut frame_buf = vec![0.0f32; n_fft];
    let mut spectrum = fft.make_output_vec();

    for frame_idx in 0..num_frames {
        let start = frame_idx * hop;
        let end = (start + n_fft).min(padded.len());
        let available = end - start;

        for i in 0..n_fft {
            frame_buf[i] = if i < available {
                padded[start + i] * window[i]
            } else {
                0.0
            };
        }

        fft.process_with_scratch(&mut frame_buf, &mut spectrum, &mut scratch)
            .map_err(|e| AnalysisError::Fft(format!("{:?}", e)))?;

        data.extend(spectrum.iter().map(|c| c.norm() * norm_factor));
    }

    Ok(Spectrogram::from_data(data, num_bins, hop, sample_rate))
}
