//! Tempo estimation from the onset strength envelope
//!
//! Autocorrelation of the envelope over the lags of the allowed BPM range,
//! weighted by a log-normal prior centered on 120 BPM so that half- and
//! double-time candidates lose to the plausible middle. The winning lag is
//! refined with parabolic interpolation.

use crate::types::DEFAULT_TEMPO;

/// Width of the tempo prior in octaves
const PRIOR_STD_OCTAVES: f64 = 1.0;

/// Estimate tempo in BPM
///
/// # Arguments
/// * `envelope` - Onset strength per frame
/// * `frame_rate` - Envelope frames per second
/// * `min_bpm` / `max_bpm` - Allowed tempo range
///
/// # Returns
/// `None` when the envelope carries no periodic energy in range
pub fn estimate_tempo(envelope: &[f32], frame_rate: f64, min_bpm: f64, max_bpm: f64) -> Option<f64> {
    let n = envelope.len();
    if n < 4 || frame_rate <= 0.0 {
        return None;
    }

    let lag_min = ((60.0 * frame_rate / max_bpm).floor() as usize).max(1);
    let lag_max = ((60.0 * frame_rate / min_bpm).ceil() as usize).min(n - 2);
    if lag_min >= lag_max {
        return None;
    }

    // Score every lag in range (plus one guard lag each side for interpolation)
    let lo = lag_min.saturating_sub(1).max(1);
    let hi = (lag_max + 1).min(n - 1);
    let scores: Vec<f64> = (lo..=hi)
        .map(|lag| autocorrelation(envelope, lag) * tempo_prior(60.0 * frame_rate / lag as f64))
        .collect();

    let (best_idx, best) = scores
        .iter()
        .enumerate()
        .filter(|(i, _)| (lag_min..=lag_max).contains(&(lo + i)))
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, &s)| (i, s))?;

    if !(best > 0.0) {
        return None;
    }

    let mut lag = (lo + best_idx) as f64;
    if best_idx > 0 && best_idx + 1 < scores.len() {
        let (a, b, c) = (scores[best_idx - 1], best, scores[best_idx + 1]);
        let denom = a - 2.0 * b + c;
        if denom.abs() > f64::EPSILON {
            lag += (0.5 * (a - c) / denom).clamp(-0.5, 0.5);
        }
    }

    let bpm = 60.0 * frame_rate / lag;
    log::debug!("estimate_tempo: lag={:.2} frames -> {:.2} BPM", lag, bpm);
    Some(bpm.clamp(min_bpm, max_bpm))
}

/// Unbiased autocorrelation at one lag
fn autocorrelation(envelope: &[f32], lag: usize) -> f64 {
    let pairs = envelope.len() - lag;
    let sum: f64 = envelope[..pairs]
        .iter()
        .zip(&envelope[lag..])
        .map(|(&a, &b)| a as f64 * b as f64)
        .sum();
    sum / pairs as f64
}

/// Log-normal weight around the default tempo
fn tempo_prior(bpm: f64) -> f64 {
    let octaves = (bpm / DEFAULT_TEMPO).log2() / PRIOR_STD_OCTAVES;
    (-0.5 * octaves * octaves).exp()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pulse_train(len: usize, period: usize) -> Vec<f32> {
        (0..len).map(|i| if i % period == 0 { 1.0 } else { 0.0 }).collect()
    }

    #[test]
    fn test_pulse_train_at_120() {
        // 48 frames per second, pulse every 24 frames = 120 BPM
        let env = pulse_train(48 * 20, 24);
        let bpm = estimate_tempo(&env, 48.0, 60.0, 200.0).unwrap();
        assert!((bpm - 120.0).abs() < 2.0, "got {}", bpm);
    }

    #[test]
    fn test_pulse_train_at_150() {
        // 100 fps, pulse every 40 frames = 150 BPM
        let env = pulse_train(100 * 30, 40);
        let bpm = estimate_tempo(&env, 100.0, 60.0, 200.0).unwrap();
        assert!((bpm - 150.0).abs() < 2.0, "got {}", bpm);
    }

    #[test]
    fn test_silent_envelope_has_no_tempo() {
        let env = vec![0.0f32; 1000];
        assert_eq!(estimate_tempo(&env, 48.0, 60.0, 200.0), None);
        assert_eq!(estimate_tempo(&[], 48.0, 60.0, 200.0), None);
    }

    #[test]
    fn test_prior_prefers_middle() {
        assert!(tempo_prior(120.0) > tempo_prior(60.0));
        assert!(tempo_prior(120.0) > tempo_prior(240.0));
        assert!((tempo_prior(60.0) - tempo_prior(240.0)).abs() < 1e-12);
    }
}
