//! Grid quantization and onset cleanup
//!
//! Order of operations used by the analyzer:
//! 1. [`quantize`] snaps durations and times to a phase-aligned tempo grid
//! 2. [`reject_noise`] drops onsets much quieter than the average
//! 3. [`merge_close`] folds near-simultaneous onsets together
//! 4. [`fill_gaps`] optionally pads long loud gaps with beat-spaced onsets

/// An onset before bar assignment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    /// Onset time in seconds
    pub time: f64,
    /// Sustain length in seconds
    pub duration: f64,
    /// RMS amplitude around the onset
    pub rms: f32,
}

/// Snap durations and times to a tempo grid
///
/// Durations round to the nearest grid multiple and are never shorter than one
/// grid unit. Times snap to the grid shifted by whichever of `phase_steps`
/// offsets in `[0, grid)` minimizes the total cube-root timing error.
///
/// # Returns
/// The chosen phase offset in seconds
pub fn quantize(onsets: &mut [Candidate], grid: f64, phase_steps: usize) -> f64 {
    if onsets.is_empty() || !(grid > 0.0) {
        return 0.0;
    }

    for onset in onsets.iter_mut() {
        let units = (onset.duration / grid).round();
        onset.duration = if units.is_finite() && units >= 1.0 {
            units * grid
        } else {
            grid
        };
    }

    let steps = phase_steps.max(1);
    let mut best_phase = 0.0;
    let mut best_error = f64::INFINITY;
    for k in 0..steps {
        let phase = grid * k as f64 / steps as f64;
        let error: f64 = onsets
            .iter()
            .map(|o| (o.time - snap(o.time, grid, phase)).abs().cbrt())
            .sum();
        if error < best_error {
            best_error = error;
            best_phase = phase;
        }
    }

    for onset in onsets.iter_mut() {
        onset.time = snap(onset.time, grid, best_phase);
    }

    best_phase
}

/// Nearest point of the grid `phase + n * grid` that is not negative
#[inline]
fn snap(time: f64, grid: f64, phase: f64) -> f64 {
    let snapped = ((time - phase) / grid).round() * grid + phase;
    if snapped < 0.0 {
        snapped + grid
    } else {
        snapped
    }
}

/// Drop onsets quieter than `ratio` times the mean onset amplitude
///
/// A zero mean means the input was silent: nothing survives.
pub fn reject_noise(onsets: Vec<Candidate>, ratio: f32) -> Vec<Candidate> {
    if onsets.is_empty() {
        return onsets;
    }
    let mean = onsets.iter().map(|o| o.rms).sum::<f32>() / onsets.len() as f32;
    if !(mean > 0.0) {
        return Vec::new();
    }
    let floor = mean * ratio;
    onsets.into_iter().filter(|o| o.rms >= floor).collect()
}

/// Merge onsets closer than `threshold` seconds
///
/// The earlier onset survives and its duration is extended to cover the later
/// one.
pub fn merge_close(mut onsets: Vec<Candidate>, threshold: f64) -> Vec<Candidate> {
    onsets.sort_by(|a, b| a.time.total_cmp(&b.time));

    let mut merged: Vec<Candidate> = Vec::with_capacity(onsets.len());
    for onset in onsets {
        match merged.last_mut() {
            Some(last) if onset.time - last.time < threshold => {
                let end = (last.time + last.duration).max(onset.time + onset.duration);
                last.duration = end - last.time;
                last.rms = last.rms.max(onset.rms);
            }
            _ => merged.push(onset),
        }
    }
    merged
}

/// Pad long gaps with one-beat onsets where the track is still loud
///
/// Between consecutive onsets, grid positions one beat apart after the first
/// onset ends are tried in order. A position whose peak amplitude is at least
/// half of the preceding onset's becomes a new one-beat onset.
///
/// # Arguments
/// * `onsets` - Time-sorted onsets
/// * `beat` - Seconds per beat
/// * `peak_at` - Peak waveform amplitude around a time in seconds
pub fn fill_gaps<F>(onsets: &[Candidate], beat: f64, peak_at: F) -> Vec<Candidate>
where
    F: Fn(f64) -> f32,
{
    let mut out = Vec::with_capacity(onsets.len());
    if !(beat > 0.0) {
        out.extend_from_slice(onsets);
        return out;
    }

    for (i, current) in onsets.iter().enumerate() {
        out.push(*current);
        let Some(next) = onsets.get(i + 1) else {
            break;
        };

        let reference = peak_at(current.time);
        if !(reference > 0.0) {
            continue;
        }

        let mut anchor = current.time + current.duration;
        let mut skipped = 0u32;
        while next.time - anchor - skipped as f64 * beat > beat {
            let time = anchor + skipped as f64 * beat;
            let peak = peak_at(time);
            if peak >= reference / 2.0 {
                out.push(Candidate {
                    time,
                    duration: beat,
                    rms: peak,
                });
                anchor = time + beat;
                skipped = 0;
            } else {
                skipped += 1;
            }
        }
    }

    out
}
