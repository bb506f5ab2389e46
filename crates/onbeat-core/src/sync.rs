//! Simulation/audio timing synchronizer
//!
//! The simulation advances one step per rendered frame, but frames do not
//! arrive at exactly the target rate. The synchronizer accumulates how many
//! steps *should* have elapsed from the measured frame rate and nudges the
//! step counter toward that estimate. Small drift is absorbed one step at a
//! time; drift beyond `max_drift` seeks the audio to match the simulation.
//!
//! Deviations are rounded to whole steps before comparison, so a fractional
//! deviation below half a step counts as in sync.

use crate::config::SyncConfig;
use crate::types::Step;

/// Audio playback position control
pub trait PlaybackClock {
    /// Current playback position in seconds
    fn position_secs(&self) -> f64;

    /// Move playback to `secs`
    fn seek(&mut self, secs: f64);
}

/// Simulated and estimated step counters
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimClock {
    pub step_count: Step,
    pub estimated_real_steps: f64,
}

impl SimClock {
    /// `estimated - step`, positive when the simulation lags real time
    pub fn deviation(&self) -> f64 {
        self.estimated_real_steps - self.step_count as f64
    }
}

/// Correction applied by one reconcile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    InSync,
    /// Advanced one extra step
    SpeedUp,
    /// Took back this frame's step
    SlowDown,
    /// Seeked playback to the simulation position
    HardResync,
}

pub struct TimingSynchronizer {
    clock: SimClock,
    target_fps: f64,
    max_drift: f64,
    resyncs: u64,
}

impl TimingSynchronizer {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            clock: SimClock::default(),
            target_fps: config.target_fps,
            max_drift: config.max_drift,
            resyncs: 0,
        }
    }

    /// Advance one frame
    ///
    /// # Arguments
    /// * `measured_fps` - Frame rate observed for the last frame
    /// * `playback` - Audio clock, read for diagnostics and written on resync
    ///
    /// # Returns
    /// The correction taken after advancing
    pub fn tick<P: PlaybackClock + ?Sized>(&mut self, measured_fps: f64, playback: &mut P) -> SyncAction {
        let ratio = if measured_fps.is_finite() && measured_fps > 0.0 {
            self.target_fps / measured_fps
        } else {
            1.0
        };
        self.clock.estimated_real_steps += ratio;
        self.clock.step_count += 1;

        log::trace!(
            "tick: step {} estimated {:.2} audio drift {:.1}ms",
            self.clock.step_count,
            self.clock.estimated_real_steps,
            (playback.position_secs() - self.position_secs()) * 1000.0
        );

        self.reconcile(playback)
    }

    /// Compare the step counter against the estimate and correct it
    ///
    /// Beyond `max_drift` the audio is seeked to the simulation. Otherwise the
    /// deviation is rounded to whole steps first: a lead or lag under half a
    /// step is [`SyncAction::InSync`], a larger one moves the counter by one.
    pub fn reconcile<P: PlaybackClock + ?Sized>(&mut self, playback: &mut P) -> SyncAction {
        let deviation = self.clock.deviation();

        if deviation.abs() > self.max_drift {
            let secs = self.position_secs();
            log::warn!(
                "reconcile: drift {:.1} steps exceeds {:.1}, seeking audio to {:.3}s",
                deviation,
                self.max_drift,
                secs
            );
            playback.seek(secs);
            self.clock.estimated_real_steps = self.clock.step_count as f64;
            self.resyncs += 1;
            return SyncAction::HardResync;
        }

        let whole = deviation.round();
        if whole >= 1.0 {
            self.clock.step_count += 1;
            SyncAction::SpeedUp
        } else if whole <= -1.0 && self.clock.step_count > 0 {
            self.clock.step_count -= 1;
            SyncAction::SlowDown
        } else {
            SyncAction::InSync
        }
    }

    pub fn step(&self) -> Step {
        self.clock.step_count
    }

    pub fn clock(&self) -> SimClock {
        self.clock
    }

    /// Overwrite both counters
    pub fn set_clock(&mut self, clock: SimClock) {
        self.clock = clock;
    }

    /// Simulation position in seconds
    pub fn position_secs(&self) -> f64 {
        self.clock.step_count as f64 / self.target_fps
    }

    pub fn resync_count(&self) -> u64 {
        self.resyncs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingClock {
        position: f64,
        seeks: Vec<f64>,
    }

    impl PlaybackClock for RecordingClock {
        fn position_secs(&self) -> f64 {
            self.position
        }

        fn seek(&mut self, secs: f64) {
            self.position = secs;
            self.seeks.push(secs);
        }
    }

    fn sync() -> TimingSynchronizer {
        TimingSynchronizer::new(&SyncConfig::default())
    }

    fn at(step: Step, estimated: f64) -> TimingSynchronizer {
        let mut s = sync();
        s.set_clock(SimClock {
            step_count: step,
            estimated_real_steps: estimated,
        });
        s
    }

    #[test]
    fn test_hard_resync_seeks_audio() {
        let mut s = at(1000, 1010.0);
        let mut playback = RecordingClock::default();
        assert_eq!(s.reconcile(&mut playback), SyncAction::HardResync);
        assert_eq!(playback.seeks, vec![1000.0 / 60.0]);
        assert_eq!(s.clock().estimated_real_steps, 1000.0);
        assert_eq!(s.step(), 1000);
        assert_eq!(s.resync_count(), 1);
    }

    #[test]
    fn test_small_drift_adjusts_by_one_step() {
        let mut playback = RecordingClock::default();

        let mut ahead = at(100, 102.0);
        assert_eq!(ahead.reconcile(&mut playback), SyncAction::SpeedUp);
        assert_eq!(ahead.step(), 101);

        let mut behind = at(100, 98.0);
        assert_eq!(behind.reconcile(&mut playback), SyncAction::SlowDown);
        assert_eq!(behind.step(), 99);

        let mut close = at(100, 100.3);
        assert_eq!(close.reconcile(&mut playback), SyncAction::InSync);
        assert_eq!(close.step(), 100);

        assert!(playback.seeks.is_empty());
    }

    #[test]
    fn test_bad_measured_fps_counts_as_on_target() {
        let mut s = sync();
        let mut playback = RecordingClock::default();
        assert_eq!(s.tick(0.0, &mut playback), SyncAction::InSync);
        assert_eq!(s.tick(f64::NAN, &mut playback), SyncAction::InSync);
        assert_eq!(s.clock().estimated_real_steps, 2.0);
        assert_eq!(s.step(), 2);
    }

    #[test]
    fn test_undershoot_converges_without_resync() {
        let mut s = sync();
        let mut playback = RecordingClock::default();
        let mut speedups = 0;
        for _ in 0..10_000 {
            if s.tick(57.0, &mut playback) == SyncAction::SpeedUp {
                speedups += 1;
            }
            assert!(s.clock().deviation().abs() <= 1.0, "deviation {}", s.clock().deviation());
        }
        assert_eq!(s.resync_count(), 0);
        // Roughly 3 extra steps per 57 frames
        let expected = 10_000.0 * (60.0 / 57.0 - 1.0);
        assert!((speedups as f64 - expected).abs() < 2.0, "speedups {}", speedups);
    }

    #[test]
    fn test_stall_triggers_resync() {
        let mut s = sync();
        let mut playback = RecordingClock::default();
        for _ in 0..100 {
            s.tick(60.0, &mut playback);
        }
        // A single frame that took ten nominal frames
        assert_eq!(s.tick(6.0, &mut playback), SyncAction::HardResync);
        assert_eq!(playback.seeks.len(), 1);
        assert!((playback.seeks[0] - 101.0 / 60.0).abs() < 1e-9);
    }
}
