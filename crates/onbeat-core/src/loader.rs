//! Background beatmap loader
//!
//! Runs onset analysis and beatmap generation on a dedicated thread so the
//! caller can keep drawing a loading indicator. Progress is published through
//! an atomic stage; the finished beatmap arrives as a single message.
//!
//! Cancellation is cooperative: the worker checks the flag between stages and
//! never publishes a result once it is set.

use crossbeam::channel::{bounded, Receiver, Sender, TryRecvError};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use thiserror::Error;

use crate::analysis::{analyze, AnalysisError, AnalysisResult};
use crate::beatmap::{generate, GenerationParams};
use crate::config::Config;
use crate::pattern::Pattern;

/// Errors surfaced by [`BeatmapLoader`]
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Analysis failed: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("Beatmap load was cancelled")]
    Cancelled,

    #[error("Beatmap worker exited without a result")]
    Disconnected,

    #[error("Failed to spawn beatmap worker: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Worker progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LoadStage {
    Queued = 0,
    Analyzing = 1,
    Generating = 2,
    Done = 3,
    Failed = 4,
    Cancelled = 5,
}

impl LoadStage {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => LoadStage::Queued,
            1 => LoadStage::Analyzing,
            2 => LoadStage::Generating,
            3 => LoadStage::Done,
            4 => LoadStage::Failed,
            _ => LoadStage::Cancelled,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, LoadStage::Done | LoadStage::Failed | LoadStage::Cancelled)
    }

    pub fn label(&self) -> &'static str {
        match self {
            LoadStage::Queued => "queued",
            LoadStage::Analyzing => "analyzing audio",
            LoadStage::Generating => "generating beatmap",
            LoadStage::Done => "done",
            LoadStage::Failed => "failed",
            LoadStage::Cancelled => "cancelled",
        }
    }
}

/// Audio and settings for one beatmap
#[derive(Debug, Clone)]
pub struct BeatmapRequest {
    /// Mono samples
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub config: Config,
}

/// A generated, playable beatmap
#[derive(Debug, Clone)]
pub struct Beatmap {
    pub patterns: Arc<[Pattern]>,
    pub analysis: AnalysisResult,
}

impl Beatmap {
    pub fn tempo(&self) -> f64 {
        self.analysis.tempo
    }
}

type JobResult = Result<Beatmap, LoaderError>;

/// Handle to a running beatmap job
pub struct BeatmapLoader {
    rx: Receiver<JobResult>,
    stage: Arc<AtomicU8>,
    cancel: Arc<AtomicBool>,
    delivered: bool,
    _handle: JoinHandle<()>,
}

impl BeatmapLoader {
    /// Start analysis and generation on a new thread
    pub fn spawn(request: BeatmapRequest) -> Result<Self, LoaderError> {
        let (tx, rx) = bounded::<JobResult>(1);
        let stage = Arc::new(AtomicU8::new(LoadStage::Queued as u8));
        let cancel = Arc::new(AtomicBool::new(false));

        let stage_for_thread = Arc::clone(&stage);
        let cancel_for_thread = Arc::clone(&cancel);
        let handle = thread::Builder::new()
            .name("beatmap-generator".to_string())
            .spawn(move || {
                run_job(request, &tx, &stage_for_thread, &cancel_for_thread);
            })?;

        log::info!("BeatmapLoader spawned");

        Ok(Self {
            rx,
            stage,
            cancel,
            delivered: false,
            _handle: handle,
        })
    }

    pub fn stage(&self) -> LoadStage {
        LoadStage::from_u8(self.stage.load(Ordering::Acquire))
    }

    /// Ask the worker to stop; nothing is published afterwards
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Release);
        log::info!("BeatmapLoader: cancel requested during {}", self.stage().label());
    }

    /// Poll for the result (non-blocking)
    ///
    /// # Returns
    /// `Ok(None)` while the worker is busy and after the beatmap has been
    /// delivered; `Ok(Some)` exactly once on success
    pub fn try_recv(&mut self) -> Result<Option<Beatmap>, LoaderError> {
        if self.delivered {
            return Ok(None);
        }
        match self.rx.try_recv() {
            Ok(result) => {
                self.delivered = true;
                result.map(Some)
            }
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => {
                self.delivered = true;
                Err(self.closed_error())
            }
        }
    }

    /// Block until the worker finishes
    pub fn wait(self) -> Result<Beatmap, LoaderError> {
        match self.rx.recv() {
            Ok(result) => result,
            Err(_) => Err(self.closed_error()),
        }
    }

    fn closed_error(&self) -> LoaderError {
        if self.cancel.load(Ordering::Acquire) {
            LoaderError::Cancelled
        } else {
            LoaderError::Disconnected
        }
    }
}

/// Worker body: analyze, generate, publish
fn run_job(request: BeatmapRequest, tx: &Sender<JobResult>, stage: &AtomicU8, cancel: &AtomicBool) {
    let start = Instant::now();
    let cancelled = || {
        if cancel.load(Ordering::Acquire) {
            stage.store(LoadStage::Cancelled as u8, Ordering::Release);
            log::info!("run_job: cancelled after {:?}", start.elapsed());
            true
        } else {
            false
        }
    };

    if cancelled() {
        return;
    }
    stage.store(LoadStage::Analyzing as u8, Ordering::Release);
    let config = &request.config;
    let analysis = match analyze(
        &request.samples,
        request.sample_rate,
        config.gameplay.tempo,
        &config.analysis,
    ) {
        Ok(analysis) => analysis,
        Err(e) => {
            log::error!("run_job: {}", e);
            stage.store(LoadStage::Failed as u8, Ordering::Release);
            if !cancelled() {
                let _ = tx.send(Err(e.into()));
            }
            return;
        }
    };

    if cancelled() {
        return;
    }
    stage.store(LoadStage::Generating as u8, Ordering::Release);
    let patterns: Arc<[Pattern]> = generate(
        &analysis.events,
        analysis.tempo,
        &GenerationParams::from_config(config),
    )
    .into();

    if cancelled() {
        return;
    }
    log::info!(
        "[PERF] run_job: {} patterns at {:.1} BPM in {:?}",
        patterns.len(),
        analysis.tempo,
        start.elapsed()
    );
    stage.store(LoadStage::Done as u8, Ordering::Release);
    let _ = tx.send(Ok(Beatmap { patterns, analysis }));
}
