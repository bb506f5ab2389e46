//! Onbeat Player - headless beatmap generation and autoplay
//!
//! Analyzes a track on the beatmap loader thread, then plays the generated
//! beatmap with autoplay input through the full engine and synchronizer loop.
//!
//! ## Usage
//!
//! ```text
//! onbeat-player [OPTIONS] <track.wav>
//! onbeat-player [OPTIONS] --synth <bars>
//!
//!   --config <path>     Config file (default: platform config dir)
//!   --seed <n>          Layout seed override
//!   --bpm <n>           Tempo hint (also the synthesized track's tempo)
//!   --miss-rate <f>     Fraction of presses autoplay skips (default 0)
//! ```

mod audio;
mod autoplay;
mod session;

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use onbeat_core::config::{default_config_path, load_config, Config};
use onbeat_core::loader::{BeatmapLoader, BeatmapRequest, LoadStage};

use audio::TrackAudio;

const SYNTH_SAMPLE_RATE: u32 = 22050;
const DEFAULT_SYNTH_BPM: f64 = 120.0;
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Where the track comes from
enum TrackSource {
    Wav(PathBuf),
    Synth { bars: u32 },
}

struct Args {
    source: TrackSource,
    config_path: Option<PathBuf>,
    seed: Option<u64>,
    bpm: Option<f64>,
    miss_rate: f64,
}

fn parse_args() -> Result<Args> {
    let mut args = std::env::args().skip(1);
    let mut source = None;
    let mut config_path = None;
    let mut seed = None;
    let mut bpm = None;
    let mut miss_rate = 0.0;

    while let Some(arg) = args.next() {
        let mut value = |name: &str| args.next().with_context(|| format!("{} needs a value", name));
        match arg.as_str() {
            "--config" => config_path = Some(PathBuf::from(value("--config")?)),
            "--seed" => seed = Some(value("--seed")?.parse::<u64>().context("--seed must be an integer")?),
            "--bpm" => bpm = Some(value("--bpm")?.parse::<f64>().context("--bpm must be a number")?),
            "--miss-rate" => miss_rate = value("--miss-rate")?.parse::<f64>().context("--miss-rate must be a number")?,
            "--synth" => {
                let bars = value("--synth")?.parse::<u32>().context("--synth needs a bar count")?;
                source = Some(TrackSource::Synth { bars });
            }
            flag if flag.starts_with("--") => bail!("Unknown option: {}", flag),
            path => source = Some(TrackSource::Wav(PathBuf::from(path))),
        }
    }

    let Some(source) = source else {
        bail!("Usage: onbeat-player [--config PATH] [--seed N] [--bpm N] [--miss-rate F] (<track.wav> | --synth <bars>)");
    };
    Ok(Args {
        source,
        config_path,
        seed,
        bpm,
        miss_rate,
    })
}

fn main() -> Result<()> {
    // Initialize logger - set RUST_LOG=debug for verbose output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = parse_args()?;
    log::info!("onbeat-player starting up");

    let config_path = args.config_path.clone().unwrap_or_else(default_config_path);
    let mut config: Config = load_config(&config_path);
    if let Some(seed) = args.seed {
        config.gameplay.seed = seed;
    }
    if let Some(bpm) = args.bpm {
        config.gameplay.tempo = Some(bpm);
    }

    let track: TrackAudio = match &args.source {
        TrackSource::Wav(path) => audio::load_wav(path)?,
        TrackSource::Synth { bars } => {
            let bpm = args.bpm.unwrap_or(DEFAULT_SYNTH_BPM);
            audio::synthesize_metronome(bpm, *bars, SYNTH_SAMPLE_RATE, config.gameplay.seed)
        }
    };
    println!("Track: {:.1}s @ {} Hz", track.duration_secs(), track.sample_rate);

    let mut loader = BeatmapLoader::spawn(BeatmapRequest {
        samples: track.samples,
        sample_rate: track.sample_rate,
        config: config.clone(),
    })
    .context("Failed to start beatmap generation")?;

    let mut shown = LoadStage::Queued;
    let beatmap = loop {
        if let Some(beatmap) = loader.try_recv().context("Beatmap generation failed")? {
            break beatmap;
        }
        let stage = loader.stage();
        if stage != shown {
            println!("Loading: {}", stage.label());
            shown = stage;
        }
        thread::sleep(POLL_INTERVAL);
    };

    println!(
        "Beatmap: {} patterns from {} onsets at {:.1} BPM{}",
        beatmap.patterns.len(),
        beatmap.analysis.events.len(),
        beatmap.tempo(),
        if beatmap.analysis.tempo_estimated { " (estimated)" } else { "" }
    );

    let report = session::run_session(&beatmap, &config, args.miss_rate, config.gameplay.seed);
    let board = &report.scoreboard;
    println!();
    println!("Score:      {}", board.total);
    println!("Hits:       {} / {}", board.hits, report.patterns);
    println!("Misses:     {}", board.misses);
    println!("Max combo:  {}", board.max_combo);
    println!("Accuracy:   {:.1}%", board.accuracy() * 100.0);
    println!(
        "Sync:       {} frames, {} speed-ups, {} slow-downs, {} resyncs",
        report.frames, report.speedups, report.slowdowns, report.resyncs
    );

    Ok(())
}
