//! Onbeat Core - Rhythm game engine library
//!
//! Audio goes in, a playable beatmap comes out:
//!
//! ```text
//! samples ──analysis──> OnsetEvent[] ──beatmap──> Pattern[] ──engine──> RenderFrame
//!                                                                ▲
//!                                            sync (step clock) ──┘
//! ```
//!
//! [`loader::BeatmapLoader`] runs the first two stages off the frame thread.

pub mod analysis;
pub mod beatmap;
pub mod config;
pub mod engine;
pub mod loader;
pub mod pattern;
pub mod sync;
pub mod types;

pub use types::*;
