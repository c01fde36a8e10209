//! # Slide Narrator
//!
//! Turn an annotated slide deck into a narrated video.
//!
//! Each page of the deck may carry directives: text to speak, how long the
//! slide stays up, and video clips to play on top of it. The library resolves
//! those directives into concrete slides, synthesizes the narration, and lays
//! everything out on a timeline that is then encoded with ffmpeg.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use slide_narrator::{config::Config, speech::build_synthesizer, NarrationEngine};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let config = Config::default();
//! let synthesizer = build_synthesizer(&config.speech, &config.work_dir)?;
//!
//! let engine = NarrationEngine::new(config, synthesizer);
//! engine.compose("talk.typ", "talk.mp4").await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`annotation`] - Deck loading and slide normalization
//! - [`composition`] - Timeline compositor and the pipeline engine
//! - [`speech`] - Narration synthesis backends
//! - [`video`] - Rasterization, overlay probing and encoding
//! - [`config`] - Configuration management
//!
//! ## Custom speech backends
//!
//! Any type implementing [`SpeechSynthesizer`](speech::SpeechSynthesizer) can
//! be handed to the engine:
//!
//! ```rust,no_run
//! use slide_narrator::speech::{SpeechClip, SpeechSynthesizer};
//! use slide_narrator::Result;
//!
//! struct Mute;
//!
//! impl SpeechSynthesizer for Mute {
//!     fn name(&self) -> &str {
//!         "mute"
//!     }
//!
//!     fn synthesize(&self, _index: usize, _text: &str) -> Result<SpeechClip> {
//!         Ok(SpeechClip::silent())
//!     }
//! }
//! ```

pub mod annotation;
pub mod composition;
pub mod config;
pub mod error;
pub mod speech;
pub mod video;

// Re-export commonly used types for convenience
pub use crate::{
    composition::{NarrationEngine, Timeline},
    config::Config,
    error::{NarratorError, Result},
    speech::SpeechSynthesizer,
};
