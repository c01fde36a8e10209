//! # Annotation Module
//!
//! Reads the per-page annotation records of a slide deck and resolves them into
//! physical slides with concrete durations, narration and overlay cues.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use slide_narrator::annotation::{DeckLoader, Normalizer};
//! use slide_narrator::annotation::types::Defaults;
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let deck = DeckLoader::load("talk.json").await?;
//! let defaults = deck.defaults_or(&Defaults::default());
//!
//! let normalized = Normalizer::new(defaults).normalize(&deck.pages)?;
//! println!("{} physical slides", normalized.physical.len());
//! # Ok(())
//! # }
//! ```

pub mod loader;
pub mod normalizer;
pub mod types;

pub use loader::DeckLoader;
pub use normalizer::{normalize, NormalizedDeck, Normalizer};
pub use types::{
    Deck, Defaults, Dimension, Directive, LogicalSlide, PageRecord, PhysicalSlide, SpeechCue,
    TransitionKind, VideoOverlayCue,
};
