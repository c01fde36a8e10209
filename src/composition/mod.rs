//! # Composition
//!
//! Lays the normalized slides, their narration and overlay videos out on a
//! single [`Timeline`], and drives the full deck-to-video pipeline through
//! [`NarrationEngine`].

pub mod compositor;
pub mod engine;
pub mod timeline;

// Re-exports for convenience
pub use compositor::{compose, resolve_dimension, Compositor, Playhead};
pub use engine::NarrationEngine;
pub use timeline::{AudioClip, Layer, Position, Size, SlideSpan, Timeline, VisualClip, VisualSource};
