//! # Video Module
//!
//! External video tooling around the timeline: slide rasterization, overlay
//! probing and final encoding.

pub mod encoder;
pub mod probe;
pub mod rasterizer;
pub mod types;

pub use encoder::{EncodedVideo, TimelineEncoder};
pub use probe::OverlayProbe;
pub use rasterizer::Rasterizer;
pub use types::{ImageHandle, OverlayMedia};
