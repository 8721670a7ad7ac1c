//! Audio output backends for trackplay.
//!
//! Sinks pull audio: the device callback asks a [`RenderCallback`] for
//! interleaved stereo `f32` samples whenever it needs more.

mod cpal_backend;
mod traits;

pub use cpal_backend::CpalOutput;
pub use traits::{AudioError, AudioSink, RenderCallback};
