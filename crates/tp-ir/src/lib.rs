//! Module data model for the trackplay tracker engine.
//!
//! Format loaders emit a [`Module`]; the playback engine consumes it
//! read-only. Samples live in a slot map and are referenced by
//! [`SampleKey`], so voices never own sample data.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod effects;
mod instrument;
mod module;
mod pattern;
mod sample;

pub use effects::{Effect, VolumeCommand};
pub use instrument::{Envelope, EnvelopePoint, Instrument, NOTE_MAP_LEN};
pub use module::{ChannelSettings, Module, ModuleError, OrderEntry, PanningMode, ORDER_END, ORDER_SKIP};
pub use pattern::{Cell, Note, Pattern, MAX_NOTE, NOTE_RELEASE};
pub use sample::{LoopType, Sample, SampleData, SampleKey};
