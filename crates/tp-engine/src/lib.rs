//! Playback engine for the trackplay tracker.
//!
//! Walks a [`tp_ir::Module`] row by row, runs the per-tick effect
//! table and mixes the channel voices into stereo frames. Transport
//! commands and read accessors live on [`Engine`]; observers subscribe
//! to playback [`Notification`]s through its [`EventBus`].

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod channel;
pub mod effects;
mod events;
mod frame;
pub mod frequency;
mod mixer;
pub mod sequencer;
mod state;
mod transport;
mod trigger;
mod voice;

pub use channel::{ChannelVoice, PAN_CENTER, PAN_SURROUND};
pub use events::{EventBus, Notification, Observer, ObserverId, Subscription};
pub use frame::Frame;
pub use mixer::Engine;
pub use sequencer::{RowEnd, Sequencer};
pub use state::{EngineConfig, EngineState, Globals, Timing, DEFAULT_MASTER_VOLUME};
pub use transport::Command;
pub use trigger::{trigger_row, TriggerOutcome};
pub use voice::{advance_cursor, render_voice};
