//! Engine configuration and mutable playback state.

use alloc::vec::Vec;

use crate::channel::ChannelVoice;
use crate::frequency::samples_per_tick;
use crate::sequencer::Sequencer;

/// Master volume applied after a playback reset.
pub const DEFAULT_MASTER_VOLUME: f32 = 0.9;

/// Engine construction parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EngineConfig {
    /// Output sample rate in Hz, fixed for the engine's life
    pub sample_rate: u32,
    /// Master volume restored by every playback reset (0-1)
    pub master_volume: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            master_volume: DEFAULT_MASTER_VOLUME,
        }
    }
}

/// Tempo, speed and the frame counts derived from them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Timing {
    pub sample_rate: u32,
    pub bpm: u16,
    pub ticks_per_row: u32,
    pub samples_per_tick: u32,
    /// Divisor converting a frequency into a per-frame cursor step
    pub step_scale: f64,
}

impl Timing {
    pub fn new(sample_rate: u32) -> Self {
        let sample_rate = sample_rate.max(1);
        let mut timing = Self {
            sample_rate,
            bpm: 125,
            ticks_per_row: 6,
            samples_per_tick: 0,
            step_scale: sample_rate as f64,
        };
        timing.set_bpm(125);
        timing
    }

    /// Change the tempo. Zero is ignored.
    pub fn set_bpm(&mut self, bpm: u16) {
        if bpm == 0 {
            return;
        }
        self.bpm = bpm;
        self.samples_per_tick = samples_per_tick(self.sample_rate, bpm);
    }

    /// Change ticks per row. Zero is ignored.
    pub fn set_speed(&mut self, ticks_per_row: u32) {
        if ticks_per_row > 0 {
            self.ticks_per_row = ticks_per_row;
        }
    }
}

/// State shared by every channel: position, timing and the master mix.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Globals {
    pub seq: Sequencer,
    pub timing: Timing,
    /// Master volume (0-1)
    pub master_volume: f32,
    /// Last nonzero master-volume slide parameter
    pub master_volume_slide: u8,
    pub playing: bool,
    /// Frames rendered in the current tick
    pub sample_count: u32,
}

impl Globals {
    pub fn new(sample_rate: u32, master_volume: f32) -> Self {
        Self {
            seq: Sequencer::default(),
            timing: Timing::new(sample_rate),
            master_volume,
            master_volume_slide: 0,
            playing: false,
            sample_count: 0,
        }
    }
}

/// Everything the engine mutates during playback.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineState {
    /// One voice per module channel
    pub channels: Vec<ChannelVoice>,
    pub globals: Globals,
}

impl EngineState {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            channels: Vec::new(),
            globals: Globals::new(config.sample_rate, config.master_volume),
        }
    }
}
