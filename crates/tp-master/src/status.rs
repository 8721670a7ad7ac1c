//! Playback position shared between the audio thread and the controller.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

use tp_engine::Engine;

const NO_PATTERN: u32 = u32::MAX;

/// Position and timing published by the audio thread after every block.
#[derive(Debug)]
pub struct PlaybackStatus {
    order: AtomicUsize,
    row: AtomicU32,
    pattern: AtomicU32,
    bpm: AtomicU32,
    speed: AtomicU32,
    playing: AtomicBool,
}

/// A copy of [`PlaybackStatus`] at one point in time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlaybackSnapshot {
    pub order: usize,
    pub row: u16,
    pub pattern: Option<u8>,
    pub bpm: u16,
    pub speed: u32,
    pub playing: bool,
}

impl PlaybackStatus {
    pub fn new() -> Self {
        Self {
            order: AtomicUsize::new(0),
            row: AtomicU32::new(0),
            pattern: AtomicU32::new(NO_PATTERN),
            bpm: AtomicU32::new(0),
            speed: AtomicU32::new(0),
            playing: AtomicBool::new(false),
        }
    }

    /// Store the engine's current position. Lock-free.
    pub fn publish(&self, engine: &Engine) {
        self.order.store(engine.order(), Ordering::Relaxed);
        self.row.store(engine.row() as u32, Ordering::Relaxed);
        self.pattern.store(
            engine.pattern_index().map_or(NO_PATTERN, u32::from),
            Ordering::Relaxed,
        );
        self.bpm.store(engine.bpm() as u32, Ordering::Relaxed);
        self.speed.store(engine.ticks_per_row(), Ordering::Relaxed);
        self.playing.store(engine.is_playing(), Ordering::Release);
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        let playing = self.playing.load(Ordering::Acquire);
        let pattern = self.pattern.load(Ordering::Relaxed);
        PlaybackSnapshot {
            order: self.order.load(Ordering::Relaxed),
            row: self.row.load(Ordering::Relaxed) as u16,
            pattern: (pattern != NO_PATTERN).then_some(pattern as u8),
            bpm: self.bpm.load(Ordering::Relaxed) as u16,
            speed: self.speed.load(Ordering::Relaxed),
            playing,
        }
    }
}

impl Default for PlaybackStatus {
    fn default() -> Self {
        Self::new()
    }
}
