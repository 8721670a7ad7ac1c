//! Top-level module (song) structure.

use alloc::vec::Vec;
use arrayvec::ArrayString;
use slotmap::SlotMap;

use crate::instrument::Instrument;
use crate::pattern::Pattern;
use crate::sample::{Sample, SampleKey};

/// Raw order value for a skip marker.
pub const ORDER_SKIP: u8 = 0xFE;
/// Raw order value for an end-of-song marker.
pub const ORDER_END: u8 = 0xFF;

/// A complete, decoded module.
///
/// Read-only to the engine. Loaders are expected to emit valid
/// indices, but the engine treats anything missing as silence.
#[derive(Clone, Debug)]
pub struct Module {
    /// Song title
    pub name: ArrayString<32>,
    /// Per-channel settings (one entry per channel)
    pub channels: Vec<ChannelSettings>,
    /// Where voice panning comes from on a trigger
    pub panning_mode: PanningMode,
    /// Initial tempo in BPM (32-255 typical)
    pub initial_tempo: u8,
    /// Initial speed (ticks per row, 1-31)
    pub initial_speed: u8,
    /// Order list
    pub orders: Vec<OrderEntry>,
    /// Order to continue from after the song ends
    pub restart_position: usize,
    /// Patterns, indexed by order entries
    pub patterns: Vec<Pattern>,
    /// Instruments (cell instrument `n` is `instruments[n - 1]`)
    pub instruments: Vec<Instrument>,
    /// Sample table
    pub samples: SlotMap<SampleKey, Sample>,
}

impl Default for Module {
    fn default() -> Self {
        Self {
            name: ArrayString::new(),
            channels: Vec::new(),
            panning_mode: PanningMode::PerSample,
            initial_tempo: 125,
            initial_speed: 6,
            orders: Vec::new(),
            restart_position: 0,
            patterns: Vec::new(),
            instruments: Vec::new(),
            samples: SlotMap::with_key(),
        }
    }
}

impl Module {
    /// Create a new empty module.
    pub fn new(name: &str) -> Self {
        let mut module = Self::default();
        let _ = module.name.try_push_str(name);
        module
    }

    /// Create a module with a given number of centered channels.
    pub fn with_channels(name: &str, num_channels: u8) -> Self {
        let mut module = Self::new(name);
        module.channels = (0..num_channels).map(|_| ChannelSettings::default()).collect();
        module
    }

    /// Number of channels.
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Number of entries in the order list.
    pub fn song_length(&self) -> usize {
        self.orders.len()
    }

    /// Pattern played at `order`, or `None` for markers and missing patterns.
    pub fn pattern_at(&self, order: usize) -> Option<&Pattern> {
        match self.orders.get(order)? {
            OrderEntry::Pattern(p) => self.patterns.get(*p as usize),
            OrderEntry::Skip | OrderEntry::End => None,
        }
    }

    /// Pattern index at `order`, if the entry references a pattern.
    pub fn pattern_index(&self, order: usize) -> Option<u8> {
        match self.orders.get(order)? {
            OrderEntry::Pattern(p) => Some(*p),
            _ => None,
        }
    }

    /// First order at or after `from` that plays a pattern, stepping over
    /// skip markers. Stops at an end marker or the end of the list.
    pub fn next_playable_order(&self, from: usize) -> Option<usize> {
        for (i, entry) in self.orders.iter().enumerate().skip(from) {
            match entry {
                OrderEntry::Pattern(_) => return Some(i),
                OrderEntry::Skip => continue,
                OrderEntry::End => return None,
            }
        }
        None
    }

    /// Last order before `from` that plays a pattern, stepping over skip markers.
    pub fn prev_playable_order(&self, from: usize) -> Option<usize> {
        let end = from.min(self.orders.len());
        self.orders[..end]
            .iter()
            .rposition(|e| matches!(e, OrderEntry::Pattern(_)))
    }

    /// Instrument for a 1-based cell instrument number.
    pub fn instrument(&self, number: u8) -> Option<&Instrument> {
        let index = (number as usize).checked_sub(1)?;
        self.instruments.get(index)
    }

    /// Check the structural invariants playback relies on.
    pub fn validate(&self) -> Result<(), ModuleError> {
        if self.channels.is_empty() {
            return Err(ModuleError::NoChannels);
        }
        if self.orders.is_empty() {
            return Err(ModuleError::EmptyOrderList);
        }
        if self.restart_position >= self.orders.len() {
            return Err(ModuleError::RestartOutOfRange {
                restart: self.restart_position,
                song_length: self.orders.len(),
            });
        }
        if self.next_playable_order(0).is_none() {
            return Err(ModuleError::NoPlayableOrder);
        }
        Ok(())
    }
}

/// Structural problems that make a module unplayable.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ModuleError {
    #[error("module has no channels")]
    NoChannels,
    #[error("module has an empty order list")]
    EmptyOrderList,
    #[error("restart position {restart} is outside the order list (length {song_length})")]
    RestartOutOfRange { restart: usize, song_length: usize },
    #[error("order list has no playable pattern")]
    NoPlayableOrder,
}

/// An entry in the order list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderEntry {
    /// Play pattern with this index
    Pattern(u8),
    /// Skip marker (+++), continue to next
    Skip,
    /// End of song marker (---)
    End,
}

impl OrderEntry {
    /// Decode a raw order byte (0xFE = skip, 0xFF = end).
    pub const fn from_raw(raw: u8) -> Self {
        match raw {
            ORDER_SKIP => OrderEntry::Skip,
            ORDER_END => OrderEntry::End,
            p => OrderEntry::Pattern(p),
        }
    }
}

/// Where a voice takes its panning from when a sample is triggered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PanningMode {
    /// Channel panning is fixed; samples never move it
    Fixed,
    /// Each triggered sample applies its authored panning
    #[default]
    PerSample,
}

/// Per-channel settings.
#[derive(Clone, Copy, Debug)]
pub struct ChannelSettings {
    /// Initial panning (-64 to +64, 0 = center)
    pub initial_pan: i8,
    /// Initial volume (0-64)
    pub initial_vol: u8,
    /// Is the channel muted?
    pub muted: bool,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            initial_pan: 0,
            initial_vol: 64,
            muted: false,
        }
    }
}

impl ChannelSettings {
    /// Initial panning mapped to `[0, 1]` (0.5 = center).
    pub fn pan_position(&self) -> f32 {
        (self.initial_pan.clamp(-64, 64) as f32 + 64.0) / 128.0
    }
}
