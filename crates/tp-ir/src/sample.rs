//! Sample data types.

use alloc::vec::Vec;
use arrayvec::ArrayString;

slotmap::new_key_type! {
    /// Key for referencing samples in a module's sample table.
    pub struct SampleKey;
}

/// A sample definition.
#[derive(Clone, Debug)]
pub struct Sample {
    /// Sample name
    pub name: ArrayString<26>,
    /// Audio data
    pub data: SampleData,
    /// Loop start position (in sample frames)
    pub loop_start: u32,
    /// Loop length (in sample frames)
    pub loop_length: u32,
    /// Loop type
    pub loop_type: LoopType,
    /// Base volume (0-64)
    pub volume: u8,
    /// Authored panning (-64 to +64, 0 = center)
    pub default_pan: i8,
    /// Base pitch offset in semitones
    pub relative_note: i8,
    /// Fine tune in 1/128 semitone steps
    pub fine_tune: i8,
}

impl Default for Sample {
    fn default() -> Self {
        Self {
            name: ArrayString::new(),
            data: SampleData::Mono8(Vec::new()),
            loop_start: 0,
            loop_length: 0,
            loop_type: LoopType::None,
            volume: 64,
            default_pan: 0,
            relative_note: 0,
            fine_tune: 0,
        }
    }
}

impl Sample {
    /// Create a new empty sample.
    pub fn new(name: &str) -> Self {
        let mut sample = Self::default();
        let _ = sample.name.try_push_str(name);
        sample
    }

    /// Get the length of the sample in frames.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the sample has no data.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns true if the sample has a usable loop inside its data.
    pub fn has_loop(&self) -> bool {
        self.loop_type != LoopType::None
            && self.loop_length > 0
            && (self.loop_start as usize) < self.len()
    }

    /// Loop length clipped to the end of the sample data.
    pub fn effective_loop_length(&self) -> u32 {
        let len = self.len() as u32;
        if self.loop_start >= len {
            return 0;
        }
        self.loop_length.min(len - self.loop_start)
    }

    /// Base volume as a gain in `[0, 1]`.
    pub fn volume_gain(&self) -> f32 {
        self.volume.min(64) as f32 / 64.0
    }

    /// Authored panning mapped to `[0, 1]` (0.5 = center).
    pub fn pan_position(&self) -> f32 {
        (self.default_pan.clamp(-64, 64) as f32 + 64.0) / 128.0
    }
}

/// Sample audio data.
#[derive(Clone, Debug)]
pub enum SampleData {
    /// 8-bit mono samples
    Mono8(Vec<i8>),
    /// 16-bit mono samples
    Mono16(Vec<i16>),
}

impl SampleData {
    /// Get the number of sample frames.
    pub fn len(&self) -> usize {
        match self {
            SampleData::Mono8(v) => v.len(),
            SampleData::Mono16(v) => v.len(),
        }
    }

    /// Returns true if empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get a sample value at position (as i16). Out of range reads as 0.
    pub fn get_mono(&self, pos: usize) -> i16 {
        match self {
            SampleData::Mono8(v) => v.get(pos).copied().unwrap_or(0) as i16 * 256,
            SampleData::Mono16(v) => v.get(pos).copied().unwrap_or(0),
        }
    }

    /// Get a sample value at position, normalized to `[-1, 1)`.
    #[inline]
    pub fn get_f32(&self, pos: usize) -> f32 {
        self.get_mono(pos) as f32 / 32768.0
    }
}

/// Loop type for samples.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoopType {
    /// No loop
    #[default]
    None,
    /// Forward loop
    Forward,
    /// Ping-pong (bidirectional) loop
    PingPong,
}
