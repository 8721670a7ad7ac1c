//! Instrument and envelope types.

use alloc::vec::Vec;
use arrayvec::ArrayString;

use crate::sample::SampleKey;

/// Number of entries in an instrument's note map (note 0 plus notes 1-96).
pub const NOTE_MAP_LEN: usize = 97;

/// An instrument definition.
#[derive(Clone, Debug)]
pub struct Instrument {
    /// Instrument name
    pub name: ArrayString<26>,
    /// Sample mapping: note (1-96) -> sample
    pub sample_map: [Option<SampleKey>; NOTE_MAP_LEN],
    /// Volume envelope
    pub volume_envelope: Option<Envelope>,
    /// Panning envelope
    pub panning_envelope: Option<Envelope>,
}

impl Default for Instrument {
    fn default() -> Self {
        Self {
            name: ArrayString::new(),
            sample_map: [None; NOTE_MAP_LEN],
            volume_envelope: None,
            panning_envelope: None,
        }
    }
}

impl Instrument {
    /// Create a new instrument with default settings.
    pub fn new(name: &str) -> Self {
        let mut inst = Self::default();
        let _ = inst.name.try_push_str(name);
        inst
    }

    /// Set all notes to map to a single sample.
    pub fn set_single_sample(&mut self, sample: SampleKey) {
        self.sample_map.fill(Some(sample));
    }

    /// Sample bound to `note`, if any.
    pub fn sample_for(&self, note: u8) -> Option<SampleKey> {
        self.sample_map.get(note as usize).copied().flatten()
    }
}

/// A volume or panning envelope.
///
/// Point values run from 0 to 64. Volume envelopes read 64 as full
/// volume, panning envelopes read 32 as center.
#[derive(Clone, Debug, Default)]
pub struct Envelope {
    /// Envelope points, ordered by tick
    pub points: Vec<EnvelopePoint>,
    /// Sustain point index (None = no sustain)
    pub sustain_point: Option<u8>,
    /// Loop start point index (None = no loop)
    pub loop_start: Option<u8>,
    /// Loop end point index
    pub loop_end: Option<u8>,
    /// Is the envelope enabled?
    pub enabled: bool,
}

impl Envelope {
    /// Create a new, enabled, empty envelope.
    pub fn new() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    /// Add a point to the envelope.
    pub fn add_point(&mut self, tick: u16, value: u8) {
        self.points.push(EnvelopePoint { tick, value });
    }

    fn point(&self, index: Option<u8>) -> Option<&EnvelopePoint> {
        index.and_then(|i| self.points.get(i as usize))
    }

    /// Value at `position` (in ticks) normalized to `[0, 1]`.
    ///
    /// Holds at the sustain point until `released`, wraps positions past
    /// the loop end back into the loop, and holds the last point's value
    /// past the end. Returns `None` for a disabled or empty envelope.
    pub fn value_at(&self, position: f32, released: bool) -> Option<f32> {
        if !self.enabled || self.points.is_empty() {
            return None;
        }

        let mut pos = position.max(0.0);

        if !released {
            if let Some(sustain) = self.point(self.sustain_point) {
                if pos >= sustain.tick as f32 {
                    return Some(sustain.normalized());
                }
            }
        }

        if let (Some(start), Some(end)) = (self.point(self.loop_start), self.point(self.loop_end)) {
            let (start, end) = (start.tick as f32, end.tick as f32);
            if end > start && pos >= end {
                pos = start + (pos - start) % (end - start);
            }
        }

        let mut prev = &self.points[0];
        if pos <= prev.tick as f32 {
            return Some(prev.normalized());
        }
        for point in &self.points[1..] {
            if point.tick as f32 > pos {
                let span = (point.tick - prev.tick) as f32;
                if span <= 0.0 {
                    return Some(point.normalized());
                }
                let t = (pos - prev.tick as f32) / span;
                let a = prev.normalized();
                return Some(a + (point.normalized() - a) * t);
            }
            prev = point;
        }

        Some(prev.normalized())
    }
}

/// A point in an envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EnvelopePoint {
    /// Tick position
    pub tick: u16,
    /// Value (0-64)
    pub value: u8,
}

impl EnvelopePoint {
    fn normalized(&self) -> f32 {
        self.value.min(64) as f32 / 64.0
    }
}
