//! Pattern and cell types for tracker sequences.

use alloc::vec::Vec;
use core::fmt;

use crate::effects::{Effect, VolumeCommand};

/// Highest pitched note value (B-7).
pub const MAX_NOTE: u8 = 96;
/// Raw note value meaning "release".
pub const NOTE_RELEASE: u8 = 97;

const NOTE_NAMES: [&str; 12] = [
    "C-", "C#", "D-", "D#", "E-", "F-", "F#", "G-", "G#", "A-", "A#", "B-",
];

/// A note value in a pattern cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Note {
    /// No note
    #[default]
    None,
    /// Pitched note (1-96, where 1 = C-0 and 49 = C-4)
    On(u8),
    /// Note release (key off)
    Off,
}

impl Note {
    /// Decode a raw note value: 0 = none, 1-96 = pitched, 97 = release.
    /// Anything else reads as no note.
    pub const fn from_raw(raw: u8) -> Self {
        match raw {
            1..=MAX_NOTE => Note::On(raw),
            NOTE_RELEASE => Note::Off,
            _ => Note::None,
        }
    }

    /// Raw note value.
    pub const fn raw(self) -> u8 {
        match self {
            Note::None => 0,
            Note::On(n) => n,
            Note::Off => NOTE_RELEASE,
        }
    }

    /// Create a note from octave (0-7) and semitone (0-11).
    pub const fn from_octave_semitone(octave: u8, semitone: u8) -> Self {
        Note::On(octave * 12 + semitone + 1)
    }

    /// Get the octave (0-7) if this is a pitched note.
    pub const fn octave(self) -> Option<u8> {
        match self {
            Note::On(n) if n > 0 => Some((n - 1) / 12),
            _ => None,
        }
    }

    /// Get the semitone (0-11) if this is a pitched note.
    pub const fn semitone(self) -> Option<u8> {
        match self {
            Note::On(n) if n > 0 => Some((n - 1) % 12),
            _ => None,
        }
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.octave(), self.semitone()) {
            (Some(octave), Some(semitone)) => {
                write!(f, "{}{}", NOTE_NAMES[semitone as usize], octave)
            }
            _ if *self == Note::Off => f.write_str("==="),
            _ => f.write_str("..."),
        }
    }
}

/// A single cell in a pattern.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cell {
    /// Note value
    pub note: Note,
    /// Instrument number (0 = none, 1-255 = instrument index + 1)
    pub instrument: u8,
    /// Raw volume column (0-64 = set volume, above 64 = volume command)
    pub volume: Option<u8>,
    /// Effect column command
    pub effect: Effect,
    /// Effect parameter
    pub param: u8,
}

impl Cell {
    /// Create an empty cell.
    pub const fn empty() -> Self {
        Self {
            note: Note::None,
            instrument: 0,
            volume: None,
            effect: Effect::None,
            param: 0,
        }
    }

    /// Returns true if the cell is completely empty.
    pub fn is_empty(&self) -> bool {
        self.note == Note::None
            && self.instrument == 0
            && self.volume.is_none()
            && self.effect == Effect::None
    }

    /// Decoded volume column.
    pub fn volume_command(&self) -> VolumeCommand {
        self.volume.map_or(VolumeCommand::None, VolumeCommand::decode)
    }
}

/// Tracker-style text, e.g. `C-5 01 40 A0F`.
impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.note)?;
        if self.instrument == 0 {
            f.write_str(".. ")?;
        } else {
            write!(f, "{:02X} ", self.instrument)?;
        }
        match self.volume {
            Some(v) => write!(f, "{:02X} ", v)?,
            None => f.write_str(".. ")?,
        }
        match self.effect.column(self.param) {
            ('.', _) => f.write_str("..."),
            (cmd, param) => write!(f, "{}{:02X}", cmd, param),
        }
    }
}

/// A pattern containing rows of cells across channels.
#[derive(Clone, Debug)]
pub struct Pattern {
    /// Number of rows (typically 64, can be 1-256)
    pub rows: u16,
    /// Number of channels
    pub channels: u8,
    /// Pattern data, stored row-major: data[row * channels + channel]
    pub data: Vec<Cell>,
}

impl Pattern {
    /// Create a new pattern with empty cells.
    pub fn new(rows: u16, channels: u8) -> Self {
        Self {
            rows,
            channels,
            data: alloc::vec![Cell::empty(); rows as usize * channels as usize],
        }
    }

    /// Get a reference to a cell.
    pub fn cell(&self, row: u16, channel: u8) -> &Cell {
        debug_assert!(row < self.rows);
        debug_assert!(channel < self.channels);
        &self.data[row as usize * self.channels as usize + channel as usize]
    }

    /// Get a mutable reference to a cell.
    pub fn cell_mut(&mut self, row: u16, channel: u8) -> &mut Cell {
        debug_assert!(row < self.rows);
        debug_assert!(channel < self.channels);
        &mut self.data[row as usize * self.channels as usize + channel as usize]
    }

    /// Get a cell, or `None` when out of range or the data is short.
    pub fn get(&self, row: usize, channel: usize) -> Option<&Cell> {
        if row >= self.rows as usize || channel >= self.channels as usize {
            return None;
        }
        self.data.get(row * self.channels as usize + channel)
    }

    /// Iterate over all cells in a row.
    pub fn row(&self, row: u16) -> &[Cell] {
        let start = row as usize * self.channels as usize;
        &self.data[start..start + self.channels as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn note_octave_semitone() {
        let c4 = Note::from_octave_semitone(4, 0);
        assert_eq!(c4, Note::On(49));
        assert_eq!(c4.octave(), Some(4));
        assert_eq!(c4.semitone(), Some(0));

        let a4 = Note::from_octave_semitone(4, 9);
        assert_eq!(a4, Note::On(58));
    }

    #[test]
    fn raw_note_values() {
        assert_eq!(Note::from_raw(0), Note::None);
        assert_eq!(Note::from_raw(1), Note::On(1));
        assert_eq!(Note::from_raw(96), Note::On(96));
        assert_eq!(Note::from_raw(97), Note::Off);
        assert_eq!(Note::from_raw(120), Note::None);
        assert_eq!(Note::Off.raw(), 97);
    }

    #[test]
    fn cell_text() {
        let cell = Cell {
            note: Note::from_octave_semitone(5, 0),
            instrument: 1,
            volume: Some(0x40),
            effect: Effect::VolumeSlide,
            param: 0x0F,
        };
        assert_eq!(cell.to_string(), "C-5 01 40 A0F");
        assert_eq!(Cell::empty().to_string(), "... .. .. ...");

        let off = Cell { note: Note::Off, ..Cell::empty() };
        assert_eq!(off.to_string(), "=== .. .. ...");
    }

    #[test]
    fn pattern_cell_access() {
        let mut pattern = Pattern::new(64, 4);
        pattern.cell_mut(10, 2).note = Note::On(60);

        assert_eq!(pattern.cell(10, 2).note, Note::On(60));
        assert_eq!(pattern.cell(10, 1).note, Note::None);
        assert!(pattern.get(64, 0).is_none());
        assert!(pattern.get(0, 4).is_none());
    }

    #[test]
    fn short_pattern_data_reads_as_missing() {
        let mut pattern = Pattern::new(4, 2);
        pattern.data.truncate(3);
        assert!(pattern.get(1, 0).is_none());
        assert!(pattern.get(0, 1).is_some());
    }
}
