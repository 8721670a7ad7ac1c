//! ProTracker MOD format parser.

use tp_ir::{
    ChannelSettings, Cell, Effect, Instrument, LoopType, Module, Note, OrderEntry, PanningMode,
    Pattern, Sample, SampleData, SampleKey,
};

use crate::FormatError;

const HEADER_LEN: usize = 1084;
const NUM_SAMPLES: usize = 31;
const SAMPLE_HEADER_LEN: usize = 30;
const ROWS: u16 = 64;

/// Channel panning for MOD files, L R R L repeating.
const STEREO_SEPARATION: i8 = 32;

/// Amiga periods for octaves 1-3. Period 428 is note 49 (C-4).
const PERIODS: [u16; 36] = [
    856, 808, 762, 720, 678, 640, 604, 570, 538, 508, 480, 453, // Octave 1
    428, 404, 381, 360, 339, 320, 302, 285, 269, 254, 240, 226, // Octave 2
    214, 202, 190, 180, 170, 160, 151, 143, 135, 127, 120, 113, // Octave 3
];
const FIRST_NOTE: u8 = 37;

/// Load a MOD file from bytes.
pub fn load_mod(data: &[u8]) -> Result<Module, FormatError> {
    if data.len() < HEADER_LEN {
        return Err(FormatError::TooShort { len: data.len() });
    }

    // Detect format by checking signature at offset 1080
    let sig = &data[1080..1084];
    let num_channels: u8 = match sig {
        b"M.K." | b"M!K!" | b"FLT4" | b"4CHN" => 4,
        b"6CHN" => 6,
        b"8CHN" | b"OCTA" | b"FLT8" => 8,
        _ => {
            tracing::warn!(signature = ?sig, "unknown MOD signature, assuming 4 channels");
            4
        }
    };

    let title = parse_string(&data[0..20]);
    let mut module = Module::new(&title);
    module.panning_mode = PanningMode::Fixed;
    module.channels = (0..num_channels)
        .map(|ch| ChannelSettings {
            initial_pan: if matches!(ch % 4, 0 | 3) {
                -STEREO_SEPARATION
            } else {
                STEREO_SEPARATION
            },
            ..ChannelSettings::default()
        })
        .collect();

    let headers: Vec<SampleHeader> = (0..NUM_SAMPLES)
        .map(|i| {
            let offset = 20 + i * SAMPLE_HEADER_LEN;
            SampleHeader::parse(&data[offset..offset + SAMPLE_HEADER_LEN])
        })
        .collect();

    // Song length and restart position
    let song_length = (data[950] as usize).clamp(1, 128);
    let restart = data[951] as usize;
    module.restart_position = if restart < song_length { restart } else { 0 };

    let order_table = &data[952..952 + 128];
    module.orders = order_table[..song_length]
        .iter()
        .map(|&p| OrderEntry::Pattern(p))
        .collect();

    // Every entry of the table counts, even past the song length
    let num_patterns = order_table.iter().max().copied().unwrap_or(0) as usize + 1;
    let pattern_size = ROWS as usize * num_channels as usize * 4;
    for index in 0..num_patterns {
        let offset = HEADER_LEN + index * pattern_size;
        let bytes = data
            .get(offset..offset + pattern_size)
            .ok_or(FormatError::TruncatedPattern { index })?;
        module.patterns.push(parse_pattern(bytes, num_channels));
    }

    let mut sample_offset = HEADER_LEN + num_patterns * pattern_size;
    for (i, header) in headers.iter().enumerate() {
        let available = data.len().saturating_sub(sample_offset);
        let len = header.length.min(available);
        if len < header.length {
            tracing::warn!(sample = i + 1, expected = header.length, found = len, "sample data truncated");
        }
        let frames = &data[sample_offset..sample_offset + len];
        sample_offset += len;

        let key = module.samples.insert(header.to_sample(frames));
        module.instruments.push(instrument_for(&header.name, key));
    }

    module.validate()?;
    tracing::debug!(
        title = module.name.as_str(),
        channels = num_channels,
        orders = song_length,
        patterns = num_patterns,
        "parsed MOD"
    );
    Ok(module)
}

/// Parse a null-terminated string from bytes.
fn parse_string(data: &[u8]) -> String {
    let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
    String::from_utf8_lossy(&data[..end]).trim().to_string()
}

/// A sample header (30 bytes); lengths in bytes.
struct SampleHeader {
    name: String,
    length: usize,
    fine_tune: i8,
    volume: u8,
    loop_start: usize,
    loop_length: usize,
}

impl SampleHeader {
    fn parse(data: &[u8]) -> Self {
        let word = |at: usize| u16::from_be_bytes([data[at], data[at + 1]]) as usize * 2;
        let nibble = (data[24] & 0x0F) as i8;
        Self {
            name: parse_string(&data[0..22]),
            length: word(22),
            fine_tune: if nibble > 7 { nibble - 16 } else { nibble },
            volume: data[25].min(64),
            loop_start: word(26),
            loop_length: word(28),
        }
    }

    fn to_sample(&self, frames: &[u8]) -> Sample {
        let mut sample = Sample::new(&self.name);
        sample.data = SampleData::Mono8(frames.iter().map(|&b| b as i8).collect());
        sample.volume = self.volume;
        sample.fine_tune = self.fine_tune * 16;

        // A one-word loop is the "no loop" marker
        if self.loop_length > 2 && self.loop_start < frames.len() {
            sample.loop_start = self.loop_start as u32;
            sample.loop_length = self.loop_length.min(frames.len() - self.loop_start) as u32;
            sample.loop_type = LoopType::Forward;
        }
        sample
    }
}

fn instrument_for(name: &str, key: SampleKey) -> Instrument {
    let mut inst = Instrument::new(name);
    inst.set_single_sample(key);
    inst
}

/// Parse a pattern.
fn parse_pattern(data: &[u8], num_channels: u8) -> Pattern {
    let mut pattern = Pattern::new(ROWS, num_channels);
    for (i, bytes) in data.chunks_exact(4).enumerate() {
        let row = (i / num_channels as usize) as u16;
        let ch = (i % num_channels as usize) as u8;
        *pattern.cell_mut(row, ch) = parse_cell([bytes[0], bytes[1], bytes[2], bytes[3]]);
    }
    pattern
}

/// Parse a single pattern cell.
fn parse_cell(data: [u8; 4]) -> Cell {
    // Byte 0: Upper 4 bits of sample number, upper 4 bits of period
    // Byte 1: Lower 8 bits of period
    // Byte 2: Lower 4 bits of sample number, effect command
    // Byte 3: Effect parameter
    let period = u16::from_be_bytes([data[0] & 0x0F, data[1]]);
    let instrument = (data[0] & 0xF0) | (data[2] >> 4);
    let (effect, param) = parse_effect(data[2] & 0x0F, data[3]);

    Cell {
        note: period_to_note(period),
        instrument,
        volume: None,
        effect,
        param,
    }
}

/// Convert an Amiga period to the nearest note.
fn period_to_note(period: u16) -> Note {
    if period == 0 {
        return Note::None;
    }
    let index = PERIODS
        .iter()
        .enumerate()
        .min_by_key(|&(_, &p)| (period as i32 - p as i32).unsigned_abs())
        .map_or(0, |(i, _)| i);
    Note::On(FIRST_NOTE + index as u8)
}

/// Parse a MOD effect command into an effect and its stored parameter.
fn parse_effect(cmd: u8, param: u8) -> (Effect, u8) {
    let effect = match cmd {
        0x0 if param != 0 => Effect::Arpeggio,
        0x0 => return (Effect::None, 0),
        0x1 => Effect::PortaUp,
        0x2 => Effect::PortaDown,
        0x3 => Effect::TonePorta,
        0x4 => Effect::Vibrato,
        0x5 => Effect::TonePortaVolSlide,
        0x6 => Effect::VibratoVolSlide,
        0x7 => Effect::Tremolo,
        0x8 => Effect::SetPan,
        0x9 => Effect::SampleOffset,
        0xA => Effect::VolumeSlide,
        0xB => Effect::PositionJump,
        0xC => Effect::SetVolume,
        // Break row is stored as BCD
        0xD => return (Effect::PatternBreak, (param >> 4) * 10 + (param & 0x0F)),
        0xE => return parse_extended_effect(param),
        0xF if param < 32 => Effect::SetSpeed,
        0xF => Effect::SetTempo,
        _ => Effect::None,
    };
    (effect, param)
}

/// Parse extended effect (Exy). The stored parameter is `y`.
fn parse_extended_effect(param: u8) -> (Effect, u8) {
    let val = param & 0x0F;
    let effect = match param >> 4 {
        0x1 => Effect::FinePortaUp,
        0x2 => Effect::FinePortaDown,
        0x4 => Effect::SetVibratoWaveform,
        0x6 => Effect::PatternLoop,
        0x7 => Effect::SetTremoloWaveform,
        0x8 => Effect::SetPanPosition,
        0x9 => Effect::RetriggerNote,
        0xA => Effect::FineVolumeSlideUp,
        0xB => Effect::FineVolumeSlideDown,
        0xC => Effect::NoteCut,
        0xD => Effect::NoteDelay,
        0xE => Effect::PatternDelay,
        _ => return (Effect::None, 0),
    };
    (effect, val)
}
