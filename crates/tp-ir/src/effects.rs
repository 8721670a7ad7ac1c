//! Effect command types for tracker patterns.
//!
//! Effects are stored as a code plus a separate parameter byte in each
//! [`Cell`](crate::Cell). The code is a fieldless enum so the engine can
//! dispatch through a table indexed by `effect as usize`.

/// Volume column command, decoded from the raw volume column byte.
///
/// Values `0..=64` set the channel volume directly. Larger values
/// carry a command in the high nibble and its parameter in the low nibble.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VolumeCommand {
    #[default]
    None,
    /// Set volume (0-64)
    SetVolume(u8),
    VolumeSlideDown(u8),
    VolumeSlideUp(u8),
    FineVolSlideDown(u8),
    FineVolSlideUp(u8),
    VibratoSpeed(u8),
    Vibrato(u8),
    /// Set panning (0-15)
    SetPan(u8),
    PanSlideLeft(u8),
    PanSlideRight(u8),
    TonePorta(u8),
}

impl VolumeCommand {
    /// Decode a raw volume column byte.
    pub const fn decode(raw: u8) -> Self {
        if raw <= 64 {
            return VolumeCommand::SetVolume(raw);
        }
        let x = raw & 0x0F;
        match raw & 0xF0 {
            0x60 => VolumeCommand::VolumeSlideDown(x),
            0x70 => VolumeCommand::VolumeSlideUp(x),
            0x80 => VolumeCommand::FineVolSlideDown(x),
            0x90 => VolumeCommand::FineVolSlideUp(x),
            0xA0 => VolumeCommand::VibratoSpeed(x),
            0xB0 => VolumeCommand::Vibrato(x),
            0xC0 => VolumeCommand::SetPan(x),
            0xD0 => VolumeCommand::PanSlideLeft(x),
            0xE0 => VolumeCommand::PanSlideRight(x),
            0xF0 => VolumeCommand::TonePorta(x),
            _ => VolumeCommand::None,
        }
    }

    /// Returns the variant name as a static string (ignoring parameters).
    pub fn name(&self) -> &'static str {
        match self {
            VolumeCommand::None => "None",
            VolumeCommand::SetVolume(_) => "SetVolume",
            VolumeCommand::VolumeSlideDown(_) => "VolumeSlideDown",
            VolumeCommand::VolumeSlideUp(_) => "VolumeSlideUp",
            VolumeCommand::FineVolSlideDown(_) => "FineVolSlideDown",
            VolumeCommand::FineVolSlideUp(_) => "FineVolSlideUp",
            VolumeCommand::VibratoSpeed(_) => "VibratoSpeed",
            VolumeCommand::Vibrato(_) => "Vibrato",
            VolumeCommand::SetPan(_) => "SetPan",
            VolumeCommand::PanSlideLeft(_) => "PanSlideLeft",
            VolumeCommand::PanSlideRight(_) => "PanSlideRight",
            VolumeCommand::TonePorta(_) => "TonePorta",
        }
    }
}

/// Effect column command code.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Effect {
    #[default]
    None = 0,

    // === Arpeggio & Portamento ===
    /// Arpeggio: cycle between note, note+x, note+y each tick
    Arpeggio,
    /// Slide pitch up by amount per tick
    PortaUp,
    /// Slide pitch down by amount per tick
    PortaDown,
    /// Slide toward target note
    TonePorta,
    /// Vibrato with speed and depth
    Vibrato,
    /// Tone portamento + volume slide
    TonePortaVolSlide,
    /// Vibrato + volume slide
    VibratoVolSlide,

    // === Tremolo & Volume ===
    /// Tremolo (volume oscillation)
    Tremolo,
    /// Set channel panning (0-255)
    SetPan,
    /// Set sample offset (in 256-frame units)
    SampleOffset,
    /// Volume slide up/down per tick
    VolumeSlide,
    /// Jump to order position
    PositionJump,
    /// Set channel volume (0-64)
    SetVolume,
    /// Break to row in next pattern
    PatternBreak,

    // === Extended effects (Exx style) ===
    /// Fine porta up (once per row)
    FinePortaUp,
    /// Fine porta down (once per row)
    FinePortaDown,
    /// Set vibrato waveform (0=sine, 1=ramp, 2=square)
    SetVibratoWaveform,
    /// Pattern loop (0=set start, n=loop n times)
    PatternLoop,
    /// Set tremolo waveform
    SetTremoloWaveform,
    /// Set coarse panning position (0-15)
    SetPanPosition,
    /// Retrigger note every n ticks
    RetriggerNote,
    /// Fine volume slide up (once per row)
    FineVolumeSlideUp,
    /// Fine volume slide down (once per row)
    FineVolumeSlideDown,
    /// Cut note after n ticks
    NoteCut,
    /// Delay note by n ticks
    NoteDelay,
    /// Delay pattern by n rows
    PatternDelay,

    // === Speed & Tempo ===
    /// Set ticks per row (speed)
    SetSpeed,
    /// Set BPM tempo
    SetTempo,

    // === Global ===
    /// Set master volume (0-64)
    SetGlobalVolume,
    /// Master volume slide
    GlobalVolumeSlide,
    /// Tremor (on/off volume)
    Tremor,
    /// Panning slide
    PanSlide,
    /// Surround on/off
    Surround,

    /// Volume column command routed through the effect table
    VolumeColumn,
}

impl Effect {
    /// Number of effect codes.
    pub const COUNT: usize = Effect::VolumeColumn as usize + 1;

    /// Every effect, indexed by its code.
    pub const ALL: [Effect; Effect::COUNT] = [
        Effect::None,
        Effect::Arpeggio,
        Effect::PortaUp,
        Effect::PortaDown,
        Effect::TonePorta,
        Effect::Vibrato,
        Effect::TonePortaVolSlide,
        Effect::VibratoVolSlide,
        Effect::Tremolo,
        Effect::SetPan,
        Effect::SampleOffset,
        Effect::VolumeSlide,
        Effect::PositionJump,
        Effect::SetVolume,
        Effect::PatternBreak,
        Effect::FinePortaUp,
        Effect::FinePortaDown,
        Effect::SetVibratoWaveform,
        Effect::PatternLoop,
        Effect::SetTremoloWaveform,
        Effect::SetPanPosition,
        Effect::RetriggerNote,
        Effect::FineVolumeSlideUp,
        Effect::FineVolumeSlideDown,
        Effect::NoteCut,
        Effect::NoteDelay,
        Effect::PatternDelay,
        Effect::SetSpeed,
        Effect::SetTempo,
        Effect::SetGlobalVolume,
        Effect::GlobalVolumeSlide,
        Effect::Tremor,
        Effect::PanSlide,
        Effect::Surround,
        Effect::VolumeColumn,
    ];

    /// Numeric effect code.
    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Effect for a numeric code.
    pub fn from_code(code: u8) -> Option<Effect> {
        Effect::ALL.get(code as usize).copied()
    }

    /// Returns true for the slide-to-note family, which never retriggers a note.
    pub const fn is_tone_porta(self) -> bool {
        matches!(self, Effect::TonePorta | Effect::TonePortaVolSlide)
    }

    /// Tracker column text: command character and displayed parameter.
    pub const fn column(self, param: u8) -> (char, u8) {
        let low = param & 0x0F;
        match self {
            Effect::None | Effect::VolumeColumn => ('.', 0),
            Effect::Arpeggio => ('0', param),
            Effect::PortaUp => ('1', param),
            Effect::PortaDown => ('2', param),
            Effect::TonePorta => ('3', param),
            Effect::Vibrato => ('4', param),
            Effect::TonePortaVolSlide => ('5', param),
            Effect::VibratoVolSlide => ('6', param),
            Effect::Tremolo => ('7', param),
            Effect::SetPan => ('8', param),
            Effect::SampleOffset => ('9', param),
            Effect::VolumeSlide => ('A', param),
            Effect::PositionJump => ('B', param),
            Effect::SetVolume => ('C', param),
            Effect::PatternBreak => ('D', param),
            Effect::FinePortaUp => ('E', 0x10 | low),
            Effect::FinePortaDown => ('E', 0x20 | low),
            Effect::SetVibratoWaveform => ('E', 0x40 | low),
            Effect::PatternLoop => ('E', 0x60 | low),
            Effect::SetTremoloWaveform => ('E', 0x70 | low),
            Effect::SetPanPosition => ('E', 0x80 | low),
            Effect::RetriggerNote => ('E', 0x90 | low),
            Effect::FineVolumeSlideUp => ('E', 0xA0 | low),
            Effect::FineVolumeSlideDown => ('E', 0xB0 | low),
            Effect::NoteCut => ('E', 0xC0 | low),
            Effect::NoteDelay => ('E', 0xD0 | low),
            Effect::PatternDelay => ('E', 0xE0 | low),
            Effect::SetSpeed | Effect::SetTempo => ('F', param),
            Effect::SetGlobalVolume => ('G', param),
            Effect::GlobalVolumeSlide => ('H', param),
            Effect::PanSlide => ('P', param),
            Effect::Tremor => ('T', param),
            Effect::Surround => ('S', 0x90 | low),
        }
    }

    /// Returns the variant name as a static string.
    pub fn name(&self) -> &'static str {
        match self {
            Effect::None => "None",
            Effect::Arpeggio => "Arpeggio",
            Effect::PortaUp => "PortaUp",
            Effect::PortaDown => "PortaDown",
            Effect::TonePorta => "TonePorta",
            Effect::Vibrato => "Vibrato",
            Effect::TonePortaVolSlide => "TonePortaVolSlide",
            Effect::VibratoVolSlide => "VibratoVolSlide",
            Effect::Tremolo => "Tremolo",
            Effect::SetPan => "SetPan",
            Effect::SampleOffset => "SampleOffset",
            Effect::VolumeSlide => "VolumeSlide",
            Effect::PositionJump => "PositionJump",
            Effect::SetVolume => "SetVolume",
            Effect::PatternBreak => "PatternBreak",
            Effect::FinePortaUp => "FinePortaUp",
            Effect::FinePortaDown => "FinePortaDown",
            Effect::SetVibratoWaveform => "SetVibratoWaveform",
            Effect::PatternLoop => "PatternLoop",
            Effect::SetTremoloWaveform => "SetTremoloWaveform",
            Effect::SetPanPosition => "SetPanPosition",
            Effect::RetriggerNote => "RetriggerNote",
            Effect::FineVolumeSlideUp => "FineVolumeSlideUp",
            Effect::FineVolumeSlideDown => "FineVolumeSlideDown",
            Effect::NoteCut => "NoteCut",
            Effect::NoteDelay => "NoteDelay",
            Effect::PatternDelay => "PatternDelay",
            Effect::SetSpeed => "SetSpeed",
            Effect::SetTempo => "SetTempo",
            Effect::SetGlobalVolume => "SetGlobalVolume",
            Effect::GlobalVolumeSlide => "GlobalVolumeSlide",
            Effect::Tremor => "Tremor",
            Effect::PanSlide => "PanSlide",
            Effect::Surround => "Surround",
            Effect::VolumeColumn => "VolumeColumn",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_index_the_table() {
        for (i, effect) in Effect::ALL.iter().enumerate() {
            assert_eq!(effect.code() as usize, i, "{}", effect.name());
            assert_eq!(Effect::from_code(i as u8), Some(*effect));
        }
        assert_eq!(Effect::from_code(Effect::COUNT as u8), None);
    }

    #[test]
    fn volume_column_decoding() {
        assert_eq!(VolumeCommand::decode(0), VolumeCommand::SetVolume(0));
        assert_eq!(VolumeCommand::decode(64), VolumeCommand::SetVolume(64));
        assert_eq!(VolumeCommand::decode(0x65), VolumeCommand::VolumeSlideDown(5));
        assert_eq!(VolumeCommand::decode(0x7A), VolumeCommand::VolumeSlideUp(10));
        assert_eq!(VolumeCommand::decode(0xC8), VolumeCommand::SetPan(8));
        assert_eq!(VolumeCommand::decode(0xF3), VolumeCommand::TonePorta(3));
        assert_eq!(VolumeCommand::decode(0x50), VolumeCommand::None);
    }

    #[test]
    fn extended_column_text() {
        assert_eq!(Effect::VolumeSlide.column(0x0F), ('A', 0x0F));
        assert_eq!(Effect::NoteCut.column(3), ('E', 0xC3));
        assert_eq!(Effect::None.column(0), ('.', 0));
    }

    #[test]
    fn tone_porta_family() {
        assert!(Effect::TonePorta.is_tone_porta());
        assert!(Effect::TonePortaVolSlide.is_tone_porta());
        assert!(!Effect::Vibrato.is_tone_porta());
    }
}
