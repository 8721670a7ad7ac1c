//! Note, period and frequency conversion.
//!
//! Uses the linear period table: 64 period units per semitone and 768 per
//! octave, with note 1 (C-0) at period 7680. Playback frequency is
//! `8363 * 2^((4608 - period) / 768)`, so C-4 (note 49, period 4608)
//! plays a sample at its native 8363 Hz.

/// Period of note 1 (C-0) with no relative note or fine tune.
pub const PERIOD_BASE: f32 = 7680.0;

/// Period that plays a sample at [`BASE_FREQUENCY`].
pub const REFERENCE_PERIOD: f32 = 4608.0;

/// Period units per semitone.
pub const PERIOD_PER_SEMITONE: f32 = 64.0;

/// Period units per octave.
pub const PERIOD_PER_OCTAVE: f32 = 768.0;

/// Lowest allowed period (highest pitch).
pub const PERIOD_MIN: f32 = 1.0;

/// Highest allowed period (lowest pitch), one octave below C-0.
pub const PERIOD_MAX: f32 = PERIOD_BASE + PERIOD_PER_OCTAVE;

/// Sample playback rate at [`REFERENCE_PERIOD`], in Hz.
pub const BASE_FREQUENCY: f32 = 8363.0;

/// Convert a note (1-96) to a linear period.
///
/// `relative_note` transposes in semitones, `fine_tune` in 1/128 semitone.
pub fn note_to_period(note: u8, relative_note: i8, fine_tune: i8) -> f32 {
    let semitones = note as f32 - 1.0 + relative_note as f32;
    PERIOD_BASE - semitones * PERIOD_PER_SEMITONE - fine_tune as f32 / 2.0
}

/// Playback frequency in Hz for a period.
pub fn period_to_frequency(period: f32) -> f32 {
    BASE_FREQUENCY * libm::exp2f((REFERENCE_PERIOD - period) / PERIOD_PER_OCTAVE)
}

/// Per-output-frame cursor step for a period.
pub fn period_to_step(period: f32, step_scale: f64) -> f64 {
    if period <= 0.0 || step_scale <= 0.0 {
        return 0.0;
    }
    period_to_frequency(period) as f64 / step_scale
}

/// Clamp a period to the playable range.
pub fn clamp_period(period: f32) -> f32 {
    period.clamp(PERIOD_MIN, PERIOD_MAX)
}

/// Output frames per tick at a given tempo: `round(sample_rate * 2.5 / bpm)`.
pub fn samples_per_tick(sample_rate: u32, bpm: u16) -> u32 {
    if bpm == 0 {
        return sample_rate.max(1);
    }
    let exact = sample_rate as f64 * 2.5 / bpm as f64;
    ((exact + 0.5) as u32).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f64 = 44100.0;

    #[test]
    fn c4_plays_at_base_frequency() {
        let period = note_to_period(49, 0, 0);
        assert_eq!(period, REFERENCE_PERIOD);
        assert_eq!(period_to_frequency(period), BASE_FREQUENCY);
    }

    #[test]
    fn c0_is_period_base() {
        assert_eq!(note_to_period(1, 0, 0), PERIOD_BASE);
    }

    #[test]
    fn octave_up_doubles_frequency() {
        let base = period_to_frequency(note_to_period(49, 0, 0));
        let up = period_to_frequency(note_to_period(61, 0, 0));
        assert!((up - base * 2.0).abs() < 0.01);
    }

    #[test]
    fn octave_down_halves_frequency() {
        let base = period_to_frequency(note_to_period(49, 0, 0));
        let down = period_to_frequency(note_to_period(37, 0, 0));
        assert!((down - base / 2.0).abs() < 0.01);
    }

    #[test]
    fn relative_note_transposes() {
        assert_eq!(note_to_period(37, 12, 0), note_to_period(49, 0, 0));
        assert_eq!(note_to_period(50, -1, 0), note_to_period(49, 0, 0));
    }

    #[test]
    fn fine_tune_is_fractional_semitone() {
        // 128 fine-tune steps are one semitone
        let up = note_to_period(49, 0, 127);
        assert!((note_to_period(49, 0, 0) - up - 63.5).abs() < 1e-3);
        let down = note_to_period(49, 0, -128);
        assert_eq!(down, note_to_period(48, 0, 0));
    }

    #[test]
    fn step_at_native_rate_is_one() {
        let step = period_to_step(REFERENCE_PERIOD, BASE_FREQUENCY as f64);
        assert!((step - 1.0).abs() < 1e-6);
    }

    #[test]
    fn step_scales_inversely_with_rate() {
        let a = period_to_step(REFERENCE_PERIOD, SAMPLE_RATE);
        let b = period_to_step(REFERENCE_PERIOD, SAMPLE_RATE / 2.0);
        assert!((b - a * 2.0).abs() < 1e-9);
    }

    #[test]
    fn zero_period_or_scale_gives_zero_step() {
        assert_eq!(period_to_step(0.0, SAMPLE_RATE), 0.0);
        assert_eq!(period_to_step(REFERENCE_PERIOD, 0.0), 0.0);
    }

    #[test]
    fn clamp_keeps_period_in_range() {
        assert_eq!(clamp_period(-20.0), PERIOD_MIN);
        assert_eq!(clamp_period(10_000.0), PERIOD_MAX);
        assert_eq!(clamp_period(4608.0), 4608.0);
    }

    #[test]
    fn tick_length_from_tempo() {
        // 125 BPM at 44.1 kHz: 882 frames per tick
        assert_eq!(samples_per_tick(44100, 125), 882);
        // 150 BPM at 48 kHz: 800 frames per tick
        assert_eq!(samples_per_tick(48000, 150), 800);
        // rounding: 44100 * 2.5 / 130 = 848.08
        assert_eq!(samples_per_tick(44100, 130), 848);
        assert_eq!(samples_per_tick(1, 255), 1);
    }
}
