//! Per-channel voice registers.

use tp_ir::{Sample, SampleKey};

use crate::frequency::period_to_step;

/// Reserved pan value that places a voice in surround.
pub const PAN_SURROUND: f32 = 2.0;

/// Pan value for the center position.
pub const PAN_CENTER: f32 = 0.5;

/// Position within the bound sample.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SampleCursor {
    /// Fractional frame position
    pub position: f64,
    /// Frames advanced per output frame (always >= 0)
    pub step: f64,
    /// Frames left before the next loop boundary or the sample end
    pub remain: f64,
    /// Moving backwards through a ping-pong loop
    pub reversed: bool,
}

impl SampleCursor {
    /// Rewind to the start of `sample`.
    pub fn restart(&mut self, sample: &Sample) {
        self.position = 0.0;
        self.reversed = false;
        self.remain = boundary(sample);
    }

    /// Jump forward to `frame`, clamped to the sample.
    pub fn seek(&mut self, sample: &Sample, frame: u32) {
        let last = sample.len().saturating_sub(1) as f64;
        self.position = (frame as f64).min(last);
        self.reversed = false;
        self.remain = boundary(sample) - self.position;
    }
}

/// First boundary a fresh cursor runs into: the loop end, or the sample end.
fn boundary(sample: &Sample) -> f64 {
    if sample.has_loop() {
        (sample.loop_start + sample.effective_loop_length()) as f64
    } else {
        sample.len() as f64
    }
}

/// Volume registers.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VolumeState {
    /// Channel volume (0-1)
    pub channel: f32,
    /// Base volume of the bound sample (0-1)
    pub sample: f32,
    /// Position in the volume and panning envelopes, in ticks
    pub envelope_position: f32,
    /// Note has been released; envelopes leave their sustain point
    pub released: bool,
}

/// Waveform oscillator used by vibrato and tremolo.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Oscillator {
    /// Phase (0-63 per cycle)
    pub phase: u8,
    /// Phase increment per tick
    pub speed: u8,
    /// Amplitude
    pub depth: u8,
    /// 0 = sine, 1 = ramp down, 2 = square
    pub waveform: u8,
}

impl Oscillator {
    /// Advance one tick and return the new wave value in `[-1, 1]`.
    pub fn step(&mut self) -> f32 {
        self.phase = self.phase.wrapping_add(self.speed) & 63;
        self.value()
    }

    /// Wave value at the current phase, in `[-1, 1]`.
    pub fn value(&self) -> f32 {
        let phase = (self.phase & 63) as f32;
        match self.waveform & 3 {
            1 => 1.0 - phase / 32.0,
            2 => {
                if phase < 32.0 {
                    1.0
                } else {
                    -1.0
                }
            }
            _ => libm::sinf(phase * core::f32::consts::PI / 32.0),
        }
    }
}

/// Slide-to-note registers.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Portamento {
    /// Period the slide is heading for
    pub target: f32,
    /// Period units per tick
    pub speed: f32,
}

/// Tremor counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tremor {
    /// Ticks elapsed in the on/off cycle
    pub count: u16,
    /// Voice is in the off part of the cycle
    pub muted: bool,
}

/// Last nonzero parameters of effects that reuse them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EffectMemory {
    pub porta_up: u8,
    pub porta_down: u8,
    pub volume_slide: u8,
    pub sample_offset: u8,
    pub global_volume_slide: u8,
    pub pan_slide: u8,
    pub tremor: u8,
}

/// Per-channel pattern loop registers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PatternLoopState {
    /// Row marked as the loop start
    pub start_row: u16,
    /// Remaining repeats
    pub count: u8,
}

/// Playback registers for one channel.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ChannelVoice {
    /// Current instrument number (0 = none)
    pub instrument: u8,
    /// Bound sample
    pub sample: Option<SampleKey>,
    /// Instrument whose envelopes apply (0 = none)
    pub envelope_instrument: u8,
    /// Last pitched note (1-96)
    pub note: u8,
    /// Base period (0 = no pitch)
    pub period: f32,
    /// Temporary period offset from vibrato and arpeggio
    pub period_offset: f32,
    /// Sample cursor
    pub cursor: SampleCursor,
    /// Volume registers
    pub volume: VolumeState,
    /// Pan (0-1, or [`PAN_SURROUND`])
    pub pan: f32,
    /// Slide-to-note registers
    pub porta: Portamento,
    pub vibrato: Oscillator,
    pub tremolo: Oscillator,
    /// Gain multiplier from tremolo (0-2)
    pub tremolo_gain: f32,
    pub tremor: Tremor,
    pub memory: EffectMemory,
    pub pattern_loop: PatternLoopState,
    /// A note delay is holding the voice silent
    pub delayed: bool,
    /// User mute
    pub muted: bool,
}

impl ChannelVoice {
    /// Create a voice at rest with the given pan.
    pub fn new(pan: f32) -> Self {
        Self {
            pan,
            tremolo_gain: 1.0,
            ..Default::default()
        }
    }

    /// Zero every register and restore `pan`. The user mute flag is kept.
    pub fn reset(&mut self, pan: f32) {
        let muted = self.muted;
        *self = Self::new(pan);
        self.muted = muted;
    }

    /// Recompute the cursor step from the period and any temporary offset.
    pub fn retune(&mut self, step_scale: f64) {
        if self.delayed || self.period <= 0.0 {
            self.cursor.step = 0.0;
            return;
        }
        let period = crate::frequency::clamp_period(self.period + self.period_offset);
        self.cursor.step = period_to_step(period, step_scale);
    }

    /// Drop any vibrato/arpeggio offset.
    pub fn clear_period_offset(&mut self, step_scale: f64) {
        if self.period_offset != 0.0 {
            self.period_offset = 0.0;
            self.retune(step_scale);
        }
    }

    /// Voice can produce sound: a sample is bound and the cursor moves.
    pub fn is_active(&self) -> bool {
        self.sample.is_some() && self.cursor.step > 0.0
    }

    /// Muted by the user or by tremor.
    pub fn is_silenced(&self) -> bool {
        self.muted || self.tremor.muted
    }
}
