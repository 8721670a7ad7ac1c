//! Voice renderer: one channel's contribution to one output frame.

use tp_ir::{Instrument, LoopType, Sample};

use crate::channel::{ChannelVoice, SampleCursor};
use crate::frame::Frame;

/// Render one frame of `voice` playing `sample` and advance its cursor.
///
/// `instrument` supplies the volume and panning envelopes, if any.
/// Muted voices still advance so they stay in time when unmuted.
pub fn render_voice(
    voice: &mut ChannelVoice,
    sample: &Sample,
    instrument: Option<&Instrument>,
    samples_per_tick: u32,
) -> Frame {
    let value = sample.data.get_f32(voice.cursor.position as usize);

    let position = voice.volume.envelope_position;
    let released = voice.volume.released;
    let volume_env = instrument
        .and_then(|i| i.volume_envelope.as_ref())
        .and_then(|e| e.value_at(position, released))
        .unwrap_or(1.0);
    let pan_env = instrument
        .and_then(|i| i.panning_envelope.as_ref())
        .and_then(|e| e.value_at(position, released))
        .unwrap_or(0.5);
    voice.volume.envelope_position += 1.0 / samples_per_tick.max(1) as f32;

    let out = if voice.is_silenced() {
        Frame::silence()
    } else {
        let gain = volume_env * voice.tremolo_gain * voice.volume.channel;
        place(value * gain, voice.pan, pan_env)
    };

    advance_cursor(&mut voice.cursor, sample);
    out
}

/// Stereo placement. A pan above 1 is surround: the right side is the
/// inverted left side.
fn place(value: f32, pan: f32, pan_env: f32) -> Frame {
    if pan > 1.0 {
        return Frame {
            left: 0.5 * value,
            right: -0.5 * value,
        };
    }
    let swing = 2.0 * pan;
    let pan = (pan + (pan_env - 0.5) * swing).clamp(0.0, 1.0);
    Frame {
        left: value * (1.0 - pan),
        right: value * pan,
    }
}

/// Step the cursor and handle loop bounds or the end of the sample.
pub fn advance_cursor(cursor: &mut SampleCursor, sample: &Sample) {
    let step = cursor.step;
    if cursor.reversed {
        cursor.position -= step;
    } else {
        cursor.position += step;
    }
    cursor.remain -= step;
    if cursor.remain > 0.0 {
        return;
    }

    let overshoot = -cursor.remain;
    if !sample.has_loop() {
        cursor.position = sample.len().saturating_sub(1) as f64;
        cursor.step = 0.0;
        cursor.remain = 0.0;
        return;
    }

    let start = sample.loop_start as f64;
    let length = sample.effective_loop_length() as f64;
    match sample.loop_type {
        LoopType::PingPong => {
            let span = (length - 1.0).max(0.0);
            let over = if span > 0.0 { overshoot % span } else { 0.0 };
            cursor.position = if cursor.reversed {
                start + over
            } else {
                start + span - over
            }
            .clamp(start, start + span);
            cursor.remain = if span - over > 0.0 { span - over } else { span };
            cursor.reversed = !cursor.reversed;
        }
        _ => {
            let over = overshoot % length;
            cursor.position = start + over;
            cursor.remain = length - over;
            cursor.reversed = false;
        }
    }
}
