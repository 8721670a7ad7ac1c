//! Tick-0 trigger pass: new instruments, new notes and the volume column.

use tp_ir::{Cell, Module, Note, PanningMode, Sample};

use crate::channel::ChannelVoice;
use crate::frequency::note_to_period;

/// What the trigger pass did on one channel, for notification.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TriggerOutcome {
    /// An instrument was (re)triggered
    pub instrument: bool,
    /// The cell carries an effect
    pub effect: bool,
}

fn bound_sample<'m>(voice: &ChannelVoice, module: &'m Module) -> Option<&'m Sample> {
    voice.sample.and_then(|key| module.samples.get(key))
}

/// Run the trigger pass for one channel on tick 0 of a row.
pub fn trigger_row(
    voice: &mut ChannelVoice,
    cell: &Cell,
    module: &Module,
    step_scale: f64,
) -> TriggerOutcome {
    let mut outcome = TriggerOutcome::default();
    let mut retriggered = false;
    let slide = cell.effect.is_tone_porta();
    // a note delay never outlives its row
    voice.delayed = false;

    if cell.instrument != 0 {
        outcome.instrument = true;
        voice.instrument = cell.instrument;
        bind_instrument(voice, cell, module);
        retriggered = cell.note != Note::Off;
    }

    match cell.note {
        Note::Off if !slide => voice.volume.released = true,
        Note::On(note) if !slide => {
            voice.note = note;
            if let Some(sample) = bound_sample(voice, module) {
                voice.period = note_to_period(note, sample.relative_note, sample.fine_tune);
                voice.cursor.restart(sample);
            }
            voice.period_offset = 0.0;
            voice.retune(step_scale);
            if cell.instrument == 0 {
                outcome.instrument = true;
            }
            retriggered = true;
        }
        _ => {}
    }

    voice.tremolo_gain = 1.0;
    voice.tremor.muted = false;

    match cell.volume {
        Some(v) if v <= 64 => voice.volume.channel = v as f32 / 64.0,
        _ if retriggered => voice.volume.channel = voice.volume.sample,
        _ => {}
    }

    outcome.effect = cell.effect != tp_ir::Effect::None;
    outcome
}

/// Switch the voice to the cell's instrument and bind its sample.
fn bind_instrument(voice: &mut ChannelVoice, cell: &Cell, module: &Module) {
    let Some(instrument) = module.instrument(cell.instrument) else {
        voice.sample = None;
        voice.envelope_instrument = 0;
        return;
    };

    let note = match cell.note {
        Note::On(n) => n,
        _ => voice.note,
    };
    let key = instrument
        .sample_for(note)
        .filter(|key| module.samples.get(*key).is_some_and(|s| !s.is_empty()));

    let Some(key) = key else {
        voice.sample = None;
        return;
    };
    let sample = &module.samples[key];

    voice.sample = Some(key);
    voice.cursor.restart(sample);
    voice.volume.sample = sample.volume_gain();
    voice.volume.envelope_position = 0.0;
    voice.volume.released = false;
    voice.envelope_instrument = cell.instrument;
    voice.tremor.count = 0;
    if module.panning_mode == PanningMode::PerSample {
        voice.pan = sample.pan_position();
    }
}
