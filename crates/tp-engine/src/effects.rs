//! Effect dispatch.
//!
//! Each effect code has one handler in [`EFFECT_TABLE`]. A handler is
//! called exactly once per channel per tick (after the trigger pass on
//! tick 0) and may touch only its own voice plus the shared globals:
//! timing, pending navigation and the master volume.

use tp_ir::{Cell, Effect, Module, Note, Sample, VolumeCommand};

use crate::channel::{ChannelVoice, PAN_CENTER, PAN_SURROUND};
use crate::frequency::{clamp_period, note_to_period, PERIOD_PER_SEMITONE};
use crate::state::Globals;

/// Everything a handler may read or mutate.
pub struct EffectContext<'a> {
    pub voice: &'a mut ChannelVoice,
    pub globals: &'a mut Globals,
    pub module: &'a Module,
    /// Cell of the current row on this channel
    pub cell: Cell,
    pub channel: usize,
}

impl EffectContext<'_> {
    fn sample(&self) -> Option<&Sample> {
        self.voice.sample.and_then(|key| self.module.samples.get(key))
    }

    fn step_scale(&self) -> f64 {
        self.globals.timing.step_scale
    }

    fn retune(&mut self) {
        let scale = self.step_scale();
        self.voice.retune(scale);
    }

    fn slide_period(&mut self, delta: f32) {
        if self.voice.period <= 0.0 {
            return;
        }
        self.voice.period = clamp_period(self.voice.period + delta);
        self.retune();
    }

    fn slide_volume(&mut self, delta: f32) {
        let v = &mut self.voice.volume.channel;
        *v = (*v + delta).clamp(0.0, 1.0);
    }

    fn slide_pan(&mut self, delta: f32) {
        let base = if self.voice.pan > 1.0 { PAN_CENTER } else { self.voice.pan };
        self.voice.pan = (base + delta).clamp(0.0, 1.0);
    }
}

/// Effect handler: `(context, parameter, tick)`.
pub type EffectHandler = fn(&mut EffectContext<'_>, u8, u32);

/// Handlers indexed by effect code.
pub static EFFECT_TABLE: [EffectHandler; Effect::COUNT] = [
    no_effect,
    arpeggio,
    porta_up,
    porta_down,
    tone_porta,
    vibrato,
    tone_porta_vol_slide,
    vibrato_vol_slide,
    tremolo,
    set_pan,
    sample_offset,
    volume_slide,
    position_jump,
    set_volume,
    pattern_break,
    fine_porta_up,
    fine_porta_down,
    set_vibrato_waveform,
    pattern_loop,
    set_tremolo_waveform,
    set_pan_position,
    retrigger_note,
    fine_volume_slide_up,
    fine_volume_slide_down,
    note_cut,
    note_delay,
    pattern_delay,
    set_speed,
    set_tempo,
    set_global_volume,
    global_volume_slide,
    tremor,
    pan_slide,
    surround,
    volume_column,
];

/// Apply one effect for one tick.
#[inline]
pub fn dispatch(effect: Effect, ctx: &mut EffectContext<'_>, param: u8, tick: u32) {
    EFFECT_TABLE[effect as usize](ctx, param, tick);
}

/// Use `param` if nonzero and remember it, otherwise recall the last one.
fn remember(slot: &mut u8, param: u8) -> u8 {
    if param != 0 {
        *slot = param;
    }
    *slot
}

fn nibbles(param: u8) -> (u8, u8) {
    (param >> 4, param & 0x0F)
}

/// `x` slides up, otherwise `y` slides down; both in 1/64 steps.
fn slide_delta(param: u8) -> f32 {
    let (x, y) = nibbles(param);
    if x > 0 {
        x as f32 / 64.0
    } else {
        -(y as f32) / 64.0
    }
}

fn no_effect(_: &mut EffectContext<'_>, _: u8, _: u32) {}

fn arpeggio(ctx: &mut EffectContext<'_>, param: u8, tick: u32) {
    let (x, y) = nibbles(param);
    let semitones = match tick % 3 {
        0 => 0,
        1 => x,
        _ => y,
    };
    ctx.voice.period_offset = -(semitones as f32) * PERIOD_PER_SEMITONE;
    ctx.retune();
}

fn porta_up(ctx: &mut EffectContext<'_>, param: u8, tick: u32) {
    let speed = remember(&mut ctx.voice.memory.porta_up, param);
    if tick > 0 {
        ctx.slide_period(-(speed as f32) * 4.0);
    }
}

fn porta_down(ctx: &mut EffectContext<'_>, param: u8, tick: u32) {
    let speed = remember(&mut ctx.voice.memory.porta_down, param);
    if tick > 0 {
        ctx.slide_period(speed as f32 * 4.0);
    }
}

/// Set the slide target from the row's note.
fn set_porta_target(ctx: &mut EffectContext<'_>) {
    if let Note::On(note) = ctx.cell.note {
        let (relative, fine) = ctx
            .sample()
            .map_or((0, 0), |s| (s.relative_note, s.fine_tune));
        ctx.voice.porta.target = note_to_period(note, relative, fine);
        ctx.voice.note = note;
    }
}

fn slide_to_target(ctx: &mut EffectContext<'_>) {
    let porta = ctx.voice.porta;
    if ctx.voice.period <= 0.0 || porta.target <= 0.0 {
        return;
    }
    let period = ctx.voice.period;
    ctx.voice.period = if period > porta.target {
        (period - porta.speed).max(porta.target)
    } else {
        (period + porta.speed).min(porta.target)
    };
    ctx.retune();
}

fn tone_porta(ctx: &mut EffectContext<'_>, param: u8, tick: u32) {
    if tick == 0 {
        set_porta_target(ctx);
        if param != 0 {
            ctx.voice.porta.speed = param as f32 * 4.0;
        }
    } else {
        slide_to_target(ctx);
    }
}

fn vibrato(ctx: &mut EffectContext<'_>, param: u8, tick: u32) {
    if tick == 0 {
        let (x, y) = nibbles(param);
        if x != 0 {
            ctx.voice.vibrato.speed = x;
        }
        if y != 0 {
            ctx.voice.vibrato.depth = y;
        }
        return;
    }
    let wave = ctx.voice.vibrato.step();
    ctx.voice.period_offset = wave * ctx.voice.vibrato.depth as f32 * 8.0;
    ctx.retune();
}

fn tone_porta_vol_slide(ctx: &mut EffectContext<'_>, param: u8, tick: u32) {
    tone_porta(ctx, 0, tick);
    volume_slide(ctx, param, tick);
}

fn vibrato_vol_slide(ctx: &mut EffectContext<'_>, param: u8, tick: u32) {
    vibrato(ctx, 0, tick);
    volume_slide(ctx, param, tick);
}

fn tremolo(ctx: &mut EffectContext<'_>, param: u8, tick: u32) {
    if tick == 0 {
        let (x, y) = nibbles(param);
        if x != 0 {
            ctx.voice.tremolo.speed = x;
        }
        if y != 0 {
            ctx.voice.tremolo.depth = y;
        }
        return;
    }
    let wave = ctx.voice.tremolo.step();
    ctx.voice.tremolo_gain = (1.0 + wave * ctx.voice.tremolo.depth as f32 / 16.0).clamp(0.0, 2.0);
}

fn set_pan(ctx: &mut EffectContext<'_>, param: u8, tick: u32) {
    if tick == 0 {
        ctx.voice.pan = param as f32 / 255.0;
    }
}

fn sample_offset(ctx: &mut EffectContext<'_>, param: u8, tick: u32) {
    if tick != 0 {
        return;
    }
    let offset = remember(&mut ctx.voice.memory.sample_offset, param) as u32 * 256;
    let Some(key) = ctx.voice.sample else { return };
    if let Some(sample) = ctx.module.samples.get(key) {
        ctx.voice.cursor.seek(sample, offset);
    }
}

fn volume_slide(ctx: &mut EffectContext<'_>, param: u8, tick: u32) {
    let param = remember(&mut ctx.voice.memory.volume_slide, param);
    if tick > 0 {
        ctx.slide_volume(slide_delta(param));
    }
}

fn position_jump(ctx: &mut EffectContext<'_>, param: u8, tick: u32) {
    if tick == 0 {
        ctx.globals.seq.flow.order_jump = Some(param);
    }
}

fn set_volume(ctx: &mut EffectContext<'_>, param: u8, tick: u32) {
    if tick == 0 {
        ctx.voice.volume.channel = param.min(64) as f32 / 64.0;
    }
}

fn pattern_break(ctx: &mut EffectContext<'_>, param: u8, tick: u32) {
    if tick == 0 {
        ctx.globals.seq.flow.break_row = Some(param);
    }
}

fn fine_porta_up(ctx: &mut EffectContext<'_>, param: u8, tick: u32) {
    if tick == 0 {
        ctx.slide_period(-((param & 0x0F) as f32) * 4.0);
    }
}

fn fine_porta_down(ctx: &mut EffectContext<'_>, param: u8, tick: u32) {
    if tick == 0 {
        ctx.slide_period((param & 0x0F) as f32 * 4.0);
    }
}

fn set_vibrato_waveform(ctx: &mut EffectContext<'_>, param: u8, tick: u32) {
    if tick == 0 {
        ctx.voice.vibrato.waveform = param & 0x03;
    }
}

fn pattern_loop(ctx: &mut EffectContext<'_>, param: u8, tick: u32) {
    if tick != 0 {
        return;
    }
    let count = param & 0x0F;
    let state = &mut ctx.voice.pattern_loop;
    if count == 0 {
        state.start_row = ctx.globals.seq.row;
    } else if state.count == 0 {
        state.count = count;
        ctx.globals.seq.flow.row_jump = Some(state.start_row);
    } else {
        state.count -= 1;
        if state.count > 0 {
            ctx.globals.seq.flow.row_jump = Some(state.start_row);
        }
    }
}

fn set_tremolo_waveform(ctx: &mut EffectContext<'_>, param: u8, tick: u32) {
    if tick == 0 {
        ctx.voice.tremolo.waveform = param & 0x03;
    }
}

fn set_pan_position(ctx: &mut EffectContext<'_>, param: u8, tick: u32) {
    if tick == 0 {
        ctx.voice.pan = (param & 0x0F) as f32 / 15.0;
    }
}

fn retrigger_note(ctx: &mut EffectContext<'_>, param: u8, tick: u32) {
    let interval = (param & 0x0F) as u32;
    if tick == 0 || interval == 0 || tick % interval != 0 {
        return;
    }
    let Some(key) = ctx.voice.sample else { return };
    if let Some(sample) = ctx.module.samples.get(key) {
        ctx.voice.cursor.restart(sample);
        ctx.retune();
    }
}

fn fine_volume_slide_up(ctx: &mut EffectContext<'_>, param: u8, tick: u32) {
    if tick == 0 {
        ctx.slide_volume((param & 0x0F) as f32 / 64.0);
    }
}

fn fine_volume_slide_down(ctx: &mut EffectContext<'_>, param: u8, tick: u32) {
    if tick == 0 {
        ctx.slide_volume(-((param & 0x0F) as f32) / 64.0);
    }
}

fn note_cut(ctx: &mut EffectContext<'_>, param: u8, tick: u32) {
    if tick == (param & 0x0F) as u32 {
        ctx.voice.volume.channel = 0.0;
    }
}

fn note_delay(ctx: &mut EffectContext<'_>, param: u8, tick: u32) {
    let delay = (param & 0x0F) as u32;
    if delay == 0 || !matches!(ctx.cell.note, Note::On(_)) {
        return;
    }
    if tick == 0 {
        ctx.voice.delayed = true;
        ctx.retune();
    } else if tick == delay && ctx.voice.delayed {
        ctx.voice.delayed = false;
        let Some(key) = ctx.voice.sample else { return };
        if let Some(sample) = ctx.module.samples.get(key) {
            ctx.voice.cursor.restart(sample);
        }
        ctx.voice.volume.envelope_position = 0.0;
        ctx.retune();
    }
}

fn pattern_delay(ctx: &mut EffectContext<'_>, param: u8, tick: u32) {
    if tick == 0 && ctx.globals.seq.flow.pattern_delay == 0 {
        ctx.globals.seq.flow.pattern_delay = (param & 0x0F) + 1;
    }
}

fn set_speed(ctx: &mut EffectContext<'_>, param: u8, tick: u32) {
    if tick == 0 {
        ctx.globals.timing.set_speed(param as u32);
    }
}

fn set_tempo(ctx: &mut EffectContext<'_>, param: u8, tick: u32) {
    if tick == 0 {
        ctx.globals.timing.set_bpm(param as u16);
    }
}

fn set_global_volume(ctx: &mut EffectContext<'_>, param: u8, tick: u32) {
    if tick == 0 {
        ctx.globals.master_volume = param.min(64) as f32 / 64.0;
    }
}

fn global_volume_slide(ctx: &mut EffectContext<'_>, param: u8, tick: u32) {
    let param = remember(&mut ctx.globals.master_volume_slide, param);
    if tick > 0 {
        let master = &mut ctx.globals.master_volume;
        *master = (*master + slide_delta(param)).clamp(0.0, 1.0);
    }
}

fn tremor(ctx: &mut EffectContext<'_>, param: u8, _tick: u32) {
    let (x, y) = nibbles(remember(&mut ctx.voice.memory.tremor, param));
    let on = x as u16 + 1;
    let cycle = on + y as u16 + 1;
    let tremor = &mut ctx.voice.tremor;
    tremor.muted = tremor.count % cycle >= on;
    tremor.count = tremor.count.wrapping_add(1);
}

fn pan_slide(ctx: &mut EffectContext<'_>, param: u8, tick: u32) {
    let param = remember(&mut ctx.voice.memory.pan_slide, param);
    if tick > 0 {
        let (x, y) = nibbles(param);
        let delta = if x > 0 { x as f32 } else { -(y as f32) };
        ctx.slide_pan(delta / 255.0);
    }
}

fn surround(ctx: &mut EffectContext<'_>, param: u8, tick: u32) {
    if tick == 0 {
        ctx.voice.pan = if param & 0x0F != 0 { PAN_SURROUND } else { PAN_CENTER };
    }
}

/// Volume column commands above 64, routed like an effect.
fn volume_column(ctx: &mut EffectContext<'_>, _param: u8, tick: u32) {
    match ctx.cell.volume_command() {
        VolumeCommand::None | VolumeCommand::SetVolume(_) => {}
        VolumeCommand::VolumeSlideDown(x) => {
            if tick > 0 {
                ctx.slide_volume(-(x as f32) / 64.0);
            }
        }
        VolumeCommand::VolumeSlideUp(x) => {
            if tick > 0 {
                ctx.slide_volume(x as f32 / 64.0);
            }
        }
        VolumeCommand::FineVolSlideDown(x) => {
            if tick == 0 {
                ctx.slide_volume(-(x as f32) / 64.0);
            }
        }
        VolumeCommand::FineVolSlideUp(x) => {
            if tick == 0 {
                ctx.slide_volume(x as f32 / 64.0);
            }
        }
        VolumeCommand::VibratoSpeed(x) => {
            if tick == 0 && x != 0 {
                ctx.voice.vibrato.speed = x;
            }
        }
        VolumeCommand::Vibrato(x) => vibrato(ctx, x, tick),
        VolumeCommand::SetPan(x) => {
            if tick == 0 {
                ctx.voice.pan = x as f32 / 15.0;
            }
        }
        VolumeCommand::PanSlideLeft(x) => {
            if tick > 0 {
                ctx.slide_pan(-(x as f32) / 255.0);
            }
        }
        VolumeCommand::PanSlideRight(x) => {
            if tick > 0 {
                ctx.slide_pan(x as f32 / 255.0);
            }
        }
        VolumeCommand::TonePorta(x) => {
            if tick == 0 {
                set_porta_target(ctx);
                if x != 0 {
                    ctx.voice.porta.speed = x as f32 * 64.0;
                }
            } else {
                slide_to_target(ctx);
            }
        }
    }
}
