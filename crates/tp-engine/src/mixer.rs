//! Main playback engine.
//!
//! The engine pulls frames on demand: every rendered frame mixes all
//! active voices, and every `samples_per_tick` frames the sequencer
//! advances one tick. Nothing on this path allocates or logs.

use alloc::vec::Vec;
use tp_ir::{Cell, Effect, Module};

use crate::channel::ChannelVoice;
use crate::effects::{dispatch, EffectContext};
use crate::events::{EventBus, Notification};
use crate::frame::Frame;
use crate::sequencer::RowEnd;
use crate::state::{EngineConfig, EngineState};
use crate::trigger::trigger_row;
use crate::voice::render_voice;

/// The main playback engine.
pub struct Engine {
    /// The module being played (`None` until a valid module is loaded)
    pub(crate) module: Option<Module>,
    pub(crate) config: EngineConfig,
    pub(crate) state: EngineState,
    pub(crate) bus: EventBus,
    /// The current tick's pass has not run yet
    pub(crate) tick_pending: bool,
}

impl Engine {
    /// Create an engine with no module loaded.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            module: None,
            state: EngineState::new(&config),
            config,
            bus: EventBus::new(),
            tick_pending: false,
        }
    }

    /// Create an engine and load `module` into it.
    pub fn with_module(module: Module, config: EngineConfig) -> Self {
        let mut engine = Self::new(config);
        engine.load_module(module);
        engine
    }

    /// Load a module, replacing any current one.
    ///
    /// A module that fails validation is rejected with a warning and the
    /// engine is left with no module; rendering then produces silence.
    pub fn load_module(&mut self, module: Module) {
        self.state.globals.playing = false;
        if let Err(err) = module.validate() {
            tracing::warn!(name = module.name.as_str(), %err, "rejecting module");
            self.module = None;
            self.state.channels.clear();
            self.tick_pending = false;
            return;
        }

        tracing::info!(
            name = module.name.as_str(),
            channels = module.num_channels(),
            orders = module.song_length(),
            patterns = module.patterns.len(),
            "module loaded"
        );
        self.state.channels = module
            .channels
            .iter()
            .map(|settings| {
                let mut voice = ChannelVoice::new(settings.pan_position());
                voice.muted = settings.muted;
                voice
            })
            .collect();
        self.state.globals.seq.pattern_loop = false;
        self.state.globals.seq.rewind(&module);
        reset_playback(&module, &mut self.state, &self.config);
        self.tick_pending = true;

        let ready = Notification::ModuleReady {
            name: module.name,
            song_length: module.song_length(),
        };
        self.module = Some(module);
        self.bus.dispatch(&ready);
    }

    /// The loaded module.
    pub fn module(&self) -> Option<&Module> {
        self.module.as_ref()
    }

    /// Observer registry for playback notifications.
    pub fn events(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    /// Current playback state.
    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Fill `out` with rendered frames.
    pub fn render(&mut self, out: &mut [Frame]) {
        realtime(|| {
            for frame in out.iter_mut() {
                *frame = self.render_frame();
            }
        });
    }

    /// Fill an interleaved stereo buffer (`[l, r, l, r, ...]`).
    pub fn render_interleaved(&mut self, out: &mut [f32]) {
        realtime(|| {
            for pair in out.chunks_exact_mut(2) {
                let frame = self.render_frame();
                pair[0] = frame.left;
                pair[1] = frame.right;
            }
        });
    }

    /// Render `count` frames into a new buffer. Allocates; meant for
    /// offline rendering and tests.
    pub fn render_frames(&mut self, count: usize) -> Vec<Frame> {
        let mut frames = alloc::vec![Frame::silence(); count];
        self.render(&mut frames);
        frames
    }

    /// Generate one frame of audio.
    pub fn render_frame(&mut self) -> Frame {
        let Some(module) = self.module.as_ref() else {
            return Frame::silence();
        };
        let state = &mut self.state;
        if !state.globals.playing {
            return Frame::silence();
        }

        let samples_per_tick = state.globals.timing.samples_per_tick;
        let mut out = Frame::silence();
        for voice in state.channels.iter_mut() {
            if !voice.is_active() {
                continue;
            }
            let Some(sample) = voice.sample.and_then(|key| module.samples.get(key)) else {
                continue;
            };
            let instrument = module.instrument(voice.envelope_instrument);
            out.mix(render_voice(voice, sample, instrument, samples_per_tick));
        }
        out.scale(state.globals.master_volume);

        state.globals.sample_count += 1;
        if state.globals.sample_count >= samples_per_tick {
            state.globals.sample_count = 0;
            if !advance_tick(module, state, &mut self.bus, &self.config) {
                self.tick_pending = true;
            }
        }
        out
    }
}

/// Run `f` on the real-time path; with `alloc_check` any allocation aborts.
#[inline]
fn realtime<R>(f: impl FnOnce() -> R) -> R {
    #[cfg(feature = "alloc_check")]
    {
        assert_no_alloc::assert_no_alloc(f)
    }
    #[cfg(not(feature = "alloc_check"))]
    {
        f()
    }
}

/// Restore voices, tempo, speed, master volume and flow flags. The song
/// position and the pattern-loop setting are kept.
pub(crate) fn reset_playback(module: &Module, state: &mut EngineState, config: &EngineConfig) {
    for (voice, settings) in state.channels.iter_mut().zip(&module.channels) {
        voice.reset(settings.pan_position());
    }
    let g = &mut state.globals;
    g.timing.set_bpm(module.initial_tempo as u16);
    g.timing.set_speed(module.initial_speed as u32);
    g.master_volume = config.master_volume;
    g.master_volume_slide = 0;
    g.sample_count = 0;
    g.seq.tick = 0;
    g.seq.row_held = false;
    g.seq.flow = Default::default();
}

/// One tick boundary: advance the position, resolve the row end, then
/// run the new tick. Returns false if playback stopped at the boundary.
fn advance_tick(module: &Module, state: &mut EngineState, bus: &mut EventBus, config: &EngineConfig) -> bool {
    let g = &mut state.globals;
    g.seq.tick += 1;
    if g.seq.tick >= g.timing.ticks_per_row {
        match g.seq.end_row(module) {
            RowEnd::Advanced => {}
            RowEnd::SongLooped => {
                bus.dispatch(&Notification::SongEnded);
                reset_playback(module, state, config);
            }
            RowEnd::Unresolvable => {
                bus.dispatch(&Notification::SongEnded);
                state.globals.playing = false;
                bus.dispatch(&Notification::PlayStopped);
                state.globals.seq.rewind(module);
                reset_playback(module, state, config);
                return false;
            }
        }
    }
    process_tick(module, state, bus);
    true
}

/// Run the current tick: notifications and the trigger pass on the first
/// tick of a row, then one effect dispatch per channel.
pub(crate) fn process_tick(module: &Module, state: &mut EngineState, bus: &mut EventBus) {
    let seq = state.globals.seq;
    let Some(pattern) = module.pattern_at(seq.order) else {
        return;
    };
    let tick = seq.tick;
    let first_tick = tick == 0 && !seq.row_held;
    let step_scale = state.globals.timing.step_scale;

    if first_tick {
        if seq.row == 0 {
            bus.dispatch(&Notification::OrderChanged {
                order: seq.order,
                song_length: module.song_length(),
                pattern: module.pattern_index(seq.order).unwrap_or(0),
            });
        }
        bus.dispatch(&Notification::RowChanged {
            row: seq.row,
            rows: pattern.rows,
        });
    }

    for (channel, voice) in state.channels.iter_mut().enumerate() {
        let cell = pattern
            .get(seq.row as usize, channel)
            .copied()
            .unwrap_or_else(Cell::empty);

        if first_tick {
            voice.clear_period_offset(step_scale);
            let outcome = trigger_row(voice, &cell, module, step_scale);
            if outcome.instrument {
                bus.dispatch(&Notification::InstrumentTriggered {
                    instrument: voice.instrument,
                    channel,
                    note: cell.note.raw(),
                    effect: cell.effect,
                    param: cell.param,
                });
            }
            if outcome.effect {
                bus.dispatch(&Notification::EffectTriggered {
                    effect: cell.effect,
                    param: cell.param,
                    channel,
                    instrument: voice.instrument,
                    note: cell.note.raw(),
                });
            }
        }

        let mut ctx = EffectContext {
            voice,
            globals: &mut state.globals,
            module,
            cell,
            channel,
        };
        if cell.volume.is_some_and(|v| v > 64) {
            dispatch(Effect::VolumeColumn, &mut ctx, 0, tick);
        }
        dispatch(cell.effect, &mut ctx, cell.param, tick);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Subscription;
    use std::sync::{Arc, Mutex};
    use tp_ir::{Instrument, Note, OrderEntry, Pattern, Sample, SampleData};

    const RATE: u32 = 1000;

    /// One channel, one 4-row pattern, a long non-looping sample on
    /// instrument 1 and the given cells on channel 0.
    fn make_module(cells: &[(u16, Cell)]) -> Module {
        let mut m = Module::with_channels("engine", 1);
        let mut s = Sample::new("square");
        s.data = SampleData::Mono8(vec![64; 100_000]);
        let key = m.samples.insert(s);
        let mut inst = Instrument::new("one");
        inst.set_single_sample(key);
        m.instruments.push(inst);
        let mut p = Pattern::new(4, 1);
        for &(row, cell) in cells {
            *p.cell_mut(row, 0) = cell;
        }
        m.patterns.push(p);
        m.orders = vec![OrderEntry::Pattern(0)];
        m
    }

    fn note(n: u8) -> Cell {
        Cell { note: Note::On(n), instrument: 1, ..Cell::empty() }
    }

    fn engine(module: Module) -> Engine {
        Engine::with_module(module, EngineConfig { sample_rate: RATE, master_volume: 1.0 })
    }

    fn record(engine: &mut Engine) -> Arc<Mutex<Vec<Notification>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        engine
            .events()
            .subscribe(Subscription::All, move |n| sink.lock().unwrap().push(*n));
        log
    }

    #[test]
    fn invalid_module_leaves_engine_empty() {
        let mut m = make_module(&[]);
        m.orders.clear();
        let mut e = engine(m);
        assert!(e.module().is_none());
        e.play();
        assert!(!e.is_playing());
        assert_eq!(e.render_frame(), Frame::silence());
    }

    #[test]
    fn stopped_engine_is_silent() {
        let mut e = engine(make_module(&[(0, note(49))]));
        assert!(e.render_frames(64).iter().all(|f| *f == Frame::silence()));
    }

    #[test]
    fn play_triggers_first_row() {
        let mut e = engine(make_module(&[(0, note(49))]));
        let log = record(&mut e);
        e.play();
        let events = log.lock().unwrap().clone();
        assert_eq!(events[0], Notification::PlayStarted);
        assert_eq!(
            events[1],
            Notification::OrderChanged { order: 0, song_length: 1, pattern: 0 }
        );
        assert_eq!(events[2], Notification::RowChanged { row: 0, rows: 4 });
        assert!(matches!(
            events[3],
            Notification::InstrumentTriggered { instrument: 1, channel: 0, note: 49, .. }
        ));
        let frame = e.render_frame();
        assert!(frame.left > 0.0 && frame.right > 0.0);
    }

    #[test]
    fn master_volume_scales_mix() {
        let mut e = engine(make_module(&[(0, note(49))]));
        e.play();
        let full = e.render_frame();

        let mut e = Engine::with_module(
            make_module(&[(0, note(49))]),
            EngineConfig { sample_rate: RATE, master_volume: 0.5 },
        );
        e.play();
        let half = e.render_frame();
        assert_eq!(half.left, full.left * 0.5);
    }

    #[test]
    fn set_speed_changes_row_length() {
        let fast = Cell { effect: Effect::SetSpeed, param: 2, ..Cell::empty() };
        let mut e = engine(make_module(&[(0, fast)]));
        e.play();
        let spt = e.samples_per_tick() as usize;
        e.render_frames(2 * spt);
        assert_eq!(e.row(), 1);
    }

    #[test]
    fn song_end_resets_and_loops() {
        let mut e = engine(make_module(&[(0, Cell { effect: Effect::SetTempo, param: 200, ..note(49) })]));
        let log = record(&mut e);
        e.play();
        assert_eq!(e.bpm(), 200);

        let spt = e.samples_per_tick() as usize;
        e.render_frames(4 * 6 * spt);
        let ended = log
            .lock()
            .unwrap()
            .iter()
            .filter(|n| **n == Notification::SongEnded)
            .count();
        assert_eq!(ended, 1);
        assert!(e.is_playing());
        assert_eq!((e.order(), e.row()), (0, 0));
        // row 0 ran again and set the tempo again after the reset
        assert_eq!(e.bpm(), 200);
    }

    #[test]
    fn break_in_last_order_keeps_playing() {
        let row0 = Cell { effect: Effect::SetSpeed, param: 2, ..note(49) };
        let row1 = Cell { effect: Effect::PatternBreak, param: 1, ..Cell::empty() };
        let mut e = engine(make_module(&[(0, row0), (1, row1)]));
        let log = record(&mut e);
        e.play();
        let spt = e.samples_per_tick() as usize;
        e.render_frames(4 * 2 * spt);

        assert!(!log.lock().unwrap().contains(&Notification::SongEnded));
        assert!(e.is_playing());
        assert_eq!((e.order(), e.row()), (0, 1));
        assert_eq!(e.ticks_per_row(), 2);
        assert!(e.render_frame().left > 0.0);
    }

    #[test]
    fn note_delay_past_row_end_does_not_mute_next_note() {
        let row0 = Cell { effect: Effect::NoteDelay, param: 0x0F, ..note(49) };
        let row1 = Cell { note: Note::On(49), ..Cell::empty() };
        let mut e = engine(make_module(&[(0, row0), (1, row1)]));
        e.play();
        let row_frames = (e.ticks_per_row() * e.samples_per_tick()) as usize;

        assert!(e.render_frames(row_frames).iter().all(|f| *f == Frame::silence()));
        assert_eq!(e.row(), 1);
        assert!(e.render_frame().left > 0.0);
    }

    #[test]
    fn volume_column_runs_before_cell_effect() {
        // fine slide up 4 in the volume column, then set volume 32
        let cell = Cell { volume: Some(0x94), effect: Effect::SetVolume, param: 32, ..note(49) };
        let mut e = engine(make_module(&[(0, cell)]));
        e.play();
        assert_eq!(e.state().channels[0].volume.channel, 0.5);
    }

    #[test]
    fn unresolvable_pattern_stops_playback() {
        let mut m = make_module(&[]);
        m.orders.push(OrderEntry::Pattern(9));
        let mut e = engine(m);
        let log = record(&mut e);
        e.play();
        let spt = e.samples_per_tick() as usize;
        e.render_frames(4 * 6 * spt);

        assert!(!e.is_playing());
        assert_eq!((e.order(), e.row()), (0, 0));
        let events = log.lock().unwrap();
        let end = events.iter().position(|n| *n == Notification::SongEnded);
        let stop = events.iter().position(|n| *n == Notification::PlayStopped);
        assert!(end.is_some() && end < stop);
        drop(events);

        // playing again starts over from the first row
        log.lock().unwrap().clear();
        e.play();
        assert!(log.lock().unwrap().contains(&Notification::RowChanged { row: 0, rows: 4 }));
    }
}
