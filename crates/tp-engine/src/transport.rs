//! Transport commands and read accessors.
//!
//! Transport calls mutate the engine between render calls. When another
//! thread drives the transport, send [`Command`]s and apply them at the
//! start of each render block instead.

use heapless::String;
use tp_ir::Cell;

use crate::events::Notification;
use crate::mixer::{process_tick, reset_playback, Engine};

/// Transport operation, applied between render blocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Play,
    Stop,
    Rewind,
    PrevOrder,
    NextOrder,
    RestartOrder,
    SetMute { channel: usize, muted: bool },
    SetPatternLoop(bool),
}

impl Engine {
    /// Apply a transport command.
    pub fn apply(&mut self, command: Command) {
        match command {
            Command::Play => self.play(),
            Command::Stop => self.stop(),
            Command::Rewind => self.rewind(),
            Command::PrevOrder => self.prev_order(),
            Command::NextOrder => self.next_order(),
            Command::RestartOrder => self.restart_order(),
            Command::SetMute { channel, muted } => self.set_mute(channel, muted),
            Command::SetPatternLoop(enabled) => self.set_pattern_loop(enabled),
        }
    }

    /// Start or resume playback.
    pub fn play(&mut self) {
        let Some(module) = self.module.as_ref() else {
            return;
        };
        if self.state.globals.playing {
            return;
        }
        tracing::debug!(order = self.state.globals.seq.order, row = self.state.globals.seq.row, "play");
        self.bus.dispatch(&Notification::PlayStarted);
        if self.tick_pending {
            process_tick(module, &mut self.state, &mut self.bus);
            self.tick_pending = false;
        }
        self.state.globals.playing = true;
    }

    /// Pause playback. Position and voices are kept.
    pub fn stop(&mut self) {
        if !self.state.globals.playing {
            return;
        }
        tracing::debug!("stop");
        self.state.globals.playing = false;
        self.bus.dispatch(&Notification::PlayStopped);
    }

    /// Return to the start of the song and reset all playback state.
    pub fn rewind(&mut self) {
        let Some(module) = self.module.as_ref() else {
            return;
        };
        tracing::debug!("rewind");
        self.state.globals.seq.rewind(module);
        reset_playback(module, &mut self.state, &self.config);
        self.tick_pending = true;
        if self.state.globals.playing {
            process_tick(module, &mut self.state, &mut self.bus);
            self.tick_pending = false;
        }
    }

    /// Step back one order, skipping skip markers.
    pub fn prev_order(&mut self) {
        let Some(module) = self.module.as_ref() else {
            return;
        };
        let current = self.state.globals.seq.order;
        let target = module.prev_playable_order(current).unwrap_or(current);
        self.goto_order(target);
    }

    /// Step forward one order, bounded by the order list.
    pub fn next_order(&mut self) {
        let Some(module) = self.module.as_ref() else {
            return;
        };
        let current = self.state.globals.seq.order;
        let target = module.next_playable_order(current + 1).unwrap_or(current);
        self.goto_order(target);
    }

    /// Restart the current order from its first row.
    pub fn restart_order(&mut self) {
        let current = self.state.globals.seq.order;
        self.goto_order(current);
    }

    fn goto_order(&mut self, order: usize) {
        let Some(module) = self.module.as_ref() else {
            return;
        };
        tracing::debug!(order, "jump to order");
        let state = &mut self.state;
        for (voice, settings) in state.channels.iter_mut().zip(&module.channels) {
            voice.reset(settings.pan_position());
        }
        state.globals.seq.jump_to_order(order);
        state.globals.sample_count = 0;
        process_tick(module, state, &mut self.bus);
        self.tick_pending = false;
    }

    /// Mute or unmute a channel. Out-of-range channels are ignored.
    pub fn set_mute(&mut self, channel: usize, muted: bool) {
        if let Some(voice) = self.state.channels.get_mut(channel) {
            voice.muted = muted;
        }
    }

    /// Keep playing the current pattern instead of advancing orders.
    pub fn set_pattern_loop(&mut self, enabled: bool) {
        self.state.globals.seq.pattern_loop = enabled;
    }

    pub fn song_name(&self) -> &str {
        self.module.as_ref().map_or("", |m| m.name.as_str())
    }

    pub fn song_length(&self) -> usize {
        self.module.as_ref().map_or(0, |m| m.song_length())
    }

    pub fn num_channels(&self) -> usize {
        self.state.channels.len()
    }

    pub fn order(&self) -> usize {
        self.state.globals.seq.order
    }

    /// Pattern index played at the current order.
    pub fn pattern_index(&self) -> Option<u8> {
        self.module
            .as_ref()
            .and_then(|m| m.pattern_index(self.state.globals.seq.order))
    }

    pub fn row(&self) -> u16 {
        self.state.globals.seq.row
    }

    /// Row count of the current pattern.
    pub fn pattern_rows(&self) -> u16 {
        self.module
            .as_ref()
            .and_then(|m| self.state.globals.seq.pattern(m))
            .map_or(0, |p| p.rows)
    }

    pub fn bpm(&self) -> u16 {
        self.state.globals.timing.bpm
    }

    pub fn ticks_per_row(&self) -> u32 {
        self.state.globals.timing.ticks_per_row
    }

    pub fn samples_per_tick(&self) -> u32 {
        self.state.globals.timing.samples_per_tick
    }

    pub fn sample_rate(&self) -> u32 {
        self.state.globals.timing.sample_rate
    }

    pub fn master_volume(&self) -> f32 {
        self.state.globals.master_volume
    }

    pub fn is_playing(&self) -> bool {
        self.state.globals.playing
    }

    pub fn is_pattern_loop(&self) -> bool {
        self.state.globals.seq.pattern_loop
    }

    pub fn is_muted(&self, channel: usize) -> bool {
        self.state.channels.get(channel).is_some_and(|v| v.muted)
    }

    /// Effective volume of a channel: sample volume x channel volume x
    /// master volume.
    pub fn channel_volume(&self, channel: usize) -> f32 {
        let Some(voice) = self.state.channels.get(channel) else {
            return 0.0;
        };
        voice.volume.sample * voice.volume.channel * self.state.globals.master_volume
    }

    /// Name of the instrument sounding on a channel, or `""` when silent.
    pub fn channel_instrument_name(&self, channel: usize) -> &str {
        let (Some(module), Some(voice)) = (self.module.as_ref(), self.state.channels.get(channel)) else {
            return "";
        };
        if !voice.is_active() {
            return "";
        }
        module.instrument(voice.instrument).map_or("", |i| i.name.as_str())
    }

    /// Tracker text for a cell of the current pattern, e.g. `C-5 01 40 A0F`.
    pub fn note_text(&self, channel: usize, row: u16) -> String<16> {
        use core::fmt::Write;

        let cell = self
            .module
            .as_ref()
            .and_then(|m| self.state.globals.seq.pattern(m))
            .and_then(|p| p.get(row as usize, channel))
            .copied()
            .unwrap_or_else(Cell::empty);
        let mut text = String::new();
        let _ = write!(text, "{}", cell);
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::EngineConfig;
    use tp_ir::{Effect, Instrument, Module, Note, OrderEntry, Pattern, Sample, SampleData};

    fn module() -> Module {
        let mut m = Module::with_channels("transport", 2);
        let mut s = Sample::new("s");
        s.data = SampleData::Mono8(vec![32; 50_000]);
        s.volume = 32;
        let key = m.samples.insert(s);
        let mut inst = Instrument::new("lead");
        inst.set_single_sample(key);
        m.instruments.push(inst);

        for _ in 0..2 {
            m.patterns.push(Pattern::new(8, 2));
        }
        *m.patterns[0].cell_mut(0, 0) = Cell {
            note: Note::On(61),
            instrument: 1,
            volume: Some(0x40),
            effect: Effect::VolumeSlide,
            param: 0x0F,
        };
        m.orders = vec![
            OrderEntry::Pattern(0),
            OrderEntry::Skip,
            OrderEntry::Pattern(1),
            OrderEntry::Pattern(0),
        ];
        m
    }

    fn engine() -> Engine {
        Engine::with_module(module(), EngineConfig { sample_rate: 8000, master_volume: 1.0 })
    }

    #[test]
    fn order_navigation_skips_markers() {
        let mut e = engine();
        e.next_order();
        assert_eq!((e.order(), e.pattern_index()), (2, Some(1)));
        e.next_order();
        assert_eq!(e.order(), 3);
        e.next_order();
        assert_eq!(e.order(), 3);
        e.prev_order();
        assert_eq!(e.order(), 2);
        e.prev_order();
        assert_eq!(e.order(), 0);
        e.prev_order();
        assert_eq!(e.order(), 0);
    }

    #[test]
    fn navigation_resets_row_and_voices() {
        let mut e = engine();
        e.play();
        let spt = e.samples_per_tick() as usize;
        e.render_frames(6 * spt * 3);
        assert_eq!(e.row(), 3);

        e.restart_order();
        assert_eq!((e.order(), e.row()), (0, 0));
        assert_eq!(e.channel_instrument_name(0), "lead");
    }

    #[test]
    fn accessors_after_trigger() {
        let mut e = engine();
        e.play();
        assert_eq!(e.song_name(), "transport");
        assert_eq!(e.song_length(), 4);
        assert_eq!(e.pattern_rows(), 8);
        assert_eq!(e.bpm(), 125);
        assert_eq!(e.ticks_per_row(), 6);
        assert_eq!(e.channel_volume(0), 0.5);
        assert_eq!(e.channel_volume(1), 0.0);
        assert_eq!(e.channel_instrument_name(0), "lead");
        assert_eq!(e.channel_instrument_name(1), "");
        assert_eq!(e.note_text(0, 0).as_str(), "C-5 01 40 A0F");
        assert_eq!(e.note_text(1, 0).as_str(), "... .. .. ...");
        assert_eq!(e.note_text(5, 0).as_str(), "... .. .. ...");
    }

    #[test]
    fn mute_survives_rewind() {
        let mut e = engine();
        e.apply(Command::SetMute { channel: 1, muted: true });
        e.apply(Command::SetMute { channel: 7, muted: true });
        e.apply(Command::Rewind);
        assert!(e.is_muted(1));
        assert!(!e.is_muted(0));
        assert!(!e.is_muted(7));
    }

    #[test]
    fn stop_and_resume_keeps_position() {
        let mut e = engine();
        e.apply(Command::Play);
        let spt = e.samples_per_tick() as usize;
        e.render_frames(6 * spt + 10);
        e.apply(Command::Stop);
        assert!(!e.is_playing());
        e.render_frames(1000);
        assert_eq!(e.row(), 1);
        e.apply(Command::Play);
        assert!(e.is_playing());
        assert_eq!(e.row(), 1);
    }

    #[test]
    fn pattern_loop_command() {
        let mut e = engine();
        e.apply(Command::SetPatternLoop(true));
        assert!(e.is_pattern_loop());
        e.play();
        let spt = e.samples_per_tick() as usize;
        e.render_frames(6 * spt * 9);
        assert_eq!((e.order(), e.row()), (0, 1));
    }
}
