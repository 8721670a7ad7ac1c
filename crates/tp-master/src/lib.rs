//! Headless controller for trackplay.
//!
//! Owns the loaded module, runs an [`Engine`] inside the audio sink's
//! callback and talks to it through lock-free queues. Also renders
//! offline without an audio device.

mod realtime;
mod status;
mod wav;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ringbuf::traits::{Consumer, Producer};
use tp_audio::{AudioError, AudioSink, CpalOutput};
use tp_engine::{Command, Engine, EngineConfig, EventBus};

// Re-export common types so callers don't need tp-ir/tp-engine directly.
pub use status::{PlaybackSnapshot, PlaybackStatus};
pub use tp_engine::{Frame, Notification, Subscription};
pub use tp_formats::FormatError;
pub use tp_ir::Module;
pub use wav::{frames_to_wav, write_wav};

use realtime::SessionQueues;

/// Error type for controller operations.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Audio(#[from] AudioError),
    #[error("no module loaded")]
    NoModule,
    #[error("playback has not been started")]
    NotStarted,
    #[error("command queue is full")]
    QueueFull,
}

/// Queue sizes for a playback session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Transport commands in flight to the audio thread
    pub command_capacity: usize,
    /// Notifications buffered between polls
    pub notification_capacity: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            command_capacity: 64,
            notification_capacity: 1024,
        }
    }
}

/// Settings for an offline render.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderOptions {
    pub sample_rate: u32,
    /// Upper bound on rendered length
    pub max_frames: usize,
    /// Repeat the first pattern instead of following the order list
    pub pattern_loop: bool,
    /// Channels to mute
    pub muted: Vec<usize>,
}

impl RenderOptions {
    pub fn new(sample_rate: u32, max_seconds: u32) -> Self {
        Self {
            sample_rate,
            max_frames: sample_rate as usize * max_seconds as usize,
            pattern_loop: false,
            muted: Vec::new(),
        }
    }
}

/// Headless tracker controller: owns a module and manages playback.
pub struct Controller {
    module: Option<Module>,
    config: ControllerConfig,
    status: Arc<PlaybackStatus>,
    bus: EventBus,
    session: Option<Session>,
}

struct Session {
    output: CpalOutput,
    queues: SessionQueues,
}

impl Controller {
    pub fn new(config: ControllerConfig) -> Self {
        Self {
            module: None,
            config,
            status: Arc::new(PlaybackStatus::new()),
            bus: EventBus::new(),
            session: None,
        }
    }

    // --- Module management ---

    pub fn module(&self) -> Option<&Module> {
        self.module.as_ref()
    }

    /// Replace the module, ending any playback session.
    pub fn load(&mut self, module: Module) {
        self.shutdown();
        tracing::info!(name = module.name.as_str(), "controller module loaded");
        self.module = Some(module);
    }

    pub fn load_mod(&mut self, data: &[u8]) -> Result<(), ControllerError> {
        let module = tp_formats::load_mod(data)?;
        self.load(module);
        Ok(())
    }

    // --- Real-time playback ---

    /// Start or resume playback on the default audio device.
    pub fn play(&mut self) -> Result<(), ControllerError> {
        if self.session.is_some() {
            return self.send(Command::Play);
        }
        let module = self.module.clone().ok_or(ControllerError::NoModule)?;

        let mut output = CpalOutput::new()?;
        let config = EngineConfig {
            sample_rate: output.sample_rate(),
            ..EngineConfig::default()
        };
        let mut engine = Engine::with_module(module, config);
        engine.play();

        let (queues, render) = realtime::connect(
            engine,
            self.config.command_capacity,
            self.config.notification_capacity,
            Arc::clone(&self.status),
        );
        output.start(Box::new(render))?;
        tracing::debug!(sample_rate = config.sample_rate, "playback session started");
        self.session = Some(Session { output, queues });
        Ok(())
    }

    /// Pause playback; the stream keeps running and renders silence.
    pub fn stop(&mut self) -> Result<(), ControllerError> {
        self.send(Command::Stop)
    }

    pub fn rewind(&mut self) -> Result<(), ControllerError> {
        self.send(Command::Rewind)
    }

    pub fn prev_order(&mut self) -> Result<(), ControllerError> {
        self.send(Command::PrevOrder)
    }

    pub fn next_order(&mut self) -> Result<(), ControllerError> {
        self.send(Command::NextOrder)
    }

    pub fn restart_order(&mut self) -> Result<(), ControllerError> {
        self.send(Command::RestartOrder)
    }

    pub fn set_mute(&mut self, channel: usize, muted: bool) -> Result<(), ControllerError> {
        self.send(Command::SetMute { channel, muted })
    }

    pub fn set_pattern_loop(&mut self, enabled: bool) -> Result<(), ControllerError> {
        self.send(Command::SetPatternLoop(enabled))
    }

    fn send(&mut self, command: Command) -> Result<(), ControllerError> {
        let session = self.session.as_mut().ok_or(ControllerError::NotStarted)?;
        session
            .queues
            .commands
            .try_push(command)
            .map_err(|_| ControllerError::QueueFull)
    }

    /// Close the audio stream and drop the session's engine.
    pub fn shutdown(&mut self) {
        if let Some(mut session) = self.session.take() {
            if let Err(err) = session.output.stop() {
                tracing::warn!(%err, "failed to stop audio stream");
            }
            self.status = Arc::new(PlaybackStatus::new());
        }
    }

    pub fn is_started(&self) -> bool {
        self.session.is_some()
    }

    /// Position published by the audio thread after its last block.
    pub fn status(&self) -> PlaybackSnapshot {
        self.status.snapshot()
    }

    /// Observers for notifications delivered by [`Controller::poll_notifications`].
    pub fn events(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    /// Dispatch notifications queued by the audio thread to this
    /// controller's observers. Returns how many were delivered.
    pub fn poll_notifications(&mut self) -> usize {
        let Some(session) = self.session.as_mut() else {
            return 0;
        };
        let mut count = 0;
        while let Some(notification) = session.queues.notifications.try_pop() {
            self.bus.dispatch(&notification);
            count += 1;
        }
        count
    }

    // --- Offline rendering ---

    /// Render from the start of the song until it ends, stops, or
    /// `max_frames` is reached.
    pub fn render_frames(&self, options: &RenderOptions) -> Result<Vec<Frame>, ControllerError> {
        let module = self.module.clone().ok_or(ControllerError::NoModule)?;
        let config = EngineConfig {
            sample_rate: options.sample_rate,
            ..EngineConfig::default()
        };
        let mut engine = Engine::with_module(module, config);
        if engine.module().is_none() {
            return Err(ControllerError::NoModule);
        }

        let ended = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ended);
        engine
            .events()
            .subscribe(Subscription::SongEnded, move |_| flag.store(true, Ordering::Relaxed));
        engine.set_pattern_loop(options.pattern_loop);
        for &channel in &options.muted {
            engine.set_mute(channel, true);
        }
        engine.play();

        let mut frames = Vec::with_capacity(options.max_frames.min(options.sample_rate as usize * 60));
        while frames.len() < options.max_frames
            && engine.is_playing()
            && !ended.load(Ordering::Relaxed)
        {
            frames.push(engine.render_frame());
        }
        tracing::debug!(frames = frames.len(), "offline render finished");
        Ok(frames)
    }

    /// Render offline and encode as a 16-bit stereo WAV file image.
    pub fn render_to_wav(&self, options: &RenderOptions) -> Result<Vec<u8>, ControllerError> {
        let frames = self.render_frames(options)?;
        Ok(wav::frames_to_wav(&frames, options.sample_rate))
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new(ControllerConfig::default())
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tp_ir::{Cell, Effect, Instrument, Note, OrderEntry, Pattern, Sample, SampleData};

    fn module() -> Module {
        let mut m = Module::with_channels("offline", 2);
        let mut s = Sample::new("tone");
        s.data = SampleData::Mono8(vec![64; 100_000]);
        let key = m.samples.insert(s);
        let mut inst = Instrument::new("tone");
        inst.set_single_sample(key);
        m.instruments.push(inst);

        let mut p = Pattern::new(4, 2);
        *p.cell_mut(0, 1) = Cell { note: Note::On(49), instrument: 1, ..Cell::empty() };
        m.patterns.push(p);
        let mut p = Pattern::new(4, 2);
        *p.cell_mut(0, 0) = Cell { effect: Effect::SetSpeed, param: 3, ..Cell::empty() };
        m.patterns.push(p);
        m.orders = vec![OrderEntry::Pattern(0), OrderEntry::Pattern(1)];
        m
    }

    fn controller() -> Controller {
        let mut c = Controller::default();
        c.load(module());
        c
    }

    #[test]
    fn offline_render_stops_at_song_end() {
        let frames = controller().render_frames(&RenderOptions::new(1000, 60)).unwrap();
        // 20 frames per tick; 4 rows x 6 ticks then 4 rows x 3 ticks
        assert_eq!(frames.len(), 20 * (24 + 12));
        assert!(frames[0].right > 0.0);
    }

    #[test]
    fn offline_render_respects_cap_and_loop() {
        let mut options = RenderOptions::new(1000, 2);
        options.pattern_loop = true;
        let frames = controller().render_frames(&options).unwrap();
        assert_eq!(frames.len(), 2000);
    }

    #[test]
    fn muted_channels_render_silence() {
        let mut options = RenderOptions::new(1000, 1);
        options.muted = vec![1];
        let frames = controller().render_frames(&options).unwrap();
        assert!(frames.iter().all(|f| *f == Frame::silence()));
    }

    #[test]
    fn wav_render_has_header() {
        let wav = controller().render_to_wav(&RenderOptions::new(1000, 60)).unwrap();
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(wav.len(), 44 + 20 * 36 * 4);
    }

    #[test]
    fn no_module_errors() {
        let c = Controller::default();
        assert!(matches!(
            c.render_frames(&RenderOptions::new(1000, 1)),
            Err(ControllerError::NoModule)
        ));
        let mut c = Controller::default();
        assert!(matches!(c.rewind(), Err(ControllerError::NotStarted)));
        assert_eq!(c.poll_notifications(), 0);
    }
}
