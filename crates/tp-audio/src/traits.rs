//! Audio sink trait and error types.

/// Fills an interleaved stereo buffer (`[l, r, l, r, ...]`). Called from
/// the audio thread; must not block or allocate.
pub type RenderCallback = Box<dyn FnMut(&mut [f32]) + Send>;

/// Error type for audio operations.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    /// Failed to initialize audio device
    #[error("device init error: {0}")]
    DeviceInit(String),
    /// Failed to create audio stream
    #[error("stream create error: {0}")]
    StreamCreate(String),
    /// Playback error
    #[error("playback error: {0}")]
    Playback(String),
    /// No audio device available
    #[error("no audio device available")]
    NoDevice,
}

/// Trait for audio output backends.
pub trait AudioSink {
    /// Output sample rate in Hz.
    fn sample_rate(&self) -> u32;

    /// Start pulling audio from `render`.
    fn start(&mut self, render: RenderCallback) -> Result<(), AudioError>;

    /// Stop the stream and drop the render callback.
    fn stop(&mut self) -> Result<(), AudioError>;

    /// True while a stream is running.
    fn is_running(&self) -> bool;
}
