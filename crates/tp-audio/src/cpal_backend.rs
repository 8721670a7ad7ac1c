//! CPAL-based audio output backend.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};

use crate::traits::{AudioError, AudioSink, RenderCallback};

/// Stereo frames rendered per pass when the device has more than two
/// channels.
const SCRATCH_FRAMES: usize = 1024;

/// CPAL-based audio output on the default device.
pub struct CpalOutput {
    device: Device,
    config: StreamConfig,
    stream: Option<Stream>,
}

impl CpalOutput {
    /// Open the default output device with its default sample rate.
    pub fn new() -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;

        let config = device
            .default_output_config()
            .map_err(|e| AudioError::DeviceInit(e.to_string()))?;
        let config: StreamConfig = config.into();

        tracing::info!(
            device = %device.name().unwrap_or_default(),
            sample_rate = config.sample_rate.0,
            channels = config.channels,
            "opened audio device"
        );
        Ok(Self {
            device,
            config,
            stream: None,
        })
    }

    fn build_stream(&self, mut render: RenderCallback) -> Result<Stream, AudioError> {
        let channels = self.config.channels as usize;
        let mut scratch = vec![0.0f32; SCRATCH_FRAMES * 2];

        self.device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if channels == 2 {
                        render(data);
                    } else {
                        for chunk in data.chunks_mut(SCRATCH_FRAMES * channels) {
                            let frames = chunk.len() / channels;
                            let stereo = &mut scratch[..frames * 2];
                            render(stereo);
                            spread_stereo(stereo, chunk, channels);
                        }
                    }
                },
                |err| tracing::error!(%err, "audio stream error"),
                None,
            )
            .map_err(|e| AudioError::StreamCreate(e.to_string()))
    }
}

/// Copy interleaved stereo into a device buffer with `channels` channels.
/// Mono devices get the average; extra channels are zeroed.
fn spread_stereo(stereo: &[f32], out: &mut [f32], channels: usize) {
    for (pair, frame) in stereo.chunks_exact(2).zip(out.chunks_mut(channels)) {
        if channels == 1 {
            frame[0] = 0.5 * (pair[0] + pair[1]);
            continue;
        }
        for (i, sample) in frame.iter_mut().enumerate() {
            *sample = match i {
                0 => pair[0],
                1 => pair[1],
                _ => 0.0,
            };
        }
    }
}

impl AudioSink for CpalOutput {
    fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    fn start(&mut self, render: RenderCallback) -> Result<(), AudioError> {
        self.stop()?;
        let stream = self.build_stream(render)?;
        stream.play().map_err(|e| AudioError::Playback(e.to_string()))?;
        self.stream = Some(stream);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        if let Some(stream) = self.stream.take() {
            stream.pause().map_err(|e| AudioError::Playback(e.to_string()))?;
        }
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.stream.is_some()
    }
}
