//! CPAL-based audio output backend.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use gb_engine::Player;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use crate::interleave::interleave;
use crate::traits::{AudioError, AudioOutput};

/// CPAL-based audio output. The device callback renders straight from the
/// player.
pub struct CpalOutput {
    device: Device,
    config: StreamConfig,
    stream: Option<Stream>,
    player: Arc<Player>,
    running: Arc<AtomicBool>,
}

impl CpalOutput {
    /// Open the default output device for `player`.
    pub fn new(player: Arc<Player>) -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(AudioError::NoDevice)?;

        let config = device
            .default_output_config()
            .map_err(|e| AudioError::DeviceInit(e.to_string()))?;

        let mut config: StreamConfig = config.into();
        // Force stereo output
        config.channels = 2;
        player.set_sample_rate(config.sample_rate.0);
        info!(
            device = %device.name().unwrap_or_default(),
            sample_rate = config.sample_rate.0,
            "audio device opened"
        );

        Ok(Self {
            device,
            config,
            stream: None,
            player,
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Build and start the audio stream.
    pub fn build_stream(&mut self) -> Result<(), AudioError> {
        let running = self.running.clone();
        let player = self.player.clone();
        let channels = self.config.channels as usize;

        let stream = self.device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if !running.load(Ordering::Relaxed) {
                        data.fill(0.0);
                        return;
                    }
                    interleave(&player, data, channels);
                },
                |err| warn!(%err, "audio stream error"),
                None,
            )
            .map_err(|e| AudioError::StreamCreate(e.to_string()))?;

        stream.play().map_err(|e| AudioError::Playback(e.to_string()))?;
        self.stream = Some(stream);

        Ok(())
    }
}

impl Drop for CpalOutput {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        self.stream.take();
        self.player.stop_work();
    }
}

impl AudioOutput for CpalOutput {
    fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    fn start(&mut self) -> Result<(), AudioError> {
        self.running.store(true, Ordering::Relaxed);
        if let Some(ref stream) = self.stream {
            stream.play().map_err(|e| AudioError::Playback(e.to_string()))?;
        }
        self.player.start_work();
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.running.store(false, Ordering::Relaxed);
        // edits are applied directly again
        self.player.stop_work();
        if let Some(ref stream) = self.stream {
            stream.pause().map_err(|e| AudioError::Playback(e.to_string()))?;
        }
        Ok(())
    }
}
