//! Headless controller for gearbox.
//!
//! Owns a player and drives it either from the default audio device or
//! offline, so the CLI and tests share one API.

mod wav;

use crossbeam_channel::{bounded, Sender};
use gb_audio::{AudioError, AudioOutput, CpalOutput};
use gb_engine::{EngineConfig, EngineError, Player, TransportState, MAX_BUFFER_SAMPLES};
use std::sync::Arc;
use std::thread::JoinHandle;
use thiserror::Error;
use tracing::{debug, info, warn};

// Re-export common types so callers don't need gb-engine directly.
pub use gb_engine::{MachineId, Notification};

pub use wav::{planes_to_wav, to_pcm16, write_wav};

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Audio(#[from] AudioError),
    #[error("offline rendering needs the device playback stopped")]
    Busy,
    #[error("audio thread exited before reporting")]
    AudioThread,
}

/// Rendered stereo planes.
#[derive(Clone, Debug, Default)]
pub struct Rendered {
    pub left: Vec<f32>,
    pub right: Vec<f32>,
}

impl Rendered {
    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    pub fn peak(&self) -> f32 {
        self.left.iter().chain(&self.right).fold(0.0f32, |m, s| m.max(s.abs()))
    }
}

/// Headless controller: owns the player and manages device playback.
pub struct Controller {
    player: Arc<Player>,
    playback: Option<PlaybackHandle>,
}

struct PlaybackHandle {
    stop_signal: Sender<()>,
    thread: Option<JoinHandle<()>>,
}

impl Controller {
    pub fn new(config: &EngineConfig) -> Result<Self, ControllerError> {
        Ok(Self {
            player: Arc::new(Player::new(config)?),
            playback: None,
        })
    }

    pub fn player(&self) -> &Arc<Player> {
        &self.player
    }

    // --- Real-time playback ---

    /// Open the default device and start the transport.
    pub fn play(&mut self) -> Result<(), ControllerError> {
        self.stop();

        let (ready_tx, ready_rx) = bounded(1);
        let (stop_signal, stop_rx) = bounded::<()>(1);
        let player = self.player.clone();

        // the device stream stays on the thread that opened it
        let thread = std::thread::spawn(move || {
            let mut output = match open_output(player) {
                Ok(output) => output,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            let _ = ready_tx.send(Ok(output.sample_rate()));
            let _ = stop_rx.recv();
            if let Err(e) = output.stop() {
                warn!(%e, "stopping audio output");
            }
        });

        let sample_rate = match ready_rx.recv() {
            Ok(result) => result,
            Err(_) => Err(ControllerError::AudioThread),
        };
        let sample_rate = match sample_rate {
            Ok(rate) => rate,
            Err(e) => {
                let _ = thread.join();
                return Err(e);
            }
        };

        self.playback = Some(PlaybackHandle { stop_signal, thread: Some(thread) });
        self.player.set_state(TransportState::Playing);
        info!(sample_rate, "playback started");
        Ok(())
    }

    /// Stop the transport and close the device.
    pub fn stop(&mut self) {
        if let Some(mut pb) = self.playback.take() {
            let _ = pb.stop_signal.send(());
            if let Some(handle) = pb.thread.take() {
                let _ = handle.join();
            }
            debug!("playback stopped");
        }
        self.player.set_state(TransportState::Stopped);
    }

    pub fn is_playing(&self) -> bool {
        self.playback.is_some() && self.player.state() == TransportState::Playing
    }

    /// True once playback ran to the end of a non-looping song.
    pub fn is_finished(&self) -> bool {
        self.playback.is_some() && self.player.state() == TransportState::Stopped
    }

    // --- Offline rendering ---

    /// Play the song offline for at most `max_frames`, stopping early when
    /// a non-looping song ends.
    pub fn render_frames(&self, sample_rate: u32, max_frames: usize) -> Result<Rendered, ControllerError> {
        if self.playback.is_some() {
            return Err(ControllerError::Busy);
        }
        let player = &self.player;
        player.set_sample_rate(sample_rate);
        player.set_state(TransportState::Stopped);
        player.set_position(player.song_begin());
        player.set_state(TransportState::Playing);

        let mut out = Rendered {
            left: Vec::with_capacity(max_frames),
            right: Vec::with_capacity(max_frames),
        };
        let mut left = [0.0f32; MAX_BUFFER_SAMPLES];
        let mut right = [0.0f32; MAX_BUFFER_SAMPLES];
        while out.len() < max_frames && player.state() == TransportState::Playing {
            let n = MAX_BUFFER_SAMPLES.min(max_frames - out.len());
            player.work_stereo(&mut left[..n], &mut right[..n]);
            out.left.extend_from_slice(&left[..n]);
            out.right.extend_from_slice(&right[..n]);
        }
        player.set_state(TransportState::Stopped);
        debug!(frames = out.len(), "offline render done");
        Ok(out)
    }

    pub fn render_to_wav(&self, sample_rate: u32, max_seconds: u32) -> Result<Vec<u8>, ControllerError> {
        let max_frames = (sample_rate * max_seconds) as usize;
        let rendered = self.render_frames(sample_rate, max_frames)?;
        Ok(wav::planes_to_wav(&rendered.left, &rendered.right, sample_rate))
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.stop();
    }
}

fn open_output(player: Arc<Player>) -> Result<CpalOutput, ControllerError> {
    let mut output = CpalOutput::new(player)?;
    output.build_stream()?;
    output.start()?;
    Ok(output)
}
