//! Fixed-capacity stereo f32 buffer with planar layout.

use alloc::vec;
use alloc::vec::Vec;

/// Largest number of frames produced in one evaluation pass.
pub const MAX_BUFFER_SAMPLES: usize = 256;

/// Number of planes in every unit buffer.
pub const STEREO: usize = 2;

/// A stereo f32 buffer in planar layout.
///
/// Capacity is fixed at construction; every pass writes a prefix of
/// `frames` samples. `data[ch * capacity + frame]` addresses one sample.
#[derive(Clone, Debug)]
pub struct AudioBuffer {
    data: Vec<f32>,
    capacity: usize,
}

impl Default for AudioBuffer {
    fn default() -> Self {
        Self::new(MAX_BUFFER_SAMPLES)
    }
}

impl AudioBuffer {
    /// Create a new silent stereo buffer holding `capacity` frames.
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0.0; STEREO * capacity],
            capacity,
        }
    }

    /// Number of frames the buffer can hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Fill the whole buffer with zero.
    pub fn silence(&mut self) {
        self.data.fill(0.0);
    }

    /// Zero the first `frames` samples of both planes.
    pub fn silence_prefix(&mut self, frames: usize) {
        let frames = frames.min(self.capacity);
        for ch in 0..STEREO {
            self.channel_mut(ch)[..frames].fill(0.0);
        }
    }

    /// Read-only access to one plane.
    pub fn channel(&self, ch: usize) -> &[f32] {
        let start = ch * self.capacity;
        &self.data[start..start + self.capacity]
    }

    /// Mutable access to one plane.
    pub fn channel_mut(&mut self, ch: usize) -> &mut [f32] {
        let start = ch * self.capacity;
        &mut self.data[start..start + self.capacity]
    }

    /// Both planes, truncated to `frames`, for in-place processing.
    pub fn planes_mut(&mut self, frames: usize) -> [&mut [f32]; STEREO] {
        let frames = frames.min(self.capacity);
        let (left, right) = self.data.split_at_mut(self.capacity);
        [&mut left[..frames], &mut right[..frames]]
    }

    /// Add `frames` samples of `source` into this buffer with per-plane gain.
    pub fn mix_from_scaled(&mut self, source: &AudioBuffer, frames: usize, gain: [f32; STEREO]) {
        let frames = frames.min(self.capacity).min(source.capacity);
        for (ch, g) in gain.iter().enumerate() {
            if *g == 0.0 {
                continue;
            }
            let src = &source.channel(ch)[..frames];
            let dst = &mut self.channel_mut(ch)[..frames];
            for (d, s) in dst.iter_mut().zip(src) {
                *d += *s * *g;
            }
        }
    }

    /// Copy the first `frames` samples of both planes from `source`.
    pub fn copy_from(&mut self, source: &AudioBuffer, frames: usize) {
        let frames = frames.min(self.capacity).min(source.capacity);
        for ch in 0..STEREO {
            self.channel_mut(ch)[..frames].copy_from_slice(&source.channel(ch)[..frames]);
        }
    }

    /// True if the first `frames` samples of both planes are exactly zero.
    pub fn is_silent(&self, frames: usize) -> bool {
        let frames = frames.min(self.capacity);
        (0..STEREO).all(|ch| self.channel(ch)[..frames].iter().all(|&s| s == 0.0))
    }

    /// Scale the first `frames` samples of both planes by `gain`.
    pub fn apply_gain(&mut self, frames: usize, gain: f32) {
        let frames = frames.min(self.capacity);
        for ch in 0..STEREO {
            for s in &mut self.channel_mut(ch)[..frames] {
                *s *= gain;
            }
        }
    }
}
