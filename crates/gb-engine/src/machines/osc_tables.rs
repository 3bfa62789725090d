//! Shared single-cycle waveform tables.
//!
//! Built once on first use and read-only afterwards. Machines force the
//! tables during `init` so the audio thread never builds them.

use once_cell::sync::Lazy;

pub const TABLE_SIZE: usize = 2048;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Saw,
    Square,
    Triangle,
}

impl Waveform {
    pub fn from_param(value: i32) -> Self {
        match value {
            1 => Waveform::Saw,
            2 => Waveform::Square,
            3 => Waveform::Triangle,
            _ => Waveform::Sine,
        }
    }
}

pub struct OscTables {
    sine: Vec<f32>,
    saw: Vec<f32>,
    square: Vec<f32>,
    triangle: Vec<f32>,
}

impl OscTables {
    fn build() -> Self {
        let phase = |i: usize| i as f32 / TABLE_SIZE as f32;
        Self {
            sine: (0..TABLE_SIZE).map(|i| (phase(i) * std::f32::consts::TAU).sin()).collect(),
            saw: (0..TABLE_SIZE).map(|i| 2.0 * phase(i) - 1.0).collect(),
            square: (0..TABLE_SIZE).map(|i| if phase(i) < 0.5 { 1.0 } else { -1.0 }).collect(),
            triangle: (0..TABLE_SIZE)
                .map(|i| {
                    let p = phase(i);
                    if p < 0.5 { 4.0 * p - 1.0 } else { 3.0 - 4.0 * p }
                })
                .collect(),
        }
    }

    pub fn table(&self, wave: Waveform) -> &[f32] {
        match wave {
            Waveform::Sine => &self.sine,
            Waveform::Saw => &self.saw,
            Waveform::Square => &self.square,
            Waveform::Triangle => &self.triangle,
        }
    }
}

static TABLES: Lazy<OscTables> = Lazy::new(OscTables::build);

/// The process-wide tables.
pub fn tables() -> &'static OscTables {
    &TABLES
}
