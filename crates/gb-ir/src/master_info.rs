//! Transport timing shared by every machine during evaluation.

/// Default tempo of a fresh player.
pub const DEFAULT_BPM: u16 = 126;
/// Default tick resolution of a fresh player.
pub const DEFAULT_TPB: u16 = 4;
/// Default device rate.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Sample rate and tempo, plus the derived tick length.
///
/// A tick lasts `samples_per_second / ticks_per_second` samples, which is
/// rarely an integer. The whole part lives in `samples_per_tick`, the
/// remainder in `samples_per_tick_frac`; the scheduler spreads the
/// remainder over successive ticks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MasterInfo {
    pub samples_per_second: u32,
    pub beats_per_minute: f64,
    pub ticks_per_beat: u16,
    /// Derived: `beats_per_minute * ticks_per_beat / 60`.
    pub ticks_per_second: f64,
    /// Derived: whole samples per tick.
    pub samples_per_tick: u32,
    /// Derived: fractional samples per tick, in `[0, 1)`.
    pub samples_per_tick_frac: f64,
    /// Samples already produced in the current tick.
    pub tick_position: u32,
}

impl Default for MasterInfo {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE, DEFAULT_BPM as f64, DEFAULT_TPB)
    }
}

impl MasterInfo {
    /// Build timing info and derive the tick length.
    pub fn new(samples_per_second: u32, beats_per_minute: f64, ticks_per_beat: u16) -> Self {
        let mut info = Self {
            samples_per_second,
            beats_per_minute,
            ticks_per_beat,
            ticks_per_second: 0.0,
            samples_per_tick: 0,
            samples_per_tick_frac: 0.0,
            tick_position: 0,
        };
        info.update();
        info
    }

    /// Recompute the derived fields after a rate or tempo change.
    pub fn update(&mut self) {
        let tpb = self.ticks_per_beat.max(1) as f64;
        let bpm = if self.beats_per_minute > 0.0 { self.beats_per_minute } else { 1.0 };
        self.ticks_per_second = bpm * tpb / 60.0;
        // a tick never lasts less than one sample
        let exact = (self.samples_per_second as f64 / self.ticks_per_second).max(1.0);
        let whole = libm::floor(exact);
        self.samples_per_tick = whole as u32;
        self.samples_per_tick_frac = exact - whole;
    }

    /// Exact (fractional) tick length in samples.
    pub fn exact_samples_per_tick(&self) -> f64 {
        self.samples_per_tick as f64 + self.samples_per_tick_frac
    }

    pub fn set_sample_rate(&mut self, samples_per_second: u32) {
        self.samples_per_second = samples_per_second;
        self.update();
    }

    pub fn set_tempo(&mut self, beats_per_minute: f64, ticks_per_beat: u16) {
        self.beats_per_minute = beats_per_minute;
        self.ticks_per_beat = ticks_per_beat;
        self.update();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tempo_splits_tick_length() {
        // 44100 * 60 / (126 * 4) = 5250.0
        let info = MasterInfo::default();
        assert_eq!(info.samples_per_tick, 5250);
        assert!(info.samples_per_tick_frac.abs() < 1e-9);
    }

    #[test]
    fn fractional_tick_length() {
        // 44100 * 60 / (125 * 4) = 5292.0, 44100 * 60 / (127 * 4) = 5208.66...
        let info = MasterInfo::new(44_100, 127.0, 4);
        assert_eq!(info.samples_per_tick, 5208);
        assert!((info.samples_per_tick_frac - 0.661_417).abs() < 1e-5);
    }

    #[test]
    fn set_sample_rate_rederives() {
        let mut info = MasterInfo::default();
        info.set_sample_rate(48_000);
        assert_eq!(info.samples_per_tick, 5714);
        assert!((info.exact_samples_per_tick() - 48_000.0 * 60.0 / 504.0).abs() < 1e-9);
    }

    #[test]
    fn tick_lasts_at_least_one_sample() {
        let info = MasterInfo::new(0, 126.0, 4);
        assert_eq!(info.samples_per_tick, 1);
        assert_eq!(info.samples_per_tick_frac, 0.0);
        let info = MasterInfo::new(100, 500.0, 32);
        assert_eq!(info.samples_per_tick, 1);
    }

    #[test]
    fn zero_tempo_is_clamped() {
        let info = MasterInfo::new(44_100, 0.0, 0);
        assert!(info.ticks_per_second > 0.0);
    }
}
