//! Sample-accurate tick scheduling.
//!
//! Splits each audio request into passes that never straddle a tick
//! boundary. A tick lasts `samples_per_tick` whole samples plus a share of
//! the fractional remainder: the remainder accumulates in a carry, and each
//! whole sample in the carry lengthens the tick that starts with it.

use gb_ir::{MasterInfo, MAX_BUFFER_SAMPLES};

/// Absorbs rounding error when the carry lands just under a whole sample.
const CARRY_EPSILON: f64 = 1e-9;

#[derive(Debug, Default)]
pub struct TickScheduler {
    carry: f64,
    next_position: u32,
    stop_requested: bool,
}

impl TickScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if the next pass starts a new tick.
    pub fn at_tick_boundary(&self, info: &MasterInfo) -> bool {
        info.tick_position == 0
    }

    /// Account for the tick that is starting: its share of the fraction.
    pub fn tick_started(&mut self, info: &MasterInfo) {
        self.carry += info.samples_per_tick_frac;
    }

    /// Samples in the current tick, including any carried sample.
    pub fn tick_length(&self, info: &MasterInfo) -> u32 {
        info.samples_per_tick + (self.carry + CARRY_EPSILON).floor() as u32
    }

    /// Size the next pass: at most `remaining` samples and at most one
    /// engine buffer, never past the end of the current tick.
    pub fn plan(&mut self, info: &MasterInfo, remaining: usize) -> usize {
        let whole = (self.carry + CARRY_EPSILON).floor();
        let left_in_tick = self.tick_length(info).saturating_sub(info.tick_position) as usize;
        let limit = MAX_BUFFER_SAMPLES.min(remaining);

        if left_in_tick > limit {
            self.next_position = info.tick_position + limit as u32;
            limit
        } else {
            self.carry -= whole;
            self.next_position = 0;
            left_in_tick
        }
    }

    /// Commit the pass planned by `plan`.
    pub fn finish(&mut self, info: &mut MasterInfo) {
        info.tick_position = self.next_position;
    }

    /// Stop once the tick in progress has been mixed.
    pub fn request_stop(&mut self) {
        self.stop_requested = true;
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested
    }

    /// Consume a pending stop request.
    pub fn take_stop_request(&mut self) -> bool {
        std::mem::take(&mut self.stop_requested)
    }

    pub fn clear_stop_request(&mut self) {
        self.stop_requested = false;
    }
}
