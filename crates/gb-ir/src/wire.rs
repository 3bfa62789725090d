//! Connection kinds and their per-edge parameters.

use alloc::vec::Vec;

use crate::pattern::{ParamGroup, NO_VALUE};

/// Full-scale wire amplitude (unity gain).
pub const AMP_MAX: u16 = 0x4000;
/// Centre pan position.
pub const PAN_CENTER: u16 = 0x4000;
/// Hard-right pan position.
pub const PAN_MAX: u16 = 0x8000;

/// What flows along a connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConnectionKind {
    Audio,
    Event,
    ParameterState,
}

/// Mix settings of an audio connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AudioWire {
    /// `0..=AMP_MAX`, linear.
    pub amp: u16,
    /// `0..=PAN_MAX`, `PAN_CENTER` is centre.
    pub pan: u16,
}

impl Default for AudioWire {
    fn default() -> Self {
        Self { amp: AMP_MAX, pan: PAN_CENTER }
    }
}

impl AudioWire {
    pub fn new(amp: u16, pan: u16) -> Self {
        Self { amp: amp.min(AMP_MAX), pan: pan.min(PAN_MAX) }
    }

    /// Linear amplitude in `0.0..=1.0`.
    pub fn amplitude(&self) -> f32 {
        self.amp as f32 / AMP_MAX as f32
    }

    /// Left/right gains: amplitude scaled by a pan law that keeps both
    /// sides at full level in the centre.
    pub fn gains(&self) -> [f32; 2] {
        let amp = self.amplitude();
        let pan = self.pan as f32 / PAN_MAX as f32;
        let left = (2.0 * (1.0 - pan)).min(1.0);
        let right = (2.0 * pan).min(1.0);
        [amp * left, amp * right]
    }
}

/// Address of one parameter on a machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ParamRef {
    pub group: ParamGroup,
    pub track: u16,
    pub column: u16,
}

impl ParamRef {
    pub const fn global(column: u16) -> Self {
        Self { group: ParamGroup::Global, track: 0, column }
    }

    pub const fn track(track: u16, column: u16) -> Self {
        Self { group: ParamGroup::Track, track, column }
    }
}

/// Forwards a global parameter of the source to a parameter of the
/// destination whenever the source value changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EventBinding {
    pub source_column: u16,
    pub target: ParamRef,
}

/// Per-track automation buffers carried by a parameter-state connection.
///
/// The source's track parameters are mirrored onto the destination track by
/// track. `tracks[t][c]` holds the value last forwarded for track parameter
/// `c` of track `t`, or `NO_VALUE` if nothing was forwarded yet.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParameterStateWire {
    pub tracks: Vec<Vec<i32>>,
}

impl ParameterStateWire {
    /// Empty buffers for `tracks` tracks of `columns` columns.
    pub fn new(tracks: u16, columns: u16) -> Self {
        Self {
            tracks: (0..tracks).map(|_| alloc::vec![NO_VALUE; columns as usize]).collect(),
        }
    }

    /// Copy resized to `tracks` tracks, keeping existing values.
    pub fn with_tracks(&self, tracks: u16, columns: u16) -> Self {
        let mut out = Self::new(tracks, columns);
        for (dst, src) in out.tracks.iter_mut().zip(&self.tracks) {
            for (d, s) in dst.iter_mut().zip(src) {
                *d = *s;
            }
        }
        out
    }

    /// Record `value` for a cell. Returns true if the cell exists and the
    /// value differs from the one last recorded.
    pub fn update(&mut self, track: u16, column: u16, value: i32) -> bool {
        match self.tracks.get_mut(track as usize).and_then(|t| t.get_mut(column as usize)) {
            Some(cell) if *cell != value => {
                *cell = value;
                true
            }
            _ => false,
        }
    }

    /// Forget every recorded value.
    pub fn reset(&mut self) {
        for track in &mut self.tracks {
            track.fill(NO_VALUE);
        }
    }
}

/// Kind-specific parameters of a connection.
#[derive(Clone, Debug, PartialEq)]
pub enum WireParams {
    Audio(AudioWire),
    Event(Vec<EventBinding>),
    ParameterState(ParameterStateWire),
}

impl WireParams {
    pub fn kind(&self) -> ConnectionKind {
        match self {
            WireParams::Audio(_) => ConnectionKind::Audio,
            WireParams::Event(_) => ConnectionKind::Event,
            WireParams::ParameterState(_) => ConnectionKind::ParameterState,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_wire_is_unity_centre() {
        let wire = AudioWire::default();
        assert_eq!(wire.gains(), [1.0, 1.0]);
    }

    #[test]
    fn hard_pan_mutes_opposite_side() {
        assert_eq!(AudioWire::new(AMP_MAX, 0).gains(), [1.0, 0.0]);
        assert_eq!(AudioWire::new(AMP_MAX, PAN_MAX).gains(), [0.0, 1.0]);
    }

    #[test]
    fn amp_is_clamped() {
        let wire = AudioWire::new(0xFFFF, 0xFFFF);
        assert_eq!(wire.amp, AMP_MAX);
        assert_eq!(wire.pan, PAN_MAX);
    }

    #[test]
    fn half_amp_halves_both_sides() {
        let wire = AudioWire::new(AMP_MAX / 2, PAN_CENTER);
        assert_eq!(wire.gains(), [0.5, 0.5]);
    }

    #[test]
    fn parameter_state_update_reports_changes() {
        let mut wire = ParameterStateWire::new(2, 3);
        assert!(wire.update(1, 2, 9));
        assert!(!wire.update(1, 2, 9));
        assert!(!wire.update(2, 0, 1));
        wire.reset();
        assert!(wire.update(1, 2, 9));
    }

    #[test]
    fn parameter_state_resize_keeps_values() {
        let mut wire = ParameterStateWire::new(1, 2);
        wire.update(0, 1, 4);
        let grown = wire.with_tracks(3, 2);
        assert_eq!(grown.tracks.len(), 3);
        assert_eq!(grown.tracks[0][1], 4);
        assert_eq!(grown.tracks[2][0], NO_VALUE);
    }
}
