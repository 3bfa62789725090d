//! Directed edges between machines and the audio pull they perform.

use gb_ir::{AudioWire, ConnectionKind, MachineId, WireParams, NO_VALUE};
use slotmap::SlotMap;

use crate::unit::Unit;

/// An edge owned by its destination machine.
#[derive(Clone, Debug)]
pub struct Connection {
    pub from: MachineId,
    pub to: MachineId,
    pub params: WireParams,
    /// Values last forwarded by an event connection, one per binding.
    pub(crate) last_values: Vec<i32>,
}

impl Connection {
    pub fn new(from: MachineId, to: MachineId, params: WireParams) -> Self {
        let last_values = match &params {
            WireParams::Event(bindings) => vec![NO_VALUE; bindings.len()],
            _ => Vec::new(),
        };
        Self { from, to, params, last_values }
    }

    pub fn kind(&self) -> ConnectionKind {
        self.params.kind()
    }

    pub fn audio(&self) -> Option<&AudioWire> {
        match &self.params {
            WireParams::Audio(wire) => Some(wire),
            _ => None,
        }
    }

    pub(crate) fn audio_mut(&mut self) -> Option<&mut AudioWire> {
        match &mut self.params {
            WireParams::Audio(wire) => Some(wire),
            _ => None,
        }
    }

    /// Forget forwarded state, as if freshly connected.
    pub(crate) fn reset(&mut self) {
        self.last_values.fill(NO_VALUE);
        if let WireParams::ParameterState(wire) = &mut self.params {
            wire.reset();
        }
    }
}

/// Reverse record of an edge, kept by the source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutputRef {
    pub to: MachineId,
    pub kind: ConnectionKind,
}

/// Blend the already-evaluated output of `from` into the buffer of `to`.
///
/// Returns the source's activity flag: true if it produced signal during
/// this pass, whether or not the wire let any of it through.
pub(crate) fn pull_audio(
    units: &mut SlotMap<MachineId, Unit>,
    from: MachineId,
    to: MachineId,
    wire: AudioWire,
    frames: usize,
) -> bool {
    let Some([dst, src]) = units.get_disjoint_mut([to, from]) else {
        return false;
    };
    if !src.active {
        return false;
    }
    if wire.amp > 0 {
        dst.buffer.mix_from_scaled(&src.buffer, frames, wire.gains());
    }
    true
}
