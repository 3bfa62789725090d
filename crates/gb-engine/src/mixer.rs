//! Pull-based graph evaluation.
//!
//! Each pass evaluates every machine at most once: no-output machines
//! first, then the remaining machines in registration order, then the
//! master. Evaluating a machine first pulls its audio inputs, so later
//! visits of an already-evaluated machine reuse its buffer.

use gb_ir::{MachineId, WireParams, AMP_MAX};
use slotmap::SlotMap;

use crate::connection::pull_audio;
use crate::machine::WorkMode;
use crate::registry::Registry;
use crate::unit::{EvalMark, Unit, WorkStats};

/// Evaluation settings shared by every machine in one pass.
#[derive(Clone, Copy)]
struct Pass {
    id: u64,
    frames: usize,
    master: MachineId,
    solo: Option<MachineId>,
}

/// The graph evaluator. Counts passes so machines can tell whether they
/// were already evaluated for the current one.
#[derive(Debug, Default)]
pub struct Mixer {
    pass: u64,
}

impl Mixer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of passes run so far.
    pub fn passes(&self) -> u64 {
        self.pass
    }

    /// Evaluate the graph for `frames` samples. The master's buffer holds
    /// the result afterwards.
    ///
    /// With `solo` set, the master only mixes that machine.
    pub fn render(&mut self, registry: &mut Registry, master: MachineId, frames: usize, solo: Option<MachineId>) {
        self.pass += 1;
        let pass = Pass { id: self.pass, frames, master, solo };
        let (units, order) = registry.split_mut();

        for &id in order {
            if units.get(id).is_some_and(Unit::no_output) {
                evaluate(units, id, pass);
            }
        }
        for &id in order {
            if id != master && units.get(id).is_some_and(|u| !u.no_output()) {
                evaluate(units, id, pass);
            }
        }
        evaluate(units, master, pass);
    }
}

/// Evaluate one machine for the current pass; returns whether it produced
/// output.
fn evaluate(units: &mut SlotMap<MachineId, Unit>, id: MachineId, pass: Pass) -> bool {
    let Some(unit) = units.get_mut(id) else {
        return false;
    };
    match unit.mark {
        EvalMark::Done(p) if p == pass.id => return unit.active,
        EvalMark::InProgress(p) if p == pass.id => {
            debug_assert!(false, "machine `{}` pulled during its own evaluation", unit.name);
            return false;
        }
        _ => {}
    }
    unit.mark = EvalMark::InProgress(pass.id);
    unit.buffer.silence_prefix(pass.frames);

    let inputs = std::mem::take(&mut unit.inputs);
    let mut audio_inputs = 0usize;
    let mut max_amp = 0u16;
    let mut input_active = false;

    for cx in &inputs {
        let WireParams::Audio(wire) = &cx.params else {
            continue;
        };
        audio_inputs += 1;
        max_amp = max_amp.max(wire.amp);

        // no-output sources ran first and are never mixed
        if units.get(cx.from).map_or(true, Unit::no_output) {
            continue;
        }
        if id == pass.master && pass.solo.is_some_and(|s| s != cx.from) {
            continue;
        }
        if evaluate(units, cx.from, pass) && pull_audio(units, cx.from, id, *wire, pass.frames) {
            input_active = true;
        }
    }

    let Some(unit) = units.get_mut(id) else {
        return false;
    };
    unit.inputs = inputs;

    let live = unit.info.does_input_mixing || !unit.buffer.is_silent(pass.frames);
    let mode = if audio_inputs > 0 && input_active && max_amp > 0 && live {
        WorkMode::ReadWrite
    } else {
        WorkMode::Write
    };

    let active = unit.machine.work(unit.buffer.planes_mut(pass.frames), mode);
    unit.active = active;
    unit.mark = EvalMark::Done(pass.id);
    unit.stats = Some(WorkStats {
        mode,
        max_input_amp: max_amp as f32 / AMP_MAX as f32,
        active,
    });
    active
}
