//! Structural edits handed to the audio thread.
//!
//! An edit is prepared on the submitting thread: every container it will
//! install is built there. Applying it on the audio thread only swaps those
//! containers into place, and the replaced ones travel back to the
//! submitter inside the same `Edit` to be dropped off the audio thread.

use crossbeam_channel::{bounded, Receiver, Sender};
use gb_ir::{MachineId, Pattern, SequenceTrack};

use crate::connection::{Connection, OutputRef};
use crate::graph::Graph;
use crate::sequencer::Sequencing;
use crate::unit::{PatternCursor, Unit};

/// Input hook to run on the destination of a connection edit.
#[derive(Debug)]
pub(crate) enum InputChange {
    None,
    Added(String),
    Removed(String),
}

pub(crate) enum Edit {
    /// New input list for `to`, output list for `from`, and optionally
    /// `to`'s patterns reshaped for the changed input count.
    Connection {
        from: MachineId,
        to: MachineId,
        inputs: Vec<Connection>,
        outputs: Vec<OutputRef>,
        patterns: Option<Vec<Pattern>>,
        change: InputChange,
    },
    /// New pattern list for `machine`. `removed` names a pattern index that
    /// was deleted so the play cursor and sequence tracks can follow.
    Patterns {
        machine: MachineId,
        patterns: Vec<Pattern>,
        sequence: Option<Vec<SequenceTrack>>,
        removed: Option<u16>,
    },
    /// New track count and matching patterns for `machine`.
    Tracks {
        machine: MachineId,
        tracks: u16,
        patterns: Vec<Pattern>,
    },
    /// New set of song sequencer tracks.
    Sequence { tracks: Vec<SequenceTrack> },
}

impl Edit {
    /// Swap the prepared state into place. `self` holds the old state
    /// afterwards.
    pub(crate) fn apply(&mut self, graph: &mut Graph, seq: &mut Sequencing) {
        match self {
            Edit::Connection { from, to, inputs, outputs, patterns, change } => {
                if let Some(unit) = graph.units.get_mut(*from) {
                    std::mem::swap(&mut unit.outputs, outputs);
                }
                let Some(unit) = graph.units.get_mut(*to) else { return };
                keep_live_wires(&mut unit.inputs, inputs);
                std::mem::swap(&mut unit.inputs, inputs);
                if let Some(patterns) = patterns {
                    std::mem::swap(&mut unit.patterns, patterns);
                }
                match change {
                    InputChange::None => {}
                    InputChange::Added(name) => unit.machine.add_input(name),
                    InputChange::Removed(name) => unit.machine.delete_input(name),
                }
            }
            Edit::Patterns { machine, patterns, sequence, removed } => {
                if let Some(tracks) = sequence {
                    std::mem::swap(seq.song.tracks_mut(), tracks);
                }
                let Some(unit) = graph.units.get_mut(*machine) else { return };
                std::mem::swap(&mut unit.patterns, patterns);
                follow_removed_pattern(unit, *removed);
            }
            Edit::Tracks { machine, tracks, patterns } => {
                let Some(unit) = graph.units.get_mut(*machine) else { return };
                std::mem::swap(&mut unit.tracks, tracks);
                std::mem::swap(&mut unit.patterns, patterns);
                unit.machine.set_track_count(unit.tracks);
            }
            Edit::Sequence { tracks } => {
                std::mem::swap(seq.song.tracks_mut(), tracks);
            }
        }
    }
}

/// Move the current wire settings and forwarding state of every surviving
/// edge into `prepared`. Amp and pan may have changed since the edit was
/// built; the stale copies end up in `live` and go back to the submitter.
fn keep_live_wires(live: &mut [Connection], prepared: &mut [Connection]) {
    for cx in prepared.iter_mut() {
        let kind = cx.kind();
        if let Some(old) = live.iter_mut().find(|o| o.from == cx.from && o.kind() == kind) {
            std::mem::swap(&mut cx.params, &mut old.params);
            std::mem::swap(&mut cx.last_values, &mut old.last_values);
        }
    }
}

fn follow_removed_pattern(unit: &mut Unit, removed: Option<u16>) {
    let Some(cursor) = unit.cursor else { return };
    unit.cursor = match removed {
        Some(r) if cursor.pattern == r => None,
        Some(r) if cursor.pattern > r => Some(PatternCursor { pattern: cursor.pattern - 1, ..cursor }),
        _ => ((cursor.pattern as usize) < unit.patterns.len()).then_some(cursor),
    };
}

/// An edit waiting in the slot, with the way back to its submitter.
pub(crate) struct PendingEdit {
    edit: Edit,
    done: Sender<Edit>,
}

impl PendingEdit {
    /// Apply the edit and hand the old state back.
    pub(crate) fn complete(mut self, graph: &mut Graph, seq: &mut Sequencing) {
        self.edit.apply(graph, seq);
        let _ = self.done.send(self.edit);
    }
}

/// Single-slot handoff of edits to whichever thread renders audio.
pub(crate) struct EditChannel {
    tx: Sender<PendingEdit>,
    rx: Receiver<PendingEdit>,
}

impl EditChannel {
    pub(crate) fn new() -> Self {
        let (tx, rx) = bounded(1);
        Self { tx, rx }
    }

    /// Queue `edit`, waiting while another edit occupies the slot. The
    /// returned receiver yields the old state once the edit was applied.
    pub(crate) fn submit(&self, edit: Edit) -> Receiver<Edit> {
        let (done, completed) = bounded(1);
        // both ends live in `self`, so the channel cannot disconnect
        let _ = self.tx.send(PendingEdit { edit, done });
        completed
    }

    /// Take the pending edit, if any. Never blocks.
    pub(crate) fn take(&self) -> Option<PendingEdit> {
        self.rx.try_recv().ok()
    }

    pub(crate) fn is_pending(&self) -> bool {
        !self.rx.is_empty()
    }
}
