//! Sequencer tracks: pattern placements over tick-indexed time.

use alloc::vec::Vec;

use crate::ids::MachineId;

/// One placement in a sequence track.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeqEvent {
    /// Song tick at which the placement starts.
    pub tick: u32,
    /// Index into the bound machine's pattern list; `None` silences it.
    pub pattern: Option<u16>,
}

/// A track of placements driving one machine.
///
/// Events are kept sorted by tick with at most one event per tick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SequenceTrack {
    pub machine: MachineId,
    events: Vec<SeqEvent>,
}

impl SequenceTrack {
    /// Create an empty track bound to `machine`.
    pub fn new(machine: MachineId) -> Self {
        Self { machine, events: Vec::new() }
    }

    pub fn events(&self) -> &[SeqEvent] {
        &self.events
    }

    /// Place `pattern` at `tick`, replacing whatever was there.
    pub fn set_event(&mut self, tick: u32, pattern: Option<u16>) {
        let event = SeqEvent { tick, pattern };
        match self.events.binary_search_by(|e| e.tick.cmp(&tick)) {
            Ok(pos) => self.events[pos] = event,
            Err(pos) => self.events.insert(pos, event),
        }
    }

    /// Remove the event at `tick`. Returns true if one was removed.
    pub fn remove_event(&mut self, tick: u32) -> bool {
        match self.events.binary_search_by(|e| e.tick.cmp(&tick)) {
            Ok(pos) => {
                self.events.remove(pos);
                true
            }
            Err(_) => false,
        }
    }

    /// Event starting exactly at `tick`.
    pub fn event_at(&self, tick: u32) -> Option<&SeqEvent> {
        self.events
            .binary_search_by(|e| e.tick.cmp(&tick))
            .ok()
            .map(|pos| &self.events[pos])
    }

    /// Drop events referring to `pattern` and renumber later patterns.
    pub fn forget_pattern(&mut self, pattern: u16) {
        self.events.retain(|e| e.pattern != Some(pattern));
        for e in &mut self.events {
            if let Some(p) = e.pattern.as_mut() {
                if *p > pattern {
                    *p -= 1;
                }
            }
        }
    }
}
