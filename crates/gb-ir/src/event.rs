//! Engine-originated notifications and transport state.

use crate::ids::MachineId;
use crate::pattern::ParamGroup;
use crate::wire::ConnectionKind;

/// Transport state of the player.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
    /// Graph stays resident but nothing is mixed.
    Muted,
    /// Like `Muted`, and tick processing is suspended too.
    Released,
}

impl TransportState {
    /// True if the evaluator should mix audio in this state.
    pub fn mixes(self) -> bool {
        !matches!(self, TransportState::Muted | TransportState::Released)
    }
}

/// What happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineEvent {
    TransportChanged(TransportState),
    MachineCreated,
    /// Queued after the machine is gone; `machine` no longer resolves.
    MachineDeleted { machine: MachineId },
    Connected { from: MachineId, to: MachineId, kind: ConnectionKind },
    Disconnected { from: MachineId, to: MachineId, kind: ConnectionKind },
    ParameterChanged { group: ParamGroup, track: u16, column: u16, value: i32 },
    /// Raw MIDI message as received.
    Midi { status: u8, data1: u8, data2: u8 },
}

/// A queued event plus the machine it concerns, if any.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Notification {
    pub origin: Option<MachineId>,
    pub event: EngineEvent,
}

impl Notification {
    pub fn new(origin: Option<MachineId>, event: EngineEvent) -> Self {
        Self { origin, event }
    }

    /// Notification with no originating machine.
    pub fn global(event: EngineEvent) -> Self {
        Self { origin: None, event }
    }

    /// True if this notification names `machine` as origin or endpoint.
    pub fn names(&self, machine: MachineId) -> bool {
        if self.origin == Some(machine) {
            return true;
        }
        match self.event {
            EngineEvent::Connected { from, to, .. } | EngineEvent::Disconnected { from, to, .. } => {
                from == machine || to == machine
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn muted_states_do_not_mix() {
        assert!(TransportState::Playing.mixes());
        assert!(TransportState::Stopped.mixes());
        assert!(!TransportState::Muted.mixes());
        assert!(!TransportState::Released.mixes());
    }

    #[test]
    fn names_matches_origin_and_endpoints() {
        let mut map: SlotMap<MachineId, ()> = SlotMap::with_key();
        let a = map.insert(());
        let b = map.insert(());
        let c = map.insert(());

        let created = Notification::new(Some(a), EngineEvent::MachineCreated);
        assert!(created.names(a));
        assert!(!created.names(b));

        let wired = Notification::global(EngineEvent::Connected {
            from: a,
            to: b,
            kind: ConnectionKind::Audio,
        });
        assert!(wired.names(a));
        assert!(wired.names(b));
        assert!(!wired.names(c));

        let gone = Notification::global(EngineEvent::MachineDeleted { machine: c });
        assert!(!gone.names(c));
    }
}
