//! MIDI input: message decoding and controller-to-parameter mappings.

use gb_ir::{MachineId, ParamGroup};

/// Routes one controller on one channel to a machine parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MidiMapping {
    pub machine: MachineId,
    pub group: ParamGroup,
    pub track: u16,
    pub column: u16,
    pub channel: u8,
    pub controller: u8,
}

#[derive(Clone, Debug, Default)]
pub struct MidiMappings {
    mappings: Vec<MidiMapping>,
}

impl MidiMappings {
    /// Add a mapping unless an identical one exists. Returns true if added.
    pub fn add(&mut self, mapping: MidiMapping) -> bool {
        if self.mappings.contains(&mapping) {
            return false;
        }
        self.mappings.push(mapping);
        true
    }

    pub fn remove(&mut self, mapping: &MidiMapping) -> bool {
        let before = self.mappings.len();
        self.mappings.retain(|m| m != mapping);
        before != self.mappings.len()
    }

    pub fn remove_machine(&mut self, machine: MachineId) {
        self.mappings.retain(|m| m.machine != machine);
    }

    /// Mappings listening to `controller` on `channel`.
    pub fn matching(&self, channel: u8, controller: u8) -> impl Iterator<Item = &MidiMapping> {
        self.mappings.iter().filter(move |m| m.channel == channel && m.controller == controller)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MidiMapping> {
        self.mappings.iter()
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    pub fn clear(&mut self) {
        self.mappings.clear();
    }
}

/// A decoded channel message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MidiMessage {
    /// Note on, or note off with velocity 0.
    Note { channel: u8, note: u8, velocity: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
}

impl MidiMessage {
    /// Decode a raw `(status, data1, data2)` triple. Messages the engine
    /// does not route decode to `None`.
    pub fn decode(status: u8, data1: u8, data2: u8) -> Option<Self> {
        let channel = status & 0x0f;
        match status >> 4 {
            0x8 => Some(MidiMessage::Note { channel, note: data1, velocity: 0 }),
            0x9 => Some(MidiMessage::Note { channel, note: data1, velocity: data2 }),
            0xb => Some(MidiMessage::ControlChange { channel, controller: data1, value: data2 }),
            _ => None,
        }
    }
}
