//! Passthrough effect: hands its mixed input on unchanged.

use gb_ir::{MasterInfo, ParamGroup};

use crate::error::MachineError;
use crate::machine::{Machine, MachineInfo, MachineType, WorkMode};

pub static INFO: MachineInfo = MachineInfo {
    name: "Passthrough",
    short_name: "Pass",
    author: "gearbox",
    uri: "@gearbox/passthrough",
    machine_type: MachineType::Effect,
    global_params: &[],
    track_params: &[],
    min_tracks: 0,
    max_tracks: 0,
    no_output: false,
    does_input_mixing: false,
};

pub struct PassthroughMachine;

impl Machine for PassthroughMachine {
    fn info(&self) -> &'static MachineInfo {
        &INFO
    }

    fn init(&mut self, _data: &[u8], _master: &MasterInfo) -> Result<(), MachineError> {
        Ok(())
    }

    fn work(&mut self, _buffer: [&mut [f32]; 2], mode: WorkMode) -> bool {
        mode.reads()
    }

    fn set_param(&mut self, _group: ParamGroup, _track: u16, _column: u16, _value: i32) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_leaves_buffer_unchanged() {
        let mut m = PassthroughMachine;
        m.init(&[], &MasterInfo::default()).unwrap();
        let mut l = [0.5f32, -0.3];
        let mut r = [0.8f32, -0.1];
        assert!(m.work([&mut l, &mut r], WorkMode::ReadWrite));
        assert_eq!(l, [0.5, -0.3]);
        assert_eq!(r, [0.8, -0.1]);
    }

    #[test]
    fn passthrough_is_inactive_without_input() {
        let mut m = PassthroughMachine;
        let mut l = [0.0f32; 2];
        let mut r = [0.0f32; 2];
        assert!(!m.work([&mut l, &mut r], WorkMode::Write));
    }
}
