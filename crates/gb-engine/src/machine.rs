//! Machine trait for audio generators, effects and the master.

use gb_ir::{MasterInfo, ParamGroup, AMP_MAX, NO_VALUE, PAN_CENTER, PAN_MAX};

use crate::error::MachineError;

/// Work mode indicating data flow direction for `Machine::work()`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkMode {
    /// No live input; the buffer starts silent.
    Write,
    /// Live input in the buffer, processed in place.
    ReadWrite,
}

impl WorkMode {
    /// True if the buffer holds live input signal.
    pub fn reads(self) -> bool {
        self == WorkMode::ReadWrite
    }
}

/// Whether a machine generates or processes audio.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MachineType {
    Generator,
    Effect,
    Master,
}

/// Metadata describing a machine's parameters.
pub struct ParamInfo {
    pub id: u16,
    pub name: &'static str,
    pub min: i32,
    pub max: i32,
    pub default: i32,
    pub no_value: i32,
}

impl ParamInfo {
    pub fn clamp(&self, value: i32) -> i32 {
        value.clamp(self.min, self.max)
    }

    /// Map a 7-bit controller value linearly onto `min..=max`.
    pub fn scale_midi(&self, value: u8) -> i32 {
        let span = (self.max - self.min) as f32;
        self.min + (value.min(127) as f32 * span / 127.0) as i32
    }
}

/// Columns of every input track: amplitude and pan of the connection.
pub static INPUT_PARAMS: &[ParamInfo] = &[
    ParamInfo {
        id: 0,
        name: "Amp",
        min: 0,
        max: AMP_MAX as i32,
        default: AMP_MAX as i32,
        no_value: NO_VALUE,
    },
    ParamInfo {
        id: 1,
        name: "Pan",
        min: 0,
        max: PAN_MAX as i32,
        default: PAN_CENTER as i32,
        no_value: NO_VALUE,
    },
];

/// Static metadata about a machine.
pub struct MachineInfo {
    pub name: &'static str,
    pub short_name: &'static str,
    pub author: &'static str,
    /// Loader identity, compared case-insensitively.
    pub uri: &'static str,
    pub machine_type: MachineType,
    pub global_params: &'static [ParamInfo],
    pub track_params: &'static [ParamInfo],
    pub min_tracks: u16,
    pub max_tracks: u16,
    /// Consumes no downstream audio; wired straight into the master.
    pub no_output: bool,
    /// Must always see its live input, even when the mix is silent.
    pub does_input_mixing: bool,
}

impl MachineInfo {
    /// Parameter metadata for a column of `group`.
    pub fn param(&self, group: ParamGroup, column: u16) -> Option<&'static ParamInfo> {
        let params = match group {
            ParamGroup::Input => INPUT_PARAMS,
            ParamGroup::Global => self.global_params,
            ParamGroup::Track => self.track_params,
        };
        params.get(column as usize)
    }
}

/// Core trait for audio generators, effects and the master.
///
/// `work` runs on the audio thread. It processes both planes of `buffer` in
/// place and returns true if it left non-silent output behind.
pub trait Machine: Send {
    fn info(&self) -> &'static MachineInfo;
    fn init(&mut self, data: &[u8], master: &MasterInfo) -> Result<(), MachineError>;
    fn tick(&mut self, _master: &MasterInfo) {}
    fn work(&mut self, buffer: [&mut [f32]; 2], mode: WorkMode) -> bool;
    fn stop(&mut self) {}
    fn set_param(&mut self, group: ParamGroup, track: u16, column: u16, value: i32);

    /// Current value of a parameter, or `NO_VALUE` if the machine does not
    /// expose it.
    fn param(&self, _group: ParamGroup, _track: u16, _column: u16) -> i32 {
        NO_VALUE
    }

    fn midi_note(&mut self, _channel: u8, _note: u8, _velocity: u8) {}
    fn midi_control_change(&mut self, _controller: u8, _channel: u8, _value: u8) {}
    fn set_track_count(&mut self, _tracks: u16) {}
    fn add_input(&mut self, _name: &str) {}
    fn delete_input(&mut self, _name: &str) {}
    fn sample_rate_changed(&mut self, _master: &MasterInfo) {}
}
