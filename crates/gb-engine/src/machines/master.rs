//! The master machine: sink of the graph and owner of the tempo.

use gb_ir::{MasterInfo, ParamGroup};

use crate::error::MachineError;
use crate::machine::{Machine, MachineInfo, MachineType, ParamInfo, WorkMode};

/// Global column of the output attenuation.
pub const VOLUME: u16 = 0;
/// Global column of the tempo in beats per minute.
pub const BPM: u16 = 1;
/// Global column of the tick resolution.
pub const TPB: u16 = 2;

/// Attenuation at full volume-parameter travel, in dB.
const RANGE_DB: f32 = 80.0;

static PARAMS: &[ParamInfo] = &[
    ParamInfo { id: VOLUME, name: "Volume", min: 0, max: 0x4000, default: 0, no_value: 0xFFFF },
    ParamInfo { id: BPM, name: "BPM", min: 16, max: 500, default: 126, no_value: 0xFFFF },
    ParamInfo { id: TPB, name: "TPB", min: 1, max: 32, default: 4, no_value: 0xFF },
];

pub static INFO: MachineInfo = MachineInfo {
    name: "Master",
    short_name: "Master",
    author: "gearbox",
    uri: "@gearbox/master",
    machine_type: MachineType::Master,
    global_params: PARAMS,
    track_params: &[],
    min_tracks: 0,
    max_tracks: 0,
    no_output: false,
    does_input_mixing: false,
};

/// Applies the master volume to the final mix.
pub struct MasterMachine {
    volume: i32,
    bpm: i32,
    tpb: i32,
    gain: f32,
}

impl MasterMachine {
    pub fn new() -> Self {
        Self {
            volume: PARAMS[0].default,
            bpm: PARAMS[1].default,
            tpb: PARAMS[2].default,
            gain: 1.0,
        }
    }

    fn recompute_gain(&mut self) {
        self.gain = if self.volume >= PARAMS[0].max {
            0.0
        } else {
            let db = -RANGE_DB * self.volume as f32 / PARAMS[0].max as f32;
            10f32.powf(db / 20.0)
        };
    }
}

impl Default for MasterMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl Machine for MasterMachine {
    fn info(&self) -> &'static MachineInfo {
        &INFO
    }

    fn init(&mut self, _data: &[u8], master: &MasterInfo) -> Result<(), MachineError> {
        self.bpm = PARAMS[1].clamp(master.beats_per_minute.round() as i32);
        self.tpb = PARAMS[2].clamp(master.ticks_per_beat as i32);
        self.recompute_gain();
        Ok(())
    }

    fn work(&mut self, buffer: [&mut [f32]; 2], mode: WorkMode) -> bool {
        if mode != WorkMode::ReadWrite {
            return false;
        }
        if self.gain == 0.0 {
            for plane in buffer {
                plane.fill(0.0);
            }
            return false;
        }
        if self.gain != 1.0 {
            for plane in buffer {
                for s in plane.iter_mut() {
                    *s *= self.gain;
                }
            }
        }
        true
    }

    fn set_param(&mut self, group: ParamGroup, _track: u16, column: u16, value: i32) {
        if group != ParamGroup::Global {
            return;
        }
        match column {
            VOLUME => {
                self.volume = PARAMS[0].clamp(value);
                self.recompute_gain();
            }
            BPM => self.bpm = PARAMS[1].clamp(value),
            TPB => self.tpb = PARAMS[2].clamp(value),
            _ => {}
        }
    }

    fn param(&self, group: ParamGroup, _track: u16, column: u16) -> i32 {
        match (group, column) {
            (ParamGroup::Global, VOLUME) => self.volume,
            (ParamGroup::Global, BPM) => self.bpm,
            (ParamGroup::Global, TPB) => self.tpb,
            _ => gb_ir::NO_VALUE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_volume_is_unity() {
        let mut m = MasterMachine::new();
        m.init(&[], &MasterInfo::default()).unwrap();
        let mut l = [0.5f32; 4];
        let mut r = [-0.5f32; 4];
        assert!(m.work([&mut l, &mut r], WorkMode::ReadWrite));
        assert_eq!(l, [0.5; 4]);
        assert_eq!(r, [-0.5; 4]);
    }

    #[test]
    fn volume_attenuates() {
        let mut m = MasterMachine::new();
        m.set_param(ParamGroup::Global, 0, VOLUME, 0x2000);
        let mut l = [1.0f32; 2];
        let mut r = [1.0f32; 2];
        m.work([&mut l, &mut r], WorkMode::ReadWrite);
        // half travel is -40 dB
        assert!((l[0] - 0.01).abs() < 1e-4);
    }

    #[test]
    fn bottom_of_travel_mutes() {
        let mut m = MasterMachine::new();
        m.set_param(ParamGroup::Global, 0, VOLUME, 0x4000);
        let mut l = [1.0f32; 2];
        let mut r = [1.0f32; 2];
        assert!(!m.work([&mut l, &mut r], WorkMode::ReadWrite));
        assert_eq!(l, [0.0; 2]);
    }

    #[test]
    fn silent_input_reports_inactive() {
        let mut m = MasterMachine::new();
        let mut l = [0.0f32; 2];
        let mut r = [0.0f32; 2];
        assert!(!m.work([&mut l, &mut r], WorkMode::Write));
    }

    #[test]
    fn tempo_params_are_clamped() {
        let mut m = MasterMachine::new();
        m.set_param(ParamGroup::Global, 0, BPM, 9000);
        m.set_param(ParamGroup::Global, 0, TPB, 0);
        assert_eq!(m.param(ParamGroup::Global, 0, BPM), 500);
        assert_eq!(m.param(ParamGroup::Global, 0, TPB), 1);
    }

    #[test]
    fn init_adopts_transport_tempo() {
        let mut m = MasterMachine::new();
        m.init(&[], &MasterInfo::new(44_100, 140.0, 8)).unwrap();
        assert_eq!(m.param(ParamGroup::Global, 0, BPM), 140);
        assert_eq!(m.param(ParamGroup::Global, 0, TPB), 8);
    }
}
