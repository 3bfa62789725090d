//! Table-lookup oscillator generator.

use gb_ir::{MasterInfo, ParamGroup, NO_VALUE};

use super::osc_tables::{tables, Waveform, TABLE_SIZE};
use crate::error::MachineError;
use crate::machine::{Machine, MachineInfo, MachineType, ParamInfo, WorkMode};

pub const WAVE: u16 = 0;
pub const VOLUME: u16 = 1;
/// Track column holding the note; 0 releases the track.
pub const NOTE: u16 = 0;

const MAX_TRACKS: usize = 8;
const NOTE_OFF: i32 = 0;

static GLOBAL_PARAMS: &[ParamInfo] = &[
    ParamInfo { id: WAVE, name: "Wave", min: 0, max: 3, default: 0, no_value: NO_VALUE },
    ParamInfo { id: VOLUME, name: "Volume", min: 0, max: 0x4000, default: 0x2000, no_value: NO_VALUE },
];

static TRACK_PARAMS: &[ParamInfo] = &[ParamInfo {
    id: NOTE,
    name: "Note",
    min: 0,
    max: 127,
    default: NOTE_OFF,
    no_value: NO_VALUE,
}];

pub static INFO: MachineInfo = MachineInfo {
    name: "Oscillator",
    short_name: "Osc",
    author: "gearbox",
    uri: "@gearbox/oscillator",
    machine_type: MachineType::Generator,
    global_params: GLOBAL_PARAMS,
    track_params: TRACK_PARAMS,
    min_tracks: 1,
    max_tracks: MAX_TRACKS as u16,
    no_output: false,
    does_input_mixing: false,
};

#[derive(Clone, Copy, Default)]
struct Voice {
    note: i32,
    phase: f32,
    step: f32,
}

pub struct Oscillator {
    wave: Waveform,
    volume: i32,
    voices: [Voice; MAX_TRACKS],
    tracks: usize,
    sample_rate: f32,
}

impl Oscillator {
    pub fn new() -> Self {
        Self {
            wave: Waveform::Sine,
            volume: GLOBAL_PARAMS[1].default,
            voices: [Voice::default(); MAX_TRACKS],
            tracks: 1,
            sample_rate: gb_ir::DEFAULT_SAMPLE_RATE as f32,
        }
    }

    fn set_note(&mut self, track: usize, note: i32) {
        let sample_rate = self.sample_rate;
        let Some(voice) = self.voices.get_mut(track) else { return };
        voice.note = note;
        if note == NOTE_OFF {
            return;
        }
        let freq = 440.0 * 2f32.powf((note - 69) as f32 / 12.0);
        // capped at the Nyquist rate
        voice.step = (freq * TABLE_SIZE as f32 / sample_rate).min(TABLE_SIZE as f32 / 2.0);
    }
}

impl Default for Oscillator {
    fn default() -> Self {
        Self::new()
    }
}

impl Machine for Oscillator {
    fn info(&self) -> &'static MachineInfo {
        &INFO
    }

    fn init(&mut self, _data: &[u8], master: &MasterInfo) -> Result<(), MachineError> {
        self.sample_rate = master.samples_per_second as f32;
        tables();
        Ok(())
    }

    fn work(&mut self, buffer: [&mut [f32]; 2], _mode: WorkMode) -> bool {
        let [left, right] = buffer;
        let table = tables().table(self.wave);
        let gain = self.volume as f32 / GLOBAL_PARAMS[1].max as f32;
        let mut active = false;

        left.fill(0.0);
        for voice in self.voices[..self.tracks].iter_mut() {
            if voice.note == NOTE_OFF {
                continue;
            }
            active = true;
            for s in left.iter_mut() {
                *s += table[voice.phase as usize % TABLE_SIZE] * gain;
                voice.phase = (voice.phase + voice.step) % TABLE_SIZE as f32;
            }
        }
        right.copy_from_slice(left);
        active && gain > 0.0
    }

    fn stop(&mut self) {
        for voice in &mut self.voices {
            voice.note = NOTE_OFF;
            voice.phase = 0.0;
        }
    }

    fn set_param(&mut self, group: ParamGroup, track: u16, column: u16, value: i32) {
        match (group, column) {
            (ParamGroup::Global, WAVE) => self.wave = Waveform::from_param(value),
            (ParamGroup::Global, VOLUME) => self.volume = GLOBAL_PARAMS[1].clamp(value),
            (ParamGroup::Track, NOTE) => self.set_note(track as usize, TRACK_PARAMS[0].clamp(value)),
            _ => {}
        }
    }

    fn param(&self, group: ParamGroup, track: u16, column: u16) -> i32 {
        match (group, column) {
            (ParamGroup::Global, WAVE) => self.wave as i32,
            (ParamGroup::Global, VOLUME) => self.volume,
            (ParamGroup::Track, NOTE) => {
                self.voices.get(track as usize).map(|v| v.note).unwrap_or(NO_VALUE)
            }
            _ => NO_VALUE,
        }
    }

    fn midi_note(&mut self, _channel: u8, note: u8, velocity: u8) {
        if velocity > 0 {
            self.set_note(0, note as i32);
        } else if self.voices[0].note == note as i32 {
            self.set_note(0, NOTE_OFF);
        }
    }

    fn set_track_count(&mut self, tracks: u16) {
        self.tracks = (tracks as usize).clamp(1, MAX_TRACKS);
    }

    fn sample_rate_changed(&mut self, master: &MasterInfo) {
        self.sample_rate = master.samples_per_second as f32;
        for track in 0..MAX_TRACKS {
            let note = self.voices[track].note;
            self.set_note(track, note);
        }
    }
}
