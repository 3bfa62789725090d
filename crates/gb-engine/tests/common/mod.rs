//! Probe machines shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::Arc;

use gb_engine::{
    EngineConfig, Machine, MachineError, MachineId, MachineInfo, MachineLoader, MachineType,
    MasterInfo, ParamGroup, ParamInfo, Player, WorkMode, NO_VALUE,
};
use parking_lot::Mutex;

/// Global column: constant output level in thousandths.
pub const LEVEL: u16 = 0;

static PARAMS: &[ParamInfo] = &[ParamInfo {
    id: LEVEL,
    name: "Level",
    min: 0,
    max: 1000,
    default: 0,
    no_value: NO_VALUE,
}];

static TRACK_PARAMS: &[ParamInfo] = &[ParamInfo {
    id: 0,
    name: "Value",
    min: 0,
    max: 0xffff,
    default: 0,
    no_value: NO_VALUE,
}];

pub static PROBE: MachineInfo = MachineInfo {
    name: "Probe",
    short_name: "Probe",
    author: "tests",
    uri: "@test/probe",
    machine_type: MachineType::Generator,
    global_params: PARAMS,
    track_params: TRACK_PARAMS,
    min_tracks: 1,
    max_tracks: 4,
    no_output: false,
    does_input_mixing: false,
};

pub static SINK: MachineInfo = MachineInfo {
    name: "Sink",
    short_name: "Sink",
    author: "tests",
    uri: "@test/sink",
    machine_type: MachineType::Effect,
    global_params: PARAMS,
    track_params: &[],
    min_tracks: 0,
    max_tracks: 0,
    no_output: true,
    does_input_mixing: false,
};

pub static BROKEN: MachineInfo = MachineInfo {
    name: "Broken",
    short_name: "Broken",
    author: "tests",
    uri: "@test/broken",
    machine_type: MachineType::Generator,
    global_params: &[],
    track_params: &[],
    min_tracks: 0,
    max_tracks: 0,
    no_output: false,
    does_input_mixing: false,
};

/// What one probe instance has seen.
#[derive(Default)]
pub struct Counters {
    pub works: AtomicUsize,
    pub ticks: AtomicUsize,
    pub stops: AtomicUsize,
    pub last_note: AtomicI32,
    pub controls: AtomicUsize,
    pub inputs: Mutex<Vec<String>>,
}

impl Counters {
    pub fn works(&self) -> usize {
        self.works.load(Ordering::SeqCst)
    }

    pub fn ticks(&self) -> usize {
        self.ticks.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

/// Adds `level / 1000` to whatever it reads, and reports activity when it
/// produced or passed on signal.
pub struct Probe {
    level: i32,
    values: [i32; 4],
    counters: Arc<Counters>,
    info: &'static MachineInfo,
}

impl Machine for Probe {
    fn info(&self) -> &'static MachineInfo {
        self.info
    }

    fn init(&mut self, _data: &[u8], _master: &MasterInfo) -> Result<(), MachineError> {
        if self.info.uri == BROKEN.uri {
            return Err(MachineError::Init("probe refused to start".into()));
        }
        Ok(())
    }

    fn tick(&mut self, _master: &MasterInfo) {
        self.counters.ticks.fetch_add(1, Ordering::SeqCst);
    }

    fn work(&mut self, buffer: [&mut [f32]; 2], mode: WorkMode) -> bool {
        self.counters.works.fetch_add(1, Ordering::SeqCst);
        let level = self.level as f32 / 1000.0;
        if level > 0.0 {
            for plane in buffer {
                for s in plane.iter_mut() {
                    *s += level;
                }
            }
        }
        level > 0.0 || mode.reads()
    }

    fn stop(&mut self) {
        self.counters.stops.fetch_add(1, Ordering::SeqCst);
    }

    fn set_param(&mut self, group: ParamGroup, track: u16, column: u16, value: i32) {
        match (group, column) {
            (ParamGroup::Global, LEVEL) => self.level = value,
            (ParamGroup::Track, 0) => {
                if let Some(v) = self.values.get_mut(track as usize) {
                    *v = value;
                }
            }
            _ => {}
        }
    }

    fn param(&self, group: ParamGroup, track: u16, column: u16) -> i32 {
        match (group, column) {
            (ParamGroup::Global, LEVEL) => self.level,
            (ParamGroup::Track, 0) => self.values.get(track as usize).copied().unwrap_or(NO_VALUE),
            _ => NO_VALUE,
        }
    }

    fn midi_note(&mut self, _channel: u8, note: u8, velocity: u8) {
        let note = if velocity == 0 { -(note as i32) } else { note as i32 };
        self.counters.last_note.store(note, Ordering::SeqCst);
    }

    fn midi_control_change(&mut self, _controller: u8, _channel: u8, _value: u8) {
        self.counters.controls.fetch_add(1, Ordering::SeqCst);
    }

    fn add_input(&mut self, name: &str) {
        self.counters.inputs.lock().push(name.to_string());
    }

    fn delete_input(&mut self, name: &str) {
        self.counters.inputs.lock().retain(|n| n != name);
    }
}

/// Loader that keeps the counters of every probe it creates.
pub struct ProbeLoader {
    info: &'static MachineInfo,
    made: Mutex<Vec<Arc<Counters>>>,
}

impl ProbeLoader {
    pub fn new(info: &'static MachineInfo) -> Arc<Self> {
        Arc::new(Self { info, made: Mutex::new(Vec::new()) })
    }

    /// Counters of the most recently created instance.
    pub fn last(&self) -> Arc<Counters> {
        self.made.lock().last().cloned().expect("no probe created yet")
    }
}

impl MachineLoader for ProbeLoader {
    fn info(&self) -> &'static MachineInfo {
        self.info
    }

    fn create(&self) -> Box<dyn Machine> {
        let counters = Arc::new(Counters::default());
        self.made.lock().push(counters.clone());
        Box::new(Probe { level: 0, values: [0; 4], counters, info: self.info })
    }
}

/// A player with the probe loaders registered.
pub struct Rig {
    pub player: Player,
    pub probes: Arc<ProbeLoader>,
    pub sinks: Arc<ProbeLoader>,
}

impl Rig {
    pub fn new() -> Self {
        Self::with_config(&EngineConfig::default())
    }

    pub fn with_config(config: &EngineConfig) -> Self {
        let player = Player::new(config).unwrap();
        let probes = ProbeLoader::new(&PROBE);
        let sinks = ProbeLoader::new(&SINK);
        assert!(player.register_loader(probes.clone()));
        assert!(player.register_loader(sinks.clone()));
        assert!(player.register_loader(ProbeLoader::new(&BROKEN)));
        Self { player, probes, sinks }
    }

    /// Create a probe at `level` thousandths; returns its id and counters.
    pub fn probe(&self, name: &str, level: i32) -> (MachineId, Arc<Counters>) {
        let id = self.player.create_machine(PROBE.uri, name, &[]).unwrap();
        self.player.set_parameter(id, ParamGroup::Global, 0, LEVEL, level).unwrap();
        (id, self.probes.last())
    }

    pub fn sink(&self, name: &str) -> (MachineId, Arc<Counters>) {
        let id = self.player.create_machine(SINK.uri, name, &[]).unwrap();
        (id, self.sinks.last())
    }

    /// Render `frames` samples in blocks of at most `block`.
    pub fn render(&self, frames: usize, block: usize) -> (Vec<f32>, Vec<f32>) {
        let mut left = vec![0.0; frames];
        let mut right = vec![0.0; frames];
        for (l, r) in left.chunks_mut(block).zip(right.chunks_mut(block)) {
            self.player.work_stereo(l, r);
        }
        (left, right)
    }
}
