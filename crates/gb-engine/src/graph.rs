//! The machine graph and the transport that drives it.
//!
//! Everything here lives behind the player's structural lock. The audio
//! thread holds that lock for a whole `work_stereo` call; control threads
//! take it briefly to read state or prepare edits.

use std::sync::Arc;

use gb_ir::{
    ConnectionKind, MachineId, MasterInfo, ParamGroup, Pattern, TransportState,
    WireParams, NO_VALUE,
};
use slotmap::SlotMap;

use crate::config::EngineConfig;
use crate::connection::{Connection, OutputRef};
use crate::edit::{Edit, InputChange};
use crate::error::{EngineError, Result};
use crate::loader::MachineLoader;
use crate::machines::master;
use crate::midi::{MidiMappings, MidiMessage};
use crate::mixer::Mixer;
use crate::registry::Registry;
use crate::scheduler::TickScheduler;
use crate::sequencer::Sequencing;
use crate::unit::Unit;

pub struct Graph {
    pub(crate) units: Registry,
    pub(crate) master: MachineId,
    pub(crate) info: MasterInfo,
    pub(crate) scheduler: TickScheduler,
    pub(crate) mixer: Mixer,
    pub(crate) state: TransportState,
    pub(crate) solo: Option<MachineId>,
    pub(crate) midi: MidiMappings,
}

impl Graph {
    /// Graph holding only a freshly initialised master.
    pub(crate) fn new(config: &EngineConfig, master_loader: Arc<dyn MachineLoader>) -> Result<Self> {
        let info = MasterInfo::new(
            config.sample_rate,
            config.beats_per_minute as f64,
            config.ticks_per_beat,
        );
        let mut unit = Unit::new("Master".to_string(), master_loader);
        unit.machine
            .init(&[], &info)
            .map_err(|source| EngineError::MachineInit { name: unit.name.clone(), source })?;

        let mut units = Registry::new();
        let master = units.insert(unit);
        let mut graph = Self {
            units,
            master,
            info,
            scheduler: TickScheduler::new(),
            mixer: Mixer::new(),
            state: TransportState::Stopped,
            solo: None,
            midi: MidiMappings::default(),
        };
        graph.sync_tempo();
        Ok(graph)
    }

    pub fn master(&self) -> MachineId {
        self.master
    }

    pub fn units(&self) -> &Registry {
        &self.units
    }

    pub fn info(&self) -> &MasterInfo {
        &self.info
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub(crate) fn unit(&self, id: MachineId) -> Result<&Unit> {
        self.units.get(id).ok_or(EngineError::MachineNotFound)
    }

    pub(crate) fn unit_mut(&mut self, id: MachineId) -> Result<&mut Unit> {
        self.units.get_mut(id).ok_or(EngineError::MachineNotFound)
    }

    /// Adopt the tempo held in the master's parameters.
    pub(crate) fn sync_tempo(&mut self) {
        let Some(unit) = self.units.get(self.master) else { return };
        let bpm = unit.machine.param(ParamGroup::Global, 0, master::BPM);
        let tpb = unit.machine.param(ParamGroup::Global, 0, master::TPB);
        if bpm <= 0 || tpb <= 0 {
            return;
        }
        if bpm as f64 != self.info.beats_per_minute || tpb as u16 != self.info.ticks_per_beat {
            self.info.set_tempo(bpm as f64, tpb as u16);
        }
    }

    pub(crate) fn set_sample_rate(&mut self, rate: u32) {
        self.info.set_sample_rate(rate);
        let info = self.info;
        for unit in self.units.split_mut().0.values_mut() {
            unit.machine.sample_rate_changed(&info);
        }
    }

    pub(crate) fn set_param(
        &mut self,
        id: MachineId,
        group: ParamGroup,
        track: u16,
        column: u16,
        value: i32,
    ) -> Result<()> {
        let unit = self.unit_mut(id)?;
        if value == NO_VALUE {
            return Ok(());
        }
        if !unit.set_param(group, track, column, value) {
            return Err(EngineError::UnknownParameter { group, track, column });
        }
        if id == self.master {
            self.sync_tempo();
        }
        Ok(())
    }

    pub(crate) fn param(&self, id: MachineId, group: ParamGroup, track: u16, column: u16) -> Result<i32> {
        self.unit(id)?
            .param(group, track, column)
            .ok_or(EngineError::UnknownParameter { group, track, column })
    }

    // --- Real-time path ---

    /// True if the next pass starts a tick that has to be processed.
    pub(crate) fn at_tick_boundary(&self) -> bool {
        self.state.mixes() && self.scheduler.at_tick_boundary(&self.info)
    }

    /// Process one tick: advance the sequencer when playing, then tick
    /// every machine.
    pub(crate) fn tick(&mut self, seq: &mut Sequencing) {
        let playing = self.state == TransportState::Playing;
        if playing {
            let units = &mut self.units;
            let more = seq.current().advance_tick(&mut |id, pattern| {
                if let Some(unit) = units.get_mut(id) {
                    unit.trigger(pattern);
                }
            });
            if !more {
                self.scheduler.request_stop();
            }
        }
        self.tick_machines(playing);
        self.scheduler.tick_started(&self.info);
    }

    /// Run every machine's tick, no-output machines first. Playing
    /// machines apply their next pattern row beforehand.
    fn tick_machines(&mut self, playing: bool) {
        let info = self.info;
        let (units, order) = self.units.split_mut();
        for no_output in [true, false] {
            for &id in order {
                let Some(unit) = units.get_mut(id) else { continue };
                if unit.no_output() != no_output {
                    continue;
                }
                if playing {
                    unit.play_row();
                }
                forward_control(units, id);
                if let Some(unit) = units.get_mut(id) {
                    unit.machine.tick(&info);
                }
            }
        }
        self.sync_tempo();
    }

    /// Produce the next pass into the front of `left` and `right`; never
    /// crosses a tick boundary. Returns the number of frames written.
    pub(crate) fn pass(&mut self, left: &mut [f32], right: &mut [f32]) -> usize {
        let remaining = left.len().min(right.len());
        if !self.state.mixes() {
            left[..remaining].fill(0.0);
            right[..remaining].fill(0.0);
            return remaining;
        }
        let n = self.scheduler.plan(&self.info, remaining);
        if n > 0 {
            self.mixer.render(&mut self.units, self.master, n, self.solo);
            let out = &self.units[self.master].buffer;
            left[..n].copy_from_slice(&out.channel(0)[..n]);
            right[..n].copy_from_slice(&out.channel(1)[..n]);
        }
        self.scheduler.finish(&mut self.info);
        n
    }

    /// Enter `state`. Returns false if already there.
    pub(crate) fn transition(&mut self, state: TransportState) -> bool {
        if state == self.state {
            return false;
        }
        let stopping = state == TransportState::Stopped;
        for unit in self.units.split_mut().0.values_mut() {
            unit.reset_mixer();
            if stopping {
                unit.machine.stop();
                unit.cursor = None;
            }
        }
        if stopping {
            self.scheduler.clear_stop_request();
        }
        self.state = state;
        true
    }

    /// Deliver a raw MIDI message to the mappings and every machine.
    pub(crate) fn midi_event(&mut self, status: u8, data1: u8, data2: u8) {
        let Graph { units, midi, .. } = self;
        match MidiMessage::decode(status, data1, data2) {
            Some(MidiMessage::Note { channel, note, velocity }) => {
                for unit in units.split_mut().0.values_mut() {
                    unit.machine.midi_note(channel, note, velocity);
                }
            }
            Some(MidiMessage::ControlChange { channel, controller, value }) => {
                for m in midi.matching(channel, controller) {
                    let Some(unit) = units.get_mut(m.machine) else { continue };
                    if let Some(param) = unit.info.param(m.group, m.column) {
                        unit.set_param(m.group, m.track, m.column, param.scale_midi(value));
                    }
                }
                for unit in units.split_mut().0.values_mut() {
                    unit.machine.midi_control_change(controller, channel, value);
                }
            }
            None => return,
        }
        self.sync_tempo();
    }

    // --- Edit preparation (control threads) ---

    pub(crate) fn prepare_connect(&self, from: MachineId, to: MachineId, params: WireParams) -> Result<Edit> {
        let src = self.unit(from)?;
        let dst = self.unit(to)?;
        if from == to {
            return Err(EngineError::InvalidConnection("a machine cannot feed itself"));
        }
        if from == self.master {
            return Err(EngineError::InvalidConnection("the master has no outputs"));
        }
        let kind = params.kind();
        if dst.input(from, kind).is_some() {
            return Err(EngineError::DuplicateConnection { kind });
        }
        let params = match params {
            WireParams::Audio(_) if self.units.feeds(to, from) => return Err(EngineError::Cycle),
            WireParams::Event(bindings) => {
                for b in &bindings {
                    if src.info.param(ParamGroup::Global, b.source_column).is_none() {
                        return Err(EngineError::UnknownParameter {
                            group: ParamGroup::Global,
                            track: 0,
                            column: b.source_column,
                        });
                    }
                    let t = b.target;
                    if dst.info.param(t.group, t.column).is_none() {
                        return Err(EngineError::UnknownParameter { group: t.group, track: t.track, column: t.column });
                    }
                }
                WireParams::Event(bindings)
            }
            WireParams::ParameterState(wire) => WireParams::ParameterState(
                wire.with_tracks(src.info.max_tracks, src.info.track_params.len() as u16),
            ),
            audio => audio,
        };

        let mut inputs = dst.inputs.clone();
        inputs.push(Connection::new(from, to, params));
        let mut outputs = src.outputs.clone();
        outputs.push(OutputRef { to, kind });
        let (patterns, change) = if kind == ConnectionKind::Audio {
            (
                Some(dst.patterns.iter().map(Pattern::with_input_added).collect()),
                InputChange::Added(src.name.clone()),
            )
        } else {
            (None, InputChange::None)
        };
        Ok(Edit::Connection { from, to, inputs, outputs, patterns, change })
    }

    pub(crate) fn prepare_disconnect(&self, from: MachineId, to: MachineId, kind: ConnectionKind) -> Result<Edit> {
        let src = self.unit(from)?;
        let dst = self.unit(to)?;
        let index = dst.input(from, kind).ok_or(EngineError::ConnectionNotFound { kind })?;

        let mut inputs = dst.inputs.clone();
        inputs.remove(index);
        let outputs = src.outputs.iter().filter(|o| !(o.to == to && o.kind == kind)).copied().collect();
        let (patterns, change) = match dst.audio_input_index(from) {
            Some(audio) if kind == ConnectionKind::Audio => (
                Some(dst.patterns.iter().map(|p| p.with_input_removed(audio as u16)).collect()),
                InputChange::Removed(src.name.clone()),
            ),
            _ => (None, InputChange::None),
        };
        Ok(Edit::Connection { from, to, inputs, outputs, patterns, change })
    }

    pub(crate) fn prepare_tracks(&self, id: MachineId, tracks: u16) -> Result<Edit> {
        let unit = self.unit(id)?;
        let (min, max) = (unit.info.min_tracks, unit.info.max_tracks);
        if !(min..=max).contains(&tracks) {
            return Err(EngineError::TrackCount { requested: tracks, min, max });
        }
        let patterns = unit.patterns.iter().map(|p| p.with_tracks(tracks)).collect();
        Ok(Edit::Tracks { machine: id, tracks, patterns })
    }

    // --- Deletion (structural lock held by the caller) ---

    /// Unregister a machine. The master cannot be removed.
    pub(crate) fn remove(&mut self, id: MachineId) -> Result<Unit> {
        if id == self.master {
            return Err(EngineError::MasterDeletion);
        }
        self.units.remove(id).ok_or(EngineError::MachineNotFound)
    }

    /// Drop every edge touching a removed machine, plus its MIDI mappings
    /// and solo status.
    pub(crate) fn detach(&mut self, id: MachineId, name: &str) {
        for unit in self.units.split_mut().0.values_mut() {
            unit.outputs.retain(|o| o.to != id);
            if let Some(index) = unit.audio_input_index(id) {
                unit.patterns = unit.patterns.iter().map(|p| p.with_input_removed(index as u16)).collect();
                unit.machine.delete_input(name);
            }
            unit.inputs.retain(|c| c.from != id);
        }
        self.midi.remove_machine(id);
        if self.solo == Some(id) {
            self.solo = None;
        }
    }
}

/// Forward event and parameter-state connections into machine `id`.
fn forward_control(units: &mut SlotMap<MachineId, Unit>, id: MachineId) {
    let count = units.get(id).map_or(0, |u| u.inputs.len());
    for input in 0..count {
        let Some(from) = units.get(id).map(|u| u.inputs[input].from) else { return };
        let Some([dst, src]) = units.get_disjoint_mut([id, from]) else { continue };
        match dst.inputs[input].kind() {
            ConnectionKind::Audio => {}
            ConnectionKind::Event => forward_events(dst, src, input),
            ConnectionKind::ParameterState => forward_state(dst, src, input),
        }
    }
}

/// Copy changed source globals onto their bound targets.
fn forward_events(dst: &mut Unit, src: &Unit, input: usize) {
    let count = match &dst.inputs[input].params {
        WireParams::Event(bindings) => bindings.len(),
        _ => return,
    };
    for i in 0..count {
        let cx = &mut dst.inputs[input];
        let WireParams::Event(bindings) = &cx.params else { return };
        let binding = bindings[i];
        let value = src.machine.param(ParamGroup::Global, 0, binding.source_column);
        if value == NO_VALUE || cx.last_values[i] == value {
            continue;
        }
        cx.last_values[i] = value;
        let t = binding.target;
        dst.set_param(t.group, t.track, t.column, value);
    }
}

/// Mirror changed source track parameters onto the same destination track.
fn forward_state(dst: &mut Unit, src: &Unit, input: usize) {
    let tracks = src.tracks.min(dst.tracks);
    let columns = src.info.track_params.len() as u16;
    for track in 0..tracks {
        for column in 0..columns {
            let value = src.machine.param(ParamGroup::Track, track, column);
            if value == NO_VALUE {
                continue;
            }
            let WireParams::ParameterState(wire) = &mut dst.inputs[input].params else { return };
            if wire.update(track, column, value) {
                dst.set_param(ParamGroup::Track, track, column, value);
            }
        }
    }
}
