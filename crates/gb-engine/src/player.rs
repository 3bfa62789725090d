//! The player: owns the graph, sequencer, loaders and notification queue,
//! and exposes the control API plus the audio entry point.
//!
//! Locks are always taken in the order graph, then sequencing. Control
//! calls that change structure are serialised among themselves, and while
//! an audio thread is running their edits go through the edit channel.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

use gb_ir::{
    AudioWire, ConnectionKind, EngineEvent, MachineId, MasterInfo, Notification, ParamGroup,
    Pattern, SequenceTrack, TransportState, WireParams,
};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::connection::{Connection, OutputRef};
use crate::edit::{Edit, EditChannel};
use crate::error::{EngineError, Result};
use crate::graph::Graph;
use crate::loader::{LoaderCatalog, MachineLoader};
use crate::machine::{MachineInfo, MachineType};
use crate::machines::master;
use crate::midi::MidiMapping;
use crate::notify::NotificationQueue;
use crate::scheduler::TickScheduler;
use crate::sequencer::{Sequencer, Sequencing, SongSequencer};
use crate::unit::{Unit, WorkStats};

/// Weight of the newest measurement in the smoothed CPU load.
const LOAD_SMOOTHING: f32 = 0.1;

pub struct Player {
    graph: Mutex<Graph>,
    sequencing: Mutex<Sequencing>,
    loaders: RwLock<LoaderCatalog>,
    notifications: NotificationQueue,
    edits: EditChannel,
    /// Serialises structural mutators.
    mutators: Mutex<()>,
    work_started: AtomicBool,
    /// Requested sample rate, adopted at the start of the next buffer.
    work_rate: AtomicU32,
    /// `f32` bits of the smoothed processing-time ratio.
    cpu_load: AtomicU32,
    config: EngineConfig,
}

impl Player {
    /// Player with the built-in loaders and a master machine.
    pub fn new(config: &EngineConfig) -> Result<Self> {
        if config.sample_rate == 0 {
            return Err(EngineError::ZeroSampleRate);
        }
        let loaders = LoaderCatalog::with_builtins(&config.blacklist);
        let master_loader = loaders
            .master()
            .ok_or_else(|| EngineError::UnknownLoader("Master".to_string()))?;
        let graph = Graph::new(config, master_loader)?;
        let song = SongSequencer::new(config.song_end, config.loop_enabled);
        info!(
            sample_rate = config.sample_rate,
            bpm = graph.info.beats_per_minute,
            tpb = graph.info.ticks_per_beat,
            "player ready"
        );
        Ok(Self {
            graph: Mutex::new(graph),
            sequencing: Mutex::new(Sequencing::new(song)),
            loaders: RwLock::new(loaders),
            notifications: NotificationQueue::new(),
            edits: EditChannel::new(),
            mutators: Mutex::new(()),
            work_started: AtomicBool::new(false),
            work_rate: AtomicU32::new(config.sample_rate),
            cpu_load: AtomicU32::new(0),
            config: config.clone(),
        })
    }

    // --- Audio thread ---

    /// Fill `left` and `right` with the next block of the mix.
    ///
    /// Runs the whole block under the structural lock, processing ticks
    /// at their exact sample offsets, then applies a pending edit.
    pub fn work_stereo(&self, left: &mut [f32], right: &mut [f32]) {
        let started = Instant::now();
        let frames = left.len().min(right.len());
        let mut guard = self.graph.lock();
        let graph = &mut *guard;

        let rate = self.work_rate.load(Ordering::Acquire);
        if rate != graph.info.samples_per_second {
            graph.set_sample_rate(rate);
        }

        #[cfg(feature = "alloc_check")]
        assert_no_alloc::assert_no_alloc(|| self.render(graph, &mut left[..frames], &mut right[..frames]));
        #[cfg(not(feature = "alloc_check"))]
        self.render(graph, &mut left[..frames], &mut right[..frames]);

        let budget = frames as f32 / graph.info.samples_per_second as f32;
        drop(guard);
        self.update_load(started, budget);
        self.service_edits();
    }

    fn render(&self, graph: &mut Graph, left: &mut [f32], right: &mut [f32]) {
        let frames = left.len();
        let mut done = 0;
        while done < frames {
            if graph.at_tick_boundary() {
                if graph.scheduler.take_stop_request() && graph.transition(TransportState::Stopped) {
                    self.notify_transport(TransportState::Stopped);
                }
                let mut seq = self.sequencing.lock();
                graph.tick(&mut seq);
            }
            done += graph.pass(&mut left[done..], &mut right[done..]);
        }
    }

    fn update_load(&self, started: Instant, budget: f32) {
        if budget <= 0.0 {
            return;
        }
        let ratio = started.elapsed().as_secs_f32() / budget;
        let old = f32::from_bits(self.cpu_load.load(Ordering::Relaxed));
        let load = old + (ratio - old) * LOAD_SMOOTHING;
        self.cpu_load.store(load.to_bits(), Ordering::Relaxed);
    }

    /// Apply the pending edit, if any.
    fn service_edits(&self) {
        if let Some(pending) = self.edits.take() {
            let mut graph = self.graph.lock();
            let mut seq = self.sequencing.lock();
            pending.complete(&mut graph, &mut seq);
        }
    }

    /// Mark an audio thread as running; edits are handed to it from now on.
    pub fn start_work(&self) {
        self.work_started.store(true, Ordering::Release);
    }

    /// Mark the audio thread as gone. Any edit already waiting is applied
    /// here so its submitter does not wait forever.
    pub fn stop_work(&self) {
        self.work_started.store(false, Ordering::Release);
        self.service_edits();
    }

    pub fn is_work_started(&self) -> bool {
        self.work_started.load(Ordering::Acquire)
    }

    /// True while a submitted edit waits for the audio thread.
    pub fn has_pending_edit(&self) -> bool {
        self.edits.is_pending()
    }

    /// Install a prepared edit and drop the state it replaced here, on the
    /// calling thread.
    fn submit(&self, mut edit: Edit) {
        if !self.is_work_started() {
            {
                let mut graph = self.graph.lock();
                let mut seq = self.sequencing.lock();
                edit.apply(&mut graph, &mut seq);
            }
            drop(edit);
            return;
        }
        let done = self.edits.submit(edit);
        if !self.is_work_started() {
            self.service_edits();
        }
        let old = done.recv();
        drop(old);
    }

    // --- Transport ---

    pub fn state(&self) -> TransportState {
        self.graph.lock().state
    }

    /// Change the transport state. Setting the current state is a no-op.
    pub fn set_state(&self, state: TransportState) {
        let changed = {
            let mut graph = self.graph.lock();
            let changed = graph.transition(state);
            if changed && state == TransportState::Playing {
                self.sequencing.lock().current().on_play();
            }
            changed
        };
        if changed {
            debug!(?state, "transport");
            self.notify_transport(state);
        }
    }

    fn notify_transport(&self, state: TransportState) {
        self.notifications.push(Notification::global(EngineEvent::TransportChanged(state)));
    }

    pub fn master_info(&self) -> MasterInfo {
        self.graph.lock().info
    }

    /// Device rate for subsequent buffers. A rate of 0 is ignored.
    pub fn set_sample_rate(&self, rate: u32) {
        if rate == 0 {
            warn!("ignoring a sample rate of 0");
            return;
        }
        self.work_rate.store(rate, Ordering::Release);
    }

    pub fn tempo(&self) -> (f64, u16) {
        let graph = self.graph.lock();
        (graph.info.beats_per_minute, graph.info.ticks_per_beat)
    }

    /// Set tempo through the master's parameters.
    pub fn set_tempo(&self, beats_per_minute: u16, ticks_per_beat: u16) -> Result<()> {
        let mut graph = self.graph.lock();
        let master = graph.master;
        graph.set_param(master, ParamGroup::Global, 0, master::BPM, beats_per_minute as i32)?;
        graph.set_param(master, ParamGroup::Global, 0, master::TPB, ticks_per_beat as i32)
    }

    pub fn cpu_load(&self) -> f32 {
        f32::from_bits(self.cpu_load.load(Ordering::Relaxed))
    }

    // --- Machines ---

    pub fn master(&self) -> MachineId {
        self.graph.lock().master
    }

    /// Create a machine from the loader registered under `uri`, named after
    /// `name` (made unique). No-output machines are wired to the master.
    pub fn create_machine(&self, uri: &str, name: &str, data: &[u8]) -> Result<MachineId> {
        let loader = {
            let loaders = self.loaders.read();
            if loaders.is_blacklisted(uri) {
                return Err(EngineError::Blacklisted(uri.to_string()));
            }
            loaders.find(uri).ok_or_else(|| EngineError::UnknownLoader(uri.to_string()))?
        };
        if loader.info().machine_type == MachineType::Master {
            return Err(EngineError::DuplicateMaster);
        }

        let _guard = self.mutators.lock();
        let (info, name) = {
            let graph = self.graph.lock();
            (graph.info, graph.units.new_machine_name(name))
        };
        let no_output = loader.info().no_output;
        let mut unit = Unit::new(name.clone(), loader);
        unit.machine
            .init(data, &info)
            .map_err(|source| EngineError::MachineInit { name: name.clone(), source })?;

        let id = {
            let mut graph = self.graph.lock();
            let id = graph.units.insert(unit);
            if no_output {
                let master = graph.master;
                let mut edit = graph.prepare_connect(id, master, WireParams::Audio(AudioWire::default()))?;
                edit.apply(&mut graph, &mut self.sequencing.lock());
            }
            id
        };

        info!(%name, uri, "machine created");
        self.notifications.push(Notification::new(Some(id), EngineEvent::MachineCreated));
        if no_output {
            let to = self.master();
            self.notifications.push(Notification::new(
                Some(to),
                EngineEvent::Connected { from: id, to, kind: ConnectionKind::Audio },
            ));
        }
        Ok(id)
    }

    /// Delete a machine and everything that refers to it.
    pub fn delete_machine(&self, id: MachineId) -> Result<()> {
        let _guard = self.mutators.lock();
        self.delete_machine_locked(id)
    }

    fn delete_machine_locked(&self, id: MachineId) -> Result<()> {
        let unit = {
            let mut graph = self.graph.lock();
            let unit = graph.remove(id)?;
            self.sequencing.lock().remove_machine(id);
            graph.detach(id, &unit.name);
            unit
        };
        self.notifications.purge(id);
        self.notifications.push(Notification::global(EngineEvent::MachineDeleted { machine: id }));
        info!(name = %unit.name, uri = unit.loader.uri(), "machine deleted");
        drop(unit);
        Ok(())
    }

    pub fn machine_by_name(&self, name: &str) -> Option<MachineId> {
        self.graph.lock().units.find(name)
    }

    pub fn machine_name(&self, id: MachineId) -> Option<String> {
        self.graph.lock().units.get(id).map(|u| u.name.clone())
    }

    pub fn machine_info(&self, id: MachineId) -> Option<&'static MachineInfo> {
        self.graph.lock().units.get(id).map(|u| u.info)
    }

    /// Every machine, in registration order.
    pub fn machines(&self) -> Vec<MachineId> {
        self.graph.lock().units.order().to_vec()
    }

    pub fn work_stats(&self, id: MachineId) -> Option<WorkStats> {
        self.graph.lock().units.get(id).and_then(|u| u.stats)
    }

    pub fn set_solo(&self, id: Option<MachineId>) -> Result<()> {
        let mut graph = self.graph.lock();
        if let Some(id) = id {
            graph.unit(id)?;
        }
        graph.solo = id;
        Ok(())
    }

    pub fn solo(&self) -> Option<MachineId> {
        self.graph.lock().solo
    }

    // --- Connections ---

    pub fn connect(&self, from: MachineId, to: MachineId, params: WireParams) -> Result<()> {
        let _guard = self.mutators.lock();
        let kind = params.kind();
        let edit = self.graph.lock().prepare_connect(from, to, params)?;
        self.submit(edit);
        debug!(?kind, "connected");
        self.notifications.push(Notification::new(Some(to), EngineEvent::Connected { from, to, kind }));
        Ok(())
    }

    pub fn disconnect(&self, from: MachineId, to: MachineId, kind: ConnectionKind) -> Result<()> {
        let _guard = self.mutators.lock();
        let edit = self.graph.lock().prepare_disconnect(from, to, kind)?;
        self.submit(edit);
        debug!(?kind, "disconnected");
        self.notifications.push(Notification::new(Some(to), EngineEvent::Disconnected { from, to, kind }));
        Ok(())
    }

    /// Set amplitude and pan of the audio connection `from -> to`.
    pub fn set_audio_wire(&self, from: MachineId, to: MachineId, wire: AudioWire) -> Result<()> {
        let mut graph = self.graph.lock();
        let dst = graph.unit_mut(to)?;
        let index = dst
            .input(from, ConnectionKind::Audio)
            .ok_or(EngineError::ConnectionNotFound { kind: ConnectionKind::Audio })?;
        if let Some(target) = dst.inputs[index].audio_mut() {
            *target = AudioWire::new(wire.amp, wire.pan);
        }
        Ok(())
    }

    /// Connections into `id`, in input order.
    pub fn inputs(&self, id: MachineId) -> Result<Vec<Connection>> {
        Ok(self.graph.lock().unit(id)?.inputs.clone())
    }

    pub fn outputs(&self, id: MachineId) -> Result<Vec<OutputRef>> {
        Ok(self.graph.lock().unit(id)?.outputs.clone())
    }

    // --- Parameters ---

    pub fn set_parameter(&self, id: MachineId, group: ParamGroup, track: u16, column: u16, value: i32) -> Result<()> {
        self.graph.lock().set_param(id, group, track, column, value)?;
        self.notifications.push(Notification::new(
            Some(id),
            EngineEvent::ParameterChanged { group, track, column, value },
        ));
        Ok(())
    }

    pub fn parameter(&self, id: MachineId, group: ParamGroup, track: u16, column: u16) -> Result<i32> {
        self.graph.lock().param(id, group, track, column)
    }

    // --- Patterns and tracks ---

    /// Append an empty pattern shaped for the machine. Returns its index.
    pub fn add_pattern(&self, id: MachineId, name: &str, rows: u16) -> Result<usize> {
        let _guard = self.mutators.lock();
        let (patterns, index) = {
            let graph = self.graph.lock();
            let unit = graph.unit(id)?;
            let mut patterns = unit.patterns.clone();
            patterns.push(Pattern::new(name, rows, unit.pattern_layout()));
            let index = patterns.len() - 1;
            (patterns, index)
        };
        self.submit(Edit::Patterns { machine: id, patterns, sequence: None, removed: None });
        Ok(index)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn set_pattern_value(
        &self,
        id: MachineId,
        pattern: usize,
        row: u16,
        group: ParamGroup,
        track: u16,
        column: u16,
        value: i32,
    ) -> Result<()> {
        let _guard = self.mutators.lock();
        let mut patterns = self.graph.lock().unit(id)?.patterns.clone();
        let target = patterns.get_mut(pattern).ok_or(EngineError::PatternNotFound(pattern))?;
        if !target.set_value(row, group, track, column, value) {
            return Err(EngineError::UnknownParameter { group, track, column });
        }
        self.submit(Edit::Patterns { machine: id, patterns, sequence: None, removed: None });
        Ok(())
    }

    /// Remove a pattern; sequence events that placed it are dropped too.
    pub fn remove_pattern(&self, id: MachineId, pattern: usize) -> Result<()> {
        let _guard = self.mutators.lock();
        let mut patterns = self.graph.lock().unit(id)?.patterns.clone();
        if pattern >= patterns.len() {
            return Err(EngineError::PatternNotFound(pattern));
        }
        patterns.remove(pattern);
        let mut tracks = self.sequencing.lock().song.tracks().to_vec();
        for track in tracks.iter_mut().filter(|t| t.machine == id) {
            track.forget_pattern(pattern as u16);
        }
        self.submit(Edit::Patterns {
            machine: id,
            patterns,
            sequence: Some(tracks),
            removed: Some(pattern as u16),
        });
        Ok(())
    }

    pub fn pattern(&self, id: MachineId, pattern: usize) -> Result<Pattern> {
        let graph = self.graph.lock();
        graph.unit(id)?.patterns.get(pattern).cloned().ok_or(EngineError::PatternNotFound(pattern))
    }

    pub fn pattern_count(&self, id: MachineId) -> Result<usize> {
        Ok(self.graph.lock().unit(id)?.patterns.len())
    }

    pub fn set_track_count(&self, id: MachineId, tracks: u16) -> Result<()> {
        let _guard = self.mutators.lock();
        let edit = self.graph.lock().prepare_tracks(id, tracks)?;
        self.submit(edit);
        Ok(())
    }

    pub fn track_count(&self, id: MachineId) -> Result<u16> {
        Ok(self.graph.lock().unit(id)?.tracks)
    }

    // --- Song sequencer ---

    /// Add a sequence track bound to `id`. Returns its index.
    pub fn add_sequence_track(&self, id: MachineId) -> Result<usize> {
        let _guard = self.mutators.lock();
        let graph = self.graph.lock();
        graph.unit(id)?;
        let mut tracks = self.sequencing.lock().song.tracks().to_vec();
        drop(graph);
        tracks.push(SequenceTrack::new(id));
        let index = tracks.len() - 1;
        self.submit(Edit::Sequence { tracks });
        Ok(index)
    }

    pub fn remove_sequence_track(&self, index: usize) -> Result<()> {
        let _guard = self.mutators.lock();
        let mut tracks = self.sequencing.lock().song.tracks().to_vec();
        if index >= tracks.len() {
            return Err(EngineError::SequenceTrackNotFound(index));
        }
        tracks.remove(index);
        self.submit(Edit::Sequence { tracks });
        Ok(())
    }

    /// Place `pattern` (or silence, with `None`) at `tick` on a track.
    pub fn set_sequence_event(&self, index: usize, tick: u32, pattern: Option<u16>) -> Result<()> {
        let _guard = self.mutators.lock();
        let graph = self.graph.lock();
        let mut tracks = self.sequencing.lock().song.tracks().to_vec();
        let track = tracks.get_mut(index).ok_or(EngineError::SequenceTrackNotFound(index))?;
        if let Some(p) = pattern {
            if p as usize >= graph.unit(track.machine)?.patterns.len() {
                return Err(EngineError::PatternNotFound(p as usize));
            }
        }
        drop(graph);
        track.set_event(tick, pattern);
        self.submit(Edit::Sequence { tracks });
        Ok(())
    }

    /// Remove the event at `tick`. Returns false if there was none.
    pub fn clear_sequence_event(&self, index: usize, tick: u32) -> Result<bool> {
        let _guard = self.mutators.lock();
        let mut tracks = self.sequencing.lock().song.tracks().to_vec();
        let track = tracks.get_mut(index).ok_or(EngineError::SequenceTrackNotFound(index))?;
        if !track.remove_event(tick) {
            return Ok(false);
        }
        self.submit(Edit::Sequence { tracks });
        Ok(true)
    }

    pub fn sequence_tracks(&self) -> Vec<SequenceTrack> {
        self.sequencing.lock().song.tracks().to_vec()
    }

    /// Position of the sequencer driving playback, in ticks.
    pub fn position(&self) -> u32 {
        self.sequencing.lock().current().position()
    }

    pub fn set_position(&self, tick: u32) {
        self.sequencing.lock().current().set_position(tick);
    }

    pub fn song_begin(&self) -> u32 {
        self.sequencing.lock().song.song_begin
    }

    pub fn set_song_begin(&self, tick: u32) {
        self.sequencing.lock().song.song_begin = tick;
    }

    pub fn song_end(&self) -> u32 {
        self.sequencing.lock().song.song_end
    }

    pub fn set_song_end(&self, tick: u32) {
        self.sequencing.lock().song.song_end = tick;
    }

    pub fn loop_begin(&self) -> u32 {
        self.sequencing.lock().song.loop_begin
    }

    pub fn set_loop_begin(&self, tick: u32) {
        self.sequencing.lock().song.loop_begin = tick;
    }

    pub fn loop_end(&self) -> u32 {
        self.sequencing.lock().song.loop_end
    }

    pub fn set_loop_end(&self, tick: u32) {
        self.sequencing.lock().song.loop_end = tick;
    }

    pub fn loop_enabled(&self) -> bool {
        self.sequencing.lock().song.looping
    }

    pub fn set_loop_enabled(&self, looping: bool) {
        self.sequencing.lock().song.looping = looping;
    }

    /// Drive playback from `sequencer` instead of the song sequencer, or go
    /// back to the song sequencer with `None`. Returns the one replaced.
    pub fn set_current_sequencer(&self, sequencer: Option<Box<dyn Sequencer>>) -> Option<Box<dyn Sequencer>> {
        let _graph = self.graph.lock();
        std::mem::replace(&mut self.sequencing.lock().custom, sequencer)
    }

    // --- MIDI ---

    /// Route a raw MIDI message to mappings and machines.
    pub fn midi_event(&self, status: u8, data1: u8, data2: u8) {
        self.graph.lock().midi_event(status, data1, data2);
        self.notifications.push(Notification::global(EngineEvent::Midi { status, data1, data2 }));
    }

    pub fn add_midi_mapping(&self, mapping: MidiMapping) -> Result<bool> {
        let mut graph = self.graph.lock();
        let unit = graph.unit(mapping.machine)?;
        if unit.info.param(mapping.group, mapping.column).is_none() {
            return Err(EngineError::UnknownParameter {
                group: mapping.group,
                track: mapping.track,
                column: mapping.column,
            });
        }
        Ok(graph.midi.add(mapping))
    }

    pub fn remove_midi_mapping(&self, mapping: &MidiMapping) -> bool {
        self.graph.lock().midi.remove(mapping)
    }

    pub fn midi_mappings(&self) -> Vec<MidiMapping> {
        self.graph.lock().midi.iter().copied().collect()
    }

    // --- Notifications ---

    pub fn notifications(&self) -> &NotificationQueue {
        &self.notifications
    }

    /// Hand every queued notification to `f`, oldest first.
    pub fn drain_notifications(&self, f: impl FnMut(Notification)) -> usize {
        self.notifications.drain(f)
    }

    // --- Loaders ---

    pub fn register_loader(&self, loader: Arc<dyn MachineLoader>) -> bool {
        self.loaders.write().register(loader)
    }

    pub fn loader(&self, uri: &str) -> Option<Arc<dyn MachineLoader>> {
        self.loaders.read().find(uri)
    }

    pub fn load_warnings(&self) -> String {
        self.loaders.read().warnings().to_string()
    }

    pub fn load_errors(&self) -> String {
        self.loaders.read().errors().to_string()
    }

    // --- Reset ---

    /// Stop, delete every machine but the master, and reset the sequencer,
    /// MIDI mappings and master to their initial state.
    pub fn clear(&self) -> Result<()> {
        self.set_state(TransportState::Stopped);
        let _guard = self.mutators.lock();
        let doomed: Vec<MachineId> = {
            let graph = self.graph.lock();
            graph.units.order().iter().copied().filter(|&id| id != graph.master).collect()
        };
        for id in doomed {
            self.delete_machine_locked(id)?;
        }

        let mut graph = self.graph.lock();
        let mut seq = self.sequencing.lock();
        seq.song = SongSequencer::new(self.config.song_end, self.config.loop_enabled);
        seq.custom = None;
        graph.midi.clear();
        graph.solo = None;
        let master = graph.master;
        graph.unit_mut(master)?.patterns.clear();
        graph.set_param(master, ParamGroup::Global, 0, master::VOLUME, 0)?;
        graph.set_param(master, ParamGroup::Global, 0, master::BPM, self.config.beats_per_minute as i32)?;
        graph.set_param(master, ParamGroup::Global, 0, master::TPB, self.config.ticks_per_beat as i32)?;
        graph.info.tick_position = 0;
        graph.scheduler = TickScheduler::new();
        debug!("player cleared");
        Ok(())
    }
}
