//! Song sequencing: which pattern each machine plays, tick by tick.

use gb_ir::{MachineId, SequenceTrack};

/// Advances a playback position once per tick and tells machines which
/// pattern to start.
///
/// The player drives exactly one sequencer at a time. The built-in
/// [`SongSequencer`] is the default; another implementation can be swapped
/// in with `Player::set_current_sequencer`.
pub trait Sequencer: Send {
    /// Dispatch the triggers due at the current position, then move one
    /// tick forward. `trigger(machine, pattern)` starts `pattern` on
    /// `machine` (`None` silences it).
    ///
    /// Returns false when the end of the song was passed without looping.
    fn advance_tick(&mut self, trigger: &mut dyn FnMut(MachineId, Option<u16>)) -> bool;

    fn position(&self) -> u32;
    fn set_position(&mut self, tick: u32);

    /// Drop every reference to a machine that is being deleted.
    fn remove_machine(&mut self, _machine: MachineId) {}

    /// Called when the transport starts playing.
    fn on_play(&mut self) {}
}

/// The built-in sequencer: a list of tracks plus song and loop markers.
#[derive(Clone, Debug)]
pub struct SongSequencer {
    tracks: Vec<SequenceTrack>,
    position: u32,
    pub song_begin: u32,
    pub song_end: u32,
    pub loop_begin: u32,
    pub loop_end: u32,
    pub looping: bool,
}

impl SongSequencer {
    pub fn new(song_end: u32, looping: bool) -> Self {
        Self {
            tracks: Vec::new(),
            position: 0,
            song_begin: 0,
            song_end,
            loop_begin: 0,
            loop_end: song_end,
            looping,
        }
    }

    pub fn tracks(&self) -> &[SequenceTrack] {
        &self.tracks
    }

    /// Track storage, for edits that swap it wholesale.
    pub(crate) fn tracks_mut(&mut self) -> &mut Vec<SequenceTrack> {
        &mut self.tracks
    }
}

impl Sequencer for SongSequencer {
    fn advance_tick(&mut self, trigger: &mut dyn FnMut(MachineId, Option<u16>)) -> bool {
        for track in &self.tracks {
            if let Some(event) = track.event_at(self.position) {
                trigger(track.machine, event.pattern);
            }
        }
        self.position += 1;
        if self.looping && self.position >= self.loop_end {
            self.position = self.loop_begin;
            return true;
        }
        self.looping || self.position < self.song_end
    }

    fn position(&self) -> u32 {
        self.position
    }

    fn set_position(&mut self, tick: u32) {
        self.position = tick;
    }

    fn remove_machine(&mut self, machine: MachineId) {
        self.tracks.retain(|t| t.machine != machine);
    }

    fn on_play(&mut self) {
        if !self.looping && self.position >= self.song_end {
            self.position = self.song_begin;
        }
    }
}

/// Sequencer state guarded by the tick lock.
pub(crate) struct Sequencing {
    pub(crate) song: SongSequencer,
    pub(crate) custom: Option<Box<dyn Sequencer>>,
}

impl Sequencing {
    pub(crate) fn new(song: SongSequencer) -> Self {
        Self { song, custom: None }
    }

    /// The sequencer currently driving playback.
    pub(crate) fn current(&mut self) -> &mut dyn Sequencer {
        match &mut self.custom {
            Some(custom) => custom.as_mut(),
            None => &mut self.song,
        }
    }

    pub(crate) fn remove_machine(&mut self, machine: MachineId) {
        self.song.remove_machine(machine);
        if let Some(custom) = &mut self.custom {
            custom.remove_machine(machine);
        }
    }
}
