//! Real-time engine for the gearbox machine host.
//!
//! Holds a graph of machines, advances the transport in tempo ticks and
//! renders the mix on demand through [`Player::work_stereo`].

mod config;
mod connection;
mod edit;
mod error;
mod graph;
mod loader;
pub mod machine;
pub mod machines;
mod midi;
mod mixer;
mod notify;
mod player;
mod registry;
pub mod scheduler;
mod sequencer;
mod unit;

pub use config::EngineConfig;
pub use connection::{Connection, OutputRef};
pub use error::{EngineError, MachineError, Result};
pub use graph::Graph;
pub use loader::{BuiltinLoader, LoaderCatalog, MachineLoader};
pub use machine::{Machine, MachineInfo, MachineType, ParamInfo, WorkMode};
pub use midi::{MidiMapping, MidiMappings, MidiMessage};
pub use mixer::Mixer;
pub use notify::NotificationQueue;
pub use player::Player;
pub use registry::Registry;
pub use scheduler::TickScheduler;
pub use sequencer::{Sequencer, SongSequencer};
pub use unit::{Unit, WorkStats};

pub use gb_ir::{
    AudioBuffer, AudioWire, ConnectionKind, EngineEvent, EventBinding, MachineId, MasterInfo,
    Notification, ParamGroup, ParamRef, ParameterStateWire, Pattern, PatternLayout, SeqEvent,
    SequenceTrack, TransportState, WireParams, AMP_MAX, MAX_BUFFER_SAMPLES, NO_VALUE, PAN_CENTER,
    PAN_MAX,
};
