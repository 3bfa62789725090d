//! Error types for the engine.

use gb_ir::{ConnectionKind, ParamGroup};
use thiserror::Error;

/// Failure reported by a machine while it initialises.
#[derive(Debug, Error)]
pub enum MachineError {
    #[error("invalid init data: {0}")]
    InvalidData(String),
    #[error("{0}")]
    Init(String),
}

/// Errors returned by the player's control API.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no machine loader registered for `{0}`")]
    UnknownLoader(String),
    #[error("loader `{0}` is blacklisted")]
    Blacklisted(String),
    #[error("machine not found")]
    MachineNotFound,
    #[error("the master machine cannot be deleted")]
    MasterDeletion,
    #[error("only one master machine may exist")]
    DuplicateMaster,
    #[error("machine `{name}` failed to initialise")]
    MachineInit {
        name: String,
        #[source]
        source: MachineError,
    },
    #[error("{kind:?} connection already exists")]
    DuplicateConnection { kind: ConnectionKind },
    #[error("{kind:?} connection not found")]
    ConnectionNotFound { kind: ConnectionKind },
    #[error("invalid connection: {0}")]
    InvalidConnection(&'static str),
    #[error("connection would create a cycle")]
    Cycle,
    #[error("parameter {group:?} track {track} column {column} does not exist")]
    UnknownParameter { group: ParamGroup, track: u16, column: u16 },
    #[error("pattern {0} does not exist")]
    PatternNotFound(usize),
    #[error("sequence track {0} does not exist")]
    SequenceTrackNotFound(usize),
    #[error("track count {requested} outside {min}..={max}")]
    TrackCount { requested: u16, min: u16, max: u16 },
    #[error("sample rate must be positive")]
    ZeroSampleRate,
    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
