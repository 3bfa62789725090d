//! Core data types for the gearbox engine.
//!
//! Everything here is plain data shared between the real-time engine and
//! the control side: audio buffers, transport timing, pattern grids,
//! sequence tracks, connection parameters and notifications.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod audio_buffer;
mod event;
mod ids;
mod master_info;
mod pattern;
mod sequence;
mod wire;

pub use audio_buffer::{AudioBuffer, MAX_BUFFER_SAMPLES, STEREO};
pub use event::{EngineEvent, Notification, TransportState};
pub use ids::MachineId;
pub use master_info::{MasterInfo, DEFAULT_BPM, DEFAULT_SAMPLE_RATE, DEFAULT_TPB};
pub use pattern::{ParamGroup, Pattern, PatternLayout, INPUT_COLUMNS, NO_VALUE};
pub use sequence::{SeqEvent, SequenceTrack};
pub use wire::{
    AudioWire, ConnectionKind, EventBinding, ParamRef, ParameterStateWire, WireParams, AMP_MAX,
    PAN_CENTER, PAN_MAX,
};
