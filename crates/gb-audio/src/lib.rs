//! Audio device output for gearbox.

mod cpal_backend;
mod interleave;
mod traits;

pub use cpal_backend::CpalOutput;
pub use interleave::interleave;
pub use traits::{AudioError, AudioOutput};
