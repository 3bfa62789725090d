//! Built-in machine implementations.

pub mod master;
pub mod oscillator;
mod osc_tables;
pub mod passthrough;

use std::sync::Arc;

use crate::loader::{BuiltinLoader, MachineLoader};

pub use master::MasterMachine;
pub use oscillator::Oscillator;
pub use osc_tables::{tables, OscTables, Waveform};
pub use passthrough::PassthroughMachine;

/// Loader for the master machine.
pub fn master_loader() -> Arc<dyn MachineLoader> {
    Arc::new(BuiltinLoader::new(&master::INFO, || Box::new(MasterMachine::new())))
}

/// Loaders for every built-in machine except the master.
pub fn builtin_loaders() -> Vec<Arc<dyn MachineLoader>> {
    vec![
        Arc::new(BuiltinLoader::new(&passthrough::INFO, || Box::new(PassthroughMachine))),
        Arc::new(BuiltinLoader::new(&oscillator::INFO, || Box::new(Oscillator::new()))),
    ]
}
