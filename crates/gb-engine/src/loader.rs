//! Machine loaders and the catalog they are registered in.

use std::fmt::Write as _;
use std::sync::Arc;

use tracing::warn;

use crate::machine::{Machine, MachineInfo, MachineType};

/// Creates instances of one kind of machine.
pub trait MachineLoader: Send + Sync {
    fn info(&self) -> &'static MachineInfo;
    fn create(&self) -> Box<dyn Machine>;

    fn uri(&self) -> &'static str {
        self.info().uri
    }
}

/// Loader for a machine compiled into the engine.
pub struct BuiltinLoader {
    info: &'static MachineInfo,
    create: fn() -> Box<dyn Machine>,
}

impl BuiltinLoader {
    pub fn new(info: &'static MachineInfo, create: fn() -> Box<dyn Machine>) -> Self {
        Self { info, create }
    }
}

impl MachineLoader for BuiltinLoader {
    fn info(&self) -> &'static MachineInfo {
        self.info
    }

    fn create(&self) -> Box<dyn Machine> {
        (self.create)()
    }
}

/// Registered loaders, looked up by URI.
///
/// Registration never fails hard: refused loaders are reported through
/// `warnings` and `errors` and the rest of the catalog stays usable.
#[derive(Default)]
pub struct LoaderCatalog {
    loaders: Vec<Arc<dyn MachineLoader>>,
    master: Option<Arc<dyn MachineLoader>>,
    blacklist: Vec<String>,
    warnings: String,
    errors: String,
}

impl LoaderCatalog {
    pub fn new(blacklist: &[String]) -> Self {
        Self {
            blacklist: blacklist.iter().map(|s| s.to_lowercase()).collect(),
            ..Self::default()
        }
    }

    /// Catalog holding the master loader and every built-in machine.
    pub fn with_builtins(blacklist: &[String]) -> Self {
        let mut catalog = Self::new(blacklist);
        catalog.register(crate::machines::master_loader());
        for loader in crate::machines::builtin_loaders() {
            catalog.register(loader);
        }
        catalog
    }

    pub fn is_blacklisted(&self, uri: &str) -> bool {
        let uri = uri.to_lowercase();
        self.blacklist.iter().any(|b| *b == uri)
    }

    /// Add a loader. Returns false if it was refused.
    pub fn register(&mut self, loader: Arc<dyn MachineLoader>) -> bool {
        let uri = loader.uri();
        if self.is_blacklisted(uri) {
            warn!(uri, "refusing blacklisted machine loader");
            let _ = writeln!(self.warnings, "{uri} is blacklisted");
            return false;
        }
        if self.find(uri).is_some() {
            warn!(uri, "duplicate machine loader");
            let _ = writeln!(self.errors, "{uri} is already registered");
            return false;
        }
        if loader.info().machine_type == MachineType::Master {
            if self.master.is_some() {
                let _ = writeln!(self.errors, "{uri}: a master loader is already registered");
                return false;
            }
            self.master = Some(loader.clone());
        }
        self.loaders.push(loader);
        true
    }

    /// Loader by URI, compared case-insensitively. `"Master"` names the
    /// master loader.
    pub fn find(&self, uri: &str) -> Option<Arc<dyn MachineLoader>> {
        if uri.eq_ignore_ascii_case("master") {
            return self.master.clone();
        }
        self.loaders.iter().find(|l| l.uri().eq_ignore_ascii_case(uri)).cloned()
    }

    pub fn get(&self, index: usize) -> Option<Arc<dyn MachineLoader>> {
        self.loaders.get(index).cloned()
    }

    pub fn master(&self) -> Option<Arc<dyn MachineLoader>> {
        self.master.clone()
    }

    pub fn len(&self) -> usize {
        self.loaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }

    /// Accumulated warning text, one line per problem.
    pub fn warnings(&self) -> &str {
        &self.warnings
    }

    /// Accumulated error text, one line per problem.
    pub fn errors(&self) -> &str {
        &self.errors
    }
}
