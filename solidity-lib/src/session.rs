use std::collections::BTreeMap;

use utils::DiagnosticEmitter;

use crate::config::Config;
use crate::engine::{RecordSink, Recorder};
use crate::heap::{Handle, Heap};
use crate::snapshot::SnapshotManager;
use crate::symbolic::{IdentityManager, SymbolKind};

/// Names visible in a function, mapped to their variables. State variables
/// and globals are shared: every function environment of a contract holds
/// the same handles for them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<String, Handle>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: &str, handle: Handle) {
        self.vars.insert(name.to_owned(), handle);
    }

    pub fn get(&self, name: &str) -> Option<Handle> {
        self.vars.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Adds the names of `other` this environment does not define yet.
    pub fn merge_missing(&mut self, other: &Environment) {
        for (name, handle) in &other.vars {
            self.vars.entry(name.clone()).or_insert(*handle);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Handle)> + '_ {
        self.vars.iter().map(|(name, handle)| (name.as_str(), *handle))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// Everything one analysis run owns. Nothing is shared between sessions.
pub struct Session {
    pub config: Config,
    pub heap: Heap,
    pub addresses: IdentityManager,
    pub bytes: IdentityManager,
    pub snapshots: SnapshotManager,
    pub recorder: Box<dyn RecordSink>,
    pub diag: DiagnosticEmitter,
}

impl Session {
    pub fn new(config: Config) -> Self {
        Self {
            addresses: IdentityManager::new(SymbolKind::Address, config.first_fresh_id),
            bytes: IdentityManager::new(SymbolKind::Bytes(32), config.first_fresh_id),
            heap: Heap::new().with_max_array_length(config.max_array_length),
            config,
            snapshots: SnapshotManager::new(),
            recorder: Box::new(Recorder::new()),
            diag: DiagnosticEmitter::log_to_buffer(),
        }
    }

    pub fn with_recorder(mut self, recorder: impl RecordSink + 'static) -> Self {
        self.recorder = Box::new(recorder);
        self
    }

    pub fn with_diagnostics(mut self, diag: DiagnosticEmitter) -> Self {
        self.diag = diag;
        self
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
