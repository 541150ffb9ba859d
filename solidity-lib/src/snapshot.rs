use std::collections::HashMap;

use log::debug;

use crate::heap::{Handle, Heap, Slot};

/// Saved state of variables patched by debug directives, keyed by the
/// patched variable. Only the state before the first patch is kept, so
/// removing the directive brings back the original no matter how often the
/// variable was patched in between.
#[derive(Clone, Debug, Default)]
pub struct SnapshotManager {
    store: HashMap<Handle, Vec<(Handle, Slot)>>,
}

impl SnapshotManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Saves `handle` and everything it owns. Returns false if there already
    /// is a snapshot of it.
    pub fn register(&mut self, heap: &Heap, handle: Handle) -> bool {
        if self.store.contains_key(&handle) {
            return false;
        }
        debug!("Snapshot of `{}`", heap.get(handle).identifier);
        self.store.insert(handle, heap.save_subtree(handle));
        true
    }

    /// Writes the snapshot back and forgets it. Returns false if there was
    /// nothing to restore.
    pub fn restore(&mut self, heap: &mut Heap, handle: Handle) -> bool {
        let Some(saved) = self.store.remove(&handle) else {
            return false;
        };
        debug!("Restoring `{}`", heap.get(handle).identifier);
        heap.restore_subtree(saved);
        true
    }

    /// Drops the snapshot of `handle` without writing it back.
    pub fn forget(&mut self, handle: Handle) -> bool {
        self.store.remove(&handle).is_some()
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.store.contains_key(&handle)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}
