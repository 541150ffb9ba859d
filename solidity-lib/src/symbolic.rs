use std::collections::{BTreeMap, BTreeSet};

use analysis::domains::*;
use log::debug;

use crate::value::Value;

/// What the identities of a manager stand for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymbolKind {
    Address,
    /// `bytesN` values, the identity is the content of the bytes.
    Bytes(u8),
}

/// Hands out integer identities for symbolic values and remembers which
/// variables were bound to which identity. Two variables bound to the same
/// identity are aliases of each other.
#[derive(Clone, Debug)]
pub struct IdentityManager {
    kind: SymbolKind,
    next: u64,
    first: u64,
    fixed: BTreeSet<u64>,
    bindings: BTreeMap<u64, BTreeSet<String>>,
}

impl IdentityManager {
    pub fn new(kind: SymbolKind, first_fresh_id: u64) -> Self {
        Self {
            kind,
            next: first_fresh_id,
            first: first_fresh_id,
            fixed: BTreeSet::new(),
            bindings: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> SymbolKind {
        self.kind
    }

    fn is_used(&self, id: u64) -> bool {
        self.fixed.contains(&id) || self.bindings.contains_key(&id)
    }

    /// An identity nothing else uses yet.
    pub fn fresh_id(&mut self) -> u64 {
        while self.is_used(self.next) {
            self.next += 1;
        }
        let id = self.next;
        self.next += 1;
        self.bindings.entry(id).or_default();
        id
    }

    /// Reserves `id`, e.g. the well known identity of `msg.sender`.
    pub fn register_fixed_id(&mut self, id: u64, name: Option<&str>) {
        self.fixed.insert(id);
        if let Some(name) = name {
            self.bind_var(name, id);
        }
    }

    /// Binds `name` to `id`. Binding a second name to the same identity makes
    /// them aliases.
    pub fn bind_var(&mut self, name: &str, id: u64) {
        debug!("Binding `{name}` to symbolic identity {id}");
        self.bindings.entry(id).or_default().insert(name.to_owned());
    }

    pub fn unbind_var(&mut self, name: &str) {
        for names in self.bindings.values_mut() {
            names.remove(name);
        }
    }

    /// Variables bound to `id`, in name order.
    pub fn aliases(&self, id: u64) -> Vec<String> {
        self.bindings
            .get(&id)
            .map(|names| names.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn ids_of(&self, name: &str) -> Vec<u64> {
        self.bindings
            .iter()
            .filter(|(_, names)| names.contains(name))
            .map(|(id, _)| *id)
            .collect()
    }

    /// The abstract value denoting exactly this identity.
    pub fn value_of(&self, id: u64) -> Value {
        match self.kind {
            SymbolKind::Address => Value::Address(AddressSet::of(id)),
            SymbolKind::Bytes(width) => Value::Bytes(BytesSet::of(width, id)),
        }
    }

    /// Forgets every binding. Fixed identities stay reserved.
    pub fn reset(&mut self) {
        self.bindings.clear();
        self.next = self.first;
    }
}
