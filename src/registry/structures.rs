// Tue Jan 20 2026 - Alex

use crate::graph::NameId;
use crate::registry::RegistryError;
use indexmap::IndexMap;
use log::trace;

/// Aggregated counters for every structure sharing one name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Structure {
    pub name: NameId,
    /// Compilation units that defined it.
    pub nr_files: u32,
    /// Function parameters pointing at it.
    pub nr_methods: u32,
}

impl Structure {
    fn new(name: NameId) -> Self {
        Self {
            name,
            nr_files: 1,
            nr_methods: 0,
        }
    }
}

/// Session-scoped catalog of structures keyed by interned name.
/// Iteration follows insertion order.
#[derive(Debug, Default)]
pub struct StructureRegistry {
    entries: IndexMap<NameId, Structure>,
}

impl StructureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find(&self, name: NameId) -> Option<&Structure> {
        self.entries.get(&name)
    }

    pub fn contains(&self, name: NameId) -> bool {
        self.entries.contains_key(&name)
    }

    /// Callers must `find` first; a second `add` for one name is a bug.
    pub fn add(&mut self, name: NameId) -> Result<&mut Structure, RegistryError> {
        if self.entries.contains_key(&name) {
            return Err(RegistryError::AlreadyRegistered(name));
        }
        self.entries
            .try_reserve(1)
            .map_err(|_| RegistryError::OutOfMemory(name))?;
        trace!("registered structure {}", name);
        let entry = self.entries.entry(name).or_insert_with(|| Structure::new(name));
        Ok(entry)
    }

    /// Dedup lookup: a hit counts one more defining unit.
    pub fn note_definition(&mut self, name: NameId) -> bool {
        match self.entries.get_mut(&name) {
            Some(entry) => {
                entry.nr_files += 1;
                true
            }
            None => false,
        }
    }

    pub fn bump_methods(&mut self, name: NameId) -> bool {
        match self.entries.get_mut(&name) {
            Some(entry) => {
                entry.nr_methods += 1;
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Structure> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
