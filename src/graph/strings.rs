// Mon Jan 19 2026 - Alex

use ahash::AHashMap;
use std::fmt;

/// Handle to an interned name. Two names are equal iff their handles are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NameId(u32);

impl NameId {
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Session-wide string table shared by every loaded compilation unit.
#[derive(Debug, Default)]
pub struct Strings {
    ids: AHashMap<Box<str>, NameId>,
    names: Vec<Box<str>>,
}

impl Strings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, name: &str) -> NameId {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let id = NameId(self.names.len() as u32);
        self.names.push(name.into());
        self.ids.insert(name.into(), id);
        id
    }

    /// Finds a name that was already interned, without adding it.
    pub fn lookup(&self, name: &str) -> Option<NameId> {
        self.ids.get(name).copied()
    }

    pub fn get(&self, id: NameId) -> &str {
        self.names.get(id.0 as usize).map(|s| &**s).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_is_stable() {
        let mut strings = Strings::new();
        let a = strings.intern("long int");
        let b = strings.intern("char");
        assert_ne!(a, b);
        assert_eq!(strings.intern("long int"), a);
        assert_eq!(strings.get(b), "char");
        assert_eq!(strings.len(), 2);
    }

    #[test]
    fn test_lookup_does_not_intern() {
        let mut strings = Strings::new();
        assert!(strings.lookup("long unsigned int").is_none());
        strings.intern("long unsigned int");
        assert!(strings.lookup("long unsigned int").is_some());
        assert_eq!(strings.len(), 1);
    }
}
