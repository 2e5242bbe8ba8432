//! Symbol interning.

use rustc_hash::FxHashMap;
use std::{
    fmt,
    hash::{Hash, Hasher},
    rc::Rc,
};

/// Stable integer identity of an interned symbol name.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct SymbolId(pub u32);

/// A reference to an interned symbol.
///
/// Two symbols with the same id denote the same binding slot; the name is only
/// carried along for diagnostics.
#[derive(Clone)]
pub struct Symbol {
    id: SymbolId,
    name: Rc<str>,
}

impl Symbol {
    pub fn id(&self) -> SymbolId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for Symbol {
    fn eq(&self, rhs: &Symbol) -> bool {
        self.id == rhs.id
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.id.0)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Symbol interning table for fast symbol comparison.
#[derive(Debug, Default)]
pub struct SymbolTable {
    map: FxHashMap<Rc<str>, SymbolId>,
    names: Vec<Rc<str>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a symbol name, returning the same identity for the same name
    /// every time.
    pub fn intern(&mut self, name: &str) -> Symbol {
        if let Some(&id) = self.map.get(name) {
            return Symbol {
                id,
                name: self.names[id.0 as usize].clone(),
            };
        }

        let id = SymbolId(self.names.len() as u32);
        let name: Rc<str> = Rc::from(name);
        self.names.push(name.clone());
        self.map.insert(name.clone(), id);

        Symbol {
            id,
            name,
        }
    }

    /// Get the name of a symbol by id.
    pub fn name_of(&self, id: SymbolId) -> Option<&str> {
        self.names.get(id.0 as usize).map(|name| name.as_ref())
    }

    /// Get the symbol for a name, if it has been interned.
    pub fn get(&self, name: &str) -> Option<Symbol> {
        self.map.get(name).map(|&id| Symbol {
            id,
            name: self.names[id.0 as usize].clone(),
        })
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
    fn interning_is_stable() {
        let mut symbols = SymbolTable::new();

        let a = symbols.intern("alpha");
        let b = symbols.intern("beta");
        let a2 = symbols.intern("alpha");

        assert_eq!(a, a2);
        assert_ne!(a, b);
        assert_eq!(symbols.len(), 2);
        assert_eq!(symbols.name_of(b.id()), Some("beta"));
        assert_eq!(symbols.name_of(SymbolId(99)), None);
        assert_eq!(symbols.get("alpha"), Some(a));
        assert_eq!(symbols.get("gamma"), None);
    }
}
