//! Selector interning
//!
//! Selector slots in native memory hold a pointer-sized id. Ids start at 1;
//! 0 is the null selector.

use std::cell::RefCell;
use std::collections::HashMap;

#[derive(Default)]
struct Interned {
    names: Vec<String>,
    ids: HashMap<String, usize>,
}

#[derive(Default)]
pub struct SelectorTable {
    inner: RefCell<Interned>,
}

impl SelectorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id for `name`, interning it on first use.
    pub fn intern(&self, name: &str) -> usize {
        let mut inner = self.inner.borrow_mut();
        if let Some(id) = inner.ids.get(name) {
            return *id;
        }
        inner.names.push(name.to_string());
        let id = inner.names.len();
        inner.ids.insert(name.to_string(), id);
        id
    }

    pub fn name(&self, id: usize) -> Option<String> {
        let index = id.checked_sub(1)?;
        self.inner.borrow().names.get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_is_stable() {
        let table = SelectorTable::new();
        let a = table.intern("setTitle:");
        let b = table.intern("close");
        assert_eq!(a, 1);
        assert_eq!(table.intern("setTitle:"), a);
        assert_eq!(table.name(b).as_deref(), Some("close"));
        assert_eq!(table.name(0), None);
        assert_eq!(table.name(9), None);
        assert_eq!(table.len(), 2);
    }
}
