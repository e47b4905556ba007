//! Handles between scripts and native wrappers
//!
//! The engine never sees a wrapper directly. Each one is parked in a
//! [`HandleTable`] and the script gets a numeric [`ScriptHandle`] instead.
//! The same object, callable or pointer always maps to the same handle.

use crate::native::ObjectRef;
use crate::value::Wrapper;
use std::collections::HashMap;

/// Opaque handle for script access
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ScriptHandle(pub u64);

impl ScriptHandle {
    /// Handles travel as script numbers, so they stay below 2^53.
    pub fn to_f64(self) -> f64 {
        self.0 as f64
    }

    pub fn from_f64(value: f64) -> Option<Self> {
        if value.is_finite() && value >= 1.0 && value.fract() == 0.0 && value < (1u64 << 53) as f64 {
            Some(ScriptHandle(value as u64))
        } else {
            None
        }
    }
}

/// Identity of a wrapper. Object addresses stay unique while the table holds
/// the object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum WrapperKey {
    Object(usize),
    Callable(Option<usize>, String),
    Pointer(usize, String),
}

impl WrapperKey {
    fn of(wrapper: &Wrapper) -> Self {
        match wrapper {
            Wrapper::Object(obj) => WrapperKey::Object(obj.address()),
            Wrapper::Callable(callable) => WrapperKey::Callable(
                callable.target.as_ref().map(ObjectRef::address),
                callable.selector.clone(),
            ),
            Wrapper::Pointer(ptr) => WrapperKey::Pointer(ptr.address, ptr.pointee.encoding()),
        }
    }
}

/// Wrappers currently visible to scripts.
pub struct HandleTable {
    next: u64,
    entries: HashMap<ScriptHandle, Wrapper>,
    index: HashMap<WrapperKey, ScriptHandle>,
}

impl HandleTable {
    pub fn new() -> Self {
        Self {
            next: 1,
            entries: HashMap::new(),
            index: HashMap::new(),
        }
    }

    /// Handle for `wrapper`, reusing the one already handed out for it.
    pub fn insert(&mut self, wrapper: Wrapper) -> ScriptHandle {
        let key = WrapperKey::of(&wrapper);
        if let Some(handle) = self.index.get(&key) {
            return *handle;
        }
        let handle = ScriptHandle(self.next);
        self.next += 1;
        self.entries.insert(handle, wrapper);
        self.index.insert(key, handle);
        handle
    }

    pub fn get(&self, handle: ScriptHandle) -> Option<&Wrapper> {
        self.entries.get(&handle)
    }

    pub fn remove(&mut self, handle: ScriptHandle) -> Option<Wrapper> {
        let wrapper = self.entries.remove(&handle)?;
        self.index.remove(&WrapperKey::of(&wrapper));
        Some(wrapper)
    }

    /// Forget object wrappers `keep` rejects, plus callables targeting them.
    /// Returns how many handles went away.
    pub fn retain_objects(&mut self, mut keep: impl FnMut(&ObjectRef) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, wrapper| match wrapper {
            Wrapper::Object(obj) => keep(obj),
            Wrapper::Callable(callable) => callable.target.as_ref().map_or(true, &mut keep),
            Wrapper::Pointer(_) => true,
        });
        let entries = &self.entries;
        self.index.retain(|_, handle| entries.contains_key(handle));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }
}

impl Default for HandleTable {
    fn default() -> Self {
        Self::new()
    }
}
