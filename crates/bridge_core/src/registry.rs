// registry.rs - Process-wide struct layout registry
//
// Struct names map to their field layouts. Entries are populated lazily,
// either from inline `{Name=...}` encodings or through an injected resolver,
// and are never overwritten once present.

use crate::encoding::{parse_with, EncodingError, Parser, StructDef, TypeDescriptor};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Lookup capability consulted for struct names the registry has not seen.
///
/// Returns a full inline encoding such as `{CGPoint="x"d"y"d}`.
pub trait StructResolver {
    fn resolve_struct(&self, name: &str) -> Option<String>;
}

impl<F> StructResolver for F
where
    F: Fn(&str) -> Option<String>,
{
    fn resolve_struct(&self, name: &str) -> Option<String> {
        self(name)
    }
}

type SharedResolver = Arc<dyn StructResolver + Send + Sync>;

/// Write-once-per-key cache of struct definitions.
///
/// Concurrent first resolution of the same name may call the resolver more
/// than once; the first insert wins and later ones are discarded.
pub struct StructRegistry {
    entries: RwLock<HashMap<String, Arc<StructDef>>>,
    resolver: RwLock<Option<SharedResolver>>,
}

static GLOBAL: Lazy<StructRegistry> = Lazy::new(StructRegistry::new);

impl StructRegistry {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            resolver: RwLock::new(None),
        }
    }

    pub fn with_resolver(resolver: impl StructResolver + Send + Sync + 'static) -> Self {
        let registry = Self::new();
        registry.set_resolver(resolver);
        registry
    }

    /// The process-wide registry.
    pub fn global() -> &'static StructRegistry {
        &GLOBAL
    }

    /// Install the resolver used for names not yet registered.
    pub fn set_resolver(&self, resolver: impl StructResolver + Send + Sync + 'static) {
        let mut slot = self.resolver.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(Arc::new(resolver));
    }

    pub(crate) fn resolver(&self) -> Option<SharedResolver> {
        self.resolver
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Look up an already registered struct without consulting the resolver.
    pub fn get(&self, name: &str) -> Option<Arc<StructDef>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Register a definition unless the name is already taken.
    ///
    /// Returns the definition that owns the name afterwards.
    pub fn register(&self, def: StructDef) -> Arc<StructDef> {
        self.insert_shared(Arc::new(def))
    }

    pub(crate) fn insert_shared(&self, def: Arc<StructDef>) -> Arc<StructDef> {
        debug_assert!(!def.is_opaque(), "opaque structs are never registered");
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = entries.get(def.name()) {
            return existing.clone();
        }
        tracing::debug!(name = def.name(), fields = def.fields().len(), "registered struct");
        entries.insert(def.name().to_string(), def.clone());
        def
    }

    /// Parse and register a full `{Name=...}` encoding.
    pub fn register_encoding(&self, encoding: &str) -> Result<Arc<StructDef>, EncodingError> {
        match parse_with(encoding, self)? {
            TypeDescriptor::Struct(def) if !def.is_opaque() => {
                Ok(self.get(def.name()).unwrap_or(def))
            }
            _ => Err(EncodingError::MalformedEncoding {
                encoding: encoding.to_string(),
                position: 0,
                reason: "not a struct encoding".to_string(),
            }),
        }
    }

    /// Look up `name`, asking the resolver when it is not registered yet.
    pub fn resolve(&self, name: &str) -> Result<Arc<StructDef>, EncodingError> {
        if let Some(def) = self.get(name) {
            return Ok(def);
        }
        let mut parser = Parser::new(name, self);
        let def = parser.resolve_named(name, false)?;
        parser.commit();
        Ok(def)
    }
}

impl Default for StructRegistry {
    fn default() -> Self {
        Self::new()
    }
}
