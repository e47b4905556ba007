//! Engine-neutral script values
//!
//! The marshaller reads and writes these; the QuickJS adapter converts them
//! to and from engine values.

use crate::native::{Callable, ObjectRef};
use bridge_core::TypeDescriptor;

/// Value on the script side of the bridge.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum ScriptValue {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<ScriptValue>),
    Object(ScriptObject),
    Wrapper(Wrapper),
}

impl ScriptValue {
    /// Runtime kind, as used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            ScriptValue::Undefined => "undefined",
            ScriptValue::Null => "null",
            ScriptValue::Bool(_) => "boolean",
            ScriptValue::Number(_) => "number",
            ScriptValue::String(_) => "string",
            ScriptValue::Array(_) => "array",
            ScriptValue::Object(_) => "object",
            ScriptValue::Wrapper(Wrapper::Object(_)) => "object wrapper",
            ScriptValue::Wrapper(Wrapper::Callable(_)) => "callable wrapper",
            ScriptValue::Wrapper(Wrapper::Pointer(_)) => "pointer wrapper",
        }
    }

    /// `null` or `undefined`.
    pub fn is_nullish(&self) -> bool {
        matches!(self, ScriptValue::Undefined | ScriptValue::Null)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            ScriptValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ScriptValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScriptValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[ScriptValue]> {
        match self {
            ScriptValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ScriptObject> {
        match self {
            ScriptValue::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Property lookup on objects; `None` for every other kind.
    pub fn get(&self, key: &str) -> Option<&ScriptValue> {
        self.as_object().and_then(|obj| obj.get(key))
    }
}

impl From<bool> for ScriptValue {
    fn from(value: bool) -> Self {
        ScriptValue::Bool(value)
    }
}

impl From<f64> for ScriptValue {
    fn from(value: f64) -> Self {
        ScriptValue::Number(value)
    }
}

impl From<i32> for ScriptValue {
    fn from(value: i32) -> Self {
        ScriptValue::Number(value as f64)
    }
}

impl From<&str> for ScriptValue {
    fn from(value: &str) -> Self {
        ScriptValue::String(value.to_string())
    }
}

impl From<String> for ScriptValue {
    fn from(value: String) -> Self {
        ScriptValue::String(value)
    }
}

impl From<Vec<ScriptValue>> for ScriptValue {
    fn from(value: Vec<ScriptValue>) -> Self {
        ScriptValue::Array(value)
    }
}

impl From<ScriptObject> for ScriptValue {
    fn from(value: ScriptObject) -> Self {
        ScriptValue::Object(value)
    }
}

/// Script object with named properties in insertion order.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct ScriptObject {
    props: Vec<(String, ScriptValue)>,
}

impl ScriptObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.props.len()
    }

    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&ScriptValue> {
        self.props.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Set a property, keeping its original position when it already exists.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ScriptValue>) {
        let key = key.into();
        let value = value.into();
        match self.props.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.props.push((key, value)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<ScriptValue> {
        let index = self.props.iter().position(|(k, _)| k == key)?;
        Some(self.props.remove(index).1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.props.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ScriptValue)> {
        self.props.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Builder-style `set`.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ScriptValue>) -> Self {
        self.set(key, value);
        self
    }
}

impl<K: Into<String>> FromIterator<(K, ScriptValue)> for ScriptObject {
    fn from_iter<I: IntoIterator<Item = (K, ScriptValue)>>(iter: I) -> Self {
        let mut obj = ScriptObject::new();
        for (k, v) in iter {
            obj.set(k, v);
        }
        obj
    }
}

impl IntoIterator for ScriptObject {
    type Item = (String, ScriptValue);
    type IntoIter = std::vec::IntoIter<(String, ScriptValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.props.into_iter()
    }
}

/// Opaque script value referring back to something native.
#[derive(Clone, Debug, PartialEq)]
pub enum Wrapper {
    Object(ObjectRef),
    Callable(Callable),
    Pointer(RawPointer),
}

/// Address read from a pointer slot. The pointee is never copied.
#[derive(Clone, Debug, PartialEq)]
pub struct RawPointer {
    pub address: usize,
    pub pointee: TypeDescriptor,
}
