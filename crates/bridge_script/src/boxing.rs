// boxing.rs - Native objects <-> script values
//
// Containers convert structurally: sequences become arrays and mappings become
// objects. Every other native object is boxed into an opaque wrapper that
// shares ownership of it. Objects written into native `@` slots are retained
// in a table keyed by address, so reading the slot back finds the same
// object. Each address is retained at most once.

use crate::error::MarshalError;
use crate::native::{NativeObject, ObjectRef};
use crate::value::{ScriptValue, Wrapper};
use std::cell::RefCell;
use std::collections::HashMap;

#[derive(Default)]
pub struct ObjectBoxing {
    retained: RefCell<HashMap<usize, ObjectRef>>,
}

impl ObjectBoxing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert a native object into its script representation.
    pub fn box_value(&self, object: &NativeObject) -> ScriptValue {
        match object {
            NativeObject::Null => ScriptValue::Null,
            NativeObject::Bool(b) => ScriptValue::Bool(*b),
            NativeObject::Number(n) => ScriptValue::Number(*n),
            NativeObject::String(s) => ScriptValue::String(s.clone()),
            NativeObject::Sequence(items) => {
                ScriptValue::Array(items.iter().map(|item| self.box_value(item)).collect())
            }
            NativeObject::Mapping(entries) => ScriptValue::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.as_str(), self.box_value(v)))
                    .collect(),
            ),
            NativeObject::Instance(obj) => self.box_instance(obj),
            NativeObject::Callable(callable) => ScriptValue::Wrapper(Wrapper::Callable(callable.clone())),
        }
    }

    /// Instances holding plain values box structurally, handles box opaquely.
    pub fn box_instance(&self, object: &ObjectRef) -> ScriptValue {
        match object.as_value() {
            Some(value) => self.box_value(value),
            None => ScriptValue::Wrapper(Wrapper::Object(object.clone())),
        }
    }

    /// Inverse of [`box_value`](Self::box_value).
    pub fn unbox(&self, value: &ScriptValue) -> Result<NativeObject, MarshalError> {
        Ok(match value {
            ScriptValue::Undefined => {
                return Err(MarshalError::unbox("undefined", "no native counterpart"));
            }
            ScriptValue::Null => NativeObject::Null,
            ScriptValue::Bool(b) => NativeObject::Bool(*b),
            ScriptValue::Number(n) => NativeObject::Number(*n),
            ScriptValue::String(s) => NativeObject::String(s.clone()),
            ScriptValue::Array(items) => NativeObject::Sequence(
                items
                    .iter()
                    .map(|item| self.unbox(item))
                    .collect::<Result<_, _>>()?,
            ),
            ScriptValue::Object(obj) => NativeObject::Mapping(
                obj.iter()
                    .map(|(k, v)| Ok((k.to_string(), self.unbox(v)?)))
                    .collect::<Result<_, MarshalError>>()?,
            ),
            ScriptValue::Wrapper(Wrapper::Object(obj)) => NativeObject::Instance(obj.clone()),
            ScriptValue::Wrapper(Wrapper::Callable(callable)) => NativeObject::Callable(callable.clone()),
            ScriptValue::Wrapper(Wrapper::Pointer(ptr)) => {
                return Err(MarshalError::unbox(
                    format!("pointer {:#x}", ptr.address),
                    "raw pointers are not objects",
                ));
            }
        })
    }

    /// Native instance for an `@` slot. `None` means nil.
    pub fn to_object_ref(&self, value: &ScriptValue) -> Result<Option<ObjectRef>, MarshalError> {
        match value {
            ScriptValue::Undefined | ScriptValue::Null => Ok(None),
            ScriptValue::Wrapper(Wrapper::Object(obj)) => Ok(Some(obj.clone())),
            other => Ok(Some(ObjectRef::from_value(self.unbox(other)?))),
        }
    }

    /// Keep `object` alive under its address. Returns the address.
    pub fn retain(&self, object: &ObjectRef) -> usize {
        let address = object.address();
        self.retained
            .borrow_mut()
            .entry(address)
            .or_insert_with(|| object.clone());
        address
    }

    pub fn resolve(&self, address: usize) -> Option<ObjectRef> {
        self.retained.borrow().get(&address).cloned()
    }

    pub fn is_retained(&self, address: usize) -> bool {
        self.retained.borrow().contains_key(&address)
    }

    pub fn release(&self, address: usize) -> bool {
        self.retained.borrow_mut().remove(&address).is_some()
    }

    /// Drop entries nothing outside the table refers to. Returns how many.
    pub fn collect(&self) -> usize {
        let mut retained = self.retained.borrow_mut();
        let before = retained.len();
        retained.retain(|_, obj| obj.strong_count() > 1);
        let dropped = before - retained.len();
        if dropped > 0 {
            tracing::debug!(dropped, remaining = retained.len(), "collected boxed objects");
        }
        dropped
    }

    pub fn retained_count(&self) -> usize {
        self.retained.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::Callable;
    use crate::value::{RawPointer, ScriptObject};
    use bridge_core::TypeDescriptor;

    fn sample() -> ScriptValue {
        ScriptValue::Object(
            ScriptObject::new()
                .with("name", "window")
                .with("frame", ScriptValue::Array(vec![0.into(), 0.into(), 640.into(), 480.into()]))
                .with("visible", true)
                .with("parent", ScriptValue::Null),
        )
    }

    #[test]
    fn test_box_unbox_roundtrip_is_value_equal() {
        let boxing = ObjectBoxing::new();
        let value = sample();
        let native = boxing.unbox(&value).unwrap();
        assert_eq!(native.class_name(), "NSDictionary");
        assert_eq!(native.get("visible"), Some(&NativeObject::Bool(true)));
        assert_eq!(boxing.box_value(&native), value);

        let list = ScriptValue::Array(vec![1.into(), "two".into(), sample()]);
        assert_eq!(boxing.box_value(&boxing.unbox(&list).unwrap()), list);
    }

    #[test]
    fn test_unbox_rejects_pointers_and_undefined() {
        let boxing = ObjectBoxing::new();
        let pointer = ScriptValue::Wrapper(Wrapper::Pointer(RawPointer {
            address: 0x1000,
            pointee: TypeDescriptor::Int32,
        }));
        assert!(matches!(boxing.unbox(&pointer), Err(MarshalError::Unbox { .. })));
        assert!(matches!(boxing.unbox(&ScriptValue::Undefined), Err(MarshalError::Unbox { .. })));
        let nested = ScriptValue::Array(vec![ScriptValue::Undefined]);
        assert!(boxing.unbox(&nested).is_err());
    }

    #[test]
    fn test_wrappers_share_the_native_object() {
        let boxing = ObjectBoxing::new();
        let obj = ObjectRef::from_value(NativeObject::String("x".to_string()));
        let callable = NativeObject::Callable(Callable::new(Some(obj.clone()), "description"));
        let boxed = boxing.box_value(&callable);
        match &boxed {
            ScriptValue::Wrapper(Wrapper::Callable(c)) => {
                assert!(c.target.as_ref().unwrap().ptr_eq(&obj));
                assert_eq!(c.selector, "description");
            }
            other => panic!("expected callable wrapper, got {:?}", other),
        }
        assert_eq!(boxing.unbox(&boxed).unwrap(), callable);
    }

    #[test]
    fn test_retain_table_is_one_box_per_object() {
        let boxing = ObjectBoxing::new();
        let obj = boxing.to_object_ref(&sample()).unwrap().unwrap();
        let address = boxing.retain(&obj);
        assert_eq!(boxing.retain(&obj), address);
        assert_eq!(boxing.retained_count(), 1);
        assert!(boxing.resolve(address).unwrap().ptr_eq(&obj));

        // Still referenced from here, so collect keeps it.
        assert_eq!(boxing.collect(), 0);
        drop(obj);
        assert_eq!(boxing.collect(), 1);
        assert!(boxing.resolve(address).is_none());
        assert!(!boxing.release(address));
    }

    #[test]
    fn test_nil_object_values() {
        let boxing = ObjectBoxing::new();
        assert!(boxing.to_object_ref(&ScriptValue::Null).unwrap().is_none());
        assert!(boxing.to_object_ref(&ScriptValue::Undefined).unwrap().is_none());
    }
}
