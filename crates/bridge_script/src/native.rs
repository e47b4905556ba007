//! Native object model
//!
//! What the native side of the bridge hands out: plain values, ordered
//! containers, shared instance handles and callables. Instances are reference
//! counted; their address is what an `@` slot in native memory holds.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// Opaque native instance that can live behind an [`ObjectRef`].
pub trait NativeHandle: Any {
    fn class_name(&self) -> &str;

    fn as_any(&self) -> &dyn Any;
}

/// Native value as seen by the bridge.
#[derive(Clone, Debug, PartialEq)]
pub enum NativeObject {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Sequence(Vec<NativeObject>),
    /// Key-value mapping, insertion ordered.
    Mapping(Vec<(String, NativeObject)>),
    Instance(ObjectRef),
    Callable(Callable),
}

impl NativeObject {
    /// Class name the native runtime would report for this value.
    pub fn class_name(&self) -> &str {
        match self {
            NativeObject::Null => "NSNull",
            NativeObject::Bool(_) | NativeObject::Number(_) => "NSNumber",
            NativeObject::String(_) => "NSString",
            NativeObject::Sequence(_) => "NSArray",
            NativeObject::Mapping(_) => "NSDictionary",
            NativeObject::Instance(obj) => obj.class_name(),
            NativeObject::Callable(_) => "BridgeCallable",
        }
    }

    /// Entry of a mapping by key.
    pub fn get(&self, key: &str) -> Option<&NativeObject> {
        match self {
            NativeObject::Mapping(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }
}

enum Instance {
    /// Container values that were boxed into an instance for an `@` slot.
    Value(NativeObject),
    Handle(Box<dyn NativeHandle>),
}

/// Shared handle to a native instance. Equality is identity.
#[derive(Clone)]
pub struct ObjectRef(Rc<Instance>);

impl ObjectRef {
    pub fn from_value(value: NativeObject) -> Self {
        match value {
            NativeObject::Instance(obj) => obj,
            other => ObjectRef(Rc::new(Instance::Value(other))),
        }
    }

    pub fn from_handle(handle: impl NativeHandle) -> Self {
        ObjectRef(Rc::new(Instance::Handle(Box::new(handle))))
    }

    /// Stable address of the instance for the lifetime of every clone.
    pub fn address(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    pub fn class_name(&self) -> &str {
        match &*self.0 {
            Instance::Value(value) => value.class_name(),
            Instance::Handle(handle) => handle.class_name(),
        }
    }

    /// Contained value when this instance wraps a plain container.
    pub fn as_value(&self) -> Option<&NativeObject> {
        match &*self.0 {
            Instance::Value(value) => Some(value),
            Instance::Handle(_) => None,
        }
    }

    pub fn downcast_ref<T: NativeHandle>(&self) -> Option<&T> {
        match &*self.0 {
            Instance::Handle(handle) => handle.as_any().downcast_ref::<T>(),
            Instance::Value(_) => None,
        }
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn strong_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} {:#x}>", self.class_name(), self.address())
    }
}

/// Target plus selector, invoked by the native runtime.
#[derive(Clone, Debug, PartialEq)]
pub struct Callable {
    pub target: Option<ObjectRef>,
    pub selector: String,
}

impl Callable {
    pub fn new(target: Option<ObjectRef>, selector: impl Into<String>) -> Self {
        Self {
            target,
            selector: selector.into(),
        }
    }
}
