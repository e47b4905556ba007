//! Bridge Scripting
//!
//! Moves values between JavaScript (QuickJS) and native memory.
//!
//! ## Architecture
//!
//! - **Values:** [`ScriptValue`] is the engine-independent view of a script value
//! - **Marshalling:** [`Marshaller`] converts values to and from the bytes of a typed slot
//! - **Arguments:** [`Argument`] owns or aliases one slot and tracks its lifecycle
//! - **Engine:** [`ScriptRuntime`] installs the bridge functions into a QuickJS context

pub mod argument;
pub mod boxing;
pub mod call;
pub mod error;
pub mod ffi;
pub mod marshal;
pub mod native;
pub mod quickjs;
pub mod runtime;
pub mod selector;
pub mod settings;
pub mod structs;
pub mod value;

pub use argument::{Argument, ArgumentFlags, ArgumentState};
pub use boxing::ObjectBoxing;
pub use call::CallFrame;
pub use error::MarshalError;
pub use ffi::{HandleTable, ScriptHandle};
pub use marshal::Marshaller;
pub use native::{Callable, NativeHandle, NativeObject, ObjectRef};
pub use runtime::{ScriptError, ScriptRuntime};
pub use selector::SelectorTable;
pub use settings::{MarshalSettings, SettingsError};
pub use structs::{decode_struct, script_to_struct, struct_to_script};
pub use value::{RawPointer, ScriptObject, ScriptValue, Wrapper};

pub use rquickjs;
