// quickjs.rs - rquickjs values <-> ScriptValue
//
// Wrappers become plain JS objects tagged with a numeric handle into the
// HandleTable; converting such an object back yields the original wrapper.
// Marshalling errors surface in scripts as TypeError, RangeError or Error.

use crate::error::MarshalError;
use crate::ffi::{HandleTable, ScriptHandle};
use crate::value::{ScriptObject, ScriptValue, Wrapper};
use bridge_core::StorageError;
use rquickjs::{Array, Ctx, Exception, IntoJs, Object, Value};

pub const HANDLE_PROPERTY: &str = "__bridge_handle";
pub const KIND_PROPERTY: &str = "__bridge_kind";

const MAX_DEPTH: usize = 64;

pub fn to_js<'js>(ctx: &Ctx<'js>, value: &ScriptValue, handles: &mut HandleTable) -> rquickjs::Result<Value<'js>> {
    Ok(match value {
        ScriptValue::Undefined => Value::new_undefined(ctx.clone()),
        ScriptValue::Null => Value::new_null(ctx.clone()),
        ScriptValue::Bool(b) => b.into_js(ctx)?,
        ScriptValue::Number(n) => n.into_js(ctx)?,
        ScriptValue::String(s) => s.as_str().into_js(ctx)?,
        ScriptValue::Array(items) => {
            let array = Array::new(ctx.clone())?;
            for (i, item) in items.iter().enumerate() {
                array.set(i, to_js(ctx, item, handles)?)?;
            }
            array.into_value()
        }
        ScriptValue::Object(obj) => {
            let object = Object::new(ctx.clone())?;
            for (key, item) in obj.iter() {
                object.set(key, to_js(ctx, item, handles)?)?;
            }
            object.into_value()
        }
        ScriptValue::Wrapper(wrapper) => wrapper_to_js(ctx, wrapper, handles)?,
    })
}

fn wrapper_to_js<'js>(ctx: &Ctx<'js>, wrapper: &Wrapper, handles: &mut HandleTable) -> rquickjs::Result<Value<'js>> {
    let object = Object::new(ctx.clone())?;
    match wrapper {
        Wrapper::Object(obj) => {
            object.set(KIND_PROPERTY, "object")?;
            object.set("className", obj.class_name())?;
        }
        Wrapper::Callable(callable) => {
            object.set(KIND_PROPERTY, "callable")?;
            object.set("selector", callable.selector.as_str())?;
        }
        Wrapper::Pointer(ptr) => {
            object.set(KIND_PROPERTY, "pointer")?;
            object.set("address", ptr.address as f64)?;
            object.set("type", ptr.pointee.encoding())?;
        }
    }
    let handle = handles.insert(wrapper.clone());
    object.set(HANDLE_PROPERTY, handle.to_f64())?;
    Ok(object.into_value())
}

pub fn from_js(value: &Value<'_>, handles: &HandleTable) -> Result<ScriptValue, MarshalError> {
    convert(value, handles, 0)
}

fn convert(value: &Value<'_>, handles: &HandleTable, depth: usize) -> Result<ScriptValue, MarshalError> {
    if depth > MAX_DEPTH {
        return Err(MarshalError::unbox(
            "nested value",
            format!("nesting deeper than {} levels", MAX_DEPTH),
        ));
    }
    if value.is_undefined() {
        return Ok(ScriptValue::Undefined);
    }
    if value.is_null() {
        return Ok(ScriptValue::Null);
    }
    if let Some(b) = value.as_bool() {
        return Ok(ScriptValue::Bool(b));
    }
    if let Some(n) = value.as_number() {
        return Ok(ScriptValue::Number(n));
    }
    if let Some(s) = value.as_string() {
        return Ok(ScriptValue::String(s.to_string().map_err(engine_error)?));
    }
    if let Some(array) = value.as_array() {
        let mut items = Vec::with_capacity(array.len());
        for item in array.iter::<Value>() {
            items.push(convert(&item.map_err(engine_error)?, handles, depth + 1)?);
        }
        return Ok(ScriptValue::Array(items));
    }
    if value.is_function() {
        return Err(MarshalError::unbox("function", "functions cannot cross the bridge"));
    }
    if let Some(object) = value.as_object() {
        let handle = object
            .get::<_, Option<f64>>(HANDLE_PROPERTY)
            .map_err(engine_error)?
            .and_then(ScriptHandle::from_f64);
        if let Some(handle) = handle {
            return handles
                .get(handle)
                .cloned()
                .map(ScriptValue::Wrapper)
                .ok_or_else(|| MarshalError::unbox(format!("wrapper handle {}", handle.0), "stale handle"));
        }

        let mut out = ScriptObject::new();
        for prop in object.props::<String, Value>() {
            let (key, item) = prop.map_err(engine_error)?;
            out.set(key, convert(&item, handles, depth + 1)?);
        }
        return Ok(ScriptValue::Object(out));
    }
    Err(MarshalError::unbox(
        format!("{:?}", value.type_of()),
        "no bridge representation",
    ))
}

fn engine_error(err: rquickjs::Error) -> MarshalError {
    MarshalError::unbox("script value", err.to_string())
}

/// Raise `err` as a script exception. Return the result from the native
/// function so the engine unwinds.
pub fn throw(ctx: &Ctx<'_>, err: &MarshalError) -> rquickjs::Error {
    let message = format!("{}: {}", err.exception_name(), err);
    match err {
        MarshalError::TypeMismatch { .. } | MarshalError::Unbox { .. } => Exception::throw_type(ctx, &message),
        MarshalError::ConversionOverflow { .. }
        | MarshalError::Storage(
            StorageError::OutOfBounds { .. }
            | StorageError::LayoutOverflow { .. }
            | StorageError::AllocationFailed { .. },
        ) => Exception::throw_range(ctx, &message),
        _ => Exception::throw_message(ctx, &message),
    }
}
