// marshal.rs - Script values <-> native memory
//
// `to_native` writes one script value into the bytes of a slot described by a
// TypeDescriptor; `to_script` reads it back. Structs are delegated to the
// struct codec, objects go through ObjectBoxing, selectors through the
// SelectorTable. Pointers carry only their address.

use crate::boxing::ObjectBoxing;
use crate::error::MarshalError;
use crate::native::ObjectRef;
use crate::selector::SelectorTable;
use crate::settings::MarshalSettings;
use crate::structs;
use crate::value::{RawPointer, ScriptValue, Wrapper};
use bridge_core::{Cursor, EncodingError, LayoutCalculator, StructDef, StructRegistry, TypeDescriptor};
use std::sync::Arc;

/// Largest integer magnitude an f64 represents exactly.
const MAX_SAFE_INTEGER: u64 = 1 << 53;

/// Exclusive upper bound of a 64-bit unsigned integer.
const TWO_POW_64: f64 = 18_446_744_073_709_551_616.0;
const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;

pub struct Marshaller<'r> {
    registry: &'r StructRegistry,
    layout: LayoutCalculator<'r>,
    boxing: ObjectBoxing,
    selectors: SelectorTable,
    settings: MarshalSettings,
}

impl Marshaller<'static> {
    /// Marshaller over the process-wide struct registry.
    pub fn global() -> Self {
        Self::new(StructRegistry::global())
    }
}

impl<'r> Marshaller<'r> {
    pub fn new(registry: &'r StructRegistry) -> Self {
        Self::with_settings(registry, MarshalSettings::default())
    }

    pub fn with_settings(registry: &'r StructRegistry, settings: MarshalSettings) -> Self {
        Self {
            registry,
            layout: LayoutCalculator::with_registry(registry),
            boxing: ObjectBoxing::new(),
            selectors: SelectorTable::new(),
            settings,
        }
    }

    #[inline]
    pub fn registry(&self) -> &'r StructRegistry {
        self.registry
    }

    #[inline]
    pub fn layout(&self) -> &LayoutCalculator<'r> {
        &self.layout
    }

    #[inline]
    pub fn boxing(&self) -> &ObjectBoxing {
        &self.boxing
    }

    #[inline]
    pub fn selectors(&self) -> &SelectorTable {
        &self.selectors
    }

    #[inline]
    pub fn settings(&self) -> &MarshalSettings {
        &self.settings
    }

    /// Write `value` into `dst`, which holds one `ty`.
    pub fn to_native(&self, value: &ScriptValue, ty: &TypeDescriptor, dst: &mut [u8]) -> Result<(), MarshalError> {
        tracing::trace!(ty = %ty, kind = value.kind(), "to_native");
        self.write(value, ty, dst)
            .inspect_err(|err| self.log_failure("to_native", err))
    }

    /// Read the `ty` held in `src`.
    pub fn to_script(&self, ty: &TypeDescriptor, src: &[u8]) -> Result<ScriptValue, MarshalError> {
        tracing::trace!(ty = %ty, "to_script");
        self.read(ty, src)
            .inspect_err(|err| self.log_failure("to_script", err))
    }

    pub(crate) fn log_failure(&self, operation: &str, err: &MarshalError) {
        if self.settings.log_all_exceptions {
            tracing::warn!(operation, kind = err.exception_name(), error = %err, "marshalling failed");
        } else {
            tracing::debug!(operation, kind = err.exception_name(), error = %err, "marshalling failed");
        }
    }

    /// Full definition for a struct descriptor; opaque ones are looked up by name.
    pub(crate) fn concrete(&self, def: &Arc<StructDef>) -> Result<Arc<StructDef>, MarshalError> {
        if !def.is_opaque() {
            return Ok(def.clone());
        }
        self.registry.get(def.name()).ok_or_else(|| {
            EncodingError::UnregisteredStruct {
                name: def.name().to_string(),
            }
            .into()
        })
    }

    pub(crate) fn write(&self, value: &ScriptValue, ty: &TypeDescriptor, dst: &mut [u8]) -> Result<(), MarshalError> {
        let mut cursor = Cursor::new(&mut *dst);
        match ty {
            TypeDescriptor::Void | TypeDescriptor::Unknown => {
                return Err(MarshalError::mismatch(
                    format!("a writable type, not {}", ty.explain()),
                    value.kind(),
                ));
            }
            TypeDescriptor::Bool => cursor.write::<u8>(truthy(value, ty)? as u8)?,
            TypeDescriptor::Int8 => cursor.write::<i8>(integer(value, ty, -128.0, 128.0)? as i8)?,
            TypeDescriptor::Int16 => cursor.write::<i16>(integer(value, ty, -32768.0, 32768.0)? as i16)?,
            TypeDescriptor::Int32 => {
                cursor.write::<i32>(integer(value, ty, -2_147_483_648.0, 2_147_483_648.0)? as i32)?
            }
            TypeDescriptor::Int64 => cursor.write::<i64>(integer(value, ty, -TWO_POW_63, TWO_POW_63)? as i64)?,
            TypeDescriptor::UInt8 => cursor.write::<u8>(clamp_byte(number(value, ty)?))?,
            TypeDescriptor::UInt16 => cursor.write::<u16>(integer(value, ty, 0.0, 65536.0)? as u16)?,
            TypeDescriptor::UInt32 => cursor.write::<u32>(integer(value, ty, 0.0, 4_294_967_296.0)? as u32)?,
            TypeDescriptor::UInt64 => cursor.write::<u64>(integer(value, ty, 0.0, TWO_POW_64)? as u64)?,
            TypeDescriptor::Float32 => {
                let n = number(value, ty)?;
                if n.is_finite() && n.abs() > f32::MAX as f64 {
                    return Err(MarshalError::overflow(n, ty.explain()));
                }
                cursor.write::<f32>(n as f32)?
            }
            TypeDescriptor::Float64 => cursor.write::<f64>(number(value, ty)?)?,
            TypeDescriptor::Pointer(_) => cursor.write::<usize>(address(value, ty)?)?,
            TypeDescriptor::ObjectRef => {
                let address = match self.boxing.to_object_ref(value)? {
                    Some(obj) => self.boxing.retain(&obj),
                    None => 0,
                };
                cursor.write::<usize>(address)?
            }
            TypeDescriptor::Selector => {
                let id = match value {
                    v if v.is_nullish() => 0,
                    ScriptValue::String(name) => self.selectors.intern(name),
                    ScriptValue::Wrapper(Wrapper::Callable(callable)) => self.selectors.intern(&callable.selector),
                    other => return Err(MarshalError::mismatch("selector name", other.kind())),
                };
                cursor.write::<usize>(id)?
            }
            TypeDescriptor::Struct(def) => {
                let def = self.concrete(def)?;
                structs::write_struct(self, value, &def, dst)?;
            }
            TypeDescriptor::Array { element, count } => self.write_array(value, element, *count, dst)?,
        }
        Ok(())
    }

    fn write_array(
        &self,
        value: &ScriptValue,
        element: &TypeDescriptor,
        count: usize,
        dst: &mut [u8],
    ) -> Result<(), MarshalError> {
        let items = value
            .as_array()
            .ok_or_else(|| MarshalError::mismatch(format!("array of {} {}", count, element.explain()), value.kind()))?;
        if items.len() > count {
            return Err(MarshalError::mismatch(
                format!("at most {} elements", count),
                format!("{} elements", items.len()),
            ));
        }

        let stride = self.layout.size_of(element);
        region_mut(dst, 0, stride.saturating_mul(count))?.fill(0);
        for (i, item) in items.iter().enumerate() {
            self.write(item, element, region_mut(dst, i * stride, stride)?)?;
        }
        Ok(())
    }

    /// Retained objects referenced from `@` slots inside `src`.
    pub(crate) fn referenced_objects(&self, ty: &TypeDescriptor, src: &[u8], out: &mut Vec<ObjectRef>) {
        match ty {
            TypeDescriptor::ObjectRef => {
                if let Ok(address) = Cursor::new(src).read::<usize>() {
                    if let Some(obj) = self.boxing.resolve(address) {
                        out.push(obj);
                    }
                }
            }
            TypeDescriptor::Struct(def) => {
                let Ok(def) = self.concrete(def) else {
                    return;
                };
                for (field, slot) in def.fields().iter().zip(self.layout.field_slots(&def)) {
                    if let Ok(bytes) = region(src, slot.offset, slot.size) {
                        self.referenced_objects(&field.ty, bytes, out);
                    }
                }
            }
            TypeDescriptor::Array { element, count } if holds_objects(element) => {
                let stride = self.layout.size_of(element);
                for i in 0..*count {
                    match region(src, i.saturating_mul(stride), stride) {
                        Ok(bytes) => self.referenced_objects(element, bytes, out),
                        Err(_) => break,
                    }
                }
            }
            _ => {}
        }
    }

    pub(crate) fn read(&self, ty: &TypeDescriptor, src: &[u8]) -> Result<ScriptValue, MarshalError> {
        let mut cursor = Cursor::new(src);
        let value = match ty {
            TypeDescriptor::Void => ScriptValue::Undefined,
            TypeDescriptor::Bool => ScriptValue::Bool(cursor.read::<u8>()? != 0),
            TypeDescriptor::Int8 => ScriptValue::Number(cursor.read::<i8>()? as f64),
            TypeDescriptor::Int16 => ScriptValue::Number(cursor.read::<i16>()? as f64),
            TypeDescriptor::Int32 => ScriptValue::Number(cursor.read::<i32>()? as f64),
            TypeDescriptor::Int64 => {
                let v = cursor.read::<i64>()?;
                self.check_precision(v.unsigned_abs(), || v.to_string());
                ScriptValue::Number(v as f64)
            }
            TypeDescriptor::UInt8 => ScriptValue::Number(cursor.read::<u8>()? as f64),
            TypeDescriptor::UInt16 => ScriptValue::Number(cursor.read::<u16>()? as f64),
            TypeDescriptor::UInt32 => ScriptValue::Number(cursor.read::<u32>()? as f64),
            TypeDescriptor::UInt64 => {
                let v = cursor.read::<u64>()?;
                self.check_precision(v, || v.to_string());
                ScriptValue::Number(v as f64)
            }
            TypeDescriptor::Float32 => ScriptValue::Number(cursor.read::<f32>()? as f64),
            TypeDescriptor::Float64 => ScriptValue::Number(cursor.read::<f64>()?),
            TypeDescriptor::Pointer(pointee) => match cursor.read::<usize>()? {
                0 => ScriptValue::Null,
                address => ScriptValue::Wrapper(Wrapper::Pointer(RawPointer {
                    address,
                    pointee: (**pointee).clone(),
                })),
            },
            TypeDescriptor::ObjectRef => match cursor.read::<usize>()? {
                0 => ScriptValue::Null,
                address => match self.boxing.resolve(address) {
                    Some(obj) => self.boxing.box_instance(&obj),
                    None => {
                        return Err(MarshalError::unbox(
                            format!("object at {:#x}", address),
                            "not retained by this bridge",
                        ));
                    }
                },
            },
            TypeDescriptor::Selector => match cursor.read::<usize>()? {
                0 => ScriptValue::Null,
                id => match self.selectors.name(id) {
                    Some(name) => ScriptValue::String(name),
                    None => {
                        return Err(MarshalError::unbox(format!("selector id {}", id), "not interned"));
                    }
                },
            },
            TypeDescriptor::Struct(def) => {
                let def = self.concrete(def)?;
                ScriptValue::Object(structs::read_struct(self, &def, src)?)
            }
            TypeDescriptor::Array { element, count } => {
                let stride = self.layout.size_of(element);
                let mut items = Vec::with_capacity(*count);
                for i in 0..*count {
                    items.push(self.read(element, region(src, i * stride, stride)?)?);
                }
                ScriptValue::Array(items)
            }
            TypeDescriptor::Unknown => {
                return Err(MarshalError::mismatch("a readable type", ty.explain()));
            }
        };
        Ok(value)
    }

    fn check_precision(&self, magnitude: u64, render: impl FnOnce() -> String) {
        if self.settings.warn_on_precision_loss && magnitude > MAX_SAFE_INTEGER {
            tracing::warn!(value = %render(), "64-bit integer above 2^53 loses precision as a script number");
        }
    }
}

/// Bytes `offset..offset + len` of `buf`, bounds checked.
pub(crate) fn region(buf: &[u8], offset: usize, len: usize) -> Result<&[u8], MarshalError> {
    let mut cursor = Cursor::new(buf);
    cursor.seek(offset)?;
    Ok(cursor.into_slice(len)?)
}

pub(crate) fn region_mut(buf: &mut [u8], offset: usize, len: usize) -> Result<&mut [u8], MarshalError> {
    let mut cursor = Cursor::new(buf);
    cursor.seek(offset)?;
    Ok(cursor.into_slice_mut(len)?)
}

fn number(value: &ScriptValue, ty: &TypeDescriptor) -> Result<f64, MarshalError> {
    match value {
        ScriptValue::Number(n) => Ok(*n),
        ScriptValue::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        ScriptValue::String(s) if *ty == TypeDescriptor::Int8 => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(c as u32 as f64),
                _ => Err(MarshalError::mismatch("single character", format!("string of {} characters", s.chars().count()))),
            }
        }
        other => Err(MarshalError::mismatch(format!("number for {}", ty.explain()), other.kind())),
    }
}

/// Truncate toward zero and check `min <= n < end`.
fn integer(value: &ScriptValue, ty: &TypeDescriptor, min: f64, end: f64) -> Result<f64, MarshalError> {
    let n = number(value, ty)?;
    if !n.is_finite() {
        return Err(MarshalError::overflow(n, ty.explain()));
    }
    let truncated = n.trunc();
    if truncated < min || truncated >= end {
        return Err(MarshalError::overflow(n, ty.explain()));
    }
    Ok(truncated)
}

/// Byte writes saturate instead of failing.
fn clamp_byte(n: f64) -> u8 {
    if !n.is_finite() || n <= 0.0 {
        0
    } else if n >= 255.0 {
        255
    } else {
        n.round() as u8
    }
}

fn truthy(value: &ScriptValue, ty: &TypeDescriptor) -> Result<bool, MarshalError> {
    match value {
        ScriptValue::Undefined | ScriptValue::Null => Ok(false),
        ScriptValue::Bool(b) => Ok(*b),
        ScriptValue::Number(n) => Ok(*n != 0.0 && !n.is_nan()),
        other => Err(MarshalError::mismatch(ty.explain(), other.kind())),
    }
}

fn holds_objects(ty: &TypeDescriptor) -> bool {
    match ty {
        TypeDescriptor::ObjectRef | TypeDescriptor::Struct(_) => true,
        TypeDescriptor::Array { element, .. } => holds_objects(element),
        _ => false,
    }
}

fn address(value: &ScriptValue, ty: &TypeDescriptor) -> Result<usize, MarshalError> {
    match value {
        v if v.is_nullish() => Ok(0),
        ScriptValue::Number(n) => {
            if n.is_finite() && *n >= 0.0 && n.fract() == 0.0 && *n < usize::MAX as f64 {
                Ok(*n as usize)
            } else {
                Err(MarshalError::overflow(n, ty.explain()))
            }
        }
        ScriptValue::Wrapper(Wrapper::Pointer(ptr)) => Ok(ptr.address),
        other => Err(MarshalError::mismatch(ty.explain(), other.kind())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::{Callable, NativeHandle, ObjectRef};
    use crate::value::ScriptObject;
    use bridge_core::{parse_with, StorageAllocator};
    use std::any::Any;

    fn roundtrip(m: &Marshaller, encoding: &str, value: ScriptValue) -> Result<ScriptValue, MarshalError> {
        let ty = parse_with(encoding, m.registry())?;
        let mut storage = StorageAllocator::with_registry(m.registry()).allocate(&ty)?;
        m.to_native(&value, &ty, storage.as_bytes_mut())?;
        m.to_script(&ty, storage.as_bytes())
    }

    #[test]
    fn test_byte_clamping() {
        let reg = StructRegistry::new();
        let m = Marshaller::new(&reg);
        let cases = [(-5.0, 0.0), (999.0, 255.0), (f64::NAN, 0.0), (3.7, 4.0), (2.5, 3.0), (0.4, 0.0), (254.6, 255.0)];
        for (input, expected) in cases {
            assert_eq!(
                roundtrip(&m, "C", ScriptValue::Number(input)).unwrap(),
                ScriptValue::Number(expected),
                "input {}",
                input
            );
        }
        assert_eq!(roundtrip(&m, "C", ScriptValue::Number(f64::INFINITY)).unwrap(), ScriptValue::Number(0.0));
    }

    #[test]
    fn test_integer_roundtrips_and_overflow() {
        let reg = StructRegistry::new();
        let m = Marshaller::new(&reg);
        let cases = [
            ("c", -128.0),
            ("c", 127.0),
            ("s", -32768.0),
            ("S", 65535.0),
            ("i", -2_147_483_648.0),
            ("I", 4_294_967_295.0),
            ("q", -9_007_199_254_740_991.0),
            ("Q", 9_007_199_254_740_991.0),
        ];
        for (encoding, n) in cases {
            assert_eq!(
                roundtrip(&m, encoding, ScriptValue::Number(n)).unwrap(),
                ScriptValue::Number(n),
                "{} {}",
                encoding,
                n
            );
        }

        for (encoding, n) in [("c", 128.0), ("s", -32769.0), ("S", -1.0), ("i", 2_147_483_648.0), ("I", f64::NAN), ("Q", -1.0)] {
            match roundtrip(&m, encoding, ScriptValue::Number(n)) {
                Err(MarshalError::ConversionOverflow { .. }) => {}
                other => panic!("{} {} should overflow, got {:?}", encoding, n, other),
            }
        }

        // Truncation toward zero.
        assert_eq!(roundtrip(&m, "i", ScriptValue::Number(-3.9)).unwrap(), ScriptValue::Number(-3.0));
        assert_eq!(roundtrip(&m, "c", ScriptValue::Number(-128.5)).unwrap(), ScriptValue::Number(-128.0));
    }

    #[test]
    fn test_bool_char_and_float_conversions() {
        let reg = StructRegistry::new();
        let m = Marshaller::new(&reg);
        assert_eq!(roundtrip(&m, "B", ScriptValue::Number(2.0)).unwrap(), ScriptValue::Bool(true));
        assert_eq!(roundtrip(&m, "B", ScriptValue::Null).unwrap(), ScriptValue::Bool(false));
        assert_eq!(roundtrip(&m, "i", ScriptValue::Bool(true)).unwrap(), ScriptValue::Number(1.0));
        assert_eq!(roundtrip(&m, "c", "A".into()).unwrap(), ScriptValue::Number(65.0));
        assert!(matches!(roundtrip(&m, "c", "AB".into()), Err(MarshalError::TypeMismatch { .. })));
        assert!(matches!(roundtrip(&m, "i", "7".into()), Err(MarshalError::TypeMismatch { .. })));

        assert_eq!(roundtrip(&m, "f", ScriptValue::Number(1.5)).unwrap(), ScriptValue::Number(1.5));
        assert!(matches!(
            roundtrip(&m, "f", ScriptValue::Number(1e39)),
            Err(MarshalError::ConversionOverflow { .. })
        ));
        assert_eq!(roundtrip(&m, "d", ScriptValue::Number(0.1)).unwrap(), ScriptValue::Number(0.1));
    }

    #[test]
    fn test_void_and_unknown_cannot_be_written() {
        let reg = StructRegistry::new();
        let m = Marshaller::new(&reg);
        let mut bytes = [0u8; 8];
        assert!(m.to_native(&ScriptValue::Null, &TypeDescriptor::Void, &mut bytes).is_err());
        assert!(m.to_native(&ScriptValue::Null, &TypeDescriptor::Unknown, &mut bytes).is_err());
        assert_eq!(m.to_script(&TypeDescriptor::Void, &bytes).unwrap(), ScriptValue::Undefined);
        assert!(m.to_script(&TypeDescriptor::Unknown, &bytes).is_err());
    }

    #[test]
    fn test_pointer_slots_hold_only_the_address() {
        let reg = StructRegistry::new();
        let m = Marshaller::new(&reg);
        assert_eq!(roundtrip(&m, "^i", ScriptValue::Null).unwrap(), ScriptValue::Null);
        let value = roundtrip(&m, "^{CGPoint=dd}", ScriptValue::Number(4096.0)).unwrap();
        match &value {
            ScriptValue::Wrapper(Wrapper::Pointer(ptr)) => {
                assert_eq!(ptr.address, 4096);
                assert!(ptr.pointee.is_struct());
            }
            other => panic!("expected pointer wrapper, got {:?}", other),
        }
        assert_eq!(roundtrip(&m, "^v", value.clone()).unwrap(), ScriptValue::Wrapper(Wrapper::Pointer(RawPointer {
            address: 4096,
            pointee: TypeDescriptor::Void,
        })));
        assert!(roundtrip(&m, "^v", ScriptValue::Number(-1.0)).is_err());
        assert!(roundtrip(&m, "^v", ScriptValue::Number(1.5)).is_err());
        assert!(roundtrip(&m, "^v", "x".into()).is_err());
    }

    struct View;

    impl NativeHandle for View {
        fn class_name(&self) -> &str {
            "NSView"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn test_object_slots_retain_and_resolve() {
        let reg = StructRegistry::new();
        let m = Marshaller::new(&reg);
        let view = ObjectRef::from_handle(View);
        let wrapper = ScriptValue::Wrapper(Wrapper::Object(view.clone()));
        let back = roundtrip(&m, "@", wrapper.clone()).unwrap();
        assert_eq!(back, wrapper);
        assert!(m.boxing().is_retained(view.address()));

        // Containers are boxed into instances and come back value-equal.
        let dict = ScriptValue::Object(ScriptObject::new().with("title", "main").with("count", 2));
        assert_eq!(roundtrip(&m, "@", dict.clone()).unwrap(), dict);
        assert_eq!(roundtrip(&m, "@", ScriptValue::Undefined).unwrap(), ScriptValue::Null);

        // Addresses nobody retained cannot be read.
        let mut bytes = 0x5000usize.to_ne_bytes();
        assert!(matches!(
            m.to_script(&TypeDescriptor::ObjectRef, &bytes),
            Err(MarshalError::Unbox { .. })
        ));
        bytes = 0usize.to_ne_bytes();
        assert_eq!(m.to_script(&TypeDescriptor::ObjectRef, &bytes).unwrap(), ScriptValue::Null);
    }

    #[test]
    fn test_selector_slots() {
        let reg = StructRegistry::new();
        let m = Marshaller::new(&reg);
        assert_eq!(roundtrip(&m, ":", "setFrame:".into()).unwrap(), ScriptValue::from("setFrame:"));
        let callable = ScriptValue::Wrapper(Wrapper::Callable(Callable::new(None, "close")));
        assert_eq!(roundtrip(&m, ":", callable).unwrap(), ScriptValue::from("close"));
        assert_eq!(roundtrip(&m, ":", ScriptValue::Null).unwrap(), ScriptValue::Null);
        assert!(roundtrip(&m, ":", ScriptValue::Number(3.0)).is_err());
    }

    #[test]
    fn test_fixed_arrays() {
        let reg = StructRegistry::new();
        let m = Marshaller::new(&reg);
        let value = ScriptValue::Array(vec![1.into(), 2.into()]);
        assert_eq!(
            roundtrip(&m, "[4s]", value).unwrap(),
            ScriptValue::Array(vec![1.into(), 2.into(), 0.into(), 0.into()])
        );
        let too_many = ScriptValue::Array(vec![1.into(), 2.into(), 3.into()]);
        assert!(matches!(roundtrip(&m, "[2s]", too_many), Err(MarshalError::TypeMismatch { .. })));
        assert!(roundtrip(&m, "[2s]", ScriptValue::Number(1.0)).is_err());
    }

    #[test]
    fn test_large_integers_lose_precision_through_f64() {
        let reg = StructRegistry::new();
        let m = Marshaller::new(&reg);
        let ty = TypeDescriptor::UInt64;
        let bytes = (u64::MAX - 1).to_ne_bytes();
        assert_eq!(m.to_script(&ty, &bytes).unwrap(), ScriptValue::Number(u64::MAX as f64));
    }

    #[test]
    fn test_short_destination_is_out_of_bounds() {
        let reg = StructRegistry::new();
        let m = Marshaller::new(&reg);
        let mut bytes = [0u8; 2];
        assert!(matches!(
            m.to_native(&ScriptValue::Number(1.0), &TypeDescriptor::Int32, &mut bytes),
            Err(MarshalError::Storage(_))
        ));
    }
}
