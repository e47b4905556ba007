// structs.rs - Field-wise struct marshalling
//
// Structs accept either a positional array (declaration order) or an object
// (matched by field name). Writes always start from a zeroed region, so
// fields the source does not mention read back as zero.

use crate::error::MarshalError;
use crate::marshal::{region, region_mut, Marshaller};
use crate::value::{ScriptObject, ScriptValue};
use bridge_core::{parse_with, Storage, StructDef, StructRegistry, TypeDescriptor};

/// Ordered `(name, type)` fields of a struct encoding.
pub fn decode_struct(
    encoding: &str,
    registry: &StructRegistry,
) -> Result<Vec<(String, TypeDescriptor)>, MarshalError> {
    match parse_with(encoding, registry)? {
        TypeDescriptor::Struct(def) if !def.is_opaque() => Ok(def.to_pairs()),
        other => Err(MarshalError::mismatch("struct encoding", other.explain())),
    }
}

/// Write `source` into `storage` as one `def`.
pub fn script_to_struct(
    m: &Marshaller,
    source: &ScriptValue,
    def: &StructDef,
    storage: &mut Storage,
) -> Result<(), MarshalError> {
    write_struct(m, source, def, storage.as_bytes_mut())
        .inspect_err(|err| m.log_failure("script_to_struct", err))
}

/// Read `def` from `storage` into a script object.
///
/// With `initial`, leading positional values are first written into the
/// leaf fields depth-first. Returns the object and how many of those values
/// were consumed; the rest belong to the caller.
pub fn struct_to_script(
    m: &Marshaller,
    storage: &mut Storage,
    def: &StructDef,
    initial: Option<&[ScriptValue]>,
) -> Result<(ScriptObject, usize), MarshalError> {
    let bytes = storage.as_bytes_mut();
    let consumed = match initial {
        Some(values) => seed_struct(m, def, bytes, values)?,
        None => 0,
    };
    let object = read_struct(m, def, bytes)?;
    Ok((object, consumed))
}

pub(crate) fn write_struct(
    m: &Marshaller,
    source: &ScriptValue,
    def: &StructDef,
    dst: &mut [u8],
) -> Result<(), MarshalError> {
    let layout = m.layout();
    let size = layout.struct_layout(def).size;
    region_mut(dst, 0, size)?.fill(0);

    let slots = layout.field_slots(def);
    match source {
        ScriptValue::Array(items) => {
            if items.len() > def.fields().len() {
                return Err(MarshalError::mismatch(
                    format!("at most {} values for struct {}", def.fields().len(), def.name()),
                    format!("{} values", items.len()),
                ));
            }
            for ((field, slot), item) in def.fields().iter().zip(&slots).zip(items) {
                m.write(item, &field.ty, region_mut(dst, slot.offset, slot.size)?)?;
            }
        }
        ScriptValue::Object(object) => {
            for (field, slot) in def.fields().iter().zip(&slots) {
                match object.get(&field.name) {
                    None | Some(ScriptValue::Undefined) => {}
                    Some(value) => m.write(value, &field.ty, region_mut(dst, slot.offset, slot.size)?)?,
                }
            }
        }
        other => {
            return Err(MarshalError::mismatch(
                format!("array or object for struct {}", def.name()),
                other.kind(),
            ));
        }
    }
    Ok(())
}

pub(crate) fn read_struct(m: &Marshaller, def: &StructDef, src: &[u8]) -> Result<ScriptObject, MarshalError> {
    let slots = m.layout().field_slots(def);
    let mut object = ScriptObject::new();
    for (field, slot) in def.fields().iter().zip(&slots) {
        let value = m.read(&field.ty, region(src, slot.offset, slot.size)?)?;
        object.set(field.name.clone(), value);
    }
    Ok(object)
}

/// Write leading `values` into leaf fields, depth-first.
fn seed_struct(
    m: &Marshaller,
    def: &StructDef,
    dst: &mut [u8],
    values: &[ScriptValue],
) -> Result<usize, MarshalError> {
    let slots = m.layout().field_slots(def);
    let mut consumed = 0;
    for (field, slot) in def.fields().iter().zip(&slots) {
        if consumed >= values.len() {
            break;
        }
        let field_bytes = region_mut(dst, slot.offset, slot.size)?;
        match &field.ty {
            TypeDescriptor::Struct(inner) => {
                let inner = m.concrete(inner)?;
                consumed += seed_struct(m, &inner, field_bytes, &values[consumed..])?;
            }
            ty => {
                m.write(&values[consumed], ty, field_bytes)?;
                consumed += 1;
            }
        }
    }
    Ok(consumed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_core::StorageAllocator;
    use std::sync::Arc;

    fn rect_registry() -> StructRegistry {
        StructRegistry::with_resolver(|name: &str| match name {
            "CGPoint" => Some("{CGPoint=\"x\"d\"y\"d}".to_string()),
            "CGSize" => Some("{CGSize=\"width\"d\"height\"d}".to_string()),
            "CGRect" => Some("{CGRect=\"origin\"{CGPoint}\"size\"{CGSize}}".to_string()),
            _ => None,
        })
    }

    fn allocate(reg: &StructRegistry, def: &Arc<StructDef>) -> Storage {
        StorageAllocator::with_registry(reg)
            .allocate(&TypeDescriptor::Struct(def.clone()))
            .unwrap()
    }

    #[test]
    fn test_decode_struct_field_order() {
        let reg = StructRegistry::new();
        let fields = decode_struct("{Point=ff}", &reg).unwrap();
        assert_eq!(fields.len(), 2);
        assert!(fields.iter().all(|(_, ty)| *ty == TypeDescriptor::Float32));
        assert_eq!(fields[0].0, "field0");

        let fields = decode_struct("{CGRect}", &rect_registry()).unwrap();
        assert_eq!(fields[1].0, "size");
        assert!(decode_struct("i", &reg).is_err());
        assert!(decode_struct("{Nope}", &reg).unwrap_err().is_retryable());
    }

    #[test]
    fn test_named_write_matches_fields_by_name() {
        let reg = StructRegistry::new();
        let m = Marshaller::new(&reg);
        let def = reg.register_encoding("{Point=\"x\"f\"y\"f}").unwrap();
        let mut storage = allocate(&reg, &def);

        let source = ScriptValue::Object(ScriptObject::new().with("y", 2).with("x", 1));
        script_to_struct(&m, &source, &def, &mut storage).unwrap();
        let mut cursor = storage.cursor();
        assert_eq!(cursor.read::<f32>().unwrap(), 1.0);
        assert_eq!(cursor.read::<f32>().unwrap(), 2.0);
    }

    #[test]
    fn test_writes_start_from_zero() {
        let reg = StructRegistry::new();
        let m = Marshaller::new(&reg);
        let def = reg.register_encoding("{Pair=\"a\"i\"b\"i}").unwrap();
        let mut storage = allocate(&reg, &def);

        let full = ScriptValue::Array(vec![7.into(), 9.into()]);
        script_to_struct(&m, &full, &def, &mut storage).unwrap();

        // Unmatched names and extra properties leave zeros behind.
        let partial = ScriptValue::Object(ScriptObject::new().with("b", 3).with("extra", 1));
        script_to_struct(&m, &partial, &def, &mut storage).unwrap();
        let (object, _) = struct_to_script(&m, &mut storage, &def, None).unwrap();
        assert_eq!(object, ScriptObject::new().with("a", 0).with("b", 3));

        let short = ScriptValue::Array(vec![5.into()]);
        script_to_struct(&m, &short, &def, &mut storage).unwrap();
        let (object, _) = struct_to_script(&m, &mut storage, &def, None).unwrap();
        assert_eq!(object.get("b"), Some(&ScriptValue::Number(0.0)));
    }

    #[test]
    fn test_excess_positional_values_are_rejected() {
        let reg = StructRegistry::new();
        let m = Marshaller::new(&reg);
        let def = reg.register_encoding("{Pair=ii}").unwrap();
        let mut storage = allocate(&reg, &def);
        let source = ScriptValue::Array(vec![1.into(), 2.into(), 3.into()]);
        assert!(matches!(
            script_to_struct(&m, &source, &def, &mut storage),
            Err(MarshalError::TypeMismatch { .. })
        ));
        assert!(script_to_struct(&m, &ScriptValue::from("x"), &def, &mut storage).is_err());
    }

    #[test]
    fn test_nested_structs_accept_both_forms() {
        let reg = rect_registry();
        let m = Marshaller::new(&reg);
        let def = reg.resolve("CGRect").unwrap();
        let mut storage = allocate(&reg, &def);

        let source = ScriptValue::Object(
            ScriptObject::new()
                .with("origin", ScriptValue::Array(vec![10.into(), 20.into()]))
                .with("size", ScriptObject::new().with("width", 300).with("height", 200)),
        );
        script_to_struct(&m, &source, &def, &mut storage).unwrap();
        let (object, consumed) = struct_to_script(&m, &mut storage, &def, None).unwrap();
        assert_eq!(consumed, 0);
        assert_eq!(object.get("origin").and_then(|o| o.get("y")), Some(&ScriptValue::Number(20.0)));
        assert_eq!(object.get("size").and_then(|s| s.get("width")), Some(&ScriptValue::Number(300.0)));
    }

    #[test]
    fn test_flat_values_spread_across_nested_fields() {
        let reg = rect_registry();
        let m = Marshaller::new(&reg);
        let def = reg.resolve("CGRect").unwrap();
        let mut storage = allocate(&reg, &def);

        let values: Vec<ScriptValue> = vec![1.into(), 2.into(), 3.into(), 4.into(), "rest".into()];
        let (object, consumed) = struct_to_script(&m, &mut storage, &def, Some(&values)).unwrap();
        assert_eq!(consumed, 4);
        assert_eq!(object.get("size").and_then(|s| s.get("height")), Some(&ScriptValue::Number(4.0)));

        // Storage and the returned object agree.
        let mut cursor = storage.cursor();
        cursor.seek(24).unwrap();
        assert_eq!(cursor.read::<f64>().unwrap(), 4.0);

        // Fewer values than leaves: the rest keep their stored value.
        let (object, consumed) = struct_to_script(&m, &mut storage, &def, Some(&values[..1])).unwrap();
        assert_eq!(consumed, 1);
        assert_eq!(object.get("origin").and_then(|o| o.get("y")), Some(&ScriptValue::Number(2.0)));
    }
}
