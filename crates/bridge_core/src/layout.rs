// layout.rs - Native size and alignment of type descriptors
//
// Primitive sizes are fixed; alignments follow the host ABI (`align_of` of the
// matching Rust type). Structs pad each field to its alignment and round the
// total up to the struct alignment, like a C compiler would.

use crate::encoding::{StructDef, TypeDescriptor};
use crate::registry::StructRegistry;
use std::mem::{align_of, size_of};

/// Size and alignment of one descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TypeLayout {
    pub size: usize,
    pub align: usize,
}

/// Placement of one struct field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldSlot {
    pub index: usize,
    pub offset: usize,
    pub size: usize,
    pub align: usize,
}

/// Computes layouts. Reads the registry only to look through opaque structs.
#[derive(Clone, Copy, Default)]
pub struct LayoutCalculator<'r> {
    registry: Option<&'r StructRegistry>,
}

impl<'r> LayoutCalculator<'r> {
    pub fn new() -> Self {
        Self { registry: None }
    }

    pub fn with_registry(registry: &'r StructRegistry) -> Self {
        Self {
            registry: Some(registry),
        }
    }

    pub fn layout_of(&self, ty: &TypeDescriptor) -> TypeLayout {
        match ty {
            TypeDescriptor::Void => TypeLayout { size: 0, align: 1 },
            TypeDescriptor::Bool | TypeDescriptor::Int8 | TypeDescriptor::UInt8 => primitive::<u8>(),
            TypeDescriptor::Int16 | TypeDescriptor::UInt16 => primitive::<u16>(),
            TypeDescriptor::Int32 | TypeDescriptor::UInt32 => primitive::<u32>(),
            TypeDescriptor::Int64 | TypeDescriptor::UInt64 => primitive::<u64>(),
            TypeDescriptor::Float32 => primitive::<f32>(),
            TypeDescriptor::Float64 => primitive::<f64>(),
            TypeDescriptor::Pointer(_)
            | TypeDescriptor::ObjectRef
            | TypeDescriptor::Selector
            | TypeDescriptor::Unknown => primitive::<usize>(),
            TypeDescriptor::Struct(def) => self.struct_layout(def),
            TypeDescriptor::Array { element, count } => {
                let elem = self.layout_of(element);
                TypeLayout {
                    size: elem.size.saturating_mul(*count),
                    align: elem.align,
                }
            }
        }
    }

    #[inline]
    pub fn size_of(&self, ty: &TypeDescriptor) -> usize {
        self.layout_of(ty).size
    }

    #[inline]
    pub fn alignment_of(&self, ty: &TypeDescriptor) -> usize {
        self.layout_of(ty).align
    }

    /// Offsets of every field, in declaration order.
    pub fn field_slots(&self, def: &StructDef) -> Vec<FieldSlot> {
        let mut offset = 0usize;
        def.fields()
            .iter()
            .enumerate()
            .map(|(index, field)| {
                let layout = self.layout_of(&field.ty);
                offset = align_up(offset, layout.align);
                let slot = FieldSlot {
                    index,
                    offset,
                    size: layout.size,
                    align: layout.align,
                };
                offset = offset.saturating_add(layout.size);
                slot
            })
            .collect()
    }

    pub fn field_offsets(&self, def: &StructDef) -> Vec<usize> {
        self.field_slots(def).into_iter().map(|s| s.offset).collect()
    }

    /// Layout of a struct definition, looking through opaque placeholders.
    pub fn struct_layout(&self, def: &StructDef) -> TypeLayout {
        if def.is_opaque() {
            // Only the registry can tell what an opaque struct looks like.
            return match self.registry.and_then(|r| r.get(def.name())) {
                Some(full) => self.struct_layout(&full),
                None => TypeLayout { size: 0, align: 1 },
            };
        }

        let mut size = 0usize;
        let mut align = 1usize;
        for field in def.fields() {
            let layout = self.layout_of(&field.ty);
            size = align_up(size, layout.align).saturating_add(layout.size);
            align = align.max(layout.align);
        }
        TypeLayout {
            size: align_up(size, align),
            align,
        }
    }
}

/// Size of `ty` without registry lookups.
pub fn size_of_type(ty: &TypeDescriptor) -> usize {
    LayoutCalculator::new().size_of(ty)
}

/// Alignment of `ty` without registry lookups.
pub fn alignment_of_type(ty: &TypeDescriptor) -> usize {
    LayoutCalculator::new().alignment_of(ty)
}

/// Round `value` up to the next multiple of `align` (a power of two).
#[inline]
pub fn align_up(value: usize, align: usize) -> usize {
    debug_assert!(align.is_power_of_two());
    value.saturating_add(align - 1) & !(align - 1)
}

#[inline]
fn primitive<T>() -> TypeLayout {
    TypeLayout {
        size: size_of::<T>(),
        align: align_of::<T>(),
    }
}
