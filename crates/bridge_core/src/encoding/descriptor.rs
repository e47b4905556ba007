// descriptor.rs - Parsed type descriptors
//
// A TypeDescriptor is the structured form of one encoded type. Descriptors are
// immutable once built; struct payloads are shared with the registry via Arc.

use std::fmt;
use std::sync::Arc;

/// Structured representation of an encoded native type.
#[derive(Clone, Debug, PartialEq)]
pub enum TypeDescriptor {
    Void,
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    /// Address of a value; the pointee is never stored inline.
    Pointer(Box<TypeDescriptor>),
    /// Named aggregate with ordered fields.
    Struct(Arc<StructDef>),
    /// Fixed-size inline array.
    Array {
        element: Box<TypeDescriptor>,
        count: usize,
    },
    /// Native object reference (`@` or `#`).
    ObjectRef,
    /// Method selector (`:`).
    Selector,
    /// Unknown type (`?`), typically a function pointer.
    Unknown,
}

impl TypeDescriptor {
    /// Build a pointer descriptor to `pointee`.
    pub fn pointer_to(pointee: TypeDescriptor) -> Self {
        TypeDescriptor::Pointer(Box::new(pointee))
    }

    /// Build an array descriptor of `count` elements.
    pub fn array_of(element: TypeDescriptor, count: usize) -> Self {
        TypeDescriptor::Array {
            element: Box::new(element),
            count,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, TypeDescriptor::Void)
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, TypeDescriptor::Pointer(_))
    }

    pub fn is_struct(&self) -> bool {
        matches!(self, TypeDescriptor::Struct(_))
    }

    /// Signed or unsigned integer of any width.
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            TypeDescriptor::Int8
                | TypeDescriptor::Int16
                | TypeDescriptor::Int32
                | TypeDescriptor::Int64
                | TypeDescriptor::UInt8
                | TypeDescriptor::UInt16
                | TypeDescriptor::UInt32
                | TypeDescriptor::UInt64
        )
    }

    pub fn is_float(&self) -> bool {
        matches!(self, TypeDescriptor::Float32 | TypeDescriptor::Float64)
    }

    /// Struct definition if this is a struct descriptor.
    pub fn as_struct(&self) -> Option<&Arc<StructDef>> {
        match self {
            TypeDescriptor::Struct(def) => Some(def),
            _ => None,
        }
    }

    /// Canonical encoding string (runtime style, without field names).
    pub fn encoding(&self) -> String {
        let mut out = String::new();
        self.write_encoding(&mut out);
        out
    }

    fn write_encoding(&self, out: &mut String) {
        match self {
            TypeDescriptor::Void => out.push('v'),
            TypeDescriptor::Bool => out.push('B'),
            TypeDescriptor::Int8 => out.push('c'),
            TypeDescriptor::Int16 => out.push('s'),
            TypeDescriptor::Int32 => out.push('i'),
            TypeDescriptor::Int64 => out.push('q'),
            TypeDescriptor::UInt8 => out.push('C'),
            TypeDescriptor::UInt16 => out.push('S'),
            TypeDescriptor::UInt32 => out.push('I'),
            TypeDescriptor::UInt64 => out.push('Q'),
            TypeDescriptor::Float32 => out.push('f'),
            TypeDescriptor::Float64 => out.push('d'),
            TypeDescriptor::Pointer(inner) if **inner == TypeDescriptor::Int8 => out.push('*'),
            TypeDescriptor::Pointer(inner) => {
                out.push('^');
                inner.write_encoding(out);
            }
            TypeDescriptor::Struct(def) => {
                out.push('{');
                out.push_str(&def.name);
                if !def.opaque {
                    out.push('=');
                    for field in &def.fields {
                        field.ty.write_encoding(out);
                    }
                }
                out.push('}');
            }
            TypeDescriptor::Array { element, count } => {
                out.push('[');
                out.push_str(&count.to_string());
                element.write_encoding(out);
                out.push(']');
            }
            TypeDescriptor::ObjectRef => out.push('@'),
            TypeDescriptor::Selector => out.push(':'),
            TypeDescriptor::Unknown => out.push('?'),
        }
    }

    /// Human-readable rendering, C-like.
    pub fn explain(&self) -> String {
        match self {
            TypeDescriptor::Void => "void".to_string(),
            TypeDescriptor::Bool => "bool".to_string(),
            TypeDescriptor::Int8 => "char".to_string(),
            TypeDescriptor::Int16 => "short".to_string(),
            TypeDescriptor::Int32 => "int".to_string(),
            TypeDescriptor::Int64 => "long long".to_string(),
            TypeDescriptor::UInt8 => "unsigned char".to_string(),
            TypeDescriptor::UInt16 => "unsigned short".to_string(),
            TypeDescriptor::UInt32 => "unsigned int".to_string(),
            TypeDescriptor::UInt64 => "unsigned long long".to_string(),
            TypeDescriptor::Float32 => "float".to_string(),
            TypeDescriptor::Float64 => "double".to_string(),
            TypeDescriptor::Pointer(inner) => format!("{}*", inner.explain()),
            TypeDescriptor::Struct(def) if def.opaque => format!("struct {}", def.name),
            TypeDescriptor::Struct(def) => {
                let fields: Vec<String> = def
                    .fields
                    .iter()
                    .map(|f| format!("{}: {}", f.name, f.ty.explain()))
                    .collect();
                format!("struct {} {{ {} }}", def.name, fields.join(", "))
            }
            TypeDescriptor::Array { element, count } => format!("{}[{}]", element.explain(), count),
            TypeDescriptor::ObjectRef => "id".to_string(),
            TypeDescriptor::Selector => "SEL".to_string(),
            TypeDescriptor::Unknown => "?".to_string(),
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoding())
    }
}

/// One named field of a struct.
#[derive(Clone, Debug, PartialEq)]
pub struct StructField {
    pub name: String,
    pub ty: TypeDescriptor,
}

impl StructField {
    pub fn new(name: impl Into<String>, ty: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Definition of a named aggregate.
///
/// An opaque definition has a name but no known fields; it only appears
/// behind pointers, where the pointee layout is irrelevant.
#[derive(Clone, Debug, PartialEq)]
pub struct StructDef {
    name: String,
    fields: Vec<StructField>,
    opaque: bool,
}

impl StructDef {
    pub fn new(name: impl Into<String>, fields: Vec<StructField>) -> Self {
        Self {
            name: name.into(),
            fields,
            opaque: false,
        }
    }

    /// Name-only placeholder for a struct whose fields are not known here.
    pub fn opaque(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            opaque: true,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn fields(&self) -> &[StructField] {
        &self.fields
    }

    #[inline]
    pub fn is_opaque(&self) -> bool {
        self.opaque
    }

    pub fn field(&self, name: &str) -> Option<&StructField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Number of primitive leaves reached by flattening nested structs.
    pub fn leaf_count(&self) -> usize {
        self.fields
            .iter()
            .map(|f| match &f.ty {
                TypeDescriptor::Struct(inner) => inner.leaf_count(),
                _ => 1,
            })
            .sum()
    }

    /// Ordered `(name, type)` pairs.
    pub fn to_pairs(&self) -> Vec<(String, TypeDescriptor)> {
        self.fields
            .iter()
            .map(|f| (f.name.clone(), f.ty.clone()))
            .collect()
    }
}
