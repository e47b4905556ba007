//! Type encoding grammar.
//!
//! Turns runtime type encodings (`i`, `^{CGPoint=dd}`, `[16C]`, ...) into
//! [`TypeDescriptor`] trees. Bare struct names are resolved through the
//! [`StructRegistry`](crate::registry::StructRegistry).

mod descriptor;
mod encoding_error;
mod method;
mod parser;

pub use descriptor::{StructDef, StructField, TypeDescriptor};
pub use encoding_error::EncodingError;
pub use method::MethodSignature;
pub use parser::{parse, parse_with, MAX_NESTING};
pub(crate) use parser::Parser;
