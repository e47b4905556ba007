// method.rs - Method signature encodings
//
// A method encoding is the return type followed by each argument type, e.g.
// `v24@0:8{CGPoint=dd}16`. Type qualifiers and stack frame offsets are
// accepted and ignored.

use super::{EncodingError, Parser, TypeDescriptor};
use crate::registry::StructRegistry;

/// Parsed method type encoding.
#[derive(Clone, Debug, PartialEq)]
pub struct MethodSignature {
    encoding: String,
    return_type: TypeDescriptor,
    arguments: Vec<TypeDescriptor>,
}

impl MethodSignature {
    /// Parse against the process-wide registry.
    pub fn parse(encoding: &str) -> Result<Self, EncodingError> {
        Self::parse_with(encoding, StructRegistry::global())
    }

    pub fn parse_with(encoding: &str, registry: &StructRegistry) -> Result<Self, EncodingError> {
        let mut parser = Parser::new(encoding, registry);
        let mut types = Vec::new();
        loop {
            parser.skip_qualifiers();
            if parser.at_end() {
                break;
            }
            types.push(parser.parse_type(false)?);
            parser.skip_frame_offset();
        }
        if types.is_empty() {
            return Err(EncodingError::malformed(encoding, 0, "empty method encoding"));
        }
        parser.commit();

        let return_type = types.remove(0);
        Ok(Self {
            encoding: encoding.to_string(),
            return_type,
            arguments: types,
        })
    }

    #[inline]
    pub fn encoding(&self) -> &str {
        &self.encoding
    }

    #[inline]
    pub fn return_type(&self) -> &TypeDescriptor {
        &self.return_type
    }

    #[inline]
    pub fn arguments(&self) -> &[TypeDescriptor] {
        &self.arguments
    }

    pub fn argument_count(&self) -> usize {
        self.arguments.len()
    }

    /// Arguments after the implicit receiver and selector of a method.
    pub fn explicit_arguments(&self) -> &[TypeDescriptor] {
        match self.arguments.as_slice() {
            [TypeDescriptor::ObjectRef, TypeDescriptor::Selector, rest @ ..] => rest,
            all => all,
        }
    }

    /// Human-readable description of the whole signature.
    pub fn explain(&self) -> String {
        let args: Vec<String> = self.arguments.iter().map(|a| a.explain()).collect();
        format!("{} ({})", self.return_type.explain(), args.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_frame_offsets_and_qualifiers() {
        let reg = StructRegistry::new();
        let sig = MethodSignature::parse_with("v24@0:8{CGPoint=dd}16", &reg).unwrap();
        assert_eq!(sig.return_type(), &TypeDescriptor::Void);
        assert_eq!(sig.argument_count(), 3);
        assert_eq!(sig.arguments()[0], TypeDescriptor::ObjectRef);
        assert_eq!(sig.arguments()[1], TypeDescriptor::Selector);
        assert!(sig.arguments()[2].is_struct());

        let sig = MethodSignature::parse_with("Vv@:r*n^io@", &reg).unwrap();
        assert_eq!(sig.argument_count(), 5);
        assert_eq!(sig.arguments()[3], TypeDescriptor::pointer_to(TypeDescriptor::Int32));
    }

    #[test]
    fn test_explicit_arguments_skip_receiver_and_selector() {
        let reg = StructRegistry::new();
        let getter = MethodSignature::parse_with("d16@0:8", &reg).unwrap();
        assert_eq!(getter.argument_count(), 2);
        assert!(getter.explicit_arguments().is_empty());

        let setter = MethodSignature::parse_with("v24@0:8i16", &reg).unwrap();
        assert_eq!(setter.explicit_arguments(), &[TypeDescriptor::Int32]);

        // Functions without a receiver keep every argument.
        let function = MethodSignature::parse_with("i:@", &reg).unwrap();
        assert_eq!(function.explicit_arguments().len(), 2);
        assert!(MethodSignature::parse_with("d", &reg).unwrap().explicit_arguments().is_empty());
    }

    #[test]
    fn test_explain() {
        let reg = StructRegistry::new();
        let sig = MethodSignature::parse_with("c@:@", &reg).unwrap();
        assert_eq!(sig.explain(), "char (id, SEL, id)");
    }

    #[test]
    fn test_empty_and_broken_signatures() {
        let reg = StructRegistry::new();
        assert!(MethodSignature::parse_with("", &reg).is_err());
        assert!(MethodSignature::parse_with("24", &reg).is_err());
        assert!(MethodSignature::parse_with("v@:{Open=", &reg).is_err());
        assert!(!reg.contains("Open"));
    }
}
