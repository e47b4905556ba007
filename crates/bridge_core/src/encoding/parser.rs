// parser.rs - Single-pass type encoding parser
//
// Recursive descent over the encoding bytes: greedy, left-to-right, no
// backtracking. Inline struct definitions discovered while parsing are held
// in `pending` and only published to the registry once the whole encoding
// has parsed, so a failed parse never leaves anything reachable.

use super::{EncodingError, StructDef, StructField, TypeDescriptor};
use crate::registry::StructRegistry;
use std::sync::Arc;

/// Parse `encoding` against the process-wide struct registry.
pub fn parse(encoding: &str) -> Result<TypeDescriptor, EncodingError> {
    parse_with(encoding, StructRegistry::global())
}

/// Parse `encoding`, resolving bare struct names through `registry`.
pub fn parse_with(encoding: &str, registry: &StructRegistry) -> Result<TypeDescriptor, EncodingError> {
    let mut parser = Parser::new(encoding, registry);
    parser.parse_complete()
}

/// Type qualifiers that may prefix a type in a method encoding.
const QUALIFIERS: &[u8] = b"rnNoORV";

/// Deepest pointer, array or struct nesting accepted, resolver
/// encodings included.
pub const MAX_NESTING: usize = 128;

pub(crate) struct Parser<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    registry: &'a StructRegistry,
    /// Struct names whose resolver encoding is being parsed right now.
    resolving: Vec<String>,
    /// Inline definitions waiting to be published.
    pending: Vec<Arc<StructDef>>,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(source: &'a str, registry: &'a StructRegistry) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            registry,
            resolving: Vec::new(),
            pending: Vec::new(),
            depth: 0,
        }
    }

    #[inline]
    pub(crate) fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    #[inline]
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    #[inline]
    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    fn malformed(&self, position: usize, reason: impl Into<String>) -> EncodingError {
        EncodingError::malformed(self.source, position, reason)
    }

    /// Parse exactly one type spanning the whole input, then publish.
    pub(crate) fn parse_complete(&mut self) -> Result<TypeDescriptor, EncodingError> {
        let ty = self.parse_single()?;
        self.commit();
        Ok(ty)
    }

    /// Parse exactly one type spanning the whole input, keeping new
    /// definitions pending.
    fn parse_single(&mut self) -> Result<TypeDescriptor, EncodingError> {
        if self.bytes.is_empty() {
            return Err(self.malformed(0, "empty encoding"));
        }
        let ty = self.parse_type(false)?;
        if !self.at_end() {
            return Err(self.malformed(self.pos, "trailing characters after type"));
        }
        Ok(ty)
    }

    /// Publish pending inline definitions. First registration of a name wins.
    pub(crate) fn commit(&mut self) {
        for def in self.pending.drain(..) {
            self.registry.insert_shared(def);
        }
    }

    pub(crate) fn skip_qualifiers(&mut self) {
        while matches!(self.peek(), Some(b) if QUALIFIERS.contains(&b)) {
            self.pos += 1;
        }
    }

    /// Skip a stack frame offset (`24`, `-8`) following a method argument.
    pub(crate) fn skip_frame_offset(&mut self) {
        if matches!(self.peek(), Some(b'-') | Some(b'+')) {
            self.pos += 1;
        }
        while matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
            self.pos += 1;
        }
    }

    pub(crate) fn parse_type(&mut self, behind_pointer: bool) -> Result<TypeDescriptor, EncodingError> {
        if self.depth >= MAX_NESTING {
            return Err(self.malformed(self.pos, "nesting too deep"));
        }
        self.depth += 1;
        let ty = self.parse_tagged(behind_pointer);
        self.depth -= 1;
        ty
    }

    fn parse_tagged(&mut self, behind_pointer: bool) -> Result<TypeDescriptor, EncodingError> {
        let start = self.pos;
        let Some(tag) = self.bump() else {
            return Err(self.malformed(start, "unexpected end of encoding"));
        };

        let ty = match tag {
            b'v' => TypeDescriptor::Void,
            b'B' => TypeDescriptor::Bool,
            b'c' => TypeDescriptor::Int8,
            b's' => TypeDescriptor::Int16,
            // `long` is 32-bit in this encoding, 64-bit longs are `q`.
            b'i' | b'l' => TypeDescriptor::Int32,
            b'q' => TypeDescriptor::Int64,
            b'C' => TypeDescriptor::UInt8,
            b'S' => TypeDescriptor::UInt16,
            b'I' | b'L' => TypeDescriptor::UInt32,
            b'Q' => TypeDescriptor::UInt64,
            b'f' => TypeDescriptor::Float32,
            b'd' => TypeDescriptor::Float64,
            b'*' => TypeDescriptor::pointer_to(TypeDescriptor::Int8),
            b'@' => {
                // `@?` is a block, still an object reference
                if self.peek() == Some(b'?') {
                    self.pos += 1;
                }
                TypeDescriptor::ObjectRef
            }
            b'#' => TypeDescriptor::ObjectRef,
            b':' => TypeDescriptor::Selector,
            b'?' => TypeDescriptor::Unknown,
            b'^' => TypeDescriptor::pointer_to(self.parse_type(true)?),
            b'{' => self.parse_struct(start, behind_pointer)?,
            b'[' => self.parse_array(start, behind_pointer)?,
            b'}' | b']' => {
                return Err(self.malformed(start, format!("unbalanced '{}'", tag as char)));
            }
            other => {
                return Err(self.malformed(
                    start,
                    format!("unrecognized type tag '{}'", other as char),
                ));
            }
        };
        Ok(ty)
    }

    fn parse_array(&mut self, start: usize, behind_pointer: bool) -> Result<TypeDescriptor, EncodingError> {
        let digits_start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
            self.pos += 1;
        }
        if digits_start == self.pos {
            return Err(self.malformed(digits_start, "array without element count"));
        }
        let count: usize = self.source[digits_start..self.pos]
            .parse()
            .map_err(|_| self.malformed(digits_start, "array element count out of range"))?;

        let element = self.parse_type(behind_pointer)?;
        match self.bump() {
            Some(b']') => Ok(TypeDescriptor::array_of(element, count)),
            Some(_) => Err(self.malformed(self.pos - 1, "expected ']' after array element type")),
            None => Err(self.malformed(start, "unterminated array")),
        }
    }

    fn parse_struct(&mut self, start: usize, behind_pointer: bool) -> Result<TypeDescriptor, EncodingError> {
        let name_start = self.pos;
        loop {
            match self.peek() {
                None => return Err(self.malformed(start, "unterminated struct")),
                Some(b'=') | Some(b'}') => break,
                Some(b'{') | Some(b'[') | Some(b'"') => {
                    return Err(self.malformed(self.pos, "unexpected character in struct name"));
                }
                Some(_) => self.pos += 1,
            }
        }
        let name = self.source[name_start..self.pos].to_string();

        if self.bump() == Some(b'}') {
            let def = self.resolve_named(&name, behind_pointer)?;
            return Ok(TypeDescriptor::Struct(def));
        }

        let mut fields: Vec<(Option<String>, TypeDescriptor)> = Vec::new();
        loop {
            match self.peek() {
                None => {
                    return Err(self.malformed(start, format!("unterminated struct '{}'", name)));
                }
                Some(b'}') => {
                    self.pos += 1;
                    break;
                }
                Some(b'"') => {
                    let field_name = self.parse_quoted()?;
                    let ty = self.parse_type(false)?;
                    fields.push((Some(field_name), ty));
                }
                Some(_) => {
                    let ty = self.parse_type(false)?;
                    fields.push((None, ty));
                }
            }
        }

        Ok(TypeDescriptor::Struct(self.finish_struct(name, fields)))
    }

    fn parse_quoted(&mut self) -> Result<String, EncodingError> {
        let open = self.pos;
        self.pos += 1;
        let text_start = self.pos;
        while let Some(b) = self.peek() {
            if b == b'"' {
                let text = self.source[text_start..self.pos].to_string();
                self.pos += 1;
                return Ok(text);
            }
            self.pos += 1;
        }
        Err(self.malformed(open, "unterminated field name"))
    }

    fn finish_struct(
        &mut self,
        name: String,
        fields: Vec<(Option<String>, TypeDescriptor)>,
    ) -> Arc<StructDef> {
        let anonymous = name.is_empty() || name == "?";
        let all_named = fields.iter().all(|(n, _)| n.is_some());

        let mut known_names: Option<Vec<String>> = None;
        if !all_named && !anonymous {
            if let Some(known) = self.known_for_naming(&name) {
                if known.fields().len() == fields.len() {
                    let same_types = known
                        .fields()
                        .iter()
                        .zip(&fields)
                        .all(|(k, (_, ty))| k.ty == *ty);
                    if same_types && fields.iter().all(|(n, _)| n.is_none()) {
                        return known;
                    }
                    known_names = Some(known.fields().iter().map(|f| f.name.clone()).collect());
                }
            }
        }

        let fields = fields
            .into_iter()
            .enumerate()
            .map(|(i, (field_name, ty))| {
                let field_name = field_name
                    .or_else(|| known_names.as_ref().map(|names| names[i].clone()))
                    .unwrap_or_else(|| format!("field{}", i));
                StructField::new(field_name, ty)
            })
            .collect();

        let def = Arc::new(StructDef::new(name, fields));
        if !anonymous && self.find_known(def.name()).is_none() {
            self.pending.push(def.clone());
        }
        def
    }

    fn find_known(&self, name: &str) -> Option<Arc<StructDef>> {
        self.pending
            .iter()
            .find(|def| def.name() == name)
            .cloned()
            .or_else(|| self.registry.get(name))
    }

    /// Registered layout used to name unnamed inline fields, if any.
    fn known_for_naming(&mut self, name: &str) -> Option<Arc<StructDef>> {
        if let Some(def) = self.find_known(name) {
            return Some(def);
        }
        if self.resolving.iter().any(|n| n == name) {
            return None;
        }
        match self.resolve_named(name, true) {
            Ok(def) if !def.is_opaque() => Some(def),
            _ => None,
        }
    }

    /// Resolve a bare struct name. Behind a pointer an unknown or
    /// self-referential name becomes an opaque placeholder.
    pub(crate) fn resolve_named(
        &mut self,
        name: &str,
        behind_pointer: bool,
    ) -> Result<Arc<StructDef>, EncodingError> {
        if let Some(def) = self.find_known(name) {
            return Ok(def);
        }

        let unresolved = |parser: &Self| {
            if behind_pointer {
                Ok(Arc::new(StructDef::opaque(name)))
            } else if parser.resolving.iter().any(|n| n == name) {
                Err(parser.malformed(parser.pos, format!("struct '{}' contains itself by value", name)))
            } else {
                Err(EncodingError::UnregisteredStruct {
                    name: name.to_string(),
                })
            }
        };

        if self.resolving.iter().any(|n| n == name) {
            return unresolved(&*self);
        }
        let Some(resolver) = self.registry.resolver() else {
            return unresolved(&*self);
        };
        let Some(encoding) = resolver.resolve_struct(name) else {
            return unresolved(&*self);
        };

        tracing::debug!(name, encoding = %encoding, "resolving struct through resolver");

        // The nested parse shares our pending definitions and nesting depth;
        // whatever it defines is published with the outer encoding.
        let mut nested = Parser::new(&encoding, self.registry);
        nested.resolving = std::mem::take(&mut self.resolving);
        nested.resolving.push(name.to_string());
        nested.pending = std::mem::take(&mut self.pending);
        nested.depth = self.depth;
        let result = nested.parse_single();
        self.resolving = std::mem::take(&mut nested.resolving);
        self.resolving.pop();
        self.pending = std::mem::take(&mut nested.pending);

        match result? {
            TypeDescriptor::Struct(def) if def.name() == name && !def.is_opaque() => {
                Ok(self.find_known(name).unwrap_or(def))
            }
            other => Err(EncodingError::malformed(
                &encoding,
                0,
                format!("resolver returned '{}' for struct '{}'", other.encoding(), name),
            )),
        }
    }
}
