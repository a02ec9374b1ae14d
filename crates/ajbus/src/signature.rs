// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wire type signatures.
//!
//! A signature is a string of type codes describing the structure of one or
//! more wire values:
//!
//! ```text
//! tag        ::= 'y'|'b'|'n'|'q'|'i'|'u'|'x'|'t'|'d'|'s'|'o'|'g'|'v' | array | struct | dict
//! array      ::= 'a' signature
//! struct     ::= '(' signature* ')'
//! dict       ::= 'a' '{' tag signature '}'      # key must be a basic type
//! ```
//!
//! [`Signature`] is the validated string form, [`SigType`] the parsed tree of
//! one complete type. Parsing enforces the bus limits: at most 255 bytes, and
//! 32 levels each of struct and array nesting (lowerable via
//! [`SignatureLimits`]).

use std::fmt;
use std::str::FromStr;

/// Maximum signature length in bytes.
pub const MAX_SIGNATURE_LEN: usize = 255;
/// Maximum struct (and dict entry) nesting.
pub const MAX_STRUCT_DEPTH: usize = 32;
/// Maximum array nesting.
pub const MAX_ARRAY_DEPTH: usize = 32;

/// Wire type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Byte,
    Bool,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Double,
    String,
    ObjectPath,
    Signature,
    Array,
    Struct,
    DictEntry,
    Variant,
}

impl TypeTag {
    /// Wire character of this tag (`(` and `{` for structs and dict entries).
    pub const fn as_char(self) -> char {
        match self {
            Self::Byte => 'y',
            Self::Bool => 'b',
            Self::Int16 => 'n',
            Self::UInt16 => 'q',
            Self::Int32 => 'i',
            Self::UInt32 => 'u',
            Self::Int64 => 'x',
            Self::UInt64 => 't',
            Self::Double => 'd',
            Self::String => 's',
            Self::ObjectPath => 'o',
            Self::Signature => 'g',
            Self::Array => 'a',
            Self::Struct => '(',
            Self::DictEntry => '{',
            Self::Variant => 'v',
        }
    }

    /// Map a wire character back to its tag.
    pub const fn from_char(c: char) -> Option<Self> {
        Some(match c {
            'y' => Self::Byte,
            'b' => Self::Bool,
            'n' => Self::Int16,
            'q' => Self::UInt16,
            'i' => Self::Int32,
            'u' => Self::UInt32,
            'x' => Self::Int64,
            't' => Self::UInt64,
            'd' => Self::Double,
            's' => Self::String,
            'o' => Self::ObjectPath,
            'g' => Self::Signature,
            'a' => Self::Array,
            '(' => Self::Struct,
            '{' => Self::DictEntry,
            'v' => Self::Variant,
            _ => return None,
        })
    }

    /// Basic types are the single-character, non-container types; only they
    /// may key a dictionary.
    pub const fn is_basic(self) -> bool {
        !matches!(
            self,
            Self::Array | Self::Struct | Self::DictEntry | Self::Variant
        )
    }

    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            Self::Byte
                | Self::Int16
                | Self::UInt16
                | Self::Int32
                | Self::UInt32
                | Self::Int64
                | Self::UInt64
        )
    }

    pub const fn is_string_like(self) -> bool {
        matches!(self, Self::String | Self::ObjectPath | Self::Signature)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Parsed form of one complete type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SigType {
    /// A basic type (`y b n q i u x t d s o g`).
    Scalar(TypeTag),
    Variant,
    Array(Box<SigType>),
    Struct(Vec<SigType>),
    /// Key/value pair; only legal as the element type of an array.
    DictEntry(TypeTag, Box<SigType>),
}

impl SigType {
    /// `a{KV}`.
    pub fn dict(key: TypeTag, value: SigType) -> Self {
        Self::Array(Box::new(Self::DictEntry(key, Box::new(value))))
    }

    pub fn array(element: SigType) -> Self {
        Self::Array(Box::new(element))
    }

    /// Leading tag of this type.
    pub fn tag(&self) -> TypeTag {
        match self {
            Self::Scalar(tag) => *tag,
            Self::Variant => TypeTag::Variant,
            Self::Array(_) => TypeTag::Array,
            Self::Struct(_) => TypeTag::Struct,
            Self::DictEntry(..) => TypeTag::DictEntry,
        }
    }

    /// Key and value types when this is a dictionary (`a{KV}`).
    pub fn as_dict(&self) -> Option<(TypeTag, &SigType)> {
        match self {
            Self::Array(element) => match element.as_ref() {
                Self::DictEntry(key, value) => Some((*key, value.as_ref())),
                _ => None,
            },
            _ => None,
        }
    }

    /// Number of bytes this type occupies in a signature string.
    pub fn encoded_len(&self) -> usize {
        match self {
            Self::Scalar(_) | Self::Variant => 1,
            Self::Array(element) => 1 + element.encoded_len(),
            Self::Struct(members) => 2 + members.iter().map(Self::encoded_len).sum::<usize>(),
            Self::DictEntry(_, value) => 3 + value.encoded_len(),
        }
    }

    fn write_to(&self, out: &mut String) {
        match self {
            Self::Scalar(tag) => out.push(tag.as_char()),
            Self::Variant => out.push('v'),
            Self::Array(element) => {
                out.push('a');
                element.write_to(out);
            }
            Self::Struct(members) => {
                out.push('(');
                for member in members {
                    member.write_to(out);
                }
                out.push(')');
            }
            Self::DictEntry(key, value) => {
                out.push('{');
                out.push(key.as_char());
                value.write_to(out);
                out.push('}');
            }
        }
    }

    /// Struct and array nesting of this type, as `(structs, arrays)`.
    pub fn depth(&self) -> (usize, usize) {
        match self {
            Self::Scalar(_) | Self::Variant => (0, 0),
            Self::Array(element) => {
                let (s, a) = element.depth();
                (s, a + 1)
            }
            Self::Struct(members) => {
                let (s, a) = members
                    .iter()
                    .map(Self::depth)
                    .fold((0, 0), |acc, d| (acc.0.max(d.0), acc.1.max(d.1)));
                (s + 1, a)
            }
            Self::DictEntry(_, value) => {
                let (s, a) = value.depth();
                (s + 1, a)
            }
        }
    }
}

impl fmt::Display for SigType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::with_capacity(self.encoded_len());
        self.write_to(&mut out);
        f.write_str(&out)
    }
}

/// Signature grammar violations. Offsets are byte positions in the input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("signature is {len} bytes long, limit is {max}")]
    TooLong { len: usize, max: usize },
    #[error("unknown type code '{code}' at offset {offset}")]
    UnknownCode { code: char, offset: usize },
    #[error("signature ends inside a container at offset {offset}")]
    Truncated { offset: usize },
    #[error("unexpected '{found}' at offset {offset}")]
    Unbalanced { found: char, offset: usize },
    #[error("empty struct at offset {offset}")]
    EmptyStruct { offset: usize },
    #[error("dict entry key at offset {offset} is not a basic type")]
    ContainerKey { offset: usize },
    #[error("dict entry at offset {offset} must hold exactly one key and one value")]
    DictArity { offset: usize },
    #[error("dict entry outside of an array at offset {offset}")]
    DictOutsideArray { offset: usize },
    #[error("struct nesting deeper than {max}")]
    StructDepth { max: usize },
    #[error("array nesting deeper than {max}")]
    ArrayDepth { max: usize },
    #[error("expected a single complete type, found {count}")]
    NotSingle { count: usize },
}

/// Length and nesting bounds applied while parsing and while walking trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureLimits {
    pub max_len: usize,
    pub max_struct_depth: usize,
    pub max_array_depth: usize,
}

impl Default for SignatureLimits {
    fn default() -> Self {
        Self {
            max_len: MAX_SIGNATURE_LEN,
            max_struct_depth: MAX_STRUCT_DEPTH,
            max_array_depth: MAX_ARRAY_DEPTH,
        }
    }
}

impl SignatureLimits {
    /// Upper bound on combined container nesting (structs, arrays, variants).
    pub const fn max_total_depth(&self) -> usize {
        self.max_struct_depth + self.max_array_depth
    }

    /// Check a parsed type against these limits.
    pub fn check(&self, ty: &SigType) -> Result<(), SignatureError> {
        let len = ty.encoded_len();
        if len > self.max_len {
            return Err(SignatureError::TooLong {
                len,
                max: self.max_len,
            });
        }
        let (structs, arrays) = ty.depth();
        if structs > self.max_struct_depth {
            return Err(SignatureError::StructDepth {
                max: self.max_struct_depth,
            });
        }
        if arrays > self.max_array_depth {
            return Err(SignatureError::ArrayDepth {
                max: self.max_array_depth,
            });
        }
        Ok(())
    }
}

/// A validated signature: zero or more complete types.
#[derive(Clone)]
pub struct Signature {
    text: String,
    types: Vec<SigType>,
}

impl Signature {
    /// Parse and validate with the default limits.
    pub fn new(text: &str) -> Result<Self, SignatureError> {
        Self::parse_with(text, &SignatureLimits::default())
    }

    /// Parse and validate with explicit limits.
    pub fn parse_with(text: &str, limits: &SignatureLimits) -> Result<Self, SignatureError> {
        if text.len() > limits.max_len {
            return Err(SignatureError::TooLong {
                len: text.len(),
                max: limits.max_len,
            });
        }
        let mut parser = Parser::new(text.as_bytes(), limits);
        let mut types = Vec::new();
        while !parser.at_end() {
            types.push(parser.complete_type()?);
        }
        Ok(Self {
            text: text.to_owned(),
            types,
        })
    }

    /// The empty signature (no arguments).
    pub fn empty() -> Self {
        Self {
            text: String::new(),
            types: Vec::new(),
        }
    }

    /// Build from a single parsed type.
    pub fn from_type(ty: SigType) -> Result<Self, SignatureError> {
        Self::from_types(vec![ty])
    }

    /// Concatenate complete types, re-checking the length limit.
    pub fn from_types(types: Vec<SigType>) -> Result<Self, SignatureError> {
        let limits = SignatureLimits::default();
        let mut text = String::new();
        for ty in &types {
            limits.check(ty)?;
            ty.write_to(&mut text);
        }
        if text.len() > limits.max_len {
            return Err(SignatureError::TooLong {
                len: text.len(),
                max: limits.max_len,
            });
        }
        Ok(Self { text, types })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Number of complete types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Parsed complete types, in order.
    pub fn types(&self) -> &[SigType] {
        &self.types
    }

    /// The only complete type, if there is exactly one.
    pub fn single(&self) -> Result<&SigType, SignatureError> {
        match self.types.as_slice() {
            [ty] => Ok(ty),
            other => Err(SignatureError::NotSingle { count: other.len() }),
        }
    }

    /// Split into one signature per complete type.
    pub fn split(&self) -> Vec<Signature> {
        self.types
            .iter()
            .map(|ty| Signature {
                text: ty.to_string(),
                types: vec![ty.clone()],
            })
            .collect()
    }
}

impl PartialEq for Signature {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl Eq for Signature {}

impl std::hash::Hash for Signature {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.text.hash(state);
    }
}

impl PartialEq<str> for Signature {
    fn eq(&self, other: &str) -> bool {
        self.text == other
    }
}

impl PartialEq<&str> for Signature {
    fn eq(&self, other: &&str) -> bool {
        self.text == *other
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({:?})", self.text)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl FromStr for Signature {
    type Err = SignatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<&SigType> for Signature {
    type Error = SignatureError;

    fn try_from(ty: &SigType) -> Result<Self, Self::Error> {
        Self::from_type(ty.clone())
    }
}

/// Recursive-descent parser with explicit nesting counters.
struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
    structs: usize,
    arrays: usize,
    limits: &'a SignatureLimits,
}

impl<'a> Parser<'a> {
    fn new(input: &'a [u8], limits: &'a SignatureLimits) -> Self {
        Self {
            input,
            pos: 0,
            structs: 0,
            arrays: 0,
            limits,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.pos).map(|b| char::from(*b))
    }

    fn complete_type(&mut self) -> Result<SigType, SignatureError> {
        let offset = self.pos;
        let Some(c) = self.peek() else {
            return Err(SignatureError::Truncated { offset });
        };
        self.pos += 1;
        match c {
            'a' => {
                self.arrays += 1;
                if self.arrays > self.limits.max_array_depth {
                    return Err(SignatureError::ArrayDepth {
                        max: self.limits.max_array_depth,
                    });
                }
                let element = if self.peek() == Some('{') {
                    self.pos += 1;
                    self.dict_entry(self.pos - 1)?
                } else {
                    self.complete_type()?
                };
                self.arrays -= 1;
                Ok(SigType::Array(Box::new(element)))
            }
            '(' => {
                self.enter_struct()?;
                let mut members = Vec::new();
                loop {
                    match self.peek() {
                        None => return Err(SignatureError::Truncated { offset: self.pos }),
                        Some(')') => {
                            self.pos += 1;
                            break;
                        }
                        Some(_) => members.push(self.complete_type()?),
                    }
                }
                self.structs -= 1;
                if members.is_empty() {
                    return Err(SignatureError::EmptyStruct { offset });
                }
                Ok(SigType::Struct(members))
            }
            '{' => Err(SignatureError::DictOutsideArray { offset }),
            ')' | '}' => Err(SignatureError::Unbalanced { found: c, offset }),
            'v' => Ok(SigType::Variant),
            other => match TypeTag::from_char(other) {
                Some(tag) if tag.is_basic() => Ok(SigType::Scalar(tag)),
                _ => Err(SignatureError::UnknownCode {
                    code: other,
                    offset,
                }),
            },
        }
    }

    fn enter_struct(&mut self) -> Result<(), SignatureError> {
        self.structs += 1;
        if self.structs > self.limits.max_struct_depth {
            return Err(SignatureError::StructDepth {
                max: self.limits.max_struct_depth,
            });
        }
        Ok(())
    }

    /// Parses `KV}` after the opening brace.
    fn dict_entry(&mut self, offset: usize) -> Result<SigType, SignatureError> {
        self.enter_struct()?;
        let key_offset = self.pos;
        let key = match self.peek() {
            None | Some('}') => return Err(SignatureError::DictArity { offset }),
            Some(_) => self.complete_type()?,
        };
        let SigType::Scalar(key) = key else {
            return Err(SignatureError::ContainerKey { offset: key_offset });
        };
        let value = match self.peek() {
            None => return Err(SignatureError::Truncated { offset: self.pos }),
            Some('}') => return Err(SignatureError::DictArity { offset }),
            Some(_) => self.complete_type()?,
        };
        match self.peek() {
            Some('}') => self.pos += 1,
            None => return Err(SignatureError::Truncated { offset: self.pos }),
            Some(_) => return Err(SignatureError::DictArity { offset }),
        }
        self.structs -= 1;
        Ok(SigType::DictEntry(key, Box::new(value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_basic_and_container_types() {
        let sig = Signature::new("ia{sv}(ias)ay").expect("valid");
        assert_eq!(sig.len(), 4);
        assert_eq!(sig.types()[0], SigType::Scalar(TypeTag::Int32));
        assert_eq!(
            sig.types()[1],
            SigType::dict(TypeTag::String, SigType::Variant)
        );
        assert_eq!(
            sig.types()[2],
            SigType::Struct(vec![
                SigType::Scalar(TypeTag::Int32),
                SigType::array(SigType::Scalar(TypeTag::String)),
            ])
        );
        let parts: Vec<String> = sig.split().iter().map(ToString::to_string).collect();
        assert_eq!(parts, ["i", "a{sv}", "(ias)", "ay"]);
    }

    #[test]
    fn display_round_trips_text() {
        for text in ["a{oa{sa{sv}}}", "(yb(nq)(iu(xt)))", "aad", "g", ""] {
            let sig = Signature::new(text).expect("valid");
            let rebuilt: String = sig.types().iter().map(ToString::to_string).collect();
            assert_eq!(rebuilt, text);
        }
    }

    #[test]
    fn rejects_malformed_signatures() {
        assert!(matches!(
            Signature::new("a"),
            Err(SignatureError::Truncated { offset: 1 })
        ));
        assert!(matches!(
            Signature::new("(is"),
            Err(SignatureError::Truncated { .. })
        ));
        assert!(matches!(
            Signature::new("is)"),
            Err(SignatureError::Unbalanced { found: ')', offset: 2 })
        ));
        assert!(matches!(
            Signature::new("()"),
            Err(SignatureError::EmptyStruct { offset: 0 })
        ));
        assert!(matches!(
            Signature::new("a{(i)s}"),
            Err(SignatureError::ContainerKey { offset: 2 })
        ));
        assert!(matches!(
            Signature::new("a{vs}"),
            Err(SignatureError::ContainerKey { .. })
        ));
        assert!(matches!(
            Signature::new("a{s}"),
            Err(SignatureError::DictArity { .. })
        ));
        assert!(matches!(
            Signature::new("a{sii}"),
            Err(SignatureError::DictArity { .. })
        ));
        assert!(matches!(
            Signature::new("{si}"),
            Err(SignatureError::DictOutsideArray { offset: 0 })
        ));
        assert!(matches!(
            Signature::new("z"),
            Err(SignatureError::UnknownCode { code: 'z', offset: 0 })
        ));
    }

    #[test]
    fn enforces_length_and_depth_limits() {
        let long = "i".repeat(MAX_SIGNATURE_LEN + 1);
        assert!(matches!(
            Signature::new(&long),
            Err(SignatureError::TooLong { len: 256, max: 255 })
        ));
        assert!(Signature::new(&"i".repeat(MAX_SIGNATURE_LEN)).is_ok());

        let arrays = format!("{}i", "a".repeat(MAX_ARRAY_DEPTH));
        assert!(Signature::new(&arrays).is_ok());
        let too_deep = format!("{}i", "a".repeat(MAX_ARRAY_DEPTH + 1));
        assert!(matches!(
            Signature::new(&too_deep),
            Err(SignatureError::ArrayDepth { max: 32 })
        ));

        let structs = format!(
            "{}i{}",
            "(".repeat(MAX_STRUCT_DEPTH + 1),
            ")".repeat(MAX_STRUCT_DEPTH + 1)
        );
        assert!(matches!(
            Signature::new(&structs),
            Err(SignatureError::StructDepth { max: 32 })
        ));
    }

    #[test]
    fn custom_limits_are_applied() {
        let limits = SignatureLimits {
            max_len: 8,
            max_struct_depth: 1,
            max_array_depth: 1,
        };
        assert!(Signature::parse_with("a(is)", &limits).is_ok());
        assert!(matches!(
            Signature::parse_with("aai", &limits),
            Err(SignatureError::ArrayDepth { max: 1 })
        ));
        assert!(matches!(
            Signature::parse_with("((i))", &limits),
            Err(SignatureError::StructDepth { max: 1 })
        ));
        assert!(matches!(
            Signature::parse_with("iiiiiiiii", &limits),
            Err(SignatureError::TooLong { .. })
        ));
    }

    #[test]
    fn single_requires_exactly_one_type() {
        assert!(Signature::new("a{si}").expect("valid").single().is_ok());
        assert!(matches!(
            Signature::new("ii").expect("valid").single(),
            Err(SignatureError::NotSingle { count: 2 })
        ));
        assert!(matches!(
            Signature::empty().single(),
            Err(SignatureError::NotSingle { count: 0 })
        ));
    }

    #[test]
    fn depth_counts_dict_entries_as_structs() {
        let sig = Signature::new("aa{s(i)}").expect("valid");
        assert_eq!(sig.types()[0].depth(), (2, 2));
    }

    #[test]
    fn tags_classify() {
        assert!(TypeTag::String.is_basic());
        assert!(!TypeTag::Variant.is_basic());
        assert!(TypeTag::UInt64.is_integer());
        assert!(!TypeTag::Double.is_integer());
        assert_eq!(TypeTag::from_char('q'), Some(TypeTag::UInt16));
        assert_eq!(TypeTag::Struct.as_char(), '(');
    }
}
