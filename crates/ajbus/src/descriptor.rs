// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Native type descriptors.
//!
//! A [`TypeDescriptor`] is the structural description of a native type that
//! the signature calculator and the unmarshaller work from. Descriptors come
//! from [`BusType::descriptor`](crate::BusType::descriptor) (and therefore
//! from the derive macros), from [`StructBuilder`] for hand-built types, or
//! from [`TypeDescriptor::from_signature`] for members that are only known by
//! their wire signature.

use std::sync::Arc;

use crate::error::AnnotationError;
use crate::signature::{SigType, TypeTag};

/// Native scalar kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Bool,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F64,
    String,
    ObjectPath,
    Signature,
}

impl PrimitiveKind {
    /// Wire tag used when no override is given.
    pub const fn default_tag(self) -> TypeTag {
        match self {
            Self::Bool => TypeTag::Bool,
            Self::U8 => TypeTag::Byte,
            Self::I16 => TypeTag::Int16,
            Self::U16 => TypeTag::UInt16,
            Self::I32 => TypeTag::Int32,
            Self::U32 => TypeTag::UInt32,
            Self::I64 => TypeTag::Int64,
            Self::U64 => TypeTag::UInt64,
            Self::F64 => TypeTag::Double,
            Self::String => TypeTag::String,
            Self::ObjectPath => TypeTag::ObjectPath,
            Self::Signature => TypeTag::Signature,
        }
    }

    pub const fn from_tag(tag: TypeTag) -> Option<Self> {
        Some(match tag {
            TypeTag::Bool => Self::Bool,
            TypeTag::Byte => Self::U8,
            TypeTag::Int16 => Self::I16,
            TypeTag::UInt16 => Self::U16,
            TypeTag::Int32 => Self::I32,
            TypeTag::UInt32 => Self::U32,
            TypeTag::Int64 => Self::I64,
            TypeTag::UInt64 => Self::U64,
            TypeTag::Double => Self::F64,
            TypeTag::String => Self::String,
            TypeTag::ObjectPath => Self::ObjectPath,
            TypeTag::Signature => Self::Signature,
            _ => return None,
        })
    }

    /// Rust spelling, used in diagnostics.
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::U8 => "u8",
            Self::I16 => "i16",
            Self::U16 => "u16",
            Self::I32 => "i32",
            Self::U32 => "u32",
            Self::I64 => "i64",
            Self::U64 => "u64",
            Self::F64 => "f64",
            Self::String => "String",
            Self::ObjectPath => "ObjectPath",
            Self::Signature => "Signature",
        }
    }

    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            Self::U8 | Self::I16 | Self::U16 | Self::I32 | Self::U32 | Self::I64 | Self::U64
        )
    }
}

/// Structural description of a native type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    pub name: String,
    pub kind: TypeKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    Primitive(PrimitiveKind),
    Enum(EnumDescriptor),
    Sequence(Arc<TypeDescriptor>),
    Map {
        key: Arc<TypeDescriptor>,
        value: Arc<TypeDescriptor>,
    },
    Struct(Vec<FieldDescriptor>),
    /// Self-describing value; always `v`.
    Variant,
}

/// Fieldless enumeration, marshalled as its ordinal.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumDescriptor {
    /// Variant names in declaration (ordinal) order.
    pub variants: Vec<String>,
    /// Integer signature declared on the enum itself.
    pub signature: Option<String>,
}

/// One struct member.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub ty: Arc<TypeDescriptor>,
    /// Explicit 0-based ordinal; required on every field.
    pub position: Option<u32>,
    /// Signature override for this field.
    pub signature: Option<String>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, ty: Arc<TypeDescriptor>) -> Self {
        Self {
            name: name.into(),
            ty,
            position: None,
            signature: None,
        }
    }

    /// Set the field position.
    #[must_use]
    pub fn at(mut self, position: u32) -> Self {
        self.position = Some(position);
        self
    }

    #[must_use]
    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }
}

impl TypeDescriptor {
    pub fn primitive(kind: PrimitiveKind) -> Self {
        Self {
            name: kind.type_name().to_owned(),
            kind: TypeKind::Primitive(kind),
        }
    }

    pub fn variant() -> Self {
        Self {
            name: "Variant".to_owned(),
            kind: TypeKind::Variant,
        }
    }

    pub fn sequence(element: Arc<TypeDescriptor>) -> Self {
        Self {
            name: format!("Vec<{}>", element.name),
            kind: TypeKind::Sequence(element),
        }
    }

    pub fn map(key: Arc<TypeDescriptor>, value: Arc<TypeDescriptor>) -> Self {
        Self {
            name: format!("Map<{}, {}>", key.name, value.name),
            kind: TypeKind::Map { key, value },
        }
    }

    pub fn structure(name: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Struct(fields),
        }
    }

    /// Tuple-like struct: field `i` sits at position `i`.
    pub fn tuple(name: impl Into<String>, members: Vec<Arc<TypeDescriptor>>) -> Self {
        let fields = members
            .into_iter()
            .enumerate()
            .map(|(i, ty)| FieldDescriptor::new(i.to_string(), ty).at(i as u32))
            .collect();
        Self::structure(name, fields)
    }

    pub fn enumeration(
        name: impl Into<String>,
        variants: Vec<String>,
        signature: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Enum(EnumDescriptor {
                variants,
                signature,
            }),
        }
    }

    /// Synthesize a descriptor for a wire type.
    ///
    /// Structs become positional tuples; nothing maps to an enum.
    pub fn from_signature(ty: &SigType) -> Self {
        match ty {
            SigType::Scalar(tag) => match PrimitiveKind::from_tag(*tag) {
                Some(kind) => Self::primitive(kind),
                // Basic tags all have a primitive kind.
                None => Self::variant(),
            },
            SigType::Variant => Self::variant(),
            SigType::Array(element) => match element.as_ref() {
                SigType::DictEntry(key, value) => Self::map(
                    Arc::new(Self::from_signature(&SigType::Scalar(*key))),
                    Arc::new(Self::from_signature(value)),
                ),
                other => Self::sequence(Arc::new(Self::from_signature(other))),
            },
            SigType::Struct(members) => Self::tuple(
                ty.to_string(),
                members
                    .iter()
                    .map(|m| Arc::new(Self::from_signature(m)))
                    .collect(),
            ),
            SigType::DictEntry(key, value) => Self::tuple(
                ty.to_string(),
                vec![
                    Arc::new(Self::from_signature(&SigType::Scalar(*key))),
                    Arc::new(Self::from_signature(value)),
                ],
            ),
        }
    }

    pub fn is_variant(&self) -> bool {
        matches!(self.kind, TypeKind::Variant)
    }

    /// Struct fields sorted by position, after checking that positions form
    /// a contiguous permutation of `0..N`.
    pub fn ordered_fields(&self) -> Result<Vec<&FieldDescriptor>, AnnotationError> {
        let TypeKind::Struct(fields) = &self.kind else {
            return Ok(Vec::new());
        };
        if fields.is_empty() {
            return Err(AnnotationError::EmptyStruct {
                type_name: self.name.clone(),
            });
        }
        let mut slots: Vec<Option<&FieldDescriptor>> = vec![None; fields.len()];
        for field in fields {
            let Some(position) = field.position else {
                return Err(AnnotationError::MissingFieldPosition {
                    type_name: self.name.clone(),
                    field: field.name.clone(),
                });
            };
            let Some(slot) = slots.get_mut(position as usize) else {
                // Out of range means some lower position is unused.
                return Err(AnnotationError::FieldPositionGap {
                    type_name: self.name.clone(),
                    missing: first_unused(fields),
                });
            };
            if slot.is_some() {
                return Err(AnnotationError::DuplicateFieldPosition {
                    type_name: self.name.clone(),
                    position,
                });
            }
            *slot = Some(field);
        }
        // Every slot is filled: N fields landed in N distinct slots.
        Ok(slots.into_iter().flatten().collect())
    }
}

fn first_unused(fields: &[FieldDescriptor]) -> u32 {
    let mut used: Vec<u32> = fields.iter().filter_map(|f| f.position).collect();
    used.sort_unstable();
    used.dedup();
    used.iter()
        .enumerate()
        .find(|(i, p)| **p != *i as u32)
        .map_or(used.len() as u32, |(i, _)| i as u32)
}

/// Fluent builder for hand-declared struct descriptors.
///
/// ```
/// use ajbus::{BusType, StructBuilder};
///
/// let foo = StructBuilder::new("Foo")
///     .field_at("b", 1, String::descriptor())
///     .field_at("a", 0, i32::descriptor())
///     .build();
/// assert_eq!(foo.ordered_fields().unwrap()[0].name, "a");
/// ```
#[derive(Debug)]
pub struct StructBuilder {
    name: String,
    fields: Vec<FieldDescriptor>,
}

impl StructBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Add a field without a position (rejected when the signature is
    /// computed).
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, ty: Arc<TypeDescriptor>) -> Self {
        self.fields.push(FieldDescriptor::new(name, ty));
        self
    }

    #[must_use]
    pub fn field_at(mut self, name: impl Into<String>, position: u32, ty: Arc<TypeDescriptor>) -> Self {
        self.fields.push(FieldDescriptor::new(name, ty).at(position));
        self
    }

    #[must_use]
    pub fn field_desc(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn build(self) -> Arc<TypeDescriptor> {
        Arc::new(TypeDescriptor::structure(self.name, self.fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::Signature;

    fn int() -> Arc<TypeDescriptor> {
        Arc::new(TypeDescriptor::primitive(PrimitiveKind::I32))
    }

    #[test]
    fn ordered_fields_follow_positions() {
        let desc = StructBuilder::new("Foo")
            .field_at("c", 2, int())
            .field_at("a", 0, int())
            .field_at("b", 1, int())
            .build();
        let names: Vec<&str> = desc
            .ordered_fields()
            .expect("valid")
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[test]
    fn position_errors_are_reported() {
        let missing = StructBuilder::new("Foo")
            .field_at("a", 0, int())
            .field("b", int())
            .build();
        assert_eq!(
            missing.ordered_fields(),
            Err(AnnotationError::MissingFieldPosition {
                type_name: "Foo".into(),
                field: "b".into()
            })
        );

        let duplicate = StructBuilder::new("Foo")
            .field_at("a", 0, int())
            .field_at("b", 0, int())
            .build();
        assert_eq!(
            duplicate.ordered_fields(),
            Err(AnnotationError::DuplicateFieldPosition {
                type_name: "Foo".into(),
                position: 0
            })
        );

        let gap = StructBuilder::new("Foo")
            .field_at("a", 0, int())
            .field_at("b", 2, int())
            .build();
        assert_eq!(
            gap.ordered_fields(),
            Err(AnnotationError::FieldPositionGap {
                type_name: "Foo".into(),
                missing: 1
            })
        );

        let empty = StructBuilder::new("Empty").build();
        assert!(matches!(
            empty.ordered_fields(),
            Err(AnnotationError::EmptyStruct { .. })
        ));
    }

    #[test]
    fn descriptors_synthesized_from_signatures() {
        let sig = Signature::new("a{s(iv)}").expect("valid");
        let desc = TypeDescriptor::from_signature(&sig.types()[0]);
        let TypeKind::Map { key, value } = &desc.kind else {
            panic!("expected map, got {:?}", desc.kind);
        };
        assert_eq!(key.kind, TypeKind::Primitive(PrimitiveKind::String));
        let fields = value.ordered_fields().expect("tuple positions");
        assert_eq!(fields.len(), 2);
        assert!(fields[1].ty.is_variant());
    }
}
