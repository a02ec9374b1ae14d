// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type signature calculator.
//!
//! Derives the wire signature of a native type from its descriptor. The
//! computation is purely structural and never looks at instance values:
//!
//! | Native kind      | Signature                                |
//! |------------------|------------------------------------------|
//! | primitive        | fixed tag (`i32` is `i`, `String` is `s`)|
//! | enumeration      | explicit integer override, required      |
//! | sequence         | `a` + element                            |
//! | map              | `a{KV}`, K basic                         |
//! | variant          | `v`                                      |
//! | struct           | `(` members in position order `)`        |
//!
//! An override replaces the computed signature of one field or parameter; it
//! must be a single complete type with the same shape as the native type.

use crate::descriptor::{PrimitiveKind, TypeDescriptor, TypeKind};
use crate::error::AnnotationError;
use crate::signature::{SigType, Signature, SignatureLimits, TypeTag};

/// Computes signatures from descriptors.
#[derive(Debug, Clone, Default)]
pub struct TypeSignatureCalculator {
    limits: SignatureLimits,
}

impl TypeSignatureCalculator {
    pub fn new(limits: SignatureLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &SignatureLimits {
        &self.limits
    }

    /// Signature of `desc`, or of `override_sig` if given and compatible.
    pub fn signature(
        &self,
        desc: &TypeDescriptor,
        override_sig: Option<&str>,
    ) -> Result<Signature, AnnotationError> {
        let ty = self.sig_type(desc, override_sig)?;
        self.finish(&desc.name, vec![ty])
    }

    /// Parsed form of [`signature`](Self::signature).
    pub fn sig_type(
        &self,
        desc: &TypeDescriptor,
        override_sig: Option<&str>,
    ) -> Result<SigType, AnnotationError> {
        let ty = match override_sig {
            Some(text) => self.resolve_override(desc, text)?,
            None => self.resolve(desc)?,
        };
        self.limits
            .check(&ty)
            .map_err(|source| AnnotationError::SignatureLimit {
                target: desc.name.clone(),
                source,
            })?;
        Ok(ty)
    }

    /// Join complete types into a member signature, re-checking limits.
    pub(crate) fn finish(
        &self,
        target: &str,
        types: Vec<SigType>,
    ) -> Result<Signature, AnnotationError> {
        let len: usize = types.iter().map(SigType::encoded_len).sum();
        if len > self.limits.max_len {
            return Err(AnnotationError::SignatureLimit {
                target: target.to_owned(),
                source: crate::signature::SignatureError::TooLong {
                    len,
                    max: self.limits.max_len,
                },
            });
        }
        Signature::from_types(types).map_err(|source| AnnotationError::SignatureLimit {
            target: target.to_owned(),
            source,
        })
    }

    fn resolve(&self, desc: &TypeDescriptor) -> Result<SigType, AnnotationError> {
        match &desc.kind {
            TypeKind::Primitive(kind) => Ok(SigType::Scalar(kind.default_tag())),
            TypeKind::Enum(e) => match &e.signature {
                Some(text) => self.resolve_override(desc, text),
                None => Err(AnnotationError::MissingEnumSignature {
                    type_name: desc.name.clone(),
                }),
            },
            TypeKind::Sequence(element) => Ok(SigType::array(self.resolve(element)?)),
            TypeKind::Map { key, value } => {
                let key_ty = self.resolve(key)?;
                let SigType::Scalar(key_tag) = key_ty else {
                    return Err(AnnotationError::ContainerDictKey {
                        type_name: desc.name.clone(),
                        key_signature: key_ty.to_string(),
                    });
                };
                Ok(SigType::dict(key_tag, self.resolve(value)?))
            }
            TypeKind::Variant => Ok(SigType::Variant),
            TypeKind::Struct(_) => {
                let members = desc
                    .ordered_fields()?
                    .into_iter()
                    .map(|field| match field.signature.as_deref() {
                        Some(text) => self.resolve_override(&field.ty, text),
                        None => self.resolve(&field.ty),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(SigType::Struct(members))
            }
        }
    }

    fn resolve_override(
        &self,
        desc: &TypeDescriptor,
        text: &str,
    ) -> Result<SigType, AnnotationError> {
        let malformed = |source| AnnotationError::MalformedOverride {
            target: desc.name.clone(),
            signature: text.to_owned(),
            source,
        };
        let sig = Signature::parse_with(text, &self.limits).map_err(malformed)?;
        let ty = sig.single().map_err(malformed)?.clone();

        match &desc.kind {
            TypeKind::Enum(_) if !matches!(ty, SigType::Scalar(tag) if tag.is_integer()) => {
                Err(AnnotationError::EnumSignatureNotInteger {
                    type_name: desc.name.clone(),
                    signature: text.to_owned(),
                })
            }
            TypeKind::Struct(_) => {
                // Surface position errors before the shape comparison.
                desc.ordered_fields()?;
                check_compatible(desc, &ty, text).map(|()| ty)
            }
            _ => check_compatible(desc, &ty, text).map(|()| ty),
        }
    }
}

fn check_compatible(desc: &TypeDescriptor, ty: &SigType, text: &str) -> Result<(), AnnotationError> {
    if compatible(desc, ty) {
        Ok(())
    } else {
        Err(AnnotationError::IncompatibleOverride {
            type_name: desc.name.clone(),
            signature: text.to_owned(),
        })
    }
}

/// Whether values of `desc` can travel as `ty`.
pub(crate) fn compatible(desc: &TypeDescriptor, ty: &SigType) -> bool {
    matches_wire(desc, ty, false)
}

/// Whether a received `ty` can fill `desc`. Variant targets accept any
/// wire type, at any nesting level.
pub(crate) fn accepts_inbound(desc: &TypeDescriptor, ty: &SigType) -> bool {
    matches_wire(desc, ty, true)
}

fn matches_wire(desc: &TypeDescriptor, ty: &SigType, wrap: bool) -> bool {
    match (&desc.kind, ty) {
        (TypeKind::Variant, SigType::Variant) => true,
        (TypeKind::Variant, _) => wrap,
        (TypeKind::Primitive(kind), SigType::Scalar(tag)) => primitive_accepts(*kind, *tag),
        (TypeKind::Enum(_), SigType::Scalar(tag)) => tag.is_integer(),
        (TypeKind::Sequence(element), SigType::Array(wire)) => {
            !matches!(wire.as_ref(), SigType::DictEntry(..)) && matches_wire(element, wire, wrap)
        }
        (TypeKind::Map { key, value }, SigType::Array(wire)) => match wire.as_ref() {
            SigType::DictEntry(key_tag, value_ty) => {
                matches_wire(key, &SigType::Scalar(*key_tag), wrap)
                    && matches_wire(value, value_ty, wrap)
            }
            _ => false,
        },
        (TypeKind::Struct(_), SigType::Struct(members)) => match desc.ordered_fields() {
            Ok(fields) => {
                fields.len() == members.len()
                    && fields
                        .iter()
                        .zip(members)
                        .all(|(f, m)| matches_wire(&f.ty, m, wrap))
            }
            Err(_) => false,
        },
        _ => false,
    }
}

fn primitive_accepts(kind: PrimitiveKind, tag: TypeTag) -> bool {
    match kind {
        PrimitiveKind::Bool => tag == TypeTag::Bool,
        PrimitiveKind::F64 => tag == TypeTag::Double,
        PrimitiveKind::String => tag.is_string_like(),
        PrimitiveKind::ObjectPath => tag == TypeTag::ObjectPath,
        PrimitiveKind::Signature => tag == TypeTag::Signature,
        _ => kind.is_integer() && tag.is_integer(),
    }
}
