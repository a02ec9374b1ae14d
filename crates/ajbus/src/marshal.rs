// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Value marshaller: native value + signature -> [`Arg`] tree.
//!
//! The walk is driven by the leading tag of the expected signature. Children
//! are built before their parent, and the first failure aborts the whole
//! construction, so a partially built tree never escapes.

use crate::arg::{Arg, Depth};
use crate::error::{Error, MarshalError, MarshalErrorKind, Result, SignatureMismatchError};
use crate::object_path::ObjectPath;
use crate::registry::SignatureRegistry;
use crate::signature::{SigType, Signature, SignatureLimits, TypeTag};
use crate::types::BusType;
use crate::value::Value;
use crate::variant::Content;

/// Builds outbound argument trees.
#[derive(Debug, Clone, Copy)]
pub struct Marshaller<'r> {
    registry: &'r SignatureRegistry,
}

impl<'r> Marshaller<'r> {
    pub fn new(registry: &'r SignatureRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'r SignatureRegistry {
        self.registry
    }

    /// Marshal `value` as the single complete type in `signature`.
    pub fn marshal_value(&self, value: &Value, signature: &Signature) -> Result<Arg> {
        let ty = signature.single().map_err(|_| {
            MarshalError::outbound(signature, value.type_name(), MarshalErrorKind::NotSingle)
        })?;
        to_arg(value, ty, self.registry.limits())
    }

    /// Marshal a native value against an explicit signature.
    pub fn marshal<T: BusType>(&self, value: &T, signature: &Signature) -> Result<Arg> {
        self.marshal_value(&value.to_value(), signature)
    }

    /// Marshal a native value against its own registered signature.
    pub fn marshal_typed<T: BusType>(&self, value: &T) -> Result<Arg> {
        let entry = self.registry.lookup::<T>()?;
        to_arg(&value.to_value(), entry.sig_type(), self.registry.limits())
    }

    /// Marshal a full argument list; one value per complete type.
    pub fn marshal_args(&self, values: &[Value], signature: &Signature) -> Result<Vec<Arg>> {
        if values.len() != signature.len() {
            return Err(SignatureMismatchError {
                signature: signature.to_string(),
                expected: signature.len(),
                found: values.len(),
            }
            .into());
        }
        let limits = self.registry.limits();
        values
            .iter()
            .zip(signature.types())
            .enumerate()
            .map(|(i, (value, ty))| to_arg(value, ty, limits).map_err(|e| e.within(i)))
            .collect()
    }
}

/// Marshal `value` as `ty` under `limits`.
pub(crate) fn to_arg(value: &Value, ty: &SigType, limits: &SignatureLimits) -> Result<Arg> {
    Walker { limits }.marshal(value, ty, Depth::default())
}

struct Walker<'a> {
    limits: &'a SignatureLimits,
}

impl Walker<'_> {
    fn marshal(&self, value: &Value, ty: &SigType, depth: Depth) -> Result<Arg> {
        let fail = |kind| Error::from(MarshalError::outbound(ty, value.type_name(), kind));

        #[cfg(feature = "logging")]
        log::trace!("[marshal] {} <- {}", ty, value.type_name());

        if value.is_null() {
            return Err(fail(MarshalErrorKind::Null));
        }
        let Some(inner) = depth.descend(ty.tag(), self.limits) else {
            return Err(fail(MarshalErrorKind::DepthExceeded {
                limit: self.limits.max_total_depth(),
            }));
        };

        match ty {
            SigType::Scalar(tag) => scalar(value, *tag).map_err(fail),
            SigType::Variant => match value {
                Value::Variant(variant) => {
                    let signature = variant.sig_type().clone();
                    let inner_arg = match variant.content() {
                        Content::Received(arg) => {
                            log::debug!("[marshal] reusing received variant '{}'", signature);
                            arg.clone()
                        }
                        Content::Native(native) => self.marshal(native, &signature, inner)?,
                    };
                    Ok(Arg::Variant {
                        signature,
                        value: Box::new(inner_arg),
                    })
                }
                _ => Err(fail(MarshalErrorKind::TypeMismatch)),
            },
            SigType::Array(element) => match (element.as_ref(), value) {
                (SigType::DictEntry(key, value_ty), Value::Map(entries)) => {
                    let Some(entry_depth) = inner.descend(TypeTag::DictEntry, self.limits) else {
                        return Err(fail(MarshalErrorKind::DepthExceeded {
                            limit: self.limits.max_struct_depth,
                        }));
                    };
                    let key_ty = SigType::Scalar(*key);
                    let items = entries
                        .iter()
                        .enumerate()
                        .map(|(i, (k, v))| {
                            self.entry(k, v, &key_ty, value_ty, entry_depth)
                                .map_err(|e| e.within(i))
                        })
                        .collect::<Result<Vec<_>>>()?;
                    Ok(Arg::Array {
                        element: element.as_ref().clone(),
                        items,
                    })
                }
                (SigType::DictEntry(..), _) => Err(fail(MarshalErrorKind::TypeMismatch)),
                (element_ty, Value::Sequence(values)) => {
                    let items = values
                        .iter()
                        .enumerate()
                        .map(|(i, v)| self.marshal(v, element_ty, inner).map_err(|e| e.within(i)))
                        .collect::<Result<Vec<_>>>()?;
                    Ok(Arg::Array {
                        element: element_ty.clone(),
                        items,
                    })
                }
                _ => Err(fail(MarshalErrorKind::TypeMismatch)),
            },
            SigType::Struct(members) => match value {
                Value::Struct { fields, .. } => {
                    if fields.len() != members.len() {
                        return Err(fail(MarshalErrorKind::MemberCount {
                            expected: members.len(),
                            found: fields.len(),
                        }));
                    }
                    let args = fields
                        .iter()
                        .zip(members)
                        .enumerate()
                        .map(|(i, (v, t))| self.marshal(v, t, inner).map_err(|e| e.within(i)))
                        .collect::<Result<Vec<_>>>()?;
                    Ok(Arg::Struct(args))
                }
                _ => Err(fail(MarshalErrorKind::TypeMismatch)),
            },
            // Only reachable through a hand-built SigType.
            SigType::DictEntry(..) => Err(fail(MarshalErrorKind::TypeMismatch)),
        }
    }

    fn entry(
        &self,
        key: &Value,
        value: &Value,
        key_ty: &SigType,
        value_ty: &SigType,
        depth: Depth,
    ) -> Result<Arg> {
        let key = self.marshal(key, key_ty, depth)?;
        let value = self.marshal(value, value_ty, depth)?;
        Ok(Arg::DictEntry(Box::new(key), Box::new(value)))
    }
}

fn scalar(value: &Value, tag: TypeTag) -> std::result::Result<Arg, MarshalErrorKind> {
    match tag {
        TypeTag::Bool => value.as_bool().map(Arg::Bool).ok_or(MarshalErrorKind::TypeMismatch),
        TypeTag::Double => value.as_f64().map(Arg::Double).ok_or(MarshalErrorKind::TypeMismatch),
        TypeTag::String => value
            .as_str()
            .map(|s| Arg::String(s.to_owned()))
            .ok_or(MarshalErrorKind::TypeMismatch),
        TypeTag::ObjectPath => match value {
            Value::ObjectPath(path) => Ok(Arg::ObjectPath(path.clone())),
            Value::String(s) => ObjectPath::new(s.as_str())
                .map(Arg::ObjectPath)
                .map_err(|_| MarshalErrorKind::InvalidObjectPath(s.clone())),
            _ => Err(MarshalErrorKind::TypeMismatch),
        },
        TypeTag::Signature => match value {
            Value::Signature(sig) => Ok(Arg::Signature(sig.clone())),
            Value::String(s) => Signature::new(s)
                .map(Arg::Signature)
                .map_err(|_| MarshalErrorKind::InvalidSignature(s.clone())),
            _ => Err(MarshalErrorKind::TypeMismatch),
        },
        tag if tag.is_integer() => {
            // Enum constants arrive here through their ordinal.
            let n = value.as_integer().ok_or(MarshalErrorKind::TypeMismatch)?;
            let out_of_range = |_| MarshalErrorKind::OutOfRange {
                value: n.to_string(),
            };
            match tag {
                TypeTag::Byte => u8::try_from(n).map(Arg::Byte).map_err(out_of_range),
                TypeTag::Int16 => i16::try_from(n).map(Arg::Int16).map_err(out_of_range),
                TypeTag::UInt16 => u16::try_from(n).map(Arg::UInt16).map_err(out_of_range),
                TypeTag::Int32 => i32::try_from(n).map(Arg::Int32).map_err(out_of_range),
                TypeTag::UInt32 => u32::try_from(n).map(Arg::UInt32).map_err(out_of_range),
                TypeTag::Int64 => i64::try_from(n).map(Arg::Int64).map_err(out_of_range),
                _ => u64::try_from(n).map(Arg::UInt64).map_err(out_of_range),
            }
        }
        _ => Err(MarshalErrorKind::TypeMismatch),
    }
}
