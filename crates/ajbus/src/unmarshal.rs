// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Value unmarshaller: received [`Arg`] tree + target type -> native value.
//!
//! The walk is driven by the target descriptor. Variant nodes are never
//! resolved here; they come back as a [`Variant`] holding the received node
//! until the caller asks for a concrete type.

use std::sync::Arc;

use crate::arg::{Arg, Depth};
use crate::calc::accepts_inbound;
use crate::descriptor::{PrimitiveKind, TypeDescriptor, TypeKind};
use crate::error::{Error, MarshalError, MarshalErrorKind, Result, SignatureMismatchError};
use crate::registry::SignatureRegistry;
use crate::signature::{SigType, SignatureLimits, TypeTag};
use crate::types::BusType;
use crate::value::Value;
use crate::variant::Variant;

/// Converts inbound argument trees into native values.
#[derive(Debug, Clone, Copy)]
pub struct Unmarshaller<'r> {
    registry: &'r SignatureRegistry,
}

impl<'r> Unmarshaller<'r> {
    pub fn new(registry: &'r SignatureRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'r SignatureRegistry {
        self.registry
    }

    /// Unmarshal into the shape described by `desc`.
    pub fn unmarshal_value(&self, arg: &Arg, desc: &TypeDescriptor) -> Result<Value> {
        from_arg(arg, desc, self.registry.limits())
    }

    /// Unmarshal into a native type.
    pub fn unmarshal<T: BusType>(&self, arg: &Arg) -> Result<T> {
        let entry = self.registry.lookup::<T>()?;
        let value = from_arg(arg, &entry.descriptor, self.registry.limits())?;
        T::from_value(value)
    }

    /// Unmarshal a full argument list against the declared parameters.
    pub fn unmarshal_args(
        &self,
        args: &[Arg],
        params: &[Arc<TypeDescriptor>],
    ) -> Result<Vec<Value>> {
        if args.len() != params.len() {
            return Err(SignatureMismatchError {
                signature: args.iter().map(Arg::signature).collect(),
                expected: params.len(),
                found: args.len(),
            }
            .into());
        }
        let limits = self.registry.limits();
        args.iter()
            .zip(params)
            .enumerate()
            .map(|(i, (arg, desc))| from_arg(arg, desc, limits).map_err(|e| e.within(i)))
            .collect()
    }
}

/// Unmarshal `arg` into `desc` under `limits`.
pub(crate) fn from_arg(arg: &Arg, desc: &TypeDescriptor, limits: &SignatureLimits) -> Result<Value> {
    Walker { limits }.unmarshal(arg, desc, Depth::default())
}

struct Walker<'a> {
    limits: &'a SignatureLimits,
}

impl Walker<'_> {
    fn unmarshal(&self, arg: &Arg, desc: &TypeDescriptor, depth: Depth) -> Result<Value> {
        let fail = |kind| {
            Error::from(MarshalError::inbound(
                arg.signature(),
                arg.tag(),
                desc.name.as_str(),
                kind,
            ))
        };

        #[cfg(feature = "logging")]
        log::trace!("[unmarshal] {} -> {}", arg.tag(), desc.name);

        let Some(inner) = depth.descend(arg.tag(), self.limits) else {
            return Err(fail(MarshalErrorKind::DepthExceeded {
                limit: self.limits.max_total_depth(),
            }));
        };

        match &desc.kind {
            TypeKind::Variant => Ok(Value::Variant(Variant::from_arg(arg.clone()))),
            TypeKind::Primitive(kind) => coerce(arg, *kind).map_err(fail),
            TypeKind::Enum(e) => {
                let n = arg
                    .as_integer()
                    .ok_or_else(|| fail(MarshalErrorKind::TypeMismatch))?;
                match u32::try_from(n) {
                    Ok(ordinal) if (ordinal as usize) < e.variants.len() => Ok(Value::Enum {
                        type_name: desc.name.clone(),
                        ordinal,
                    }),
                    _ => Err(fail(MarshalErrorKind::EnumOutOfRange {
                        ordinal: n,
                        variants: e.variants.len(),
                    })),
                }
            }
            TypeKind::Sequence(element_desc) => match arg {
                Arg::Array { element, items } if element.tag() != TypeTag::DictEntry => {
                    if !accepts_inbound(element_desc, element) {
                        return Err(fail(MarshalErrorKind::ElementTypeMismatch {
                            element: element.to_string(),
                        }));
                    }
                    let values = items
                        .iter()
                        .enumerate()
                        .map(|(i, item)| {
                            self.element(item, element, element_desc, inner)
                                .map_err(|e| e.within(i))
                        })
                        .collect::<Result<Vec<_>>>()?;
                    Ok(Value::Sequence(values))
                }
                _ => Err(fail(MarshalErrorKind::TypeMismatch)),
            },
            TypeKind::Map { key, value } => match arg {
                Arg::Array {
                    element: element @ SigType::DictEntry(key_tag, value_ty),
                    items,
                } => {
                    if !accepts_inbound(key, &SigType::Scalar(*key_tag))
                        || !accepts_inbound(value, value_ty)
                    {
                        return Err(fail(MarshalErrorKind::ElementTypeMismatch {
                            element: element.to_string(),
                        }));
                    }
                    let Some(entry_depth) = inner.descend(TypeTag::DictEntry, self.limits) else {
                        return Err(fail(MarshalErrorKind::DepthExceeded {
                            limit: self.limits.max_struct_depth,
                        }));
                    };
                    let pairs = items
                        .iter()
                        .enumerate()
                        .map(|(i, item)| match item {
                            Arg::DictEntry(k, v) => self
                                .entry(k, v, (*key_tag, value_ty), element, key, value, entry_depth)
                                .map_err(|e| e.within(i)),
                            other => Err(MarshalError::inbound(
                                other.signature(),
                                other.tag(),
                                desc.name.as_str(),
                                MarshalErrorKind::ElementTypeMismatch {
                                    element: element.to_string(),
                                },
                            )
                            .within(i)
                            .into()),
                        })
                        .collect::<Result<Vec<_>>>()?;
                    Ok(Value::Map(pairs))
                }
                _ => Err(fail(MarshalErrorKind::TypeMismatch)),
            },
            TypeKind::Struct(_) => match arg {
                Arg::Struct(members) => {
                    let fields = desc.ordered_fields()?;
                    if members.len() != fields.len() {
                        return Err(fail(MarshalErrorKind::MemberCount {
                            expected: fields.len(),
                            found: members.len(),
                        }));
                    }
                    let values = members
                        .iter()
                        .zip(&fields)
                        .enumerate()
                        .map(|(i, (member, field))| {
                            self.unmarshal(member, &field.ty, inner)
                                .map_err(|e| e.within(i))
                        })
                        .collect::<Result<Vec<_>>>()?;
                    Ok(Value::Struct {
                        type_name: desc.name.clone(),
                        fields: values,
                    })
                }
                _ => Err(fail(MarshalErrorKind::TypeMismatch)),
            },
        }
    }

    /// One array item; its node must carry the declared element tag.
    fn element(
        &self,
        item: &Arg,
        element: &SigType,
        desc: &TypeDescriptor,
        depth: Depth,
    ) -> Result<Value> {
        if item.tag() != element.tag() {
            return Err(MarshalError::inbound(
                item.signature(),
                item.tag(),
                desc.name.as_str(),
                MarshalErrorKind::ElementTypeMismatch {
                    element: element.to_string(),
                },
            )
            .into());
        }
        self.unmarshal(item, desc, depth)
    }

    /// One dictionary entry; key and value nodes must carry the declared tags.
    #[allow(clippy::too_many_arguments)]
    fn entry(
        &self,
        key: &Arg,
        value: &Arg,
        (key_tag, value_ty): (TypeTag, &SigType),
        element: &SigType,
        key_desc: &TypeDescriptor,
        value_desc: &TypeDescriptor,
        depth: Depth,
    ) -> Result<(Value, Value)> {
        let mismatch = |node: &Arg, desc: &TypeDescriptor| {
            Error::from(MarshalError::inbound(
                node.signature(),
                node.tag(),
                desc.name.as_str(),
                MarshalErrorKind::ElementTypeMismatch {
                    element: element.to_string(),
                },
            ))
        };
        if key.tag() != key_tag {
            return Err(mismatch(key, key_desc));
        }
        if value.tag() != value_ty.tag() {
            return Err(mismatch(value, value_desc));
        }
        Ok((
            self.unmarshal(key, key_desc, depth)?,
            self.unmarshal(value, value_desc, depth)?,
        ))
    }
}

/// Lossless scalar conversion.
fn coerce(arg: &Arg, kind: PrimitiveKind) -> std::result::Result<Value, MarshalErrorKind> {
    match (kind, arg) {
        (PrimitiveKind::Bool, Arg::Bool(v)) => Ok(Value::Bool(*v)),
        (PrimitiveKind::F64, Arg::Double(v)) => Ok(Value::F64(*v)),
        (PrimitiveKind::String, other) => other
            .as_str()
            .map(|s| Value::String(s.to_owned()))
            .ok_or(MarshalErrorKind::TypeMismatch),
        (PrimitiveKind::ObjectPath, Arg::ObjectPath(path)) => Ok(Value::ObjectPath(path.clone())),
        (PrimitiveKind::Signature, Arg::Signature(sig)) => Ok(Value::Signature(sig.clone())),
        (kind, other) if kind.is_integer() => {
            let n = other.as_integer().ok_or(MarshalErrorKind::TypeMismatch)?;
            let out_of_range = |_| MarshalErrorKind::OutOfRange {
                value: n.to_string(),
            };
            match kind {
                PrimitiveKind::U8 => u8::try_from(n).map(Value::U8).map_err(out_of_range),
                PrimitiveKind::I16 => i16::try_from(n).map(Value::I16).map_err(out_of_range),
                PrimitiveKind::U16 => u16::try_from(n).map(Value::U16).map_err(out_of_range),
                PrimitiveKind::I32 => i32::try_from(n).map(Value::I32).map_err(out_of_range),
                PrimitiveKind::U32 => u32::try_from(n).map(Value::U32).map_err(out_of_range),
                PrimitiveKind::I64 => i64::try_from(n).map(Value::I64).map_err(out_of_range),
                _ => u64::try_from(n).map(Value::U64).map_err(out_of_range),
            }
        }
        _ => Err(MarshalErrorKind::TypeMismatch),
    }
}
