// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Native type codecs.
//!
//! [`BusType`] connects a Rust type to the engine: its structural
//! descriptor, and conversion to and from the [`Value`] model. Structs and
//! enums get an implementation from `#[derive(BusStruct)]` and
//! `#[derive(BusEnum)]`.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::sync::Arc;

use crate::calc::TypeSignatureCalculator;
use crate::descriptor::{PrimitiveKind, TypeDescriptor};
use crate::error::{MarshalError, MarshalErrorKind, Result};
use crate::object_path::ObjectPath;
use crate::signature::Signature;
use crate::value::Value;
use crate::variant::Variant;

/// A native type the engine can marshal.
pub trait BusType: Sized + 'static {
    /// Structural description of `Self`.
    fn descriptor() -> Arc<TypeDescriptor>;

    /// Convert to the value model.
    fn to_value(&self) -> Value;

    /// Convert back from the value model.
    fn from_value(value: Value) -> Result<Self>;
}

/// Error for a value whose shape does not belong to `T`.
pub fn shape_error<T: BusType>(value: &Value) -> crate::error::Error {
    let desc = T::descriptor();
    let target = TypeSignatureCalculator::default()
        .signature(&desc, None)
        .map_or_else(|_| desc.name.clone(), |sig| sig.to_string());
    MarshalError::outbound(target, value.type_name(), MarshalErrorKind::TypeMismatch).into()
}

macro_rules! impl_primitive {
    ($($ty:ty => $kind:ident, $variant:ident;)*) => {
        $(
            impl BusType for $ty {
                fn descriptor() -> Arc<TypeDescriptor> {
                    Arc::new(TypeDescriptor::primitive(PrimitiveKind::$kind))
                }

                fn to_value(&self) -> Value {
                    Value::$variant(Clone::clone(self))
                }

                fn from_value(value: Value) -> Result<Self> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        other => Err(shape_error::<Self>(&other)),
                    }
                }
            }
        )*
    };
}

impl_primitive! {
    bool => Bool, Bool;
    u8 => U8, U8;
    i16 => I16, I16;
    u16 => U16, U16;
    i32 => I32, I32;
    u32 => U32, U32;
    i64 => I64, I64;
    u64 => U64, U64;
    f64 => F64, F64;
    String => String, String;
    ObjectPath => ObjectPath, ObjectPath;
    Signature => Signature, Signature;
}

impl BusType for Variant {
    fn descriptor() -> Arc<TypeDescriptor> {
        Arc::new(TypeDescriptor::variant())
    }

    fn to_value(&self) -> Value {
        Value::Variant(self.clone())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Variant(v) => Ok(v),
            other => Err(shape_error::<Self>(&other)),
        }
    }
}

impl<T: BusType> BusType for Vec<T> {
    fn descriptor() -> Arc<TypeDescriptor> {
        Arc::new(TypeDescriptor::sequence(T::descriptor()))
    }

    fn to_value(&self) -> Value {
        Value::Sequence(self.iter().map(BusType::to_value).collect())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Sequence(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(shape_error::<Self>(&other)),
        }
    }
}

impl<K, V> BusType for HashMap<K, V>
where
    K: BusType + Eq + Hash,
    V: BusType,
{
    fn descriptor() -> Arc<TypeDescriptor> {
        Arc::new(TypeDescriptor::map(K::descriptor(), V::descriptor()))
    }

    fn to_value(&self) -> Value {
        Value::Map(self.iter().map(|(k, v)| (k.to_value(), v.to_value())).collect())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Map(entries) => entries
                .into_iter()
                .map(|(k, v)| Ok((K::from_value(k)?, V::from_value(v)?)))
                .collect(),
            other => Err(shape_error::<Self>(&other)),
        }
    }
}

impl<K, V> BusType for BTreeMap<K, V>
where
    K: BusType + Ord,
    V: BusType,
{
    fn descriptor() -> Arc<TypeDescriptor> {
        Arc::new(TypeDescriptor::map(K::descriptor(), V::descriptor()))
    }

    fn to_value(&self) -> Value {
        Value::Map(self.iter().map(|(k, v)| (k.to_value(), v.to_value())).collect())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Map(entries) => entries
                .into_iter()
                .map(|(k, v)| Ok((K::from_value(k)?, V::from_value(v)?)))
                .collect(),
            other => Err(shape_error::<Self>(&other)),
        }
    }
}

/// `None` becomes [`Value::Null`], which no signature accepts; received
/// values always come back as `Some`.
impl<T: BusType> BusType for Option<T> {
    fn descriptor() -> Arc<TypeDescriptor> {
        T::descriptor()
    }

    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

macro_rules! impl_tuple {
    ($len:expr; $($name:ident : $idx:tt),+) => {
        impl<$($name: BusType),+> BusType for ($($name,)+) {
            fn descriptor() -> Arc<TypeDescriptor> {
                let members = vec![$($name::descriptor()),+];
                let name = format!(
                    "({})",
                    members.iter().map(|m| m.name.as_str()).collect::<Vec<_>>().join(", ")
                );
                Arc::new(TypeDescriptor::tuple(name, members))
            }

            fn to_value(&self) -> Value {
                Value::Struct {
                    type_name: Self::descriptor().name.clone(),
                    fields: vec![$(self.$idx.to_value()),+],
                }
            }

            fn from_value(value: Value) -> Result<Self> {
                match value {
                    Value::Struct { fields, .. } if fields.len() == $len => {
                        let mut fields = fields.into_iter();
                        Ok(($(
                            $name::from_value(fields.next().unwrap_or(Value::Null))?,
                        )+))
                    }
                    other => Err(shape_error::<Self>(&other)),
                }
            }
        }
    };
}

impl_tuple!(1; A: 0);
impl_tuple!(2; A: 0, B: 1);
impl_tuple!(3; A: 0, B: 1, C: 2);
impl_tuple!(4; A: 0, B: 1, C: 2, D: 3);
impl_tuple!(5; A: 0, B: 1, C: 2, D: 3, E: 4);
impl_tuple!(6; A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);
impl_tuple!(7; A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6);
impl_tuple!(8; A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7);
