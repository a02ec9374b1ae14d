// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Native value model.
//!
//! [`Value`] is the closed set of shapes native data takes on its way to and
//! from the wire. Rust types convert through [`BusType`](crate::BusType);
//! the marshaller and unmarshaller only ever see `Value`s.

use crate::object_path::ObjectPath;
use crate::signature::Signature;
use crate::variant::Variant;

/// A native value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent value (a `None` optional).
    Null,
    Bool(bool),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F64(f64),
    String(String),
    ObjectPath(ObjectPath),
    Signature(Signature),
    /// Enumeration constant; marshalled as `ordinal`.
    Enum { type_name: String, ordinal: u32 },
    Sequence(Vec<Value>),
    /// Key/value pairs in the container's iteration order.
    Map(Vec<(Value, Value)>),
    /// Struct members in field position order.
    Struct { type_name: String, fields: Vec<Value> },
    Variant(Variant),
}

impl Value {
    /// Name of the native shape, for diagnostics.
    pub fn type_name(&self) -> &str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::U8(_) => "u8",
            Self::I16(_) => "i16",
            Self::U16(_) => "u16",
            Self::I32(_) => "i32",
            Self::U32(_) => "u32",
            Self::I64(_) => "i64",
            Self::U64(_) => "u64",
            Self::F64(_) => "f64",
            Self::String(_) => "String",
            Self::ObjectPath(_) => "ObjectPath",
            Self::Signature(_) => "Signature",
            Self::Enum { type_name, .. } | Self::Struct { type_name, .. } => type_name.as_str(),
            Self::Sequence(_) => "Vec",
            Self::Map(_) => "Map",
            Self::Variant(_) => "Variant",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Integer payload widened to `i128`. Enum constants yield their ordinal.
    pub fn as_integer(&self) -> Option<i128> {
        Some(match self {
            Self::U8(v) => i128::from(*v),
            Self::I16(v) => i128::from(*v),
            Self::U16(v) => i128::from(*v),
            Self::I32(v) => i128::from(*v),
            Self::U32(v) => i128::from(*v),
            Self::I64(v) => i128::from(*v),
            Self::U64(v) => i128::from(*v),
            Self::Enum { ordinal, .. } => i128::from(*ordinal),
            _ => return None,
        })
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::F64(v) => Some(*v),
            _ => None,
        }
    }

    /// String payload of string, object path and signature values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            Self::ObjectPath(p) => Some(p.as_str()),
            Self::Signature(g) => Some(g.as_str()),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Self::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(Value, Value)]> {
        match self {
            Self::Map(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&[Value]> {
        match self {
            Self::Struct { fields, .. } => Some(fields),
            _ => None,
        }
    }

    pub fn as_variant(&self) -> Option<&Variant> {
        match self {
            Self::Variant(v) => Some(v),
            _ => None,
        }
    }
}

macro_rules! impl_from_scalar {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }
        )*
    };
}

impl_from_scalar! {
    bool => Bool,
    u8 => U8,
    i16 => I16,
    u16 => U16,
    i32 => I32,
    u32 => U32,
    i64 => I64,
    u64 => U64,
    f64 => F64,
    String => String,
    ObjectPath => ObjectPath,
    Signature => Signature,
    Variant => Variant,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::Sequence(items.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_ordinal_reads_as_integer() {
        let v = Value::Enum {
            type_name: "Color".into(),
            ordinal: 2,
        };
        assert_eq!(v.as_integer(), Some(2));
        assert_eq!(v.type_name(), "Color");
    }

    #[test]
    fn conversions_build_expected_shapes() {
        assert_eq!(Value::from(7i32), Value::I32(7));
        assert_eq!(
            Value::from(vec!["a", "b"]),
            Value::Sequence(vec![Value::String("a".into()), Value::String("b".into())])
        );
        assert_eq!(Value::from("x").as_str(), Some("x"));
        assert!(Value::Null.is_null());
        assert_eq!(Value::U64(u64::MAX).as_integer(), Some(u64::MAX as i128));
    }
}
