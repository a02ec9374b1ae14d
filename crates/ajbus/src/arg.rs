// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wire argument tree.
//!
//! [`Arg`] is the owned, immutable node type exchanged with the transport
//! core. The marshaller builds trees bottom-up; the transport hands
//! received trees to the unmarshaller. Nothing mutates a tree after it
//! has been built.

use crate::object_path::ObjectPath;
use crate::signature::{SigType, Signature, SignatureLimits, TypeTag};

/// One wire value.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Byte(u8),
    Bool(bool),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Double(f64),
    String(String),
    ObjectPath(ObjectPath),
    Signature(Signature),
    /// Homogeneous sequence. `element` keeps empty arrays typed; for
    /// dictionaries it is a [`SigType::DictEntry`].
    Array { element: SigType, items: Vec<Arg> },
    Struct(Vec<Arg>),
    DictEntry(Box<Arg>, Box<Arg>),
    /// Self-describing value; `signature` is the type of `value`.
    Variant { signature: SigType, value: Box<Arg> },
}

impl Arg {
    /// Wrap `value` in a variant tagged with its own type.
    pub fn variant(value: Arg) -> Self {
        Self::Variant {
            signature: value.sig_type(),
            value: Box::new(value),
        }
    }

    pub fn array(element: SigType, items: Vec<Arg>) -> Self {
        Self::Array { element, items }
    }

    /// Build `a{KV}` from key/value pairs.
    pub fn dict(key: TypeTag, value: SigType, entries: Vec<(Arg, Arg)>) -> Self {
        Self::Array {
            element: SigType::DictEntry(key, Box::new(value)),
            items: entries
                .into_iter()
                .map(|(k, v)| Self::DictEntry(Box::new(k), Box::new(v)))
                .collect(),
        }
    }

    pub fn tag(&self) -> TypeTag {
        match self {
            Self::Byte(_) => TypeTag::Byte,
            Self::Bool(_) => TypeTag::Bool,
            Self::Int16(_) => TypeTag::Int16,
            Self::UInt16(_) => TypeTag::UInt16,
            Self::Int32(_) => TypeTag::Int32,
            Self::UInt32(_) => TypeTag::UInt32,
            Self::Int64(_) => TypeTag::Int64,
            Self::UInt64(_) => TypeTag::UInt64,
            Self::Double(_) => TypeTag::Double,
            Self::String(_) => TypeTag::String,
            Self::ObjectPath(_) => TypeTag::ObjectPath,
            Self::Signature(_) => TypeTag::Signature,
            Self::Array { .. } => TypeTag::Array,
            Self::Struct(_) => TypeTag::Struct,
            Self::DictEntry(..) => TypeTag::DictEntry,
            Self::Variant { .. } => TypeTag::Variant,
        }
    }

    /// Type of this node, recomputed from the tree.
    pub fn sig_type(&self) -> SigType {
        match self {
            Self::Array { element, .. } => SigType::Array(Box::new(element.clone())),
            Self::Struct(members) => SigType::Struct(members.iter().map(Self::sig_type).collect()),
            Self::DictEntry(key, value) => SigType::DictEntry(key.tag(), Box::new(value.sig_type())),
            Self::Variant { .. } => SigType::Variant,
            scalar => SigType::Scalar(scalar.tag()),
        }
    }

    /// Signature text of this node.
    pub fn signature(&self) -> String {
        self.sig_type().to_string()
    }

    /// Integer payload widened to `i128`, for any integer node.
    pub fn as_integer(&self) -> Option<i128> {
        Some(match self {
            Self::Byte(v) => i128::from(*v),
            Self::Int16(v) => i128::from(*v),
            Self::UInt16(v) => i128::from(*v),
            Self::Int32(v) => i128::from(*v),
            Self::UInt32(v) => i128::from(*v),
            Self::Int64(v) => i128::from(*v),
            Self::UInt64(v) => i128::from(*v),
            _ => return None,
        })
    }

    /// String payload of `s`, `o` and `g` nodes.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            Self::ObjectPath(p) => Some(p.as_str()),
            Self::Signature(g) => Some(g.as_str()),
            _ => None,
        }
    }

    /// Array items (dictionary entries included).
    pub fn items(&self) -> Option<&[Arg]> {
        match self {
            Self::Array { items, .. } => Some(items),
            _ => None,
        }
    }

    /// Struct members.
    pub fn members(&self) -> Option<&[Arg]> {
        match self {
            Self::Struct(members) => Some(members),
            _ => None,
        }
    }

    /// Inner node and its type for a variant.
    pub fn as_variant(&self) -> Option<(&SigType, &Arg)> {
        match self {
            Self::Variant { signature, value } => Some((signature, value)),
            _ => None,
        }
    }

    /// Check that this tree matches `ty` exactly, with the default nesting
    /// limits.
    pub fn conforms_to(&self, ty: &SigType) -> bool {
        self.conforms_with(ty, &SignatureLimits::default())
    }

    pub fn conforms_with(&self, ty: &SigType, limits: &SignatureLimits) -> bool {
        conforms(self, ty, limits, Depth::default())
    }

    /// Check a full argument list against a signature.
    pub fn list_conforms(args: &[Arg], signature: &Signature) -> bool {
        args.len() == signature.len()
            && args
                .iter()
                .zip(signature.types())
                .all(|(arg, ty)| arg.conforms_to(ty))
    }
}

/// Nesting counters shared by every tree walk.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Depth {
    pub structs: usize,
    pub arrays: usize,
    pub variants: usize,
}

impl Depth {
    /// Descend one level into a container with the given tag; `None` when
    /// a limit would be exceeded.
    pub(crate) fn descend(self, tag: TypeTag, limits: &SignatureLimits) -> Option<Self> {
        let mut next = self;
        match tag {
            TypeTag::Struct | TypeTag::DictEntry => next.structs += 1,
            TypeTag::Array => next.arrays += 1,
            TypeTag::Variant => next.variants += 1,
            _ => return Some(next),
        }
        let total = next.structs + next.arrays + next.variants;
        (next.structs <= limits.max_struct_depth
            && next.arrays <= limits.max_array_depth
            && total <= limits.max_total_depth())
            .then_some(next)
    }
}

fn conforms(arg: &Arg, ty: &SigType, limits: &SignatureLimits, depth: Depth) -> bool {
    let Some(inner) = depth.descend(ty.tag(), limits) else {
        return false;
    };
    match (arg, ty) {
        (Arg::Array { element, items }, SigType::Array(expected)) => {
            element == expected.as_ref()
                && items
                    .iter()
                    .all(|item| conforms(item, expected, limits, inner))
        }
        (Arg::Struct(members), SigType::Struct(types)) => {
            members.len() == types.len()
                && members
                    .iter()
                    .zip(types)
                    .all(|(m, t)| conforms(m, t, limits, inner))
        }
        (Arg::DictEntry(key, value), SigType::DictEntry(key_tag, value_ty)) => {
            key.tag() == *key_tag && conforms(value, value_ty, limits, inner)
        }
        (Arg::Variant { signature, value }, SigType::Variant) => {
            conforms(value, signature, limits, inner)
        }
        (scalar, SigType::Scalar(tag)) => scalar.tag() == *tag,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(text: &str) -> SigType {
        Signature::new(text)
            .expect("valid")
            .single()
            .expect("single")
            .clone()
    }

    #[test]
    fn signature_is_recomputed_from_tree() {
        let arg = Arg::Struct(vec![
            Arg::Int32(7),
            Arg::String("x".into()),
            Arg::dict(
                TypeTag::String,
                SigType::Variant,
                vec![(Arg::String("k".into()), Arg::variant(Arg::Double(1.5)))],
            ),
        ]);
        assert_eq!(arg.signature(), "(isa{sv})");
        assert_eq!(arg.tag(), TypeTag::Struct);
    }

    #[test]
    fn empty_arrays_stay_typed() {
        let arg = Arg::array(sig("(is)"), Vec::new());
        assert_eq!(arg.signature(), "a(is)");
        assert!(arg.conforms_to(&sig("a(is)")));
        assert!(!arg.conforms_to(&sig("ai")));
    }

    #[test]
    fn conformance_checks_every_level() {
        let good = Arg::array(
            SigType::Scalar(TypeTag::String),
            vec![Arg::String("a".into()), Arg::String("b".into())],
        );
        assert!(good.conforms_to(&sig("as")));

        let bad = Arg::array(
            SigType::Scalar(TypeTag::String),
            vec![Arg::String("a".into()), Arg::Int32(1)],
        );
        assert!(!bad.conforms_to(&sig("as")));

        let variant = Arg::Variant {
            signature: sig("s"),
            value: Box::new(Arg::Int32(1)),
        };
        assert!(!variant.conforms_to(&SigType::Variant));
        assert!(Arg::variant(Arg::Int32(1)).conforms_to(&SigType::Variant));
    }

    #[test]
    fn conformance_enforces_nesting_limits() {
        let mut arg = Arg::Int32(0);
        for _ in 0..70 {
            arg = Arg::variant(arg);
        }
        let limits = SignatureLimits::default();
        assert!(limits.max_total_depth() < 70);
        assert!(!arg.conforms_to(&SigType::Variant));

        let list = [Arg::Int32(1), Arg::String("s".into())];
        assert!(Arg::list_conforms(
            &list,
            &Signature::new("is").expect("valid")
        ));
        assert!(!Arg::list_conforms(
            &list,
            &Signature::new("i").expect("valid")
        ));
    }
}
