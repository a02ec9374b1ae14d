// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Self-describing values (`v`).
//!
//! A [`Variant`] either wraps a native value together with the signature it
//! should travel as, or holds a received node that has not been given a
//! native type yet. Received variants resolve lazily: the first
//! [`get`](Variant::get) for a type unmarshals the node and keeps the result,
//! later calls for the same type reuse it.

use parking_lot::Mutex;
use std::any::TypeId;
use std::fmt;

use crate::arg::Arg;
use crate::calc::TypeSignatureCalculator;
use crate::error::{MarshalError, MarshalErrorKind, Result};
use crate::marshal::to_arg;
use crate::registry::SignatureRegistry;
use crate::signature::{SigType, Signature, SignatureLimits};
use crate::types::BusType;
use crate::unmarshal::from_arg;
use crate::value::Value;

/// A value that carries its own signature.
pub struct Variant {
    signature: SigType,
    repr: Repr,
}

enum Repr {
    Native(Box<Value>),
    Received {
        arg: Box<Arg>,
        resolved: Mutex<Option<(TypeId, Box<Value>)>>,
    },
}

/// Borrowed view of what a variant holds.
pub(crate) enum Content<'a> {
    Native(&'a Value),
    Received(&'a Arg),
}

impl Variant {
    /// Wrap a native value; its signature is computed from its type.
    pub fn new<T: BusType>(value: T) -> Result<Self> {
        let signature = TypeSignatureCalculator::default().sig_type(&T::descriptor(), None)?;
        Ok(Self::native(value.to_value(), signature))
    }

    /// Like [`new`](Self::new), using a registry's cached signature.
    pub fn new_in<T: BusType>(value: T, registry: &SignatureRegistry) -> Result<Self> {
        let entry = registry.lookup::<T>()?;
        Ok(Self::native(value.to_value(), entry.sig_type().clone()))
    }

    /// Wrap an untyped value that should travel as `signature`.
    pub fn with_signature(value: Value, signature: &Signature) -> Result<Self> {
        let ty = signature.single().map_err(|_| {
            MarshalError::outbound(signature, value.type_name(), MarshalErrorKind::NotSingle)
        })?;
        Ok(Self::native(value, ty.clone()))
    }

    fn native(value: Value, signature: SigType) -> Self {
        Self {
            signature,
            repr: Repr::Native(Box::new(value)),
        }
    }

    /// Hold a received node. A variant node is unwrapped one level; any
    /// other node is held as-is under its own signature.
    pub fn from_arg(arg: Arg) -> Self {
        let (signature, arg) = match arg {
            Arg::Variant { signature, value } => (signature, value),
            other => (other.sig_type(), Box::new(other)),
        };
        Self {
            signature,
            repr: Repr::Received {
                arg,
                resolved: Mutex::new(None),
            },
        }
    }

    /// Signature of the wrapped value.
    pub fn signature(&self) -> String {
        self.signature.to_string()
    }

    pub fn sig_type(&self) -> &SigType {
        &self.signature
    }

    /// The native value, when this variant was built locally.
    pub fn value(&self) -> Option<&Value> {
        match &self.repr {
            Repr::Native(value) => Some(value.as_ref()),
            Repr::Received { .. } => None,
        }
    }

    /// The received node, when this variant came off the wire.
    pub fn arg(&self) -> Option<&Arg> {
        match &self.repr {
            Repr::Native(_) => None,
            Repr::Received { arg, .. } => Some(arg.as_ref()),
        }
    }

    pub fn is_received(&self) -> bool {
        matches!(self.repr, Repr::Received { .. })
    }

    pub(crate) fn content(&self) -> Content<'_> {
        match &self.repr {
            Repr::Native(value) => Content::Native(value.as_ref()),
            Repr::Received { arg, .. } => Content::Received(arg.as_ref()),
        }
    }

    /// Resolve into a concrete type with the default limits.
    pub fn get<T: BusType>(&self) -> Result<T> {
        self.resolve::<T>(&SignatureLimits::default(), None)
    }

    /// Resolve into a concrete type using a registry's limits and cache.
    pub fn get_with<T: BusType>(&self, registry: &SignatureRegistry) -> Result<T> {
        self.resolve::<T>(registry.limits(), Some(registry))
    }

    fn resolve<T: BusType>(
        &self,
        limits: &SignatureLimits,
        registry: Option<&SignatureRegistry>,
    ) -> Result<T> {
        let descriptor = match registry {
            Some(registry) => registry.descriptor_of::<T>()?,
            None => T::descriptor(),
        };
        match &self.repr {
            Repr::Native(value) => {
                // Route through the wire form so the same coercions apply.
                let arg = to_arg(value, &self.signature, limits)?;
                T::from_value(from_arg(&arg, &descriptor, limits)?)
            }
            Repr::Received { arg, resolved } => {
                let key = TypeId::of::<T>();
                let mut slot = resolved.lock();
                if let Some((cached, value)) = slot.as_ref() {
                    if *cached == key {
                        return T::from_value(value.as_ref().clone());
                    }
                }
                let value = from_arg(arg, &descriptor, limits)?;
                *slot = Some((key, Box::new(value.clone())));
                T::from_value(value)
            }
        }
    }

    /// Inner node of this variant, building it for native values.
    fn inner_arg(&self) -> Result<Arg> {
        match &self.repr {
            Repr::Native(value) => to_arg(value, &self.signature, &SignatureLimits::default()),
            Repr::Received { arg, .. } => Ok(arg.as_ref().clone()),
        }
    }
}

impl Clone for Variant {
    fn clone(&self) -> Self {
        let repr = match &self.repr {
            Repr::Native(value) => Repr::Native(value.clone()),
            Repr::Received { arg, resolved } => Repr::Received {
                arg: arg.clone(),
                resolved: Mutex::new(resolved.lock().clone()),
            },
        };
        Self {
            signature: self.signature.clone(),
            repr,
        }
    }
}

impl PartialEq for Variant {
    fn eq(&self, other: &Self) -> bool {
        if self.signature != other.signature {
            return false;
        }
        match (&self.repr, &other.repr) {
            (Repr::Native(a), Repr::Native(b)) => a == b,
            (Repr::Received { arg: a, .. }, Repr::Received { arg: b, .. }) => a == b,
            _ => match (self.inner_arg(), other.inner_arg()) {
                (Ok(a), Ok(b)) => a == b,
                _ => false,
            },
        }
    }
}

impl fmt::Debug for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Variant");
        s.field("signature", &self.signature());
        match &self.repr {
            Repr::Native(value) => s.field("value", value),
            Repr::Received { arg, .. } => s.field("arg", arg),
        };
        s.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::collections::HashMap;

    #[test]
    fn native_variant_knows_its_signature() {
        let v = Variant::new(2.5f64).expect("variant");
        assert_eq!(v.signature(), "d");
        assert_eq!(v.value(), Some(&Value::F64(2.5)));
        assert!(!v.is_received());
        assert_eq!(v.get::<f64>().expect("f64"), 2.5);
    }

    #[test]
    fn native_variant_coerces_like_the_wire() {
        let v = Variant::new(7u8).expect("variant");
        assert_eq!(v.get::<i64>().expect("widen"), 7);
        assert!(matches!(v.get::<String>(), Err(Error::Marshal(_))));
    }

    #[test]
    fn received_variant_resolves_lazily_and_caches() {
        let v = Variant::from_arg(Arg::variant(Arg::dict(
            crate::signature::TypeTag::String,
            SigType::Scalar(crate::signature::TypeTag::Int32),
            vec![(Arg::String("k".into()), Arg::Int32(1))],
        )));
        assert!(v.is_received());
        assert_eq!(v.signature(), "a{si}");

        let first: HashMap<String, i32> = v.get().expect("map");
        let second: HashMap<String, i32> = v.get().expect("cached");
        assert_eq!(first, second);
        assert_eq!(first.get("k"), Some(&1));

        // A different type replaces the cached resolution.
        assert!(v.get::<Vec<i32>>().is_err());
        assert_eq!(v.get::<HashMap<String, i64>>().expect("widen")["k"], 1);
    }

    #[test]
    fn received_and_native_compare_by_wire_form() {
        let native = Variant::new(String::from("x")).expect("variant");
        let received = Variant::from_arg(Arg::variant(Arg::String("x".into())));
        assert_eq!(native, received);
        assert_eq!(received.clone(), received);

        let other = Variant::from_arg(Arg::variant(Arg::String("y".into())));
        assert_ne!(native, other);
    }

    #[test]
    fn with_signature_rejects_multiple_types() {
        assert!(Variant::with_signature(Value::I32(1), &Signature::new("ii").expect("valid")).is_err());
        let v = Variant::with_signature(Value::I32(1), &Signature::new("x").expect("valid"))
            .expect("variant");
        assert_eq!(v.get::<i64>().expect("i64"), 1);
    }
}
