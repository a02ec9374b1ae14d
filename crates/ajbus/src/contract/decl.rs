// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Interface declarations: the input of [`ContractDescriptor`].
//!
//! A declaration lists members the way they exist on the native side (native
//! names, native parameter types, optional overrides). The descriptor turns
//! it into wire contracts.
//!
//! [`ContractDescriptor`]: super::ContractDescriptor

use std::collections::BTreeMap;
use std::sync::Arc;

use super::{EmitsChanged, MemberFlags, SecurePolicy};
use crate::descriptor::TypeDescriptor;
use crate::types::BusType;

/// What a declared member is on the native side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberRole {
    Method,
    Signal,
    /// Property read accessor.
    Getter,
    /// Property write accessor.
    Setter,
}

impl MemberRole {
    pub fn is_accessor(self) -> bool {
        matches!(self, Self::Getter | Self::Setter)
    }
}

/// One declared parameter.
#[derive(Debug, Clone)]
pub struct ParamDecl {
    pub name: Option<String>,
    pub ty: Arc<TypeDescriptor>,
    /// Signature override for this parameter alone.
    pub signature: Option<String>,
}

impl ParamDecl {
    pub fn new(name: Option<String>, ty: Arc<TypeDescriptor>) -> Self {
        Self {
            name,
            ty,
            signature: None,
        }
    }
}

/// One declared member (method, signal or property accessor).
#[derive(Debug, Clone)]
pub struct MemberDecl {
    pub native_name: String,
    pub role: MemberRole,
    /// Wire name override.
    pub name: Option<String>,
    pub params: Vec<ParamDecl>,
    /// Reply values, in order. A getter has exactly one.
    pub returns: Vec<Arc<TypeDescriptor>>,
    /// Override for the whole input signature. For accessors this is the
    /// property type.
    pub signature: Option<String>,
    /// Override for the output signature.
    pub reply_signature: Option<String>,
    pub flags: MemberFlags,
    pub emits_changed: Option<EmitsChanged>,
    pub annotations: BTreeMap<String, String>,
    pub access_perm: Option<String>,
    pub timeout_ms: Option<u32>,
    pub description: Option<String>,
}

impl MemberDecl {
    fn new(role: MemberRole, native_name: impl Into<String>) -> Self {
        Self {
            native_name: native_name.into(),
            role,
            name: None,
            params: Vec::new(),
            returns: Vec::new(),
            signature: None,
            reply_signature: None,
            flags: MemberFlags::empty(),
            emits_changed: None,
            annotations: BTreeMap::new(),
            access_perm: None,
            timeout_ms: None,
            description: None,
        }
    }

    pub fn method(native_name: impl Into<String>) -> Self {
        Self::new(MemberRole::Method, native_name)
    }

    pub fn signal(native_name: impl Into<String>) -> Self {
        Self::new(MemberRole::Signal, native_name)
    }

    /// Property getter, e.g. `get_volume` for property `volume`.
    pub fn getter(native_name: impl Into<String>) -> Self {
        Self::new(MemberRole::Getter, native_name)
    }

    /// Property setter, e.g. `set_volume` for property `volume`.
    pub fn setter(native_name: impl Into<String>) -> Self {
        Self::new(MemberRole::Setter, native_name)
    }

    pub fn param<T: BusType>(self, name: impl Into<String>) -> Self {
        self.param_desc(name, T::descriptor())
    }

    pub fn param_desc(mut self, name: impl Into<String>, ty: Arc<TypeDescriptor>) -> Self {
        self.params.push(ParamDecl::new(Some(name.into()), ty));
        self
    }

    /// Parameter with its own signature override.
    pub fn param_as<T: BusType>(mut self, name: impl Into<String>, signature: impl Into<String>) -> Self {
        let mut param = ParamDecl::new(Some(name.into()), T::descriptor());
        param.signature = Some(signature.into());
        self.params.push(param);
        self
    }

    pub fn returns<T: BusType>(self) -> Self {
        self.returns_desc(T::descriptor())
    }

    /// Append a reply value.
    pub fn returns_desc(mut self, ty: Arc<TypeDescriptor>) -> Self {
        self.returns.push(ty);
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    pub fn reply_signature(mut self, signature: impl Into<String>) -> Self {
        self.reply_signature = Some(signature.into());
        self
    }

    pub fn flag(mut self, flag: MemberFlags) -> Self {
        self.flags = self.flags | flag;
        self
    }

    pub fn emits_changed(mut self, mode: EmitsChanged) -> Self {
        self.emits_changed = Some(mode);
        self
    }

    pub fn annotate(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(name.into(), value.into());
        self
    }

    pub fn access_perm(mut self, perm: impl Into<String>) -> Self {
        self.access_perm = Some(perm.into());
        self
    }

    pub fn timeout_ms(mut self, timeout: u32) -> Self {
        self.timeout_ms = Some(timeout);
        self
    }

    pub fn describe(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    /// Wire name: the override, else the native name with any accessor
    /// prefix removed.
    pub fn wire_name(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        if !self.role.is_accessor() {
            return self.native_name.clone();
        }
        let prefix = match self.role {
            MemberRole::Getter => "get",
            _ => "set",
        };
        match self.native_name.strip_prefix(prefix) {
            Some(rest) => {
                let rest = rest.strip_prefix('_').unwrap_or(rest);
                if rest.is_empty() {
                    self.native_name.clone()
                } else {
                    rest.to_owned()
                }
            }
            None => self.native_name.clone(),
        }
    }
}

/// A declared interface.
#[derive(Debug, Clone)]
pub struct InterfaceDecl {
    pub name: String,
    pub members: Vec<MemberDecl>,
    pub secure: SecurePolicy,
    pub announced: bool,
    pub annotations: BTreeMap<String, String>,
    pub description: Option<String>,
}

impl InterfaceDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
            secure: SecurePolicy::default(),
            announced: false,
            annotations: BTreeMap::new(),
            description: None,
        }
    }

    pub fn member(mut self, member: MemberDecl) -> Self {
        self.members.push(member);
        self
    }

    pub fn secure(mut self, policy: SecurePolicy) -> Self {
        self.secure = policy;
        self
    }

    pub fn announced(mut self, announced: bool) -> Self {
        self.announced = announced;
        self
    }

    pub fn annotate(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(name.into(), value.into());
        self
    }

    pub fn describe(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }
}
