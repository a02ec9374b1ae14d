// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Interface contracts.
//!
//! [`ContractDescriptor`] turns an [`InterfaceDecl`] into an
//! [`InterfaceContract`]: one [`MemberContract`] per method, signal and
//! property, each carrying its wire name and input/output signatures. This
//! runs once per interface registration; the resulting contracts are what the
//! bus core publishes and dispatches on.
//!
//! ```
//! use ajbus::contract::{ContractDescriptor, InterfaceDecl, MemberDecl};
//!
//! let decl = InterfaceDecl::new("org.example.Echo")
//!     .member(MemberDecl::method("echo").param::<String>("text").returns::<String>())
//!     .member(MemberDecl::getter("get_count").returns::<u32>());
//!
//! let iface = ContractDescriptor::default().describe(&decl).unwrap();
//! let echo = iface.method("echo").unwrap();
//! assert_eq!(echo.input_signature, "s");
//! assert_eq!(iface.property("count").unwrap().output_signature, "u");
//! ```

mod decl;
mod dynamic;

#[cfg(test)]
mod tests;

pub use decl::{InterfaceDecl, MemberDecl, MemberRole, ParamDecl};
pub use dynamic::{InterfaceDef, InterfaceSet, MethodDef, PropertyDef, SignalDef};

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::ops::BitOr;
use std::sync::Arc;

use crate::arg::Arg;
use crate::calc::TypeSignatureCalculator;
use crate::descriptor::TypeDescriptor;
use crate::error::{AnnotationError, Error, MarshalError, MarshalErrorKind, Result};
use crate::marshal::Marshaller;
use crate::registry::SignatureRegistry;
use crate::signature::{SigType, Signature};
use crate::unmarshal::Unmarshaller;
use crate::value::Value;

/// Interface the bus core implements itself; never derived here.
pub const PROPERTIES_INTERFACE: &str = "org.freedesktop.DBus.Properties";

/// Annotation publishing a property's [`EmitsChanged`] mode.
pub const EMITS_CHANGED_ANNOTATION: &str = "org.freedesktop.DBus.Property.EmitsChangedSignal";

/// Kind of an interface member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Method,
    Signal,
    Property,
}

impl MemberKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Method => "method",
            Self::Signal => "signal",
            Self::Property => "property",
        }
    }
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Property access rights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct AccessFlags(pub u8);

impl AccessFlags {
    /// A getter exists
    pub const READ: Self = Self(0x01);

    /// A setter exists
    pub const WRITE: Self = Self(0x02);

    pub const READ_WRITE: Self = Self(0x03);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn contains(self, flag: Self) -> bool {
        (self.0 & flag.0) == flag.0 && flag.0 != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for AccessFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for AccessFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match (self.contains(Self::READ), self.contains(Self::WRITE)) {
            (true, true) => "readwrite",
            (true, false) => "read",
            (false, true) => "write",
            (false, false) => "-",
        };
        f.write_str(text)
    }
}

/// Member annotation flags handed to the bus core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct MemberFlags(pub u8);

impl MemberFlags {
    /// Method call expects no reply
    pub const NO_REPLY: Self = Self(0x01);

    pub const DEPRECATED: Self = Self(0x02);

    /// Signal goes to session members only
    pub const SESSIONCAST: Self = Self(0x04);

    pub const SESSIONLESS: Self = Self(0x08);

    pub const UNICAST: Self = Self(0x10);

    pub const GLOBAL_BROADCAST: Self = Self(0x20);

    const NAMES: [(Self, &'static str); 6] = [
        (Self::NO_REPLY, "no-reply"),
        (Self::DEPRECATED, "deprecated"),
        (Self::SESSIONCAST, "sessioncast"),
        (Self::SESSIONLESS, "sessionless"),
        (Self::UNICAST, "unicast"),
        (Self::GLOBAL_BROADCAST, "global-broadcast"),
    ];

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn contains(self, flag: Self) -> bool {
        (self.0 & flag.0) != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Flag from its textual name, as used in interface definition files.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::NAMES
            .iter()
            .find(|(_, n)| n.eq_ignore_ascii_case(name))
            .map(|(flag, _)| *flag)
    }

    /// Names of the set flags.
    pub fn names(self) -> Vec<&'static str> {
        Self::NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect()
    }
}

impl BitOr for MemberFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// How a property announces changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EmitsChanged {
    /// PropertiesChanged carries the new value
    True,
    /// PropertiesChanged lists the name only
    Invalidates,
    Const,
    False,
}

impl EmitsChanged {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::True => "true",
            Self::Invalidates => "invalidates",
            Self::Const => "const",
            Self::False => "false",
        }
    }
}

/// Interface security policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SecurePolicy {
    #[default]
    Inherit,
    Required,
    Off,
}

impl SecurePolicy {
    /// Parse the textual policy. Unknown values fall back to `Inherit`.
    pub fn from_annotation(text: &str) -> Self {
        match text.trim().to_ascii_lowercase().as_str() {
            "inherit" | "" => Self::Inherit,
            "required" | "true" => Self::Required,
            "off" | "false" => Self::Off,
            other => {
                log::warn!("[contract] unknown secure policy '{}', using inherit", other);
                Self::Inherit
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inherit => "inherit",
            Self::Required => "required",
            Self::Off => "off",
        }
    }
}

/// The wire contract of one member.
#[derive(Debug, Clone)]
pub struct MemberContract {
    pub interface: String,
    pub name: String,
    pub kind: MemberKind,
    /// Arguments of a call or signal; the value type of a property.
    pub input_signature: Signature,
    /// Reply of a call (empty for signals); the value type of a property.
    pub output_signature: Signature,
    pub access: AccessFlags,
    pub flags: MemberFlags,
    pub annotations: BTreeMap<String, String>,
    pub arg_names: Vec<String>,
    pub access_perm: Option<String>,
    pub timeout_ms: Option<u32>,
    pub description: Option<String>,
    inputs: Vec<Arc<TypeDescriptor>>,
    outputs: Vec<Arc<TypeDescriptor>>,
}

impl MemberContract {
    /// Native descriptors of the input arguments.
    pub fn inputs(&self) -> &[Arc<TypeDescriptor>] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Arc<TypeDescriptor>] {
        &self.outputs
    }

    pub fn marshal_inputs(&self, marshaller: &Marshaller<'_>, values: &[Value]) -> Result<Vec<Arg>> {
        marshaller.marshal_args(values, &self.input_signature)
    }

    pub fn marshal_outputs(&self, marshaller: &Marshaller<'_>, values: &[Value]) -> Result<Vec<Arg>> {
        marshaller.marshal_args(values, &self.output_signature)
    }

    /// Check received arguments against the input signature, then
    /// unmarshal them into the declared parameter types.
    pub fn unmarshal_inputs(&self, unmarshaller: &Unmarshaller<'_>, args: &[Arg]) -> Result<Vec<Value>> {
        receive(unmarshaller, args, &self.input_signature, &self.inputs)
    }

    pub fn unmarshal_outputs(&self, unmarshaller: &Unmarshaller<'_>, args: &[Arg]) -> Result<Vec<Value>> {
        receive(unmarshaller, args, &self.output_signature, &self.outputs)
    }
}

fn receive(
    unmarshaller: &Unmarshaller<'_>,
    args: &[Arg],
    signature: &Signature,
    params: &[Arc<TypeDescriptor>],
) -> Result<Vec<Value>> {
    let limits = unmarshaller.registry().limits();
    if args.len() == signature.len() {
        let types = signature.types().iter().zip(params);
        for (i, (arg, (ty, desc))) in args.iter().zip(types).enumerate() {
            if !arg.conforms_with(ty, limits) {
                let err = MarshalError::inbound(
                    arg.signature(),
                    arg.tag(),
                    desc.name.as_str(),
                    MarshalErrorKind::TypeMismatch,
                );
                return Err(Error::from(err).within(i));
            }
        }
    }
    unmarshaller.unmarshal_args(args, params)
}

/// Derived contracts of one interface.
#[derive(Debug, Clone)]
pub struct InterfaceContract {
    pub name: String,
    pub members: Vec<MemberContract>,
    pub secure: SecurePolicy,
    pub announced: bool,
    pub annotations: BTreeMap<String, String>,
    pub description: Option<String>,
}

impl InterfaceContract {
    pub fn find(&self, kind: MemberKind, name: &str) -> Option<&MemberContract> {
        self.members.iter().find(|m| m.kind == kind && m.name == name)
    }

    pub fn method(&self, name: &str) -> Option<&MemberContract> {
        self.find(MemberKind::Method, name)
    }

    pub fn signal(&self, name: &str) -> Option<&MemberContract> {
        self.find(MemberKind::Signal, name)
    }

    pub fn property(&self, name: &str) -> Option<&MemberContract> {
        self.find(MemberKind::Property, name)
    }

    pub fn members_of(&self, kind: MemberKind) -> impl Iterator<Item = &MemberContract> {
        self.members.iter().filter(move |m| m.kind == kind)
    }
}

/// Derives [`InterfaceContract`]s from declarations.
#[derive(Debug, Clone, Default)]
pub struct ContractDescriptor {
    calc: TypeSignatureCalculator,
}

/// A property under construction, merged from its accessors.
struct PropertyParts {
    name: String,
    ty: SigType,
    desc: Arc<TypeDescriptor>,
    access: AccessFlags,
    flags: MemberFlags,
    emits_changed: Option<EmitsChanged>,
    annotations: BTreeMap<String, String>,
    access_perm: Option<String>,
    timeout_ms: Option<u32>,
    description: Option<String>,
}

enum Slot {
    Member(MemberContract),
    Property(PropertyParts),
}

impl ContractDescriptor {
    pub fn new(calc: TypeSignatureCalculator) -> Self {
        Self { calc }
    }

    /// Descriptor using the registry's limits.
    pub fn from_registry(registry: &SignatureRegistry) -> Self {
        Self::new(registry.calculator().clone())
    }

    pub fn calculator(&self) -> &TypeSignatureCalculator {
        &self.calc
    }

    /// Derive every member contract of `decl`.
    ///
    /// Members keep declaration order; a property sits where its first
    /// accessor was declared.
    pub fn describe(&self, decl: &InterfaceDecl) -> std::result::Result<InterfaceContract, AnnotationError> {
        log::debug!(
            "[contract] deriving {} ({} declared members)",
            decl.name,
            decl.members.len()
        );

        let mut slots: Vec<Slot> = Vec::with_capacity(decl.members.len());
        let mut properties: HashMap<String, usize> = HashMap::new();
        let mut seen: HashSet<(MemberKind, String)> = HashSet::new();

        for member in &decl.members {
            let name = member.wire_name();
            match member.role {
                MemberRole::Method | MemberRole::Signal => {
                    let kind = if member.role == MemberRole::Method {
                        MemberKind::Method
                    } else {
                        MemberKind::Signal
                    };
                    if !seen.insert((kind, name.clone())) {
                        return Err(AnnotationError::DuplicateMember {
                            interface: decl.name.clone(),
                            kind: kind.as_str(),
                            name,
                        });
                    }
                    slots.push(Slot::Member(self.operation(decl, member, kind, name)?));
                }
                MemberRole::Getter | MemberRole::Setter => {
                    let (ty, desc) = self.accessor(decl, member)?;
                    match properties.get(&name) {
                        Some(&index) => {
                            if let Slot::Property(parts) = &mut slots[index] {
                                merge_accessor(decl, parts, member, ty)?;
                            }
                        }
                        None => {
                            properties.insert(name.clone(), slots.len());
                            slots.push(Slot::Property(PropertyParts {
                                name,
                                ty,
                                desc,
                                access: access_of(member.role),
                                flags: member.flags,
                                emits_changed: member.emits_changed,
                                annotations: member.annotations.clone(),
                                access_perm: member.access_perm.clone(),
                                timeout_ms: member.timeout_ms,
                                description: member.description.clone(),
                            }));
                        }
                    }
                }
            }
        }

        let members = slots
            .into_iter()
            .map(|slot| match slot {
                Slot::Member(contract) => Ok(contract),
                Slot::Property(parts) => self.property(decl, parts),
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(InterfaceContract {
            name: decl.name.clone(),
            members,
            secure: decl.secure,
            announced: decl.announced,
            annotations: decl.annotations.clone(),
            description: decl.description.clone(),
        })
    }

    /// Derive contracts for several interfaces, skipping the standard
    /// properties interface.
    pub fn describe_all(
        &self,
        decls: &[InterfaceDecl],
    ) -> std::result::Result<Vec<InterfaceContract>, AnnotationError> {
        decls
            .iter()
            .filter(|decl| {
                let skip = decl.name == PROPERTIES_INTERFACE;
                if skip {
                    log::warn!("[contract] skipping {}, handled by the bus core", decl.name);
                }
                !skip
            })
            .map(|decl| self.describe(decl))
            .collect()
    }

    fn operation(
        &self,
        decl: &InterfaceDecl,
        member: &MemberDecl,
        kind: MemberKind,
        name: String,
    ) -> std::result::Result<MemberContract, AnnotationError> {
        if kind == MemberKind::Signal && (!member.returns.is_empty() || member.reply_signature.is_some()) {
            return Err(AnnotationError::SignalWithReply {
                interface: decl.name.clone(),
                signal: name,
            });
        }
        let target = format!("{}.{}", decl.name, name);

        let params: Vec<_> = member
            .params
            .iter()
            .map(|p| (p.ty.as_ref(), p.signature.as_deref()))
            .collect();
        let input_signature = self.list_signature(&target, &params, member.signature.as_deref())?;

        let outputs = member.returns.clone();
        let returns: Vec<_> = outputs.iter().map(|d| (d.as_ref(), None)).collect();
        let output_signature =
            self.list_signature(&target, &returns, member.reply_signature.as_deref())?;

        log::debug!(
            "[contract] {} {} in='{}' out='{}'",
            kind,
            target,
            input_signature,
            output_signature
        );

        Ok(MemberContract {
            interface: decl.name.clone(),
            name,
            kind,
            input_signature,
            output_signature,
            access: AccessFlags::empty(),
            flags: member.flags,
            annotations: member.annotations.clone(),
            arg_names: member
                .params
                .iter()
                .map(|p| p.name.clone().unwrap_or_default())
                .collect(),
            access_perm: member.access_perm.clone(),
            timeout_ms: member.timeout_ms,
            description: member.description.clone(),
            inputs: member.params.iter().map(|p| p.ty.clone()).collect(),
            outputs,
        })
    }

    /// Signature of a parameter list. A whole-list override must split into
    /// one complete type per parameter.
    fn list_signature(
        &self,
        target: &str,
        params: &[(&TypeDescriptor, Option<&str>)],
        whole: Option<&str>,
    ) -> std::result::Result<Signature, AnnotationError> {
        let types = match whole {
            Some(text) => {
                let sig = Signature::parse_with(text, self.calc.limits()).map_err(|source| {
                    AnnotationError::MalformedOverride {
                        target: target.to_owned(),
                        signature: text.to_owned(),
                        source,
                    }
                })?;
                if sig.len() != params.len() {
                    return Err(AnnotationError::OverrideArity {
                        member: target.to_owned(),
                        signature: text.to_owned(),
                        expected: params.len(),
                        found: sig.len(),
                    });
                }
                params
                    .iter()
                    .zip(sig.split())
                    .map(|((desc, _), part)| self.calc.sig_type(desc, Some(part.as_str())))
                    .collect::<std::result::Result<Vec<_>, _>>()?
            }
            None => params
                .iter()
                .map(|(desc, own)| self.calc.sig_type(desc, *own))
                .collect::<std::result::Result<Vec<_>, _>>()?,
        };
        self.calc.finish(target, types)
    }

    /// Property type of one accessor, after checking its shape.
    fn accessor(
        &self,
        decl: &InterfaceDecl,
        member: &MemberDecl,
    ) -> std::result::Result<(SigType, Arc<TypeDescriptor>), AnnotationError> {
        let bad = |reason| AnnotationError::BadAccessor {
            interface: decl.name.clone(),
            member: member.native_name.clone(),
            reason,
        };
        let (desc, own) = if member.role == MemberRole::Getter {
            if !member.params.is_empty() {
                return Err(bad("a getter takes no parameters"));
            }
            let [returns] = member.returns.as_slice() else {
                return Err(bad("a getter returns exactly one value"));
            };
            (returns.clone(), member.reply_signature.as_deref())
        } else {
            if !member.returns.is_empty() {
                return Err(bad("a setter cannot return a value"));
            }
            let [param] = member.params.as_slice() else {
                return Err(bad("a setter takes exactly one parameter"));
            };
            (param.ty.clone(), param.signature.as_deref())
        };
        let ty = self.calc.sig_type(&desc, member.signature.as_deref().or(own))?;
        Ok((ty, desc))
    }

    fn property(
        &self,
        decl: &InterfaceDecl,
        parts: PropertyParts,
    ) -> std::result::Result<MemberContract, AnnotationError> {
        let target = format!("{}.{}", decl.name, parts.name);
        let signature = self.calc.finish(&target, vec![parts.ty])?;
        let mut annotations = parts.annotations;
        if let Some(mode) = parts.emits_changed {
            annotations.insert(EMITS_CHANGED_ANNOTATION.to_owned(), mode.as_str().to_owned());
        }
        log::debug!(
            "[contract] property {} '{}' {}",
            target,
            signature,
            parts.access
        );
        Ok(MemberContract {
            interface: decl.name.clone(),
            name: parts.name,
            kind: MemberKind::Property,
            input_signature: signature.clone(),
            output_signature: signature,
            access: parts.access,
            flags: parts.flags,
            annotations,
            arg_names: Vec::new(),
            access_perm: parts.access_perm,
            timeout_ms: parts.timeout_ms,
            description: parts.description,
            inputs: vec![parts.desc.clone()],
            outputs: vec![parts.desc],
        })
    }
}

fn access_of(role: MemberRole) -> AccessFlags {
    if role == MemberRole::Getter {
        AccessFlags::READ
    } else {
        AccessFlags::WRITE
    }
}

/// Fold a second accessor into a property; getter and setter must agree.
fn merge_accessor(
    decl: &InterfaceDecl,
    parts: &mut PropertyParts,
    member: &MemberDecl,
    ty: SigType,
) -> std::result::Result<(), AnnotationError> {
    let access = access_of(member.role);
    if parts.access.contains(access) {
        return Err(AnnotationError::DuplicateMember {
            interface: decl.name.clone(),
            kind: MemberKind::Property.as_str(),
            name: parts.name.clone(),
        });
    }
    if parts.ty != ty {
        let (getter, setter) = if member.role == MemberRole::Getter {
            (ty.to_string(), parts.ty.to_string())
        } else {
            (parts.ty.to_string(), ty.to_string())
        };
        return Err(AnnotationError::PropertySignatureMismatch {
            interface: decl.name.clone(),
            property: parts.name.clone(),
            getter,
            setter,
        });
    }
    parts.access = parts.access | access;
    parts.flags = parts.flags | member.flags;
    parts.emits_changed = parts.emits_changed.or(member.emits_changed);
    for (key, value) in &member.annotations {
        parts.annotations.entry(key.clone()).or_insert_with(|| value.clone());
    }
    if parts.access_perm.is_none() {
        parts.access_perm = member.access_perm.clone();
    }
    parts.timeout_ms = parts.timeout_ms.or(member.timeout_ms);
    if parts.description.is_none() {
        parts.description = member.description.clone();
    }
    Ok(())
}
