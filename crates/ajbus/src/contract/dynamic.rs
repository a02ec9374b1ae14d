// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Interfaces defined at runtime by wire signature.
//!
//! An [`InterfaceSet`] is usually loaded from TOML:
//!
//! ```toml
//! [[interface]]
//! name = "org.example.Player"
//! secure = "required"
//!
//! [[interface.method]]
//! name = "Play"
//! signature = "su"
//! reply = "b"
//! args = ["uri", "offset"]
//!
//! [[interface.signal]]
//! name = "Stopped"
//! signature = "u"
//! flags = ["sessionless"]
//!
//! [[interface.property]]
//! name = "Volume"
//! signature = "q"
//! access = "readwrite"
//! emits_changed = "true"
//! ```
//!
//! Parameter types are synthesized from the signatures, so every member
//! travels exactly as declared.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use super::{EmitsChanged, InterfaceDecl, MemberDecl, MemberFlags, SecurePolicy};
use crate::config::ConfigError;
use crate::descriptor::TypeDescriptor;
use crate::error::AnnotationError;
use crate::signature::{Signature, SignatureLimits};

/// A list of dynamic interfaces.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InterfaceSet {
    #[serde(rename = "interface", default)]
    pub interfaces: Vec<InterfaceDef>,
}

impl InterfaceSet {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let set: Self = toml::from_str(content)?;
        for iface in &set.interfaces {
            if iface.name.is_empty() {
                return Err(ConfigError::Invalid("interface without a name".into()));
            }
        }
        Ok(set)
    }

    /// Declarations for every interface in the set.
    pub fn to_decls(&self, limits: &SignatureLimits) -> Result<Vec<InterfaceDecl>, AnnotationError> {
        self.interfaces.iter().map(|i| i.to_decl(limits)).collect()
    }
}

/// One dynamic interface.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InterfaceDef {
    pub name: String,
    /// `inherit`, `required` or `off`.
    #[serde(default)]
    pub secure: Option<String>,
    #[serde(default)]
    pub announced: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    #[serde(rename = "method", default)]
    pub methods: Vec<MethodDef>,
    #[serde(rename = "signal", default)]
    pub signals: Vec<SignalDef>,
    #[serde(rename = "property", default)]
    pub properties: Vec<PropertyDef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MethodDef {
    pub name: String,
    #[serde(default)]
    pub signature: String,
    #[serde(default)]
    pub reply: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub flags: Vec<String>,
    #[serde(default)]
    pub timeout_ms: Option<u32>,
    #[serde(default)]
    pub access_perm: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignalDef {
    pub name: String,
    #[serde(default)]
    pub signature: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub flags: Vec<String>,
    #[serde(default)]
    pub access_perm: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PropertyDef {
    pub name: String,
    pub signature: String,
    /// `read`, `write` or `readwrite`.
    #[serde(default = "default_access")]
    pub access: String,
    #[serde(default)]
    pub emits_changed: Option<EmitsChanged>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

fn default_access() -> String {
    "readwrite".to_string()
}

impl InterfaceDef {
    /// Build the declaration; descriptors come from the signatures.
    pub fn to_decl(&self, limits: &SignatureLimits) -> Result<InterfaceDecl, AnnotationError> {
        let mut decl = InterfaceDecl::new(&self.name).announced(self.announced);
        if let Some(policy) = &self.secure {
            decl = decl.secure(SecurePolicy::from_annotation(policy));
        }
        decl.annotations = self.annotations.clone();
        decl.description = self.description.clone();

        for def in &self.methods {
            let mut member = MemberDecl::method(&def.name);
            for (i, desc) in self.descriptors(&def.name, &def.signature, limits)?.into_iter().enumerate() {
                member = member.param_desc(arg_name(&def.args, i), desc);
            }
            for desc in self.descriptors(&def.name, &def.reply, limits)? {
                member = member.returns_desc(desc);
            }
            member.flags = flags(&def.flags);
            member.timeout_ms = def.timeout_ms;
            member.access_perm = def.access_perm.clone();
            member.description = def.description.clone();
            member.annotations = def.annotations.clone();
            decl = decl.member(member);
        }

        for def in &self.signals {
            let mut member = MemberDecl::signal(&def.name);
            for (i, desc) in self.descriptors(&def.name, &def.signature, limits)?.into_iter().enumerate() {
                member = member.param_desc(arg_name(&def.args, i), desc);
            }
            member.flags = flags(&def.flags);
            member.access_perm = def.access_perm.clone();
            member.description = def.description.clone();
            member.annotations = def.annotations.clone();
            decl = decl.member(member);
        }

        for def in &self.properties {
            let descs = self.descriptors(&def.name, &def.signature, limits)?;
            let [desc] = descs.as_slice() else {
                return Err(AnnotationError::OverrideArity {
                    member: format!("{}.{}", self.name, def.name),
                    signature: def.signature.clone(),
                    expected: 1,
                    found: descs.len(),
                });
            };
            let (read, write) = match def.access.to_ascii_lowercase().as_str() {
                "read" => (true, false),
                "write" => (false, true),
                "readwrite" | "rw" => (true, true),
                other => {
                    log::warn!(
                        "[contract] property {}.{} has unknown access '{}', using readwrite",
                        self.name,
                        def.name,
                        other
                    );
                    (true, true)
                }
            };
            let mut accessors = Vec::new();
            if read {
                accessors.push(MemberDecl::getter(&def.name).returns_desc(desc.clone()));
            }
            if write {
                accessors.push(MemberDecl::setter(&def.name).param_desc("value", desc.clone()));
            }
            for mut accessor in accessors {
                accessor.name = Some(def.name.clone());
                accessor.emits_changed = def.emits_changed;
                accessor.description = def.description.clone();
                accessor.annotations = def.annotations.clone();
                decl = decl.member(accessor);
            }
        }

        Ok(decl)
    }

    fn descriptors(
        &self,
        member: &str,
        text: &str,
        limits: &SignatureLimits,
    ) -> Result<Vec<Arc<TypeDescriptor>>, AnnotationError> {
        let sig = Signature::parse_with(text, limits).map_err(|source| {
            AnnotationError::MalformedOverride {
                target: format!("{}.{}", self.name, member),
                signature: text.to_owned(),
                source,
            }
        })?;
        Ok(sig
            .types()
            .iter()
            .map(|ty| Arc::new(TypeDescriptor::from_signature(ty)))
            .collect())
    }
}

fn arg_name(names: &[String], index: usize) -> String {
    names
        .get(index)
        .cloned()
        .unwrap_or_else(|| format!("arg{}", index))
}

fn flags(names: &[String]) -> MemberFlags {
    names.iter().fold(MemberFlags::empty(), |acc, name| {
        match MemberFlags::from_name(name) {
            Some(flag) => acc | flag,
            None => {
                log::warn!("[contract] ignoring unknown member flag '{}'", name);
                acc
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{AccessFlags, ContractDescriptor, MemberKind, EMITS_CHANGED_ANNOTATION};

    const PLAYER: &str = r#"
[[interface]]
name = "org.example.Player"
secure = "required"
announced = true

[[interface.method]]
name = "Play"
signature = "su"
reply = "b"
args = ["uri"]
timeout_ms = 2500

[[interface.method]]
name = "Queue"
signature = "a(sa{sv})"

[[interface.signal]]
name = "Stopped"
signature = "u"
flags = ["sessionless", "bogus"]

[[interface.property]]
name = "Volume"
signature = "q"
emits_changed = "invalidates"

[[interface.property]]
name = "Track"
signature = "s"
access = "read"
"#;

    #[test]
    fn toml_interfaces_derive_exact_signatures() {
        let set = InterfaceSet::from_toml_str(PLAYER).expect("parse");
        let decls = set.to_decls(&SignatureLimits::default()).expect("decls");
        let iface = ContractDescriptor::default().describe(&decls[0]).expect("contract");

        assert_eq!(iface.secure, SecurePolicy::Required);
        assert!(iface.announced);

        let play = iface.method("Play").expect("Play");
        assert_eq!(play.input_signature, "su");
        assert_eq!(play.output_signature, "b");
        assert_eq!(play.arg_names, vec!["uri".to_string(), "arg1".to_string()]);
        assert_eq!(play.timeout_ms, Some(2500));

        assert_eq!(iface.method("Queue").expect("Queue").input_signature, "a(sa{sv})");

        let stopped = iface.signal("Stopped").expect("Stopped");
        assert_eq!(stopped.flags, MemberFlags::SESSIONLESS);
        assert!(stopped.output_signature.is_empty());

        let volume = iface.property("Volume").expect("Volume");
        assert_eq!(volume.access, AccessFlags::READ_WRITE);
        assert_eq!(
            volume.annotations.get(EMITS_CHANGED_ANNOTATION).map(String::as_str),
            Some("invalidates")
        );
        assert_eq!(iface.property("Track").expect("Track").access, AccessFlags::READ);
        assert_eq!(iface.members_of(MemberKind::Property).count(), 2);
    }

    #[test]
    fn malformed_signature_names_the_member() {
        let def = InterfaceDef {
            name: "org.example.Bad".into(),
            methods: vec![MethodDef {
                name: "Broken".into(),
                signature: "a{vs}".into(),
                ..MethodDef::default()
            }],
            ..InterfaceDef::default()
        };
        let err = def.to_decl(&SignatureLimits::default()).unwrap_err();
        assert!(matches!(
            err,
            AnnotationError::MalformedOverride { ref target, .. } if target == "org.example.Bad.Broken"
        ));
    }

    #[test]
    fn property_needs_one_complete_type() {
        let def = InterfaceDef {
            name: "org.example.Bad".into(),
            properties: vec![PropertyDef {
                name: "Pair".into(),
                signature: "ii".into(),
                access: default_access(),
                ..PropertyDef::default()
            }],
            ..InterfaceDef::default()
        };
        assert!(matches!(
            def.to_decl(&SignatureLimits::default()),
            Err(AnnotationError::OverrideArity { found: 2, .. })
        ));
    }

    #[test]
    fn unnamed_interfaces_are_rejected() {
        let err = InterfaceSet::from_toml_str("[[interface]]\nname = \"\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
