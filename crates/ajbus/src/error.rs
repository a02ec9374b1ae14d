// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error taxonomy.
//!
//! - [`AnnotationError`]: a type or interface declaration is inconsistent.
//!   Raised while computing signatures or contracts, before any value is
//!   touched. Not retryable; the declaration has to be fixed.
//! - [`MarshalError`]: a value did not fit its signature (outbound) or a
//!   received node did not fit the requested native type (inbound).
//! - [`SignatureMismatchError`]: an argument list has the wrong length.
//! - [`SignatureError`]: a signature string violates the grammar or limits.

use std::fmt;

use crate::signature::{SignatureError, TypeTag};

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Annotation(#[from] AnnotationError),
    #[error(transparent)]
    Marshal(#[from] MarshalError),
    #[error(transparent)]
    SignatureMismatch(#[from] SignatureMismatchError),
    #[error("bad signature: {0}")]
    Signature(#[from] SignatureError),
    #[error(transparent)]
    ObjectPath(#[from] InvalidObjectPath),
}

impl Error {
    /// True when the failure comes from a broken declaration rather than
    /// from the data being marshalled.
    pub fn is_contract_error(&self) -> bool {
        matches!(self, Self::Annotation(_))
    }

    pub fn as_marshal(&self) -> Option<&MarshalError> {
        match self {
            Self::Marshal(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_annotation(&self) -> Option<&AnnotationError> {
        match self {
            Self::Annotation(e) => Some(e),
            _ => None,
        }
    }

    /// Record the enclosing member index on a nested marshal failure.
    pub(crate) fn within(self, index: usize) -> Self {
        match self {
            Self::Marshal(e) => Self::Marshal(e.within(index)),
            other => other,
        }
    }
}

/// Static declaration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnnotationError {
    #[error("field '{field}' of {type_name} has no position")]
    MissingFieldPosition { type_name: String, field: String },
    #[error("position {position} is used twice in {type_name}")]
    DuplicateFieldPosition { type_name: String, position: u32 },
    #[error("positions of {type_name} are not contiguous: {missing} is missing")]
    FieldPositionGap { type_name: String, missing: u32 },
    #[error("{type_name} has no fields")]
    EmptyStruct { type_name: String },
    #[error("enum {type_name} needs an explicit integer signature")]
    MissingEnumSignature { type_name: String },
    #[error("enum {type_name} cannot use signature '{signature}', only integer tags")]
    EnumSignatureNotInteger { type_name: String, signature: String },
    #[error("{type_name} uses '{key_signature}' as a dictionary key, keys must be basic types")]
    ContainerDictKey {
        type_name: String,
        key_signature: String,
    },
    #[error("signature '{signature}' cannot describe {type_name}")]
    IncompatibleOverride { type_name: String, signature: String },
    #[error("malformed signature '{signature}' on {target}: {source}")]
    MalformedOverride {
        target: String,
        signature: String,
        #[source]
        source: SignatureError,
    },
    #[error("signature '{signature}' of {member} has {found} types for {expected} parameters")]
    OverrideArity {
        member: String,
        signature: String,
        expected: usize,
        found: usize,
    },
    #[error("{interface} declares {kind} '{name}' more than once")]
    DuplicateMember {
        interface: String,
        kind: &'static str,
        name: String,
    },
    #[error("property {interface}.{property} getter is '{getter}' but setter is '{setter}'")]
    PropertySignatureMismatch {
        interface: String,
        property: String,
        getter: String,
        setter: String,
    },
    #[error("accessor {interface}.{member}: {reason}")]
    BadAccessor {
        interface: String,
        member: String,
        reason: &'static str,
    },
    #[error("signal {interface}.{signal} cannot declare a return value")]
    SignalWithReply { interface: String, signal: String },
    #[error("{target} produces an invalid signature: {source}")]
    SignatureLimit {
        target: String,
        #[source]
        source: SignatureError,
    },
}

/// Why a value and a signature did not fit.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MarshalErrorKind {
    #[error("null value")]
    Null,
    #[error("value shape does not fit")]
    TypeMismatch,
    #[error("expected {expected} members, found {found}")]
    MemberCount { expected: usize, found: usize },
    #[error("ordinal {ordinal} is out of range for {variants} variants")]
    EnumOutOfRange { ordinal: i128, variants: usize },
    #[error("element does not fit '{element}'")]
    ElementTypeMismatch { element: String },
    #[error("{value} is out of range for the wire type")]
    OutOfRange { value: String },
    #[error("'{0}' is not a valid object path")]
    InvalidObjectPath(String),
    #[error("'{0}' is not a valid signature")]
    InvalidSignature(String),
    #[error("nesting exceeds {limit} levels")]
    DepthExceeded { limit: usize },
    #[error("signature is not a single complete type")]
    NotSingle,
}

/// A value/signature fit failure.
///
/// `node_tag` is set for inbound (unmarshal) failures, where the wire side
/// is a received node; outbound failures leave it empty.
#[derive(Debug, Clone, PartialEq)]
pub struct MarshalError {
    pub signature: String,
    pub native_type: String,
    pub node_tag: Option<TypeTag>,
    pub kind: MarshalErrorKind,
    /// Member indices from the outermost value down to the failing one.
    pub path: Vec<usize>,
}

impl MarshalError {
    pub(crate) fn outbound(
        signature: impl fmt::Display,
        native_type: impl Into<String>,
        kind: MarshalErrorKind,
    ) -> Self {
        Self {
            signature: signature.to_string(),
            native_type: native_type.into(),
            node_tag: None,
            kind,
            path: Vec::new(),
        }
    }

    pub(crate) fn inbound(
        signature: impl fmt::Display,
        node_tag: TypeTag,
        native_type: impl Into<String>,
        kind: MarshalErrorKind,
    ) -> Self {
        Self {
            signature: signature.to_string(),
            native_type: native_type.into(),
            node_tag: Some(node_tag),
            kind,
            path: Vec::new(),
        }
    }

    pub(crate) fn within(mut self, index: usize) -> Self {
        self.path.insert(0, index);
        self
    }
}

impl fmt::Display for MarshalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node_tag {
            None => write!(
                f,
                "cannot marshal {} into '{}'",
                self.native_type, self.signature
            )?,
            Some(tag) => write!(
                f,
                "cannot unmarshal '{}' ({}) into {}",
                self.signature, tag, self.native_type
            )?,
        }
        if !self.path.is_empty() {
            let path: Vec<String> = self.path.iter().map(ToString::to_string).collect();
            write!(f, " at member {}", path.join("."))?;
        }
        write!(f, ": {}", self.kind)
    }
}

impl std::error::Error for MarshalError {}

/// Argument count differs from the declared parameter count.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot marshal {found} args into {expected} parameters of '{signature}'")]
pub struct SignatureMismatchError {
    pub signature: String,
    pub expected: usize,
    pub found: usize,
}

/// Object path syntax violation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a valid object path")]
pub struct InvalidObjectPath(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marshal_error_message_names_both_sides() {
        let err = MarshalError::outbound("s", "i32", MarshalErrorKind::TypeMismatch);
        assert_eq!(
            err.to_string(),
            "cannot marshal i32 into 's': value shape does not fit"
        );

        let nested = MarshalError::inbound(
            "u",
            TypeTag::UInt32,
            "Color",
            MarshalErrorKind::EnumOutOfRange {
                ordinal: 9,
                variants: 3,
            },
        )
        .within(2)
        .within(0);
        assert_eq!(nested.path, vec![0, 2]);
        assert_eq!(
            nested.to_string(),
            "cannot unmarshal 'u' (u) into Color at member 0.2: ordinal 9 is out of range for 3 variants"
        );
    }

    #[test]
    fn contract_errors_are_classified() {
        let err: Error = AnnotationError::MissingEnumSignature {
            type_name: "Color".into(),
        }
        .into();
        assert!(err.is_contract_error());
        assert!(err.as_annotation().is_some());

        let err: Error = SignatureMismatchError {
            signature: "is".into(),
            expected: 2,
            found: 3,
        }
        .into();
        assert!(!err.is_contract_error());
        assert_eq!(
            err.to_string(),
            "cannot marshal 3 args into 2 parameters of 'is'"
        );
    }
}
