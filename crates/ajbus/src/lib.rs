// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # ajbus - typed marshalling for D-Bus style message buses
//!
//! Converts native Rust values into typed argument trees ([`Arg`]) described
//! by D-Bus type signatures, and back. Also derives per-interface wire
//! contracts (member names plus input/output signatures) from declared
//! interfaces. The engine never does I/O: byte-level framing and transport
//! belong to the bus core that consumes the argument trees.
//!
//! ## Quick Start
//!
//! ```rust
//! use ajbus::{BusStruct, Marshaller, SignatureRegistry, Unmarshaller};
//!
//! #[derive(Debug, PartialEq, BusStruct)]
//! struct Foo {
//!     #[bus(position = 0)]
//!     a: i32,
//!     #[bus(position = 1)]
//!     b: String,
//! }
//!
//! let registry = SignatureRegistry::new();
//! assert_eq!(registry.signature_of::<Foo>().unwrap(), "(is)");
//!
//! let foo = Foo { a: 7, b: "x".into() };
//! let arg = Marshaller::new(&registry).marshal_typed(&foo).unwrap();
//! let back: Foo = Unmarshaller::new(&registry).unmarshal(&arg).unwrap();
//! assert_eq!(back, foo);
//! ```
//!
//! ## Pipeline
//!
//! ```text
//! native value --BusType--> Value --Marshaller--> Arg tree --> bus core
//! bus core --> Arg tree --Unmarshaller + TypeDescriptor--> Value --BusType--> native value
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Signature`] | Validated type signature |
//! | [`TypeSignatureCalculator`] | Signature of a native type, with overrides |
//! | [`SignatureRegistry`] | Concurrent per-type signature cache |
//! | [`Arg`] | Typed argument tree node |
//! | [`Marshaller`] / [`Unmarshaller`] | Value <-> `Arg` conversion |
//! | [`Variant`] | Self-describing value, lazily resolved when received |
//! | [`ContractDescriptor`] | Interface declarations -> member contracts |

// Allow the derive macros to expand to `::ajbus::` paths inside this crate
extern crate self as ajbus;

/// Argument tree model.
pub mod arg;
/// Type signature calculator.
pub mod calc;
/// Engine configuration (limits, registry sizing).
pub mod config;
/// Interface contracts (methods, signals, properties).
pub mod contract;
/// Native type descriptors.
pub mod descriptor;
/// Error taxonomy.
pub mod error;
/// Value marshaller.
pub mod marshal;
pub mod object_path;
/// Signature registry.
pub mod registry;
/// Signature grammar.
pub mod signature;
/// `BusType` trait and implementations for std types.
pub mod types;
/// Value unmarshaller.
pub mod unmarshal;
/// Native value model.
pub mod value;
pub mod variant;

pub use arg::Arg;
pub use calc::TypeSignatureCalculator;
pub use config::{ConfigError, EngineConfig};
pub use contract::{
    ContractDescriptor, InterfaceContract, InterfaceDecl, MemberContract, MemberDecl, MemberKind,
};
pub use descriptor::{FieldDescriptor, PrimitiveKind, StructBuilder, TypeDescriptor, TypeKind};
pub use error::{
    AnnotationError, Error, MarshalError, MarshalErrorKind, Result, SignatureMismatchError,
};
pub use marshal::Marshaller;
pub use object_path::ObjectPath;
pub use registry::{LookupStats, SignatureRegistry};
pub use signature::{SigType, Signature, SignatureError, SignatureLimits, TypeTag};
pub use types::BusType;
pub use unmarshal::Unmarshaller;
pub use value::Value;
pub use variant::Variant;

// Derive macros
pub use ajbus_codegen::{BusEnum, BusStruct};
