// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::missing_panics_doc)] // Tests panic on failure

//! Contract derivation with derived types and interface files.

use ajbus::contract::{AccessFlags, InterfaceSet, MemberFlags, SecurePolicy};
use ajbus::{
    AnnotationError, BusEnum, BusStruct, BusType, ContractDescriptor, EngineConfig, InterfaceDecl,
    MemberDecl, MemberKind, Marshaller, SignatureRegistry, Unmarshaller,
};
use std::io::Write;

#[derive(Debug, Clone, PartialEq, BusStruct)]
struct Track {
    #[bus(position = 0)]
    title: String,
    #[bus(position = 1, signature = "u")]
    length: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, BusEnum)]
#[bus(signature = "y")]
enum State {
    Stopped,
    Playing,
}

#[derive(Debug, Clone, Copy, PartialEq, BusEnum)]
enum Repeat {
    Off,
    One,
    All,
}

fn player() -> InterfaceDecl {
    InterfaceDecl::new("org.example.Player")
        .secure(SecurePolicy::Required)
        .announced(true)
        .member(
            MemberDecl::method("enqueue")
                .named("Enqueue")
                .param::<Vec<Track>>("tracks")
                .param::<bool>("front")
                .returns::<u32>(),
        )
        .member(
            MemberDecl::signal("StateChanged")
                .param::<State>("state")
                .flag(MemberFlags::SESSIONLESS),
        )
        .member(MemberDecl::getter("get_state").returns::<State>())
        .member(MemberDecl::getter("getRepeat").returns::<Repeat>().signature("q"))
        .member(MemberDecl::setter("setRepeat").param_as::<Repeat>("mode", "q"))
}

#[test]
fn derived_types_flow_into_contracts() {
    let registry = SignatureRegistry::new();
    let iface = ContractDescriptor::from_registry(&registry)
        .describe(&player())
        .expect("contract");

    assert_eq!(iface.secure, SecurePolicy::Required);
    assert!(iface.announced);

    let enqueue = iface.method("Enqueue").expect("Enqueue");
    assert_eq!(enqueue.input_signature, "a(su)b");
    assert_eq!(enqueue.output_signature, "u");

    let changed = iface.signal("StateChanged").expect("StateChanged");
    assert_eq!(changed.input_signature, "y");
    assert!(changed.flags.contains(MemberFlags::SESSIONLESS));

    let state = iface.property("state").expect("state");
    assert_eq!(state.access, AccessFlags::READ);
    assert_eq!(state.output_signature, "y");

    let repeat = iface.property("Repeat").expect("Repeat");
    assert_eq!(repeat.access, AccessFlags::READ_WRITE);
    assert_eq!(repeat.input_signature, "q");
    assert_eq!(iface.members_of(MemberKind::Property).count(), 2);
}

#[test]
fn contract_drives_a_call() {
    let registry = SignatureRegistry::new();
    let iface = ContractDescriptor::from_registry(&registry)
        .describe(&player())
        .expect("contract");
    let enqueue = iface.method("Enqueue").expect("Enqueue");

    let tracks = vec![Track {
        title: "intro".into(),
        length: 61,
    }];
    let args = enqueue
        .marshal_inputs(
            &Marshaller::new(&registry),
            &[tracks.to_value(), true.to_value()],
        )
        .expect("marshal");

    let values = enqueue
        .unmarshal_inputs(&Unmarshaller::new(&registry), &args)
        .expect("unmarshal");
    let mut values = values.into_iter();
    let received = Vec::<Track>::from_value(values.next().expect("tracks")).expect("tracks");
    assert_eq!(received, tracks);
    assert!(bool::from_value(values.next().expect("front")).expect("bool"));
}

#[test]
fn enum_without_signature_breaks_the_contract() {
    let decl = InterfaceDecl::new("org.example.Player")
        .member(MemberDecl::method("SetRepeat").param::<Repeat>("mode"));
    let err = ContractDescriptor::default().describe(&decl).unwrap_err();
    assert_eq!(
        err,
        AnnotationError::MissingEnumSignature {
            type_name: "Repeat".into()
        }
    );
}

#[test]
fn interface_file_with_custom_limits() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write!(
        file,
        r#"
[[interface]]
name = "org.example.Deep"

[[interface.method]]
name = "Shallow"
signature = "aai"

[[interface.method]]
name = "Deep"
signature = "aaai"
"#
    )
    .expect("write");

    let set = InterfaceSet::from_file(file.path()).expect("load");

    let config = EngineConfig::from_toml_str("max_array_depth = 2").expect("config");
    let err = set.to_decls(&config.limits()).unwrap_err();
    assert!(matches!(err, AnnotationError::MalformedOverride { ref target, .. } if target == "org.example.Deep.Deep"));

    let decls = set.to_decls(&EngineConfig::default().limits()).expect("decls");
    let contracts = ContractDescriptor::default()
        .describe_all(&decls)
        .expect("contracts");
    assert_eq!(contracts[0].method("Deep").expect("Deep").input_signature, "aaai");
}
