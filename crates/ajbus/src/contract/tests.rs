// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::*;
use crate::descriptor::TypeDescriptor;
use crate::registry::SignatureRegistry;
use crate::variant::Variant;

fn describe(decl: InterfaceDecl) -> std::result::Result<InterfaceContract, AnnotationError> {
    ContractDescriptor::default().describe(&decl)
}

fn mode() -> Arc<TypeDescriptor> {
    Arc::new(TypeDescriptor::enumeration(
        "Mode",
        vec!["Off".into(), "On".into()],
        None,
    ))
}

#[test]
fn method_contract_carries_signatures_and_metadata() {
    let iface = describe(
        InterfaceDecl::new("org.example.Store")
            .member(
                MemberDecl::method("put")
                    .param::<String>("key")
                    .param::<Vec<u8>>("data")
                    .returns::<bool>()
                    .flag(MemberFlags::DEPRECATED)
                    .access_perm("store.write")
                    .timeout_ms(1000)
                    .annotate("org.example.Note", "x"),
            )
            .member(MemberDecl::method("dump").returns::<std::collections::HashMap<String, Variant>>()),
    )
    .expect("contract");

    let put = iface.method("put").expect("put");
    assert_eq!(put.kind, MemberKind::Method);
    assert_eq!(put.input_signature, "say");
    assert_eq!(put.output_signature, "b");
    assert_eq!(put.arg_names, vec!["key".to_string(), "data".to_string()]);
    assert!(put.flags.contains(MemberFlags::DEPRECATED));
    assert!(!put.flags.contains(MemberFlags::NO_REPLY));
    assert_eq!(put.access_perm.as_deref(), Some("store.write"));
    assert_eq!(put.timeout_ms, Some(1000));
    assert_eq!(put.annotations["org.example.Note"], "x");
    assert!(put.access.is_empty());

    let dump = iface.method("dump").expect("dump");
    assert!(dump.input_signature.is_empty());
    assert_eq!(dump.output_signature, "a{sv}");
}

#[test]
fn name_override_wins() {
    let iface = describe(
        InterfaceDecl::new("org.example.A")
            .member(MemberDecl::method("do_it").named("DoIt"))
            .member(MemberDecl::getter("get_level").named("Lvl").returns::<i32>()),
    )
    .expect("contract");
    assert!(iface.method("DoIt").is_some());
    assert!(iface.method("do_it").is_none());
    assert!(iface.property("Lvl").is_some());
}

#[test]
fn duplicate_names_within_a_kind_are_rejected() {
    let err = describe(
        InterfaceDecl::new("org.example.A")
            .member(MemberDecl::method("Ping"))
            .member(MemberDecl::method("ping").named("Ping")),
    )
    .unwrap_err();
    assert_eq!(
        err,
        AnnotationError::DuplicateMember {
            interface: "org.example.A".into(),
            kind: "method",
            name: "Ping".into(),
        }
    );

    let err = describe(
        InterfaceDecl::new("org.example.A")
            .member(MemberDecl::getter("get_x").returns::<i32>())
            .member(MemberDecl::getter("getx").returns::<i32>()),
    )
    .unwrap_err();
    assert!(matches!(err, AnnotationError::DuplicateMember { kind: "property", .. }));
}

#[test]
fn same_name_in_different_kinds_is_fine() {
    let iface = describe(
        InterfaceDecl::new("org.example.A")
            .member(MemberDecl::method("Changed"))
            .member(MemberDecl::signal("Changed").param::<u32>("n")),
    )
    .expect("contract");
    assert_eq!(iface.members.len(), 2);
    assert_eq!(iface.signal("Changed").expect("signal").input_signature, "u");
}

#[test]
fn property_accessors_merge_into_one_member() {
    let iface = describe(
        InterfaceDecl::new("org.example.A")
            .member(MemberDecl::method("Reset"))
            .member(
                MemberDecl::getter("get_volume")
                    .returns::<u16>()
                    .emits_changed(EmitsChanged::True),
            )
            .member(MemberDecl::setter("set_volume").param::<u16>("v")),
    )
    .expect("contract");

    assert_eq!(iface.members.len(), 2);
    let volume = iface.property("volume").expect("volume");
    assert_eq!(volume.input_signature, "q");
    assert_eq!(volume.output_signature, "q");
    assert_eq!(volume.access, AccessFlags::READ_WRITE);
    assert_eq!(volume.access.to_string(), "readwrite");
    assert_eq!(volume.annotations[EMITS_CHANGED_ANNOTATION], "true");
    assert_eq!(volume.inputs().len(), 1);
}

#[test]
fn accessor_signatures_must_agree() {
    let err = describe(
        InterfaceDecl::new("org.example.A")
            .member(MemberDecl::getter("get_level").returns::<i32>())
            .member(MemberDecl::setter("set_level").param::<String>("v")),
    )
    .unwrap_err();
    assert_eq!(
        err,
        AnnotationError::PropertySignatureMismatch {
            interface: "org.example.A".into(),
            property: "level".into(),
            getter: "i".into(),
            setter: "s".into(),
        }
    );

    // An override can reconcile the two.
    let iface = describe(
        InterfaceDecl::new("org.example.A")
            .member(MemberDecl::getter("get_level").returns::<i32>().signature("u"))
            .member(MemberDecl::setter("set_level").param::<u32>("v")),
    )
    .expect("contract");
    assert_eq!(iface.property("level").expect("level").input_signature, "u");
}

#[test]
fn malformed_accessors_are_rejected() {
    let cases = [
        MemberDecl::getter("get_a").param::<i32>("x").returns::<i32>(),
        MemberDecl::getter("get_a"),
        MemberDecl::setter("set_a"),
        MemberDecl::setter("set_a").param::<i32>("x").returns::<bool>(),
        MemberDecl::setter("set_a").param::<i32>("x").param::<i32>("y"),
    ];
    for member in cases {
        let err = describe(InterfaceDecl::new("org.example.A").member(member)).unwrap_err();
        assert!(matches!(err, AnnotationError::BadAccessor { .. }), "{err}");
    }
}

#[test]
fn member_override_splits_across_parameters() {
    let decl = |sig: &str| {
        InterfaceDecl::new("org.example.A").member(
            MemberDecl::method("Send")
                .param::<i32>("n")
                .param::<String>("to")
                .signature(sig),
        )
    };

    let iface = describe(decl("uo")).expect("contract");
    assert_eq!(iface.method("Send").expect("Send").input_signature, "uo");

    assert!(matches!(
        describe(decl("u")).unwrap_err(),
        AnnotationError::OverrideArity {
            expected: 2,
            found: 1,
            ..
        }
    ));
    assert!(matches!(
        describe(decl("ss")).unwrap_err(),
        AnnotationError::IncompatibleOverride { .. }
    ));
    assert!(matches!(
        describe(decl("u(")).unwrap_err(),
        AnnotationError::MalformedOverride { .. }
    ));
}

#[test]
fn enum_parameters_need_an_integer_signature() {
    let missing = InterfaceDecl::new("org.example.A")
        .member(MemberDecl::method("SetMode").param_desc("mode", mode()));
    assert_eq!(
        describe(missing).unwrap_err(),
        AnnotationError::MissingEnumSignature {
            type_name: "Mode".into()
        }
    );

    let mut member = MemberDecl::method("SetMode").param_desc("mode", mode());
    member.params[0].signature = Some("y".into());
    let iface = describe(InterfaceDecl::new("org.example.A").member(member)).expect("contract");
    assert_eq!(iface.method("SetMode").expect("SetMode").input_signature, "y");
}

#[test]
fn signals_have_no_reply() {
    let err = describe(
        InterfaceDecl::new("org.example.A").member(MemberDecl::signal("Tick").returns::<u32>()),
    )
    .unwrap_err();
    assert!(matches!(err, AnnotationError::SignalWithReply { .. }));
}

#[test]
fn describe_all_skips_the_properties_interface() {
    let decls = vec![
        InterfaceDecl::new(PROPERTIES_INTERFACE)
            .member(MemberDecl::method("Get").param::<String>("iface").param::<String>("name")),
        InterfaceDecl::new("org.example.A").secure(SecurePolicy::Off),
    ];
    let contracts = ContractDescriptor::default()
        .describe_all(&decls)
        .expect("contracts");
    assert_eq!(contracts.len(), 1);
    assert_eq!(contracts[0].name, "org.example.A");
    assert_eq!(contracts[0].secure, SecurePolicy::Off);
}

#[test]
fn secure_policy_falls_back_to_inherit() {
    assert_eq!(SecurePolicy::from_annotation("required"), SecurePolicy::Required);
    assert_eq!(SecurePolicy::from_annotation("OFF"), SecurePolicy::Off);
    assert_eq!(SecurePolicy::from_annotation("sometimes"), SecurePolicy::Inherit);
}

#[test]
fn member_flags_have_names() {
    let flags = MemberFlags::NO_REPLY | MemberFlags::UNICAST;
    assert_eq!(flags.0, 0x11);
    assert_eq!(flags.names(), vec!["no-reply", "unicast"]);
    assert_eq!(MemberFlags::from_name("Global-Broadcast"), Some(MemberFlags::GLOBAL_BROADCAST));
    assert_eq!(MemberFlags::from_name("loud"), None);
}

#[test]
fn contract_marshals_and_checks_inputs() {
    let registry = SignatureRegistry::new();
    let iface = ContractDescriptor::from_registry(&registry)
        .describe(
            &InterfaceDecl::new("org.example.A").member(
                MemberDecl::method("Set")
                    .param::<String>("key")
                    .param::<u32>("n")
                    .returns::<bool>(),
            ),
        )
        .expect("contract");
    let set = iface.method("Set").expect("Set");
    let marshaller = Marshaller::new(&registry);
    let unmarshaller = Unmarshaller::new(&registry);

    let values = vec![Value::from("k"), Value::U32(3)];
    let args = set.marshal_inputs(&marshaller, &values).expect("marshal");
    assert_eq!(args, vec![Arg::String("k".into()), Arg::UInt32(3)]);
    assert_eq!(set.unmarshal_inputs(&unmarshaller, &args).expect("unmarshal"), values);

    let reply = set.marshal_outputs(&marshaller, &[Value::Bool(true)]).expect("reply");
    assert_eq!(
        set.unmarshal_outputs(&unmarshaller, &reply).expect("reply"),
        vec![Value::Bool(true)]
    );

    let err = set
        .unmarshal_inputs(&unmarshaller, &[Arg::String("k".into()), Arg::String("3".into())])
        .unwrap_err();
    assert_eq!(err.as_marshal().map(|e| e.path.clone()), Some(vec![1]));

    let err = set
        .unmarshal_inputs(&unmarshaller, &[Arg::String("k".into())])
        .unwrap_err();
    assert!(matches!(err, Error::SignatureMismatch(_)));
}
