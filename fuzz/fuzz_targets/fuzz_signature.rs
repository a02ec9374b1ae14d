// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use ajbus::{Signature, TypeDescriptor, TypeSignatureCalculator};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(sig) = Signature::new(text) else {
        return;
    };

    // Parsing is lossless
    assert_eq!(sig.as_str(), text);
    let joined: String = sig.split().iter().map(Signature::as_str).collect();
    assert_eq!(joined, text);

    // A descriptor synthesized from a type computes back to that type
    let calc = TypeSignatureCalculator::default();
    for ty in sig.types() {
        let desc = TypeDescriptor::from_signature(ty);
        let computed = calc.sig_type(&desc, None).expect("synthesized descriptor");
        assert_eq!(&computed, ty);
    }
});
