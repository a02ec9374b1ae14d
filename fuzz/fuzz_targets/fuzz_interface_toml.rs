// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use ajbus::contract::InterfaceSet;
use ajbus::{ContractDescriptor, SignatureLimits};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(set) = InterfaceSet::from_toml_str(text) else {
        return;
    };
    let Ok(decls) = set.to_decls(&SignatureLimits::default()) else {
        return;
    };
    // Must fail cleanly, never panic
    let _ = ContractDescriptor::default().describe_all(&decls);
});
