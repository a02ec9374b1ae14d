// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Signature registry.
//!
//! Caches the descriptor and computed signature of each native type, keyed
//! by `TypeId`. A registry is an ordinary value owned by the caller and
//! handed to the marshaller, unmarshaller and contract builder that should
//! share it; there is no process-wide instance.
//!
//! Population is idempotent: two threads racing on the same type compute the
//! same entry and the first insert wins. Failed computations are not cached.

use dashmap::DashMap;
use std::any::TypeId;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::calc::TypeSignatureCalculator;
use crate::config::EngineConfig;
use crate::descriptor::TypeDescriptor;
use crate::error::Result;
use crate::signature::{SigType, Signature, SignatureLimits};
use crate::types::BusType;

/// Cache hit/miss statistics.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LookupStats {
    pub hits: u64,
    pub misses: u64,
}

/// A cached type: descriptor plus computed signature.
#[derive(Debug)]
pub struct RegisteredType {
    pub descriptor: Arc<TypeDescriptor>,
    pub signature: Signature,
}

impl RegisteredType {
    /// The single complete type of [`signature`](Self::signature).
    pub fn sig_type(&self) -> &SigType {
        // Registry signatures are built from exactly one type.
        &self.signature.types()[0]
    }
}

/// Per-call-site cache of native type signatures.
pub struct SignatureRegistry {
    calc: TypeSignatureCalculator,
    entries: DashMap<TypeId, Arc<RegisteredType>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for SignatureRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SignatureRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::with_limits(SignatureLimits::default(), 0)
    }

    #[must_use]
    pub fn with_config(config: &EngineConfig) -> Self {
        Self::with_limits(config.limits(), config.registry_capacity_hint)
    }

    #[must_use]
    pub fn with_limits(limits: SignatureLimits, capacity: usize) -> Self {
        Self {
            calc: TypeSignatureCalculator::new(limits),
            entries: DashMap::with_capacity(capacity),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn calculator(&self) -> &TypeSignatureCalculator {
        &self.calc
    }

    pub fn limits(&self) -> &SignatureLimits {
        self.calc.limits()
    }

    /// Descriptor and signature of `T`, computed on first use.
    pub fn lookup<T: BusType>(&self) -> Result<Arc<RegisteredType>> {
        let key = TypeId::of::<T>();
        if let Some(entry) = self.entries.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(entry.value()));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let descriptor = T::descriptor();
        let signature = self.calc.signature(&descriptor, None)?;
        log::debug!(
            "[registry] {} -> '{}'",
            descriptor.name,
            signature.as_str()
        );
        let entry = Arc::new(RegisteredType {
            descriptor,
            signature,
        });
        Ok(Arc::clone(self.entries.entry(key).or_insert(entry).value()))
    }

    pub fn signature_of<T: BusType>(&self) -> Result<Signature> {
        Ok(self.lookup::<T>()?.signature.clone())
    }

    pub fn descriptor_of<T: BusType>(&self) -> Result<Arc<TypeDescriptor>> {
        Ok(Arc::clone(&self.lookup::<T>()?.descriptor))
    }

    pub fn contains<T: BusType>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    pub fn stats(&self) -> LookupStats {
        LookupStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for SignatureRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureRegistry")
            .field("entries", &self.entries.len())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::thread;

    #[test]
    fn second_lookup_hits_cache() {
        let registry = SignatureRegistry::new();
        assert_eq!(registry.signature_of::<Vec<String>>().expect("ok"), "as");
        assert_eq!(registry.signature_of::<Vec<String>>().expect("ok"), "as");
        assert_eq!(
            registry.stats(),
            LookupStats {
                hits: 1,
                misses: 1
            }
        );
        assert!(registry.contains::<Vec<String>>());
        assert!(!registry.contains::<String>());
    }

    #[test]
    fn concurrent_population_is_idempotent() {
        let registry = Arc::new(SignatureRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || registry.lookup::<HashMap<String, i32>>())
            })
            .collect();
        let entries: Vec<Arc<RegisteredType>> = handles
            .into_iter()
            .map(|h| h.join().expect("thread").expect("lookup"))
            .collect();
        assert_eq!(registry.len(), 1);
        let first = &entries[0];
        assert!(entries.iter().all(|e| e.signature == first.signature));
        assert_eq!(first.signature, "a{si}");
        let stats = registry.stats();
        assert_eq!(stats.hits + stats.misses, 8);
    }

    #[test]
    fn concurrent_hits_are_all_counted() {
        let registry = Arc::new(SignatureRegistry::new());
        registry.lookup::<Vec<u32>>().expect("warm");
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    for _ in 0..100 {
                        registry.lookup::<Vec<u32>>().expect("lookup");
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().expect("thread");
        }
        assert_eq!(
            registry.stats(),
            LookupStats {
                hits: 800,
                misses: 1
            }
        );
    }

    #[test]
    fn clear_resets_entries_and_stats() {
        let registry = SignatureRegistry::new();
        registry.lookup::<u8>().expect("ok");
        registry.clear();
        assert!(registry.is_empty());
        assert_eq!(registry.stats(), LookupStats::default());
    }
}
