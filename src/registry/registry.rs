//! The process-wide capability registry.
//!
//! Populated single-threaded at startup, then shared read-only behind an
//! `Arc` for the lifetime of the process. There is no removal and no
//! registration after startup, which is what makes lock-free concurrent
//! reads from the serving tasks safe.

use std::collections::HashMap;

use thiserror::Error;

use super::descriptor::{CapabilityDescriptor, CapabilityKind};
use super::schema::SchemaError;

/// Fatal registration failures. Any of these must abort process startup.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The same (kind, name) pair was registered twice, a programming
    /// error at the declaration site, never silently overwritten.
    #[error("duplicate capability registration: {kind} '{name}'")]
    Duplicate { kind: CapabilityKind, name: String },

    /// A descriptor's declaration failed schema derivation.
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Holds every capability descriptor, keyed by (kind, name).
///
/// Enumeration order is insertion order so discovery output is
/// deterministic across runs without sorting.
#[derive(Debug, Default)]
pub struct Registry {
    entries: Vec<CapabilityDescriptor>,
    index: HashMap<(CapabilityKind, String), usize>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor. Errors on a duplicate (kind, name).
    pub fn register(&mut self, descriptor: CapabilityDescriptor) -> Result<(), RegistryError> {
        let key = (descriptor.kind, descriptor.name.clone());
        if self.index.contains_key(&key) {
            return Err(RegistryError::Duplicate {
                kind: descriptor.kind,
                name: descriptor.name,
            });
        }
        self.index.insert(key, self.entries.len());
        self.entries.push(descriptor);
        Ok(())
    }

    /// O(1) lookup by kind and name.
    pub fn get(&self, kind: CapabilityKind, name: &str) -> Option<&CapabilityDescriptor> {
        self.index
            .get(&(kind, name.to_string()))
            .map(|&i| &self.entries[i])
    }

    /// All descriptors of one kind, in insertion order.
    pub fn list(&self, kind: CapabilityKind) -> Vec<&CapabilityDescriptor> {
        self.entries.iter().filter(|d| d.kind == kind).collect()
    }

    /// Total number of registered capabilities across all kinds.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
