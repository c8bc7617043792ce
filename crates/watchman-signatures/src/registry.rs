//! In-memory signature registry with query support.

use crate::{
    definition::{Scope, Signature},
    error::{Result, SignatureError},
    loader::SignatureLoader,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Immutable, ordered index of the signatures used by a run.
///
/// Iteration follows load order. Names are unique; a later signature with an
/// already registered name is dropped with a warning.
#[derive(Debug, Clone, Default)]
pub struct SignatureRegistry {
    /// Signatures in load order
    signatures: Vec<Arc<Signature>>,
    /// Position of each signature by name
    by_name: HashMap<String, usize>,
}

impl SignatureRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from already loaded signatures.
    #[must_use]
    pub fn from_signatures(signatures: impl IntoIterator<Item = Signature>) -> Self {
        let mut registry = Self::new();

        for signature in signatures {
            if registry.by_name.contains_key(signature.name()) {
                warn!(name = %signature.name(), "duplicate signature name, keeping the first");
                continue;
            }
            registry
                .by_name
                .insert(signature.name().to_string(), registry.signatures.len());
            registry.signatures.push(Arc::new(signature));
        }

        registry
    }

    /// Create a registry and load all signatures from the given loader.
    ///
    /// # Errors
    /// Returns error if loading fails.
    pub fn load_from(loader: &SignatureLoader) -> Result<Self> {
        let registry = Self::from_signatures(loader.load_all()?);
        info!(count = registry.count(), "indexed signatures");
        Ok(registry)
    }

    /// Get a signature by name.
    ///
    /// # Errors
    /// Returns error if the signature is not found.
    pub fn get(&self, name: &str) -> Result<Arc<Signature>> {
        self.by_name
            .get(name)
            .map(|&index| Arc::clone(&self.signatures[index]))
            .ok_or_else(|| SignatureError::NotFound {
                name: name.to_string(),
            })
    }

    /// Iterate over every signature in load order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Signature>> {
        self.signatures.iter()
    }

    /// Signatures whose scope includes `scope`, in load order.
    #[must_use]
    pub fn for_scope(&self, scope: Scope) -> Vec<Arc<Signature>> {
        self.signatures
            .iter()
            .filter(|signature| signature.applies_to(scope))
            .cloned()
            .collect()
    }

    /// Get the number of signatures.
    #[must_use]
    pub fn count(&self) -> usize {
        self.signatures.len()
    }

    /// Whether no signature is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }
}
