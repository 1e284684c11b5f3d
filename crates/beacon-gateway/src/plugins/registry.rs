//! Case-insensitive capability table

use parking_lot::RwLock;
use std::collections::HashMap;
use thiserror::Error;

/// Registry error type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A handler with the same (case-insensitive) name exists
    #[error("{kind} '{name}' is already registered")]
    DuplicateName { kind: &'static str, name: String },

    /// No handler under that name
    #[error("{kind} '{name}' is not registered")]
    NotFound { kind: &'static str, name: String },

    /// Names must be non-empty
    #[error("{kind} name must not be empty")]
    EmptyName { kind: &'static str },
}

/// A registered handler and the name it was registered under
#[derive(Debug, Clone)]
pub struct CapabilityEntry<H> {
    /// Name as given at registration (original casing)
    pub name: String,
    pub handler: H,
}

/// Name-to-handler table
///
/// Names compare case-insensitively and there is at most one entry per normalized name.
pub struct CapabilityRegistry<H> {
    /// Label used in errors and logs ("plugin", "effect", ...)
    kind: &'static str,
    entries: RwLock<HashMap<String, CapabilityEntry<H>>>,
}

fn normalize(name: &str) -> String {
    name.to_lowercase()
}

impl<H: Clone> CapabilityRegistry<H> {
    /// Create an empty registry
    #[must_use]
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// What this registry holds
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Register a handler under a name
    pub fn register(&self, name: impl Into<String>, handler: H) -> Result<(), RegistryError> {
        let name = name.into();
        if name.is_empty() {
            return Err(RegistryError::EmptyName { kind: self.kind });
        }

        let key = normalize(&name);
        let mut entries = self.entries.write();
        if entries.contains_key(&key) {
            return Err(RegistryError::DuplicateName {
                kind: self.kind,
                name,
            });
        }

        tracing::debug!(kind = self.kind, name = %name, "Handler registered");
        entries.insert(key, CapabilityEntry { name, handler });
        Ok(())
    }

    /// Remove a handler, returning it
    pub fn unregister(&self, name: &str) -> Result<CapabilityEntry<H>, RegistryError> {
        let removed = self.entries.write().remove(&normalize(name));

        match removed {
            Some(entry) => {
                tracing::debug!(kind = self.kind, name = %entry.name, "Handler unregistered");
                Ok(entry)
            }
            None => Err(RegistryError::NotFound {
                kind: self.kind,
                name: name.to_string(),
            }),
        }
    }

    /// Find a handler by name
    pub fn lookup(&self, name: &str) -> Option<CapabilityEntry<H>> {
        self.entries.read().get(&normalize(name)).cloned()
    }

    /// Check if a name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().contains_key(&normalize(name))
    }

    /// Registered names, in their original casing, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .entries
            .read()
            .values()
            .map(|entry| entry.name.clone())
            .collect();
        names.sort();
        names
    }

    /// Number of registered handlers
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop every handler
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    // Aliases for loaders written against the capability vocabulary

    pub fn register_capability(
        &self,
        name: impl Into<String>,
        handler: H,
    ) -> Result<(), RegistryError> {
        self.register(name, handler)
    }

    pub fn unregister_capability(&self, name: &str) -> Result<CapabilityEntry<H>, RegistryError> {
        self.unregister(name)
    }

    pub fn lookup_capability(&self, name: &str) -> Option<H> {
        self.lookup(name).map(|entry| entry.handler)
    }
}

impl<H> std::fmt::Debug for CapabilityRegistry<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("kind", &self.kind)
            .field("entries", &self.entries.read().len())
            .finish()
    }
}
