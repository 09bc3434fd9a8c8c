//! # Backend Registry
//!
//! Name -> factory table for storage backends. Populated once, by the
//! owning `World`, before any hash is created; read-only afterwards.

use super::Hash;
use super::backend::HashBackend;
use crate::primitives::DEFAULT_BACKEND;
use crate::types::{TrellisError, TrellisResult};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

type BackendInit = Rc<dyn Fn() -> Box<dyn HashBackend>>;

/// Descriptor for one backend kind.
#[derive(Clone)]
pub struct HashFactory {
    name: String,
    init: BackendInit,
}

impl fmt::Debug for HashFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashFactory")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl HashFactory {
    pub fn new<F>(name: impl Into<String>, init: F) -> Self
    where
        F: Fn() -> Box<dyn HashBackend> + 'static,
    {
        Self {
            name: name.into(),
            init: Rc::new(init),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Create fresh backend state.
    #[must_use]
    pub fn create_backend(&self) -> Box<dyn HashBackend> {
        (self.init)()
    }

    /// Create an unopened hash bound to this factory.
    #[must_use]
    pub fn new_hash(&self) -> Hash {
        Hash::from_backend(self.name.clone(), self.create_backend())
    }
}

/// Registered backends, ordered by name.
#[derive(Debug, Default, Clone)]
pub struct HashRegistry {
    factories: BTreeMap<String, HashFactory>,
}

impl HashRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend under a process-unique name.
    ///
    /// Returns `TrellisError::Duplicate` if the name is taken.
    pub fn register<F>(&mut self, name: &str, init: F) -> TrellisResult<()>
    where
        F: Fn() -> Box<dyn HashBackend> + 'static,
    {
        if self.factories.contains_key(name) {
            return Err(TrellisError::Duplicate(format!(
                "hash backend '{}' already registered",
                name
            )));
        }
        tracing::debug!(backend = name, "registered hash backend");
        self.factories
            .insert(name.to_string(), HashFactory::new(name, init));
        Ok(())
    }

    /// Look up a backend; `None` selects the default backend.
    pub fn get(&self, name: Option<&str>) -> TrellisResult<&HashFactory> {
        let name = name.unwrap_or(DEFAULT_BACKEND);
        self.factories
            .get(name)
            .ok_or_else(|| TrellisError::NotFound(format!("hash backend '{}'", name)))
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}
