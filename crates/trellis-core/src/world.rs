//! # World
//!
//! Process-scoped state owning the backend registry.
//!
//! Registration needs `&mut World`; creating hashes needs only `&World`.
//! Once a `World` is shared, the set of backends is fixed.

use crate::hash::{Hash, HashBackend, HashFactory, HashRegistry};
use crate::primitives::{MEMORY_BACKEND, REDB_BACKEND};
use crate::storage::{MemoryHash, RedbHash};
use crate::types::TrellisResult;

/// Owner of the hash registry.
#[derive(Debug, Clone)]
pub struct World {
    registry: HashRegistry,
}

impl World {
    /// A world with the built-in `memory` and `redb` backends.
    pub fn new() -> TrellisResult<Self> {
        let mut world = Self::empty();
        world.register_hash_factory(MEMORY_BACKEND, MemoryHash::boxed)?;
        world.register_hash_factory(REDB_BACKEND, RedbHash::boxed)?;
        Ok(world)
    }

    /// A world with no backends registered.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            registry: HashRegistry::new(),
        }
    }

    /// Register a backend under `name`.
    pub fn register_hash_factory<F>(&mut self, name: &str, init: F) -> TrellisResult<()>
    where
        F: Fn() -> Box<dyn HashBackend> + 'static,
    {
        self.registry.register(name, init)
    }

    #[must_use]
    pub fn registry(&self) -> &HashRegistry {
        &self.registry
    }

    /// Create an unopened hash; `None` selects the default backend.
    pub fn new_hash(&self, name: Option<&str>) -> TrellisResult<Hash> {
        Ok(self.registry.get(name)?.new_hash())
    }

    /// Create an unopened hash from an explicit factory.
    #[must_use]
    pub fn new_hash_from_factory(&self, factory: &HashFactory) -> Hash {
        factory.new_hash()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::hash::{OpenOptions, PutFlags};
    use crate::types::TrellisError;

    #[test]
    fn builtin_backends_registered() {
        let world = World::new().expect("world");
        let names: Vec<_> = world.registry().names().collect();
        assert_eq!(names, vec!["memory", "redb"]);
    }

    #[test]
    fn default_hash_is_memory() {
        let world = World::new().expect("world");
        let mut hash = world.new_hash(None).expect("hash");
        assert_eq!(hash.factory_name(), "memory");
        hash.open("scratch", &OpenOptions::default()).expect("open");
        hash.put("k", "v", PutFlags::REPLACE).expect("put");
        assert_eq!(hash.get("k").expect("get"), "v");
    }

    #[test]
    fn empty_world_has_no_default() {
        let world = World::empty();
        assert!(matches!(
            world.new_hash(None),
            Err(TrellisError::NotFound(_))
        ));
    }

    #[test]
    fn duplicate_builtin_rejected() {
        let mut world = World::new().expect("world");
        let again = world.register_hash_factory("redb", MemoryHash::boxed);
        assert!(matches!(again, Err(TrellisError::Duplicate(_))));
    }

    #[test]
    fn custom_factory() {
        let mut world = World::empty();
        world
            .register_hash_factory("scratch", MemoryHash::boxed)
            .expect("register");
        let factory = world.registry().get(Some("scratch")).expect("factory");
        let hash = world.new_hash_from_factory(factory);
        assert_eq!(hash.factory_name(), "scratch");
    }
}
