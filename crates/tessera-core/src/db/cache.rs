//! Module: cache
//! Responsibility: per-session identity map, at most one live instance per (type, key).
//! Does not own: entity loading or second-level (cross-session) caching.
//!
//! Not synchronized. One cache belongs to one session, and one session
//! serves one logical unit of work.

use crate::{key::Key, traits::EntityRef};
use std::{collections::HashMap, fmt, sync::Arc};

///
/// EntityIdentity
/// Type path + primary key naming one logical entity instance.
///

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct EntityIdentity {
    pub path: &'static str,
    pub key: Key,
}

impl EntityIdentity {
    #[must_use]
    pub const fn new(path: &'static str, key: Key) -> Self {
        Self { path, key }
    }
}

impl fmt::Display for EntityIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.path, self.key)
    }
}

///
/// SessionCache
///

#[derive(Default)]
pub struct SessionCache {
    entries: HashMap<EntityIdentity, EntityRef>,
}

impl SessionCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the live instance for (type, key), if cached.
    #[must_use]
    pub fn lookup(&self, path: &'static str, key: &Key) -> Option<EntityRef> {
        self.entries
            .get(&EntityIdentity::new(path, key.clone()))
            .cloned()
    }

    /// Cache an instance under its own type path.
    ///
    /// Non-cacheable entities are skipped. An existing entry for the same
    /// identity is replaced without any version check. Returns whether the
    /// instance was stored.
    pub fn store(&mut self, key: Key, entity: EntityRef, cacheable: bool) -> bool {
        if !cacheable {
            return false;
        }

        let identity = EntityIdentity::new(entity.model().path, key);
        self.entries.insert(identity, entity);

        true
    }

    /// Evict one identity, returning the evicted instance.
    pub fn remove(&mut self, path: &'static str, key: &Key) -> Option<EntityRef> {
        self.entries.remove(&EntityIdentity::new(path, key.clone()))
    }

    /// Whether this exact instance is the cached representative of its identity.
    #[must_use]
    pub fn contains_instance(&self, key: &Key, entity: &EntityRef) -> bool {
        self.lookup(entity.model().path, key)
            .is_some_and(|cached| Arc::ptr_eq(&cached, entity))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for SessionCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut identities: Vec<_> = self.entries.keys().collect();
        identities.sort();

        f.debug_struct("SessionCache")
            .field("identities", &identities)
            .finish()
    }
}
