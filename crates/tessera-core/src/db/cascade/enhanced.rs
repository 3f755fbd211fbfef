use crate::{
    db::cache::EntityIdentity,
    key::Key,
    model::{EntityModel, ModelBinding},
    traits::EntityRef,
};
use std::fmt;

///
/// ForeignKeys
/// Keys of the related instances read from one relationship field.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ForeignKeys {
    pub field: &'static str,
    pub column: Option<&'static str>,
    pub keys: Vec<Key>,
}

///
/// EnhancedEntity
///
/// One resolved member of a cascade batch: the live instance, its
/// materialized key, the model binding for this operation, and the keys
/// found on each relationship field. Lives only for one resolve-and-apply
/// call.
///

pub struct EnhancedEntity {
    entity: EntityRef,
    key: Key,
    binding: ModelBinding,
    foreign_keys: Vec<ForeignKeys>,
}

impl EnhancedEntity {
    pub(crate) const fn new(
        entity: EntityRef,
        key: Key,
        binding: ModelBinding,
        foreign_keys: Vec<ForeignKeys>,
    ) -> Self {
        Self {
            entity,
            key,
            binding,
            foreign_keys,
        }
    }

    #[must_use]
    pub const fn entity(&self) -> &EntityRef {
        &self.entity
    }

    #[must_use]
    pub const fn key(&self) -> &Key {
        &self.key
    }

    #[must_use]
    pub const fn binding(&self) -> ModelBinding {
        self.binding
    }

    #[must_use]
    pub const fn model(&self) -> &'static EntityModel {
        self.binding.model
    }

    #[must_use]
    pub const fn path(&self) -> &'static str {
        self.binding.model.path
    }

    #[must_use]
    pub fn identity(&self) -> EntityIdentity {
        EntityIdentity::new(self.path(), self.key.clone())
    }

    #[must_use]
    pub fn foreign_keys(&self) -> &[ForeignKeys] {
        &self.foreign_keys
    }

    /// Keys read from one relationship field, if the model declares it.
    #[must_use]
    pub fn foreign_keys_for(&self, field: &str) -> Option<&[Key]> {
        self.foreign_keys
            .iter()
            .find(|fk| fk.field == field)
            .map(|fk| fk.keys.as_slice())
    }
}

impl fmt::Debug for EnhancedEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnhancedEntity")
            .field("identity", &self.identity().to_string())
            .field("backend", &self.binding.backend)
            .field("foreign_keys", &self.foreign_keys)
            .finish()
    }
}
