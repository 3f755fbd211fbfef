//! Module: port
//! Responsibility: call shapes of the storage collaborators the session drives.
//! Does not own: any backend I/O; implementations live outside this crate.
//!
//! Write calls receive the `EnhancedEntity`, whose `ModelBinding` carries
//! the model and the backend kind for the current operation.

use crate::{
    db::{cascade::EnhancedEntity, registry::PersistenceUnit},
    error::ExternalError,
    key::Key,
    model::ModelBinding,
    traits::EntityRef,
};
use std::collections::BTreeMap;

///
/// DataManager
/// Row-level reads and writes against the unit's backend connection.
///

pub trait DataManager: Send + Sync {
    /// Single-key read; `Ok(None)` when no row exists.
    fn find(&self, binding: ModelBinding, key: &Key) -> Result<Option<EntityRef>, ExternalError>;

    /// Multi-key read. Missing keys are simply absent from the result.
    fn find_many(
        &self,
        binding: ModelBinding,
        keys: &[Key],
    ) -> Result<Vec<EntityRef>, ExternalError>;

    /// Read by column/value pairs (compound or secondary keys).
    fn find_by_columns(
        &self,
        binding: ModelBinding,
        columns: &BTreeMap<String, String>,
    ) -> Result<Vec<EntityRef>, ExternalError>;

    fn persist(&self, entity: &EnhancedEntity) -> Result<(), ExternalError>;

    fn merge(&self, entity: &EnhancedEntity) -> Result<(), ExternalError>;

    fn remove(&self, entity: &EnhancedEntity) -> Result<(), ExternalError>;
}

///
/// IndexManager
/// Secondary-index maintenance for written and removed entities.
///

pub trait IndexManager {
    fn write(&self, binding: ModelBinding, entity: &EntityRef) -> Result<(), ExternalError>;

    fn update(&self, binding: ModelBinding, entity: &EntityRef) -> Result<(), ExternalError>;

    fn remove(
        &self,
        binding: ModelBinding,
        entity: &EntityRef,
        key: &Key,
    ) -> Result<(), ExternalError>;
}

///
/// IndexManagerFactory
/// Builds the index manager of one entity manager, on its first write.
///

pub trait IndexManagerFactory: Send + Sync {
    fn create(&self, unit: &PersistenceUnit) -> Box<dyn IndexManager>;
}
