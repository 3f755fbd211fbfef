//! Core runtime for tessera: entity metadata, cascade resolution, the
//! identity session cache, the client registry, and the entity manager.
//!
//! Storage itself lives behind the collaborator traits in [`db::port`];
//! this crate only orchestrates calls into them.

// public exports are one module level down
pub mod db;
pub mod error;
pub mod key;
pub mod model;
pub mod obs;
pub mod traits;

// test
#[cfg(test)]
pub(crate) mod test_support;

pub use error::Error;

///
/// Prelude
///
/// Domain vocabulary for declaring entities and driving sessions.
///

pub mod prelude {
    pub use crate::{
        db::{EntityManager, HookKind, PersistenceUnit},
        key::Key,
        model::{
            BackendKind, CascadePolicy, CascadeType, Cardinality, EntityModel, RelationModel,
            RelationSide,
        },
        traits::{Entity, EntityKind, EntityRef, downcast_entity, relation_refs},
    };
}
