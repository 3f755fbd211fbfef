//! Runtime entity metadata.
//!
//! Models are declared once per entity type as `&'static` data and shared
//! read-only by every session. Nothing in here is mutated at runtime:
//! the backend an operation targets travels next to the model as a
//! [`ModelBinding`] instead of being written into the model.
pub mod backend;
pub mod entity;
pub mod relation;

pub use backend::{BackendKind, ModelBinding};
pub use entity::EntityModel;
pub use relation::{CascadePolicy, CascadeType, Cardinality, RelationModel, RelationSide};
