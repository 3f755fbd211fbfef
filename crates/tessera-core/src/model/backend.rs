use crate::model::entity::EntityModel;
use derive_more::Display;
use serde::{Deserialize, Serialize};

///
/// BackendKind
/// Storage technology a persistence unit targets.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Wide-column store (keyspace + column families).
    #[display("column")]
    Column,
    /// Document store (database + collections).
    #[display("document")]
    Document,
    /// Search index (index + documents).
    #[display("search")]
    Search,
}

///
/// ModelBinding
///
/// One entity model paired with the backend an operation runs against.
/// Built per call so a shared model never carries per-operation state.
///

#[derive(Clone, Copy, Debug)]
pub struct ModelBinding {
    pub model: &'static EntityModel,
    pub backend: BackendKind,
}

impl ModelBinding {
    #[must_use]
    pub const fn new(model: &'static EntityModel, backend: BackendKind) -> Self {
        Self { model, backend }
    }

    #[must_use]
    pub const fn path(&self) -> &'static str {
        self.model.path
    }
}
