//! Module: metadata
//! Responsibility: registration and lookup of entity models per persistence setup.
//! Does not own: per-operation backend selection (see `ModelBinding`).

use crate::{
    error::{Error, ErrorClass, ErrorOrigin},
    model::EntityModel,
};
use std::collections::{BTreeSet, HashMap};
use thiserror::Error as ThisError;

///
/// MetadataError
///

#[derive(Debug, ThisError)]
pub enum MetadataError {
    #[error("no metadata registered for entity '{0}'")]
    Unregistered(String),

    #[error("entity '{0}' already registered")]
    AlreadyRegistered(String),

    #[error("invalid metadata for entity '{path}': {reason}")]
    Invalid { path: String, reason: String },
}

impl From<MetadataError> for Error {
    fn from(err: MetadataError) -> Self {
        Self::new(ErrorClass::Metadata, ErrorOrigin::Session, err.to_string())
    }
}

///
/// MetadataRegistry
///
/// Immutable-after-setup map of entity type path to model.
/// Shared read-only across sessions behind an `Arc`.
///

#[derive(Debug, Default)]
pub struct MetadataRegistry {
    models: HashMap<&'static str, &'static EntityModel>,
}

impl MetadataRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a fixed model list.
    pub fn with_models(
        models: impl IntoIterator<Item = &'static EntityModel>,
    ) -> Result<Self, MetadataError> {
        let mut registry = Self::new();
        for model in models {
            registry.register(model)?;
        }

        Ok(registry)
    }

    /// Register one entity model after checking its shape.
    pub fn register(&mut self, model: &'static EntityModel) -> Result<(), MetadataError> {
        check_model(model)?;

        if self.models.contains_key(model.path) {
            return Err(MetadataError::AlreadyRegistered(model.path.to_string()));
        }

        self.models.insert(model.path, model);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, path: &str) -> Option<&'static EntityModel> {
        self.models.get(path).copied()
    }

    /// Resolve a model or fail with a metadata error.
    pub fn validate(&self, path: &str) -> Result<&'static EntityModel, MetadataError> {
        self.get(path)
            .ok_or_else(|| MetadataError::Unregistered(path.to_string()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

// Reject models that would make key reads or relation traversal ambiguous.
fn check_model(model: &EntityModel) -> Result<(), MetadataError> {
    let invalid = |reason: &str| MetadataError::Invalid {
        path: model.path.to_string(),
        reason: reason.to_string(),
    };

    if model.path.is_empty() {
        return Err(invalid("type path is empty"));
    }
    if model.entity_name.is_empty() {
        return Err(invalid("entity name is empty"));
    }
    if model.primary_key.is_empty() {
        return Err(invalid("primary key field is empty"));
    }

    let mut seen = BTreeSet::new();
    for relation in model.relations {
        if relation.field.is_empty() || relation.target_path.is_empty() {
            return Err(invalid("relation field and target must be named"));
        }
        if relation.field == model.primary_key {
            return Err(invalid("relation field shadows the primary key"));
        }
        if !seen.insert(relation.field) {
            return Err(MetadataError::Invalid {
                path: model.path.to_string(),
                reason: format!("duplicate relation field '{}'", relation.field),
            });
        }
    }

    Ok(())
}
