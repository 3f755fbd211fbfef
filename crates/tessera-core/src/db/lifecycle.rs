//! Module: lifecycle
//! Responsibility: ordered invocation of pre/post hooks around single-object writes.
//! Does not own: listener discovery; listeners are registered explicitly at setup.

use crate::{
    db::cascade::EnhancedEntity,
    error::{Error, ErrorOrigin, ExternalError},
    obs::sink::{MetricsEvent, record},
    traits::EntityKind,
};
use derive_more::Display;
use std::{collections::HashMap, fmt};

///
/// HookKind
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum HookKind {
    PrePersist,
    PostPersist,
    PreUpdate,
    PostUpdate,
    PreRemove,
    PostRemove,
}

/// Registered lifecycle callback.
pub type Listener = Box<dyn Fn(&EnhancedEntity) -> Result<(), ExternalError> + Send + Sync>;

///
/// LifecycleListeners
///
/// Listener table keyed by (entity type path, hook kind).
/// Listeners for one key run in registration order.
///

#[derive(Default)]
pub struct LifecycleListeners {
    listeners: HashMap<(&'static str, HookKind), Vec<Listener>>,
}

impl LifecycleListeners {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for one entity type path and hook.
    pub fn register<F>(&mut self, path: &'static str, hook: HookKind, listener: F) -> &mut Self
    where
        F: Fn(&EnhancedEntity) -> Result<(), ExternalError> + Send + Sync + 'static,
    {
        self.listeners
            .entry((path, hook))
            .or_default()
            .push(Box::new(listener));
        self
    }

    /// Register a listener for a typed entity.
    pub fn on<E, F>(&mut self, hook: HookKind, listener: F) -> &mut Self
    where
        E: EntityKind,
        F: Fn(&EnhancedEntity) -> Result<(), ExternalError> + Send + Sync + 'static,
    {
        self.register(E::MODEL.path, hook, listener)
    }

    #[must_use]
    pub fn count(&self, path: &'static str, hook: HookKind) -> usize {
        self.listeners.get(&(path, hook)).map_or(0, Vec::len)
    }

    /// Invoke every listener for the entity's type and `hook`, in order.
    ///
    /// The first failing listener stops the chain; its error is returned
    /// as a persistence error carrying the listener's cause.
    pub fn fire(&self, hook: HookKind, entity: &EnhancedEntity) -> Result<usize, Error> {
        let Some(listeners) = self.listeners.get(&(entity.path(), hook)) else {
            return Ok(0);
        };

        for (position, listener) in listeners.iter().enumerate() {
            listener(entity).map_err(|err| {
                Error::persistence(
                    ErrorOrigin::Lifecycle,
                    format!(
                        "{hook} listener #{position} failed for {}: {err}",
                        entity.identity()
                    ),
                    err,
                )
            })?;
        }

        record(MetricsEvent::ListenersFired {
            entity_path: entity.path(),
            count: listeners.len() as u64,
        });

        Ok(listeners.len())
    }
}

impl fmt::Debug for LifecycleListeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self
            .listeners
            .iter()
            .map(|((path, hook), listeners)| format!("{path}:{hook}x{}", listeners.len()))
            .collect();
        keys.sort();

        f.debug_struct("LifecycleListeners")
            .field("listeners", &keys)
            .finish()
    }
}
