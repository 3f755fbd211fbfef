use crate::{key::Key, model::EntityModel};
use std::{any::Any, fmt::Debug, sync::Arc};

///
/// EntityRef
///
/// Shared handle to one live entity instance.
/// The session cache, the cascade batch, and the caller all hold the same
/// allocation; entities that need mutation after construction do it through
/// interior mutability.
///

pub type EntityRef = Arc<dyn Entity>;

///
/// AsAny
/// Type-erasure hook used to recover concrete entity types from handles.
///

pub trait AsAny: Any + Send + Sync {
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

///
/// Entity
///
/// Object-safe view of an application entity: its model, its primary key,
/// and the instances currently held by each relationship field.
///

pub trait Entity: AsAny + Debug {
    /// Static metadata of this entity's type.
    fn model(&self) -> &'static EntityModel;

    /// Current primary-key value, `None` when not yet assigned.
    fn primary_key(&self) -> Option<Key>;

    /// Instances currently held by one relationship field.
    ///
    /// Returns `None` when the entity has no such field. Scalar relations
    /// return zero or one element; collections return their elements in order.
    fn related(&self, field: &str) -> Option<Vec<EntityRef>>;
}

///
/// EntityKind
/// Typed entity with compile-time access to its model.
///

pub trait EntityKind: Entity + Sized {
    const MODEL: &'static EntityModel;
}

/// Recover the concrete type behind a shared entity handle.
#[must_use]
pub fn downcast_entity<E: EntityKind>(entity: EntityRef) -> Option<Arc<E>> {
    entity.into_any().downcast::<E>().ok()
}

/// Collect relation values into shared handles.
///
/// Helper for `Entity::related` implementations over typed fields.
pub fn relation_refs<'a, E, I>(items: I) -> Vec<EntityRef>
where
    E: Entity,
    I: IntoIterator<Item = &'a Arc<E>>,
{
    items
        .into_iter()
        .map(|item| Arc::clone(item) as EntityRef)
        .collect()
}
