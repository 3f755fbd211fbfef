use crate::{
    config::PersistenceConfig,
    core::{
        db::{
            ClientRegistry, Connector, DataManager, EntityManager, EntityManagerConfig, HookKind,
            IndexManagerFactory, LifecycleListeners, MetadataRegistry, PersistenceUnit,
        },
        error::{Error, ErrorClass, ErrorOrigin, ExternalError},
        model::EntityModel,
        traits::EntityKind,
    },
};
use std::{fmt, sync::Arc};
use tracing::info;

///
/// Persistence
///
/// Process-level bootstrap: owns the client registry and the shared,
/// read-only pieces every entity manager is built from. Entity managers
/// are created per unit of work and hold only non-owning handles.
///

pub struct Persistence {
    registry: Arc<ClientRegistry>,
    metadata: Arc<MetadataRegistry>,
    data: Arc<dyn DataManager>,
    index_factory: Arc<dyn IndexManagerFactory>,
    listeners: Arc<LifecycleListeners>,
}

impl Persistence {
    /// Start building a persistence setup that connects through `connector`.
    #[must_use]
    pub fn builder(connector: Arc<dyn Connector>) -> PersistenceBuilder {
        PersistenceBuilder {
            connector,
            models: Vec::new(),
            units: Vec::new(),
            data: None,
            index_factory: None,
            listeners: LifecycleListeners::new(),
        }
    }

    /// Open an entity manager for the named persistence unit.
    ///
    /// The unit's connection is created on first use and shared afterwards.
    pub fn entity_manager(&self, unit: &str) -> Result<EntityManager, Error> {
        let (unit, client) = self.registry.client_for_unit(unit)?;

        Ok(EntityManager::new(EntityManagerConfig {
            unit,
            client,
            metadata: Arc::clone(&self.metadata),
            data: Arc::clone(&self.data),
            index_factory: Arc::clone(&self.index_factory),
            listeners: Arc::clone(&self.listeners),
        }))
    }

    #[must_use]
    pub const fn registry(&self) -> &Arc<ClientRegistry> {
        &self.registry
    }

    #[must_use]
    pub const fn metadata(&self) -> &Arc<MetadataRegistry> {
        &self.metadata
    }

    pub fn units(&self) -> impl Iterator<Item = &PersistenceUnit> {
        self.registry.units()
    }

    /// Tear down every backend connection. Later calls are no-ops.
    pub fn shutdown(&self) -> usize {
        let closed = self.registry.shutdown();
        info!(connections = closed, "persistence shut down");

        closed
    }
}

impl fmt::Debug for Persistence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Persistence")
            .field("registry", &self.registry)
            .field("models", &self.metadata.len())
            .field("listeners", &self.listeners)
            .finish_non_exhaustive()
    }
}

///
/// PersistenceBuilder
///

pub struct PersistenceBuilder {
    connector: Arc<dyn Connector>,
    models: Vec<&'static EntityModel>,
    units: Vec<PersistenceUnit>,
    data: Option<Arc<dyn DataManager>>,
    index_factory: Option<Arc<dyn IndexManagerFactory>>,
    listeners: LifecycleListeners,
}

impl PersistenceBuilder {
    /// Register an entity type.
    #[must_use]
    pub fn entity<E: EntityKind>(mut self) -> Self {
        self.models.push(E::MODEL);
        self
    }

    /// Register entity models directly.
    #[must_use]
    pub fn models(mut self, models: impl IntoIterator<Item = &'static EntityModel>) -> Self {
        self.models.extend(models);
        self
    }

    #[must_use]
    pub fn unit(mut self, unit: PersistenceUnit) -> Self {
        self.units.push(unit);
        self
    }

    /// Add every unit of a loaded configuration.
    #[must_use]
    pub fn config(mut self, config: PersistenceConfig) -> Self {
        self.units.extend(config.into_units());
        self
    }

    #[must_use]
    pub fn data_manager(mut self, data: Arc<dyn DataManager>) -> Self {
        self.data = Some(data);
        self
    }

    #[must_use]
    pub fn index_manager_factory(mut self, factory: Arc<dyn IndexManagerFactory>) -> Self {
        self.index_factory = Some(factory);
        self
    }

    /// Register a lifecycle listener for one entity type.
    #[must_use]
    pub fn listener<E, F>(mut self, hook: HookKind, listener: F) -> Self
    where
        E: EntityKind,
        F: Fn(&crate::core::db::EnhancedEntity) -> Result<(), ExternalError>
            + Send
            + Sync
            + 'static,
    {
        self.listeners.on::<E, _>(hook, listener);
        self
    }

    /// Validate metadata, register units, and assemble the bootstrap.
    pub fn build(self) -> Result<Persistence, Error> {
        let data = self.data.ok_or_else(|| missing("data manager"))?;
        let index_factory = self
            .index_factory
            .ok_or_else(|| missing("index manager factory"))?;

        let metadata = MetadataRegistry::with_models(self.models)?;
        let registry = ClientRegistry::new(self.connector);
        registry.init(self.units)?;

        info!(
            models = metadata.len(),
            units = registry.units().count(),
            "persistence initialized"
        );

        Ok(Persistence {
            registry: Arc::new(registry),
            metadata: Arc::new(metadata),
            data,
            index_factory,
            listeners: Arc::new(self.listeners),
        })
    }
}

fn missing(what: &str) -> Error {
    Error::new(
        ErrorClass::Validation,
        ErrorOrigin::Config,
        format!("no {what} configured"),
    )
}
