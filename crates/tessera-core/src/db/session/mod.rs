//! Module: session
//! Responsibility: the entity manager façade. Validates calls, consults the
//! identity cache, resolves cascades, and drives the per-object write loop
//! across listeners, the data manager, and the index manager.
//! Does not own: storage I/O, connection lifetime, or query execution.
//!
//! Invariants:
//! - State is Open until `close`, then Closed for good; every operation
//!   except `close` and `is_open` fails with a closed-session error once closed.
//! - Per-object order inside a batch is pre-hook, data write, index write,
//!   post-hook. A failure stops the batch; earlier objects stay written.
//! - Bulk finds neither read nor populate the identity cache.


use crate::{
    db::{
        cache::SessionCache,
        cascade::{CascadeResolver, EnhancedEntity},
        lifecycle::{HookKind, LifecycleListeners},
        metadata::MetadataRegistry,
        port::{DataManager, IndexManager, IndexManagerFactory},
        query::NativeQuery,
        registry::{ClientRef, PersistenceUnit},
    },
    error::{Error, ErrorClass, ErrorOrigin},
    key::Key,
    model::{CascadeType, EntityModel, ModelBinding},
    obs::sink::{MetricsEvent, MetricsSink, WriteKind, record, with_metrics_sink},
    traits::{EntityKind, EntityRef, downcast_entity},
};
use once_cell::unsync::OnceCell;
use std::{collections::BTreeMap, fmt, sync::Arc};
use tracing::{debug, warn};

///
/// EntityManagerConfig
///
/// Everything an entity manager is built from. Assembled by the caller
/// (usually the persistence bootstrap) and handed over in one piece.
///

pub struct EntityManagerConfig {
    pub unit: PersistenceUnit,
    pub client: ClientRef,
    pub metadata: Arc<MetadataRegistry>,
    pub data: Arc<dyn DataManager>,
    pub index_factory: Arc<dyn IndexManagerFactory>,
    pub listeners: Arc<LifecycleListeners>,
}

///
/// EntityManager
///
/// Session-scoped façade over one persistence unit. Meant for one caller
/// and one logical unit of work; it is not shared across threads.
///

pub struct EntityManager {
    unit: PersistenceUnit,
    client: ClientRef,
    metadata: Arc<MetadataRegistry>,
    data: Arc<dyn DataManager>,
    index_factory: Arc<dyn IndexManagerFactory>,
    index: OnceCell<Box<dyn IndexManager>>,
    listeners: Arc<LifecycleListeners>,
    session: Option<SessionCache>,
    metrics: Option<&'static dyn MetricsSink>,
}

impl EntityManager {
    #[must_use]
    pub fn new(config: EntityManagerConfig) -> Self {
        let EntityManagerConfig {
            unit,
            client,
            metadata,
            data,
            index_factory,
            listeners,
        } = config;

        Self {
            unit,
            client,
            metadata,
            data,
            index_factory,
            index: OnceCell::new(),
            listeners,
            session: Some(SessionCache::new()),
            metrics: None,
        }
    }

    /// Route this manager's metrics events to `sink` instead of the global state.
    #[must_use]
    pub fn metrics_sink(mut self, sink: &'static dyn MetricsSink) -> Self {
        self.metrics = Some(sink);
        self
    }

    fn with_metrics<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        match self.metrics {
            Some(sink) => with_metrics_sink(sink, || f(self)),
            None => f(self),
        }
    }

    // ---------------------------------------------------------------------
    // State
    // ---------------------------------------------------------------------

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.session.is_some()
    }

    #[must_use]
    pub const fn persistence_unit(&self) -> &PersistenceUnit {
        &self.unit
    }

    /// Connection handle owned by the client registry.
    #[must_use]
    pub const fn client(&self) -> &ClientRef {
        &self.client
    }

    fn session_mut(&mut self) -> Result<&mut SessionCache, Error> {
        self.session.as_mut().ok_or_else(Error::closed_session)
    }

    fn ensure_open(&self) -> Result<(), Error> {
        if self.is_open() {
            Ok(())
        } else {
            Err(Error::closed_session())
        }
    }

    fn binding(&self, model: &'static EntityModel) -> ModelBinding {
        ModelBinding::new(model, self.unit.backend())
    }

    fn index_manager(&self) -> &dyn IndexManager {
        self.index
            .get_or_init(|| {
                debug!(unit = self.unit.name(), "creating index manager");
                self.index_factory.create(&self.unit)
            })
            .as_ref()
    }

    // ---------------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------------

    /// Load one entity by key, answering from the identity cache when possible.
    ///
    /// Returns `Ok(None)` when the backend has no such row.
    pub fn find<E: EntityKind>(&mut self, key: impl Into<Key>) -> Result<Option<Arc<E>>, Error> {
        let key = key.into();

        self.with_metrics(|em| em.find_inner::<E>(key))
    }

    fn find_inner<E: EntityKind>(&mut self, key: Key) -> Result<Option<Arc<E>>, Error> {
        self.ensure_open()?;
        if key.is_empty() {
            return Err(empty_key_error(E::MODEL.path));
        }
        let model = self.metadata.validate(E::MODEL.path)?;

        if let Some(hit) = self.session_mut()?.lookup(model.path, &key) {
            record(MetricsEvent::CacheLookup {
                entity_path: model.path,
                hit: true,
            });
            debug!(entity = model.path, key = %key, "identity cache hit");

            return expect_kind::<E>(hit).map(Some);
        }

        record(MetricsEvent::CacheLookup {
            entity_path: model.path,
            hit: false,
        });
        debug!(entity = model.path, key = %key, "identity cache miss");

        let found = self
            .data
            .find(self.binding(model), &key)
            .map_err(|err| {
                Error::persistence(
                    ErrorOrigin::Data,
                    format!("find {}#{key} failed", model.path),
                    err,
                )
            })?;
        record(MetricsEvent::BackendRead {
            entity_path: model.path,
            rows: u64::from(found.is_some()),
        });

        let Some(found) = found else {
            return Ok(None);
        };
        // Only a row of the requested type may enter the cache.
        let typed = expect_kind::<E>(EntityRef::clone(&found))?;
        if found.model().path == model.path {
            self.session_mut()?.store(key, found, model.cacheable);
        }

        Ok(Some(typed))
    }

    /// Load several entities by key in one backend call.
    ///
    /// An empty key list yields an empty result without touching the backend.
    /// The identity cache is neither consulted nor populated.
    pub fn find_many<E, I, K>(&mut self, keys: I) -> Result<Vec<Arc<E>>, Error>
    where
        E: EntityKind,
        I: IntoIterator<Item = K>,
        K: Into<Key>,
    {
        let keys: Vec<Key> = keys.into_iter().map(Into::into).collect();

        self.with_metrics(|em| em.find_many_inner::<E>(&keys))
    }

    fn find_many_inner<E: EntityKind>(&mut self, keys: &[Key]) -> Result<Vec<Arc<E>>, Error> {
        self.ensure_open()?;
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        if keys.iter().any(Key::is_empty) {
            return Err(empty_key_error(E::MODEL.path));
        }
        let model = self.metadata.validate(E::MODEL.path)?;

        let rows = self
            .data
            .find_many(self.binding(model), keys)
            .map_err(|err| {
                Error::persistence(
                    ErrorOrigin::Data,
                    format!("find of {} {} keys failed", keys.len(), model.path),
                    err,
                )
            })?;

        collect_rows::<E>(model, rows)
    }

    /// Load entities matching every column/value pair in `columns`.
    ///
    /// Same contract as [`find_many`](Self::find_many): empty input is an
    /// empty result, and the identity cache is bypassed.
    pub fn find_by_columns<E: EntityKind>(
        &mut self,
        columns: &BTreeMap<String, String>,
    ) -> Result<Vec<Arc<E>>, Error> {
        self.with_metrics(|em| em.find_by_columns_inner::<E>(columns))
    }

    fn find_by_columns_inner<E: EntityKind>(
        &mut self,
        columns: &BTreeMap<String, String>,
    ) -> Result<Vec<Arc<E>>, Error> {
        self.ensure_open()?;
        if columns.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(column) = columns.keys().find(|column| column.trim().is_empty()) {
            return Err(Error::validation(
                ErrorOrigin::Session,
                format!("column name '{column}' for '{}' must not be empty", E::MODEL.path),
            ));
        }
        let model = self.metadata.validate(E::MODEL.path)?;

        let rows = self
            .data
            .find_by_columns(self.binding(model), columns)
            .map_err(|err| {
                Error::persistence(
                    ErrorOrigin::Data,
                    format!("find of {} by columns failed", model.path),
                    err,
                )
            })?;

        collect_rows::<E>(model, rows)
    }

    // ---------------------------------------------------------------------
    // Writes
    // ---------------------------------------------------------------------

    /// Insert `entity` and everything it cascades PERSIST to.
    pub fn persist(&mut self, entity: EntityRef) -> Result<(), Error> {
        self.with_metrics(|em| em.apply(CascadeType::Persist, &entity))
            .map(|_| ())
    }

    /// Update `entity` and everything it cascades MERGE to.
    ///
    /// Returns the instance now held by this session.
    pub fn merge(&mut self, entity: EntityRef) -> Result<EntityRef, Error> {
        self.with_metrics(|em| em.apply(CascadeType::Merge, &entity))?;

        Ok(entity)
    }

    /// Delete `entity` and everything it cascades REMOVE to.
    pub fn remove(&mut self, entity: EntityRef) -> Result<(), Error> {
        self.with_metrics(|em| em.apply(CascadeType::Remove, &entity))
            .map(|_| ())
    }

    // Resolve the batch up front, then apply it object by object.
    fn apply(&mut self, op: CascadeType, root: &EntityRef) -> Result<usize, Error> {
        self.ensure_open()?;
        let model = self.metadata.validate(root.model().path)?;

        let batch =
            CascadeResolver::new(&self.metadata).resolve(root, op, self.unit.backend())?;
        record(MetricsEvent::CascadeResolved {
            entity_path: model.path,
            emitted: batch.len() as u64,
        });
        debug!(
            entity = model.path,
            op = %op,
            objects = batch.len(),
            "cascade resolved"
        );

        for (position, entity) in batch.iter().enumerate() {
            if let Err(err) = self.apply_one(op, entity) {
                warn!(
                    entity = entity.path(),
                    key = %entity.key(),
                    op = %op,
                    applied = position,
                    remaining = batch.len() - position,
                    "batch aborted; applied objects are not rolled back"
                );
                return Err(err);
            }
        }

        Ok(batch.len())
    }

    fn apply_one(&mut self, op: CascadeType, entity: &EnhancedEntity) -> Result<(), Error> {
        let (pre, post, kind) = match op {
            CascadeType::Persist => (HookKind::PrePersist, HookKind::PostPersist, WriteKind::Persist),
            CascadeType::Merge => (HookKind::PreUpdate, HookKind::PostUpdate, WriteKind::Merge),
            CascadeType::Remove => (HookKind::PreRemove, HookKind::PostRemove, WriteKind::Remove),
        };
        let identity = entity.identity();

        self.listeners.fire(pre, entity)?;

        let written = match op {
            CascadeType::Persist => self.data.persist(entity),
            CascadeType::Merge => self.data.merge(entity),
            CascadeType::Remove => self.data.remove(entity),
        };
        written.map_err(|err| {
            Error::persistence(ErrorOrigin::Data, format!("{op} of {identity} failed"), err)
        })?;

        match op {
            CascadeType::Persist | CascadeType::Merge => {
                let indexed = if op == CascadeType::Persist {
                    self.index_manager().write(entity.binding(), entity.entity())
                } else {
                    self.index_manager().update(entity.binding(), entity.entity())
                };
                indexed.map_err(|err| {
                    Error::persistence(
                        ErrorOrigin::Index,
                        format!("index {op} of {identity} failed"),
                        err,
                    )
                })?;

                self.session_mut()?.store(
                    entity.key().clone(),
                    EntityRef::clone(entity.entity()),
                    entity.model().cacheable,
                );
            }
            CascadeType::Remove => {
                if self
                    .session_mut()?
                    .remove(entity.path(), entity.key())
                    .is_some()
                {
                    record(MetricsEvent::CacheEvict {
                        entity_path: entity.path(),
                    });
                }

                self.index_manager()
                    .remove(entity.binding(), entity.entity(), entity.key())
                    .map_err(|err| {
                        Error::persistence(
                            ErrorOrigin::Index,
                            format!("index remove of {identity} failed"),
                            err,
                        )
                    })?;
            }
        }

        record(MetricsEvent::EntityWrite {
            kind,
            entity_path: entity.path(),
        });
        debug!(entity = entity.path(), key = %entity.key(), op = %op, "object applied");

        self.listeners.fire(post, entity)?;

        Ok(())
    }

    // ---------------------------------------------------------------------
    // Session control
    // ---------------------------------------------------------------------

    /// Writes are applied immediately; this only checks the session is open.
    pub fn flush(&self) -> Result<(), Error> {
        self.ensure_open()
    }

    /// Whether this exact instance is the one the identity cache holds.
    pub fn contains(&mut self, entity: &EntityRef) -> Result<bool, Error> {
        self.ensure_open()?;
        self.metadata.validate(entity.model().path)?;

        let Some(key) = entity.primary_key() else {
            return Ok(false);
        };

        Ok(self.session_mut()?.contains_instance(&key, entity))
    }

    /// Empty the identity cache and release per-session connection resources.
    pub fn clear(&mut self) -> Result<(), Error> {
        let session = self.session_mut()?;
        let evicted = session.len();
        session.clear();
        self.client.release();

        debug!(unit = self.unit.name(), evicted, "session cleared");
        Ok(())
    }

    /// Close the session. Repeated calls are harmless.
    pub fn close(&mut self) {
        if let Some(session) = self.session.take() {
            debug!(unit = self.unit.name(), cached = session.len(), "entity manager closed");
        }
    }

    /// Wrap query text for the unit's query dialect.
    pub fn create_query(&self, text: &str) -> Result<NativeQuery, Error> {
        self.ensure_open()?;
        if text.trim().is_empty() {
            return Err(Error::validation(
                ErrorOrigin::Session,
                "query text must not be empty",
            ));
        }

        Ok(NativeQuery::new(self.unit.name(), self.unit.dialect(), text))
    }
}

impl fmt::Debug for EntityManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityManager")
            .field("unit", &self.unit.name())
            .field("backend", &self.unit.backend())
            .field("open", &self.is_open())
            .field("session", &self.session)
            .field("index_ready", &self.index.get().is_some())
            .finish_non_exhaustive()
    }
}

fn empty_key_error(path: &str) -> Error {
    Error::validation(
        ErrorOrigin::Session,
        format!("primary key for '{path}' must not be empty"),
    )
}

// Recover the caller's type from a handle the backend or cache produced.
fn expect_kind<E: EntityKind>(entity: EntityRef) -> Result<Arc<E>, Error> {
    let found = entity.model().path;

    downcast_entity::<E>(entity).ok_or_else(|| {
        Error::new(
            ErrorClass::Persistence,
            ErrorOrigin::Data,
            format!("expected '{}' but received '{found}'", E::MODEL.path),
        )
    })
}

fn collect_rows<E: EntityKind>(
    model: &'static EntityModel,
    rows: Vec<EntityRef>,
) -> Result<Vec<Arc<E>>, Error> {
    record(MetricsEvent::BackendRead {
        entity_path: model.path,
        rows: rows.len() as u64,
    });

    rows.into_iter().map(expect_kind::<E>).collect()
}
