//! Shared fixtures for unit tests: blog entities, a call journal, and
//! recording fakes for every external collaborator.


pub use entity::*;

use crate::{
    db::{
        cache::EntityIdentity,
        cascade::EnhancedEntity,
        port::{DataManager, IndexManager, IndexManagerFactory},
        registry::{Client, ClientIdentity, ClientRef, Connector, PersistenceUnit},
    },
    error::ExternalError,
    key::Key,
    model::{BackendKind, ModelBinding},
    traits::EntityRef,
};
use parking_lot::Mutex;
use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

///
/// Journal
/// Ordered, shareable log of collaborator calls.
///

#[derive(Clone, Debug, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    /// Entries starting with `prefix`, prefix included.
    pub fn filtered(&self, prefix: &str) -> Vec<String> {
        self.0
            .lock()
            .iter()
            .filter(|entry| entry.starts_with(prefix))
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }
}

/// Unit bound to a column backend on a fixed local node.
pub fn column_unit(name: &str) -> PersistenceUnit {
    PersistenceUnit::new(ClientIdentity::new(
        ["10.0.0.1"],
        9042,
        "blog",
        BackendKind::Column,
        name,
    ))
}

/// Unit bound to a document backend.
pub fn document_unit(name: &str) -> PersistenceUnit {
    PersistenceUnit::new(ClientIdentity::new(
        ["10.0.0.2"],
        27017,
        "blog",
        BackendKind::Document,
        name,
    ))
}

///
/// RecordingDataManager
///
/// In-memory rows keyed by identity. Every write is journaled as
/// `"<op> <path>#<key>"`; a write to the identity named by `fail_on`
/// fails instead.
///

#[derive(Default)]
pub struct RecordingDataManager {
    journal: Journal,
    rows: Mutex<HashMap<EntityIdentity, EntityRef>>,
    fail_on: Mutex<Option<String>>,
    reads: AtomicUsize,
}

impl RecordingDataManager {
    pub fn new(journal: &Journal) -> Arc<Self> {
        Arc::new(Self {
            journal: journal.clone(),
            ..Self::default()
        })
    }

    /// Fail every write whose identity renders as `identity`.
    pub fn fail_on(&self, identity: &str) {
        *self.fail_on.lock() = Some(identity.to_string());
    }

    /// Insert a row without journaling it.
    pub fn seed(&self, entity: EntityRef) {
        let key = entity.primary_key().expect("seeded entity should be keyed");
        let identity = EntityIdentity::new(entity.model().path, key);
        self.rows.lock().insert(identity, entity);
    }

    pub fn contains(&self, path: &'static str, key: impl Into<Key>) -> bool {
        self.rows
            .lock()
            .contains_key(&EntityIdentity::new(path, key.into()))
    }

    /// Number of read calls served so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn write(&self, op: &str, entity: &EnhancedEntity) -> Result<(), ExternalError> {
        let identity = entity.identity();
        if self.fail_on.lock().as_deref() == Some(identity.to_string().as_str()) {
            return Err(ExternalError::new(format!("{op} rejected for {identity}")));
        }

        self.journal.push(format!("{op} {identity}"));
        if op == "remove" {
            self.rows.lock().remove(&identity);
        } else {
            self.rows
                .lock()
                .insert(identity, EntityRef::clone(entity.entity()));
        }

        Ok(())
    }
}

impl DataManager for RecordingDataManager {
    fn find(&self, binding: ModelBinding, key: &Key) -> Result<Option<EntityRef>, ExternalError> {
        self.reads.fetch_add(1, Ordering::SeqCst);

        Ok(self
            .rows
            .lock()
            .get(&EntityIdentity::new(binding.path(), key.clone()))
            .cloned())
    }

    fn find_many(
        &self,
        binding: ModelBinding,
        keys: &[Key],
    ) -> Result<Vec<EntityRef>, ExternalError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let rows = self.rows.lock();

        Ok(keys
            .iter()
            .filter_map(|key| rows.get(&EntityIdentity::new(binding.path(), key.clone())))
            .cloned()
            .collect())
    }

    fn find_by_columns(
        &self,
        binding: ModelBinding,
        columns: &BTreeMap<String, String>,
    ) -> Result<Vec<EntityRef>, ExternalError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let Some(wanted) = columns.get(binding.model.primary_key) else {
            return Ok(Vec::new());
        };

        Ok(self
            .rows
            .lock()
            .iter()
            .filter(|(identity, _)| {
                identity.path == binding.path() && identity.key.to_string() == *wanted
            })
            .map(|(_, entity)| EntityRef::clone(entity))
            .collect())
    }

    fn persist(&self, entity: &EnhancedEntity) -> Result<(), ExternalError> {
        self.write("persist", entity)
    }

    fn merge(&self, entity: &EnhancedEntity) -> Result<(), ExternalError> {
        self.write("merge", entity)
    }

    fn remove(&self, entity: &EnhancedEntity) -> Result<(), ExternalError> {
        self.write("remove", entity)
    }
}

///
/// RecordingIndexManager
/// Journals `"index <op> <path>#<key>"` for every call.
///

#[derive(Debug)]
pub struct RecordingIndexManager {
    journal: Journal,
}

impl RecordingIndexManager {
    fn log(&self, op: &str, binding: ModelBinding, key: Option<Key>) {
        let key = key.map_or_else(|| "?".to_string(), |key| key.to_string());
        self.journal
            .push(format!("index {op} {}#{key}", binding.path()));
    }
}

impl IndexManager for RecordingIndexManager {
    fn write(&self, binding: ModelBinding, entity: &EntityRef) -> Result<(), ExternalError> {
        self.log("write", binding, entity.primary_key());
        Ok(())
    }

    fn update(&self, binding: ModelBinding, entity: &EntityRef) -> Result<(), ExternalError> {
        self.log("update", binding, entity.primary_key());
        Ok(())
    }

    fn remove(
        &self,
        binding: ModelBinding,
        _entity: &EntityRef,
        key: &Key,
    ) -> Result<(), ExternalError> {
        self.log("remove", binding, Some(key.clone()));
        Ok(())
    }
}

///
/// RecordingIndexFactory
///

#[derive(Debug, Default)]
pub struct RecordingIndexFactory {
    journal: Journal,
    created: AtomicUsize,
}

impl RecordingIndexFactory {
    pub fn new(journal: &Journal) -> Arc<Self> {
        Arc::new(Self {
            journal: journal.clone(),
            created: AtomicUsize::new(0),
        })
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl IndexManagerFactory for RecordingIndexFactory {
    fn create(&self, _unit: &PersistenceUnit) -> Box<dyn IndexManager> {
        self.created.fetch_add(1, Ordering::SeqCst);

        Box::new(RecordingIndexManager {
            journal: self.journal.clone(),
        })
    }
}

///
/// FakeClient
///

#[derive(Debug)]
pub struct FakeClient {
    backend: BackendKind,
    releases: AtomicUsize,
    shutdowns: AtomicUsize,
}

impl FakeClient {
    pub fn new(backend: BackendKind) -> Arc<Self> {
        Arc::new(Self {
            backend,
            releases: AtomicUsize::new(0),
            shutdowns: AtomicUsize::new(0),
        })
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

impl Client for FakeClient {
    fn backend(&self) -> BackendKind {
        self.backend
    }

    fn release(&self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }

    fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

///
/// CountingConnector
/// Hands out `FakeClient`s and keeps every one it created.
///

#[derive(Debug, Default)]
pub struct CountingConnector {
    connects: AtomicUsize,
    clients: Mutex<Vec<Arc<FakeClient>>>,
    refuse: bool,
}

impl CountingConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Connector whose every attempt fails.
    pub fn refusing() -> Arc<Self> {
        Arc::new(Self {
            refuse: true,
            ..Self::default()
        })
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn clients(&self) -> Vec<Arc<FakeClient>> {
        self.clients.lock().clone()
    }
}

impl Connector for CountingConnector {
    fn connect(&self, identity: &ClientIdentity) -> Result<ClientRef, ExternalError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.refuse {
            return Err(ExternalError::new(format!(
                "connection refused by {}",
                identity.nodes().join(",")
            )));
        }

        let client = FakeClient::new(identity.backend());
        self.clients.lock().push(Arc::clone(&client));

        Ok(client as ClientRef)
    }
}
