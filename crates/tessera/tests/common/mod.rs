//! Shop-domain entities and in-memory collaborators for integration tests.
#![allow(dead_code)]

use parking_lot::{Mutex, RwLock};
use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        Arc, Once,
        atomic::{AtomicUsize, Ordering},
    },
};
use tessera::{
    db::{
        Client, ClientIdentity, ClientRef, Connector, DataManager, EnhancedEntity, IndexManager,
        IndexManagerFactory, PersistenceUnit,
    },
    error::ExternalError,
    model::ModelBinding,
    prelude::*,
};

pub const SHOP_TOML: &str = r#"
[[unit]]
name = "shop"
backend = "column"
nodes = ["10.1.0.1", "10.1.0.2"]
port = 9042
keyspace = "shop"

[[unit]]
name = "catalog"
backend = "document"
nodes = ["10.1.1.1"]
port = 27017
keyspace = "catalog"
"#;

/// Route tracing output through the test harness.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

///
/// MODELS
///

static ORDER_RELATIONS: [RelationModel; 2] = [
    RelationModel::new("customer", Customer::PATH, Cardinality::One, RelationSide::Owning)
        .cascade(CascadePolicy::PERSIST)
        .foreign_key("customer_id"),
    RelationModel::new("lines", OrderLine::PATH, Cardinality::Many, RelationSide::Inverse)
        .cascade(CascadePolicy::ALL),
];

pub static CUSTOMER_MODEL: EntityModel =
    EntityModel::new(Customer::PATH, "customers", "id", &[], true);
pub static ORDER_MODEL: EntityModel =
    EntityModel::new(Order::PATH, "orders", "id", &ORDER_RELATIONS, true);
pub static ORDER_LINE_MODEL: EntityModel =
    EntityModel::new(OrderLine::PATH, "order_lines", "id", &[], true);

///
/// Customer
///

#[derive(Debug)]
pub struct Customer {
    pub id: u64,
}

impl Customer {
    pub const PATH: &'static str = "shop::Customer";

    pub fn new(id: u64) -> Arc<Self> {
        Arc::new(Self { id })
    }
}

impl Entity for Customer {
    fn model(&self) -> &'static EntityModel {
        Self::MODEL
    }

    fn primary_key(&self) -> Option<Key> {
        Some(Key::from(self.id))
    }

    fn related(&self, _field: &str) -> Option<Vec<EntityRef>> {
        None
    }
}

impl EntityKind for Customer {
    const MODEL: &'static EntityModel = &CUSTOMER_MODEL;
}

///
/// Order
///

#[derive(Debug)]
pub struct Order {
    pub id: String,
    customer: RwLock<Option<Arc<Customer>>>,
    lines: RwLock<Vec<Arc<OrderLine>>>,
}

impl Order {
    pub const PATH: &'static str = "shop::Order";

    pub fn for_customer(id: &str, customer: &Arc<Customer>) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            customer: RwLock::new(Some(Arc::clone(customer))),
            lines: RwLock::new(Vec::new()),
        })
    }

    pub fn add_line(&self, line: &Arc<OrderLine>) {
        self.lines.write().push(Arc::clone(line));
    }
}

impl Entity for Order {
    fn model(&self) -> &'static EntityModel {
        Self::MODEL
    }

    fn primary_key(&self) -> Option<Key> {
        Some(Key::from(self.id.as_str()))
    }

    fn related(&self, field: &str) -> Option<Vec<EntityRef>> {
        match field {
            "customer" => Some(relation_refs(self.customer.read().iter())),
            "lines" => Some(relation_refs(self.lines.read().iter())),
            _ => None,
        }
    }
}

impl EntityKind for Order {
    const MODEL: &'static EntityModel = &ORDER_MODEL;
}

///
/// OrderLine
///

#[derive(Debug)]
pub struct OrderLine {
    pub id: String,
    pub sku: String,
}

impl OrderLine {
    pub const PATH: &'static str = "shop::OrderLine";

    pub fn new(id: &str, sku: &str) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            sku: sku.to_string(),
        })
    }
}

impl Entity for OrderLine {
    fn model(&self) -> &'static EntityModel {
        Self::MODEL
    }

    fn primary_key(&self) -> Option<Key> {
        Some(Key::from(self.id.as_str()))
    }

    fn related(&self, _field: &str) -> Option<Vec<EntityRef>> {
        None
    }
}

impl EntityKind for OrderLine {
    const MODEL: &'static EntityModel = &ORDER_LINE_MODEL;
}

///
/// MemoryStore
/// Data manager over a shared in-memory map, keyed by "path#key".
///

#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: Mutex<HashMap<String, EntityRef>>,
    writes: Mutex<Vec<String>>,
    reads: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().clone()
    }

    pub fn has(&self, path: &str, key: impl Into<Key>) -> bool {
        self.rows
            .lock()
            .contains_key(&format!("{path}#{}", key.into()))
    }
}

impl DataManager for MemoryStore {
    fn find(&self, binding: ModelBinding, key: &Key) -> Result<Option<EntityRef>, ExternalError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.rows.lock().get(&format!("{}#{key}", binding.path())).cloned())
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
            .filter_map(|key| rows.get(&format!("{}#{key}", binding.path())).cloned())
            .collect())
    }

    fn find_by_columns(
        &self,
        _binding: ModelBinding,
        _columns: &BTreeMap<String, String>,
    ) -> Result<Vec<EntityRef>, ExternalError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }

    fn persist(&self, entity: &EnhancedEntity) -> Result<(), ExternalError> {
        let id = entity.identity().to_string();
        self.writes.lock().push(format!("persist {id}"));
        self.rows.lock().insert(id, EntityRef::clone(entity.entity()));
        Ok(())
    }

    fn merge(&self, entity: &EnhancedEntity) -> Result<(), ExternalError> {
        let id = entity.identity().to_string();
        self.writes.lock().push(format!("merge {id}"));
        self.rows.lock().insert(id, EntityRef::clone(entity.entity()));
        Ok(())
    }

    fn remove(&self, entity: &EnhancedEntity) -> Result<(), ExternalError> {
        let id = entity.identity().to_string();
        self.writes.lock().push(format!("remove {id}"));
        self.rows.lock().remove(&id);
        Ok(())
    }
}

///
/// NullIndex
///

#[derive(Debug, Default)]
pub struct NullIndexFactory {
    created: AtomicUsize,
}

impl NullIndexFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

struct NullIndex;

impl IndexManager for NullIndex {
    fn write(&self, _: ModelBinding, _: &EntityRef) -> Result<(), ExternalError> {
        Ok(())
    }

    fn update(&self, _: ModelBinding, _: &EntityRef) -> Result<(), ExternalError> {
        Ok(())
    }

    fn remove(&self, _: ModelBinding, _: &EntityRef, _: &Key) -> Result<(), ExternalError> {
        Ok(())
    }
}

impl IndexManagerFactory for NullIndexFactory {
    fn create(&self, _unit: &PersistenceUnit) -> Box<dyn IndexManager> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Box::new(NullIndex)
    }
}

///
/// StubConnector
///

#[derive(Debug)]
pub struct StubClient {
    pub identity: ClientIdentity,
    pub releases: AtomicUsize,
    pub shutdowns: AtomicUsize,
}

impl Client for StubClient {
    fn backend(&self) -> BackendKind {
        self.identity.backend()
    }

    fn release(&self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }

    fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Default)]
pub struct StubConnector {
    pub opened: Mutex<Vec<Arc<StubClient>>>,
}

impl StubConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn opened(&self) -> Vec<Arc<StubClient>> {
        self.opened.lock().clone()
    }
}

impl Connector for StubConnector {
    fn connect(&self, identity: &ClientIdentity) -> Result<ClientRef, ExternalError> {
        let client = Arc::new(StubClient {
            identity: identity.clone(),
            releases: AtomicUsize::new(0),
            shutdowns: AtomicUsize::new(0),
        });
        self.opened.lock().push(Arc::clone(&client));

        Ok(client as ClientRef)
    }
}

///
/// Shop
/// Fully wired persistence plus handles to its fakes.
///

pub struct Shop {
    pub persistence: Persistence,
    pub store: Arc<MemoryStore>,
    pub index: Arc<NullIndexFactory>,
    pub connector: Arc<StubConnector>,
}

pub fn shop() -> Shop {
    init_tracing();

    let store = MemoryStore::new();
    let index = NullIndexFactory::new();
    let connector = StubConnector::new();
    let config = PersistenceConfig::from_toml_str(SHOP_TOML).expect("shop config should parse");

    let persistence = Persistence::builder(connector.clone())
        .entity::<Customer>()
        .entity::<Order>()
        .entity::<OrderLine>()
        .config(config)
        .data_manager(store.clone())
        .index_manager_factory(index.clone())
        .build()
        .expect("shop persistence should build");

    Shop {
        persistence,
        store,
        index,
        connector,
    }
}
