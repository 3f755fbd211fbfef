//! Module: registry
//! Responsibility: own every live backend connection, keyed by client identity,
//! and the set of configured persistence units.
//! Does not own: wire protocols, retries, or timeouts (connector concerns).
//!
//! Invariants:
//! - One identity maps to at most one connection; equal identities share it.
//! - Connection creation is serialized, so `connect` runs once per identity.
//! - Lookups of an existing connection never perform I/O.
//! - After `shutdown` every held connection has been shut down exactly once
//!   and no new connection can be created.

mod identity;
mod unit;

pub use identity::ClientIdentity;
pub use unit::PersistenceUnit;

use crate::{
    error::{Error, ErrorClass, ErrorOrigin, ExternalError},
    model::BackendKind,
    obs::sink::{MetricsEvent, record},
};
use once_cell::sync::OnceCell;
use parking_lot::{Mutex, RwLock};
use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    sync::Arc,
};
use thiserror::Error as ThisError;
use tracing::{debug, info};

///
/// Client
///
/// Live connection handle owned by the registry. Entity managers hold
/// non-owning clones of the `Arc`.
///

pub trait Client: Send + Sync + fmt::Debug {
    fn backend(&self) -> BackendKind;

    /// Release per-session resources held on this connection.
    fn release(&self);

    /// Close the connection; called once, during registry teardown.
    fn shutdown(&self);
}

/// Shared connection handle.
pub type ClientRef = Arc<dyn Client>;

///
/// Connector
/// Opens a connection for one identity (network I/O).
///

pub trait Connector: Send + Sync {
    fn connect(&self, identity: &ClientIdentity) -> Result<ClientRef, ExternalError>;
}

///
/// RegistryError
///

#[derive(Debug, ThisError)]
pub enum RegistryError {
    #[error("client registry already initialized")]
    AlreadyInitialized,

    #[error("persistence unit '{0}' declared more than once")]
    DuplicateUnit(String),

    #[error("persistence unit '{0}' is not configured")]
    UnknownUnit(String),

    #[error("client registry has been shut down")]
    ShutDown,

    #[error("failed to connect to {identity}")]
    Connect {
        identity: String,
        #[source]
        source: ExternalError,
    },
}

impl RegistryError {
    pub(crate) const fn class(&self) -> ErrorClass {
        match self {
            Self::AlreadyInitialized | Self::DuplicateUnit(_) | Self::UnknownUnit(_) => {
                ErrorClass::Validation
            }
            Self::ShutDown | Self::Connect { .. } => ErrorClass::Connection,
        }
    }
}

impl From<RegistryError> for Error {
    fn from(err: RegistryError) -> Self {
        let class = err.class();
        let message = err.to_string();

        match err {
            RegistryError::Connect { source, .. } => {
                Self::new(class, ErrorOrigin::Registry, message).with_cause(source)
            }
            _ => Self::new(class, ErrorOrigin::Registry, message),
        }
    }
}

///
/// RegistryState
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum RegistryState {
    Open,
    ShutDown,
}

///
/// ClientRegistry
///
/// Process-wide connection registry with an explicit init/shutdown
/// lifecycle. Share it behind an `Arc`.
///

pub struct ClientRegistry {
    connector: Arc<dyn Connector>,
    units: OnceCell<BTreeMap<String, PersistenceUnit>>,
    clients: RwLock<HashMap<ClientIdentity, ClientRef>>,
    // Serializes connection creation and teardown.
    state: Mutex<RegistryState>,
}

impl ClientRegistry {
    /// Create an empty registry that opens connections through `connector`.
    #[must_use]
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            units: OnceCell::new(),
            clients: RwLock::new(HashMap::new()),
            state: Mutex::new(RegistryState::Open),
        }
    }

    /// Register the configured persistence units. Allowed once.
    pub fn init(
        &self,
        units: impl IntoIterator<Item = PersistenceUnit>,
    ) -> Result<(), RegistryError> {
        if *self.state.lock() == RegistryState::ShutDown {
            return Err(RegistryError::ShutDown);
        }

        let mut by_name = BTreeMap::new();
        for unit in units {
            let name = unit.name().to_string();
            if by_name.insert(name.clone(), unit).is_some() {
                return Err(RegistryError::DuplicateUnit(name));
            }
        }

        let count = by_name.len();
        self.units
            .set(by_name)
            .map_err(|_| RegistryError::AlreadyInitialized)?;
        info!(units = count, "persistence units registered");

        Ok(())
    }

    /// Look up a configured persistence unit by name.
    pub fn unit(&self, name: &str) -> Result<&PersistenceUnit, RegistryError> {
        self.units
            .get()
            .and_then(|units| units.get(name))
            .ok_or_else(|| RegistryError::UnknownUnit(name.to_string()))
    }

    /// Iterate configured persistence units in name order.
    pub fn units(&self) -> impl Iterator<Item = &PersistenceUnit> {
        self.units.get().into_iter().flat_map(BTreeMap::values)
    }

    /// Return the existing connection for `identity`, without connecting.
    #[must_use]
    pub fn get(&self, identity: &ClientIdentity) -> Option<ClientRef> {
        self.clients.read().get(identity).cloned()
    }

    /// Return the connection for `identity`, connecting through `connector` on first use.
    pub fn get_or_create(
        &self,
        identity: &ClientIdentity,
        connector: &dyn Connector,
    ) -> Result<ClientRef, RegistryError> {
        if let Some(client) = self.get(identity) {
            return Ok(client);
        }

        let state = self.state.lock();
        if *state == RegistryState::ShutDown {
            return Err(RegistryError::ShutDown);
        }

        // Another caller may have connected while we waited for the lock.
        if let Some(client) = self.get(identity) {
            return Ok(client);
        }

        debug!(identity = %identity, "opening backend connection");
        let client = connector
            .connect(identity)
            .map_err(|source| RegistryError::Connect {
                identity: identity.to_string(),
                source,
            })?;

        self.clients
            .write()
            .insert(identity.clone(), Arc::clone(&client));
        record(MetricsEvent::ConnectionOpened {
            backend: identity.backend(),
        });
        info!(identity = %identity, "backend connection opened");

        Ok(client)
    }

    /// Connect through the registry's own connector.
    pub fn connect(&self, identity: &ClientIdentity) -> Result<ClientRef, RegistryError> {
        self.get_or_create(identity, self.connector.as_ref())
    }

    /// Resolve a unit by name and return its (possibly new) connection.
    pub fn client_for_unit(
        &self,
        name: &str,
    ) -> Result<(PersistenceUnit, ClientRef), RegistryError> {
        let unit = self.unit(name)?.clone();
        let client = self.connect(unit.identity())?;

        Ok((unit, client))
    }

    /// Number of live connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.read().is_empty()
    }

    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        *self.state.lock() == RegistryState::ShutDown
    }

    /// Shut down every held connection. Later calls are no-ops.
    ///
    /// Returns the number of connections closed by this call.
    pub fn shutdown(&self) -> usize {
        let mut state = self.state.lock();
        if *state == RegistryState::ShutDown {
            return 0;
        }
        *state = RegistryState::ShutDown;

        let drained: Vec<_> = self.clients.write().drain().collect();
        for (identity, client) in &drained {
            debug!(identity = %identity, "closing backend connection");
            client.shutdown();
        }
        info!(connections = drained.len(), "client registry shut down");

        drained.len()
    }
}

impl Drop for ClientRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for ClientRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut identities: Vec<_> = self
            .clients
            .read()
            .keys()
            .map(ToString::to_string)
            .collect();
        identities.sort();

        f.debug_struct("ClientRegistry")
            .field("units", &self.units().map(PersistenceUnit::name).collect::<Vec<_>>())
            .field("connections", &identities)
            .field("state", &*self.state.lock())
            .finish()
    }
}
