//! Session orchestration: metadata, cascade resolution, the identity cache,
//! the client registry, lifecycle listeners, and the entity manager façade.

pub mod cache;
pub mod cascade;
pub mod lifecycle;
pub mod metadata;
pub mod port;
pub mod query;
pub mod registry;
pub mod session;

// re-exports
pub use cache::{EntityIdentity, SessionCache};
pub use cascade::{CascadeResolver, EnhancedEntity, ForeignKeys, ResolveError};
pub use lifecycle::{HookKind, LifecycleListeners, Listener};
pub use metadata::{MetadataError, MetadataRegistry};
pub use port::{DataManager, IndexManager, IndexManagerFactory};
pub use query::{NativeQuery, QueryDialect};
pub use registry::{
    Client, ClientIdentity, ClientRef, ClientRegistry, Connector, PersistenceUnit, RegistryError,
};
pub use session::{EntityManager, EntityManagerConfig};
