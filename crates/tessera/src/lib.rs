//! ## Crate layout
//! - `core`: entity metadata, cascade resolution, the identity cache, the
//!   client registry, and the entity manager.
//! - `config`: persistence-unit configuration loaded from TOML.
//! - [`Persistence`]: process-level bootstrap wiring configuration, the
//!   client registry, and storage collaborators into entity managers.
//!
//! Library code never installs a `tracing` subscriber; binaries decide.

pub use tessera_core as core;

pub mod config;
mod persistence;

pub use core::{Error, db, error, key, model, obs, traits};
pub use persistence::{Persistence, PersistenceBuilder};

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        Persistence,
        config::PersistenceConfig,
        core::{
            db::{ClientIdentity, EnhancedEntity, LifecycleListeners},
            prelude::*,
        },
    };
}
