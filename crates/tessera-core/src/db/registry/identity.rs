use crate::model::BackendKind;
use serde::{Deserialize, Serialize};
use std::fmt;

///
/// ClientIdentity
///
/// Logical identity of one backend connection. Connection reuse is decided
/// by value equality over every field.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct ClientIdentity {
    nodes: Vec<String>,
    port: u16,
    keyspace: String,
    backend: BackendKind,
    persistence_unit: String,
}

impl ClientIdentity {
    pub fn new(
        nodes: impl IntoIterator<Item = impl Into<String>>,
        port: u16,
        keyspace: impl Into<String>,
        backend: BackendKind,
        persistence_unit: impl Into<String>,
    ) -> Self {
        Self {
            nodes: nodes.into_iter().map(Into::into).collect(),
            port,
            keyspace: keyspace.into(),
            backend,
            persistence_unit: persistence_unit.into(),
        }
    }

    #[must_use]
    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    #[must_use]
    pub fn keyspace(&self) -> &str {
        &self.keyspace
    }

    #[must_use]
    pub const fn backend(&self) -> BackendKind {
        self.backend
    }

    #[must_use]
    pub fn persistence_unit(&self) -> &str {
        &self.persistence_unit
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}://{}:{}/{} ({})",
            self.backend,
            self.nodes.join(","),
            self.port,
            self.keyspace,
            self.persistence_unit
        )
    }
}
