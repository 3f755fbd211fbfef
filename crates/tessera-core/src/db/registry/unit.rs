use crate::{db::query::QueryDialect, db::registry::ClientIdentity, model::BackendKind};

///
/// PersistenceUnit
///
/// Named binding of a set of entity types to one backend connection
/// identity. The query dialect is fixed here, once per unit.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PersistenceUnit {
    name: String,
    identity: ClientIdentity,
    dialect: QueryDialect,
}

impl PersistenceUnit {
    /// Build a unit; the identity's persistence-unit name is the unit name.
    #[must_use]
    pub fn new(identity: ClientIdentity) -> Self {
        let dialect = QueryDialect::for_backend(identity.backend());

        Self {
            name: identity.persistence_unit().to_string(),
            identity,
            dialect,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn identity(&self) -> &ClientIdentity {
        &self.identity
    }

    #[must_use]
    pub const fn backend(&self) -> BackendKind {
        self.identity.backend()
    }

    #[must_use]
    pub const fn dialect(&self) -> QueryDialect {
        self.dialect
    }
}
