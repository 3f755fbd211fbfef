//! Module: query
//! Responsibility: pick the query dialect of a persistence unit and hand query
//! text to the external query subsystem.
//! Does not own: parsing, planning, or execution of queries.

use crate::model::BackendKind;
use derive_more::Display;

///
/// QueryDialect
///
/// Query engine family selected once per persistence unit.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum QueryDialect {
    /// Native document-store query language.
    #[display("document")]
    Document,
    /// Queries answered from the secondary index.
    #[display("index")]
    Index,
}

impl QueryDialect {
    #[must_use]
    pub const fn for_backend(backend: BackendKind) -> Self {
        match backend {
            BackendKind::Document => Self::Document,
            BackendKind::Column | BackendKind::Search => Self::Index,
        }
    }
}

///
/// NativeQuery
/// Query text bound to the unit and dialect that must run it.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NativeQuery {
    unit: String,
    dialect: QueryDialect,
    text: String,
}

impl NativeQuery {
    pub(crate) fn new(unit: impl Into<String>, dialect: QueryDialect, text: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            dialect,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn unit(&self) -> &str {
        &self.unit
    }

    #[must_use]
    pub const fn dialect(&self) -> QueryDialect {
        self.dialect
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}
