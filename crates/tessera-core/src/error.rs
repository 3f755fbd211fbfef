use std::{error::Error as StdError, fmt};
use thiserror::Error as ThisError;

/// Boxed cause carried across collaborator boundaries.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

///
/// Error
///
/// Top-level error with a stable class + origin taxonomy.
/// Every failure surfaced by the engine is wrapped in this type; the
/// original cause (collaborator, listener, connector) stays reachable
/// through `std::error::Error::source`.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct Error {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,

    #[source]
    cause: Option<BoxError>,
}

impl Error {
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
            cause: None,
        }
    }

    /// Attach the original cause.
    #[must_use]
    pub fn with_cause(mut self, cause: impl Into<BoxError>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Construct a validation error for a bad argument.
    pub(crate) fn validation(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Validation, origin, message)
    }

    /// Construct a persistence error wrapping the failing step's cause.
    pub(crate) fn persistence(
        origin: ErrorOrigin,
        message: impl Into<String>,
        cause: impl Into<BoxError>,
    ) -> Self {
        Self::new(ErrorClass::Persistence, origin, message).with_cause(cause)
    }

    /// Construct the error returned by every operation on a closed session.
    pub(crate) fn closed_session() -> Self {
        Self::new(
            ErrorClass::ClosedSession,
            ErrorOrigin::Session,
            "entity manager already closed",
        )
    }

    #[must_use]
    pub const fn is_closed_session(&self) -> bool {
        matches!(self.class, ErrorClass::ClosedSession)
    }

    /// Borrow the original cause, if any.
    #[must_use]
    pub fn cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.cause.as_deref()
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }
}

///
/// ExternalError
///
/// Failure reported by an external collaborator: data manager, index
/// manager, connector, or lifecycle listener.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct ExternalError {
    pub message: String,

    #[source]
    cause: Option<BoxError>,
}

impl ExternalError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: None,
        }
    }

    #[must_use]
    pub fn with_cause(mut self, cause: impl Into<BoxError>) -> Self {
        self.cause = Some(cause.into());
        self
    }
}

///
/// ErrorClass
/// What went wrong, independent of where.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    /// Bad or empty argument.
    Validation,
    /// Missing or invalid entity metadata.
    Metadata,
    /// Cascade-graph traversal failed before any write.
    Resolution,
    /// Backend connection could not be established.
    Connection,
    /// A step of the per-object write loop failed.
    Persistence,
    /// Operation attempted after `close()`.
    ClosedSession,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Validation => "validation",
            Self::Metadata => "metadata",
            Self::Resolution => "resolution",
            Self::Connection => "connection",
            Self::Persistence => "persistence",
            Self::ClosedSession => "closed_session",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Which component raised the error.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Session,
    Cascade,
    Cache,
    Registry,
    Lifecycle,
    Data,
    Index,
    Config,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Session => "session",
            Self::Cascade => "cascade",
            Self::Cache => "cache",
            Self::Registry => "registry",
            Self::Lifecycle => "lifecycle",
            Self::Data => "data",
            Self::Index => "index",
            Self::Config => "config",
        };
        write!(f, "{label}")
    }
}
