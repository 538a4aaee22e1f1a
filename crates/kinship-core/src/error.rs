use crate::db::association::AssociationError;
use std::fmt;
use thiserror::Error as ThisError;

///
/// InternalError
///
/// Structured runtime error with a stable internal classification.
/// Nested validation failures are never reported through this type; they
/// travel as change set data instead.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct InternalError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,

    /// Optional structured error detail.
    pub detail: Option<ErrorDetail>,
}

impl InternalError {
    #[must_use]
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
            detail: None,
        }
    }

    /// Construct a query-origin configuration error.
    pub(crate) fn query_configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Configuration, ErrorOrigin::Query, message.into())
    }

    /// Construct an association-origin misuse error.
    pub(crate) fn association_misuse(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Misuse, ErrorOrigin::Association, message.into())
    }

    /// Construct a cascade-origin misuse error.
    pub(crate) fn cascade_misuse(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Misuse, ErrorOrigin::Cascade, message.into())
    }

    /// Construct a replace-origin misuse error.
    pub(crate) fn replace_misuse(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Misuse, ErrorOrigin::Replace, message.into())
    }

    /// Construct a replace-origin invalid-state error.
    pub(crate) fn replace_invalid_state(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::InvalidState, ErrorOrigin::Replace, message.into())
    }

    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self.class, ErrorClass::Configuration)
    }

    #[must_use]
    pub const fn is_misuse(&self) -> bool {
        matches!(self.class, ErrorClass::Misuse)
    }

    #[must_use]
    pub const fn is_invalid_state(&self) -> bool {
        matches!(self.class, ErrorClass::InvalidState)
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }
}

///
/// ErrorDetail
///
/// Structured, origin-specific error detail carried by [`InternalError`].
///

#[derive(Debug, ThisError)]
pub enum ErrorDetail {
    #[error("{0}")]
    Association(AssociationError),
}

impl From<AssociationError> for InternalError {
    fn from(err: AssociationError) -> Self {
        Self {
            class: ErrorClass::Configuration,
            origin: ErrorOrigin::Association,
            message: err.to_string(),
            detail: Some(ErrorDetail::Association(err)),
        }
    }
}

///
/// ErrorClass
/// Internal error taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    /// Invalid declaration, raised while a type's schema is being defined.
    Configuration,
    /// Caller logic bug (e.g. a nested delete under an insert).
    Misuse,
    /// Unrecoverable state reached mid-cascade.
    InvalidState,
    Internal,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Configuration => "configuration",
            Self::Misuse => "misuse",
            Self::InvalidState => "invalid_state",
            Self::Internal => "internal",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Schema,
    Association,
    Query,
    Cascade,
    Replace,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Schema => "schema",
            Self::Association => "association",
            Self::Query => "query",
            Self::Cascade => "cascade",
            Self::Replace => "replace",
        };
        write!(f, "{label}")
    }
}
