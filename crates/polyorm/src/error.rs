//! Error types for polyorm

use crate::param::ParamMap;
use thiserror::Error;

/// Result type alias for polyorm operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Boxed executor failure carried by [`OrmError::Execution`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error types for compilation and execution.
#[derive(Debug, Error)]
pub enum OrmError {
    /// Invalid entity metadata (missing or duplicate primary key, empty field list)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A filter, sort key, projection or assignment names an unmapped property
    #[error("Field '{field}' not found on entity '{entity}'")]
    FieldNotFound { entity: String, field: String },

    /// The predicate tree has a shape the compiler cannot reduce
    #[error("Unsupported predicate: {0}")]
    UnsupportedPredicate(String),

    /// UPDATE/DELETE/list without any filter
    #[error("Unconditional operation rejected: {0}")]
    UnconditionalOperation(String),

    /// Malformed pagination continuation token
    #[error("Invalid cursor token: {0}")]
    InvalidCursor(String),

    /// The executor failed to run a compiled statement
    #[error("Execution error: {source} (statement: {sql})")]
    Execution {
        sql: String,
        params: ParamMap,
        #[source]
        source: BoxError,
    },

    /// Record decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Pool error
    #[cfg(feature = "pool")]
    #[error("Pool error: {0}")]
    Pool(String),

    /// Statement timeout
    #[error("Statement timeout after {0:?}")]
    Timeout(std::time::Duration),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl OrmError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a field-not-found error for an entity property
    pub fn field_not_found(entity: impl Into<String>, field: impl Into<String>) -> Self {
        Self::FieldNotFound {
            entity: entity.into(),
            field: field.into(),
        }
    }

    /// Create an unsupported-predicate error
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedPredicate(message.into())
    }

    /// Create an unconditional-operation error
    pub fn unconditional(message: impl Into<String>) -> Self {
        Self::UnconditionalOperation(message.into())
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Wrap an executor failure together with the statement that caused it.
    pub fn execution(
        sql: impl Into<String>,
        params: ParamMap,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Execution {
            sql: sql.into(),
            params,
            source: source.into(),
        }
    }

    /// Check if this is a rejected unconditional operation
    pub fn is_unconditional(&self) -> bool {
        matches!(self, Self::UnconditionalOperation(_))
    }

    /// Check if this is a field-not-found error
    pub fn is_field_not_found(&self) -> bool {
        matches!(self, Self::FieldNotFound { .. })
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Duplicate an error a builder recorded earlier.
    ///
    /// Builders only record compile errors, which are plain data; anything
    /// else degrades to [`OrmError::Other`] with the same message.
    pub(crate) fn replay(&self) -> Self {
        match self {
            Self::Configuration(m) => Self::Configuration(m.clone()),
            Self::FieldNotFound { entity, field } => Self::FieldNotFound {
                entity: entity.clone(),
                field: field.clone(),
            },
            Self::UnsupportedPredicate(m) => Self::UnsupportedPredicate(m.clone()),
            Self::UnconditionalOperation(m) => Self::UnconditionalOperation(m.clone()),
            Self::InvalidCursor(m) => Self::InvalidCursor(m.clone()),
            other => Self::Other(other.to_string()),
        }
    }

    /// Whether this error was raised while compiling, before touching a backend.
    pub fn is_compile_error(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_)
                | Self::FieldNotFound { .. }
                | Self::UnsupportedPredicate(_)
                | Self::UnconditionalOperation(_)
                | Self::InvalidCursor(_)
        )
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for OrmError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_not_found_message_names_entity_and_field() {
        let err = OrmError::field_not_found("User", "Nickname");
        assert_eq!(err.to_string(), "Field 'Nickname' not found on entity 'User'");
        assert!(err.is_field_not_found());
        assert!(err.is_compile_error());
    }

    #[test]
    fn execution_error_keeps_statement() {
        let err = OrmError::execution("DELETE FROM t", ParamMap::new(), "boom");
        assert!(err.to_string().contains("DELETE FROM t"));
        assert!(!err.is_compile_error());
    }
}
