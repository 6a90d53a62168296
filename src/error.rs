//! Unified error handling for the exercise-log engine.
//!
//! Lookups that have a safe default (route names, place names) resolve to
//! sentinels and never reach this type. Errors surface only where a caller
//! cannot reasonably proceed, such as fetching an exercise by id.

use thiserror::Error;

/// Unified error type for engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A direct fetch by id or name found nothing
    #[error("{entity} '{key}' not found")]
    NotFound { entity: &'static str, key: String },

    /// A sort mode was requested in a listing context that has no column for it
    #[error("sort mode {mode} is not supported when listing {context}")]
    UnsupportedSortMode {
        mode: &'static str,
        context: &'static str,
    },

    /// The store rejected a query the translator built
    #[error("malformed query: {message}")]
    MalformedQuery { message: String },

    /// Invalid engine configuration
    #[error("configuration error: {message}")]
    Config { message: String },

    /// Any other store failure
    #[error("store error: {0}")]
    Store(#[source] rusqlite::Error),
}

impl From<rusqlite::Error> for EngineError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            // Prepare failures carry the offending SQL
            rusqlite::Error::SqlInputError { msg, .. } => {
                EngineError::MalformedQuery { message: msg }
            }
            // SQLITE_ERROR: syntax errors, unknown tables/columns
            rusqlite::Error::SqliteFailure(code, msg)
                if code.code == rusqlite::ErrorCode::Unknown =>
            {
                EngineError::MalformedQuery {
                    message: msg.unwrap_or_else(|| code.to_string()),
                }
            }
            rusqlite::Error::InvalidColumnName(name) => EngineError::MalformedQuery {
                message: format!("unknown column {name}"),
            },
            other => EngineError::Store(other),
        }
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Extension trait for converting an absent lookup into `NotFound`.
pub trait OptionExt<T> {
    /// Convert `None` into a `NotFound` error for the given entity and key.
    fn ok_or_not_found(self, entity: &'static str, key: impl ToString) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self, entity: &'static str, key: impl ToString) -> Result<T> {
        self.ok_or_else(|| EngineError::NotFound {
            entity,
            key: key.to_string(),
        })
    }
}
