//! Error types for the permission control service

use thiserror::Error;

/// Errors surfaced by the permission control service.
///
/// The kinds mirror the service boundary: validation failures map to 400,
/// missing entities to 404, store failures to 500. The evaluator itself
/// never produces an error for schema-valid input.
#[derive(Debug, Error)]
pub enum AuthzError {
    /// Malformed input: bad URN, unknown action, schema violation
    #[error("Validation error: {0}")]
    Validation(String),

    /// A required entity was absent from the store
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Which entity was missing (user, document, resource policy)
        entity: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// Transport or I/O failure at the store boundary
    #[error("Store error: {0}")]
    Store(String),

    /// Programmer bug; must not occur for any schema-valid input
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for permission control operations
pub type Result<T> = std::result::Result<T, AuthzError>;
