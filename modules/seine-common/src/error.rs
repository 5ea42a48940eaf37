use thiserror::Error;

/// Errors surfaced by the search/curation core.
#[derive(Debug, Error)]
pub enum SeineError {
    /// A task is missing required parameters; execution never starts.
    #[error("Configuration error: {0}")]
    ConfigValidation(String),

    /// Operation attempted against a workflow in the wrong state.
    #[error("Invalid state: expected {expected}, found {actual}")]
    InvalidState { expected: String, actual: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// External fetch or LLM call failure, surfaced as a failed execution.
    #[error("Backend error: {0}")]
    Backend(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors from the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint fired. Expected during dedup races; callers
    /// branch to the "existing record" path rather than surfacing this.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// A multi-document transaction aborted. The caller must assume zero
    /// effect - the store rolls back fully.
    #[error("Transaction aborted: {0}")]
    Transaction(String),

    #[error("Database error: {0}")]
    Database(String),
}
