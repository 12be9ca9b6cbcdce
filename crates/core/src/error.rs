use thiserror::Error;

/// Shared error type used across all explorer crates.
#[derive(Debug, Error)]
pub enum AppError {
    /// The chain node could not be reached or answered with a failure.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Input that can never succeed on retry (malformed address, hash, ...).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Compiler error: {0}")]
    Compiler(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("{operation} failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        operation: String,
        attempts: u32,
        #[source]
        source: Box<AppError>,
    },

    #[error(transparent)]
    Other(#[from] eyre::Error),
}

impl AppError {
    /// Whether the failure is worth another attempt: unreachable or failing
    /// node and store connections are, everything else is terminal.
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::Rpc(_) | AppError::Database(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, AppError::Cancelled)
    }
}
