//! Application error types.

use domain::DomainError;
use stock_store::StoreError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that stop the stock report.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Logging setup failed: {0}")]
    Tracing(#[from] tracing_subscriber::util::TryInitError),

    /// The store could not be opened or migrated.
    #[error("Stock store error: {0}")]
    Store(#[from] StoreError),

    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
}
