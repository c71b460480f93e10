use thiserror::Error;

use crate::OrderId;

/// Errors that can occur when interacting with the stock store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The transaction could not be serialized with a concurrent writer.
    /// The first committer wins; the caller must retry the whole operation.
    #[error("Transaction conflict: {0}")]
    TransactionConflict(String),

    /// A row references an ingredient, dish or order that does not exist.
    #[error("Missing reference: {constraint}")]
    MissingReference { constraint: String },

    /// An order with the same reference has already been stored.
    #[error("Duplicate order reference: {0}")]
    DuplicateOrderReference(String),

    /// The order was not found in the store.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// A stored value could not be decoded into its domain type.
    #[error("Cannot decode column {column}: {value:?}")]
    Decode { column: &'static str, value: String },

    /// A value does not fit the column it is written to or summed into.
    #[error("Value {value} is out of range for column {column}")]
    OutOfRange { column: &'static str, value: String },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            match db_err.code().as_deref() {
                // serialization_failure, deadlock_detected
                Some("40001") | Some("40P01") => {
                    return StoreError::TransactionConflict(db_err.message().to_string());
                }
                // foreign_key_violation
                Some("23503") => {
                    return StoreError::MissingReference {
                        constraint: db_err.constraint().unwrap_or_default().to_string(),
                    };
                }
                _ => {}
            }
        }
        StoreError::Database(err)
    }
}

/// Result type for stock store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
