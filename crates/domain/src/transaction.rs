//! Commit-or-rollback handling shared by the services.

use stock_store::StockTransaction;

use crate::error::DomainError;

/// Ends a transaction according to the outcome of the work done in it.
///
/// A successful result is committed; a failure rolls the transaction back
/// and is returned unchanged. A failed rollback is only logged, since the
/// transaction is discarded by the store anyway.
pub(crate) async fn finish<T>(
    tx: Box<dyn StockTransaction>,
    result: Result<T, DomainError>,
) -> Result<T, DomainError> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!(error = %rollback_err, "Rollback failed");
            }
            Err(err)
        }
    }
}

/// Rolls back a read-only transaction and returns its result.
pub(crate) async fn discard<T>(
    tx: Box<dyn StockTransaction>,
    result: Result<T, DomainError>,
) -> Result<T, DomainError> {
    if let Err(rollback_err) = tx.rollback().await {
        tracing::warn!(error = %rollback_err, "Rollback failed");
    }
    result
}
