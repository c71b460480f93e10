//! Domain error types.

use common::{DishId, IngredientId, OrderId};
use stock_store::StoreError;
use thiserror::Error;

use crate::order::OrderError;
use crate::stock::StockError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in the stock store.
    #[error("Stock store error: {0}")]
    Store(#[from] StoreError),

    /// Stored stock data is inconsistent.
    #[error("Stock error: {0}")]
    Stock(#[from] StockError),

    /// An order business rule was violated.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    #[error("Ingredient not found: {0}")]
    IngredientNotFound(IngredientId),

    #[error("Dish not found: {0}")]
    DishNotFound(DishId),

    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),
}

/// Broad classification of a [`DomainError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Stored data breaks an invariant (e.g. a ledger with several units).
    DataIntegrity,
    /// The request was refused by a business rule.
    BusinessRule,
    /// A referenced ingredient, dish or order does not exist.
    NotFound,
    /// The store failed; the operation may be retried as a whole.
    Collaborator,
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::Stock(_) | DomainError::Store(StoreError::OutOfRange { .. }) => {
                ErrorKind::DataIntegrity
            }
            DomainError::Order(_) => ErrorKind::BusinessRule,
            DomainError::IngredientNotFound(_)
            | DomainError::DishNotFound(_)
            | DomainError::OrderNotFound(_)
            | DomainError::Store(StoreError::OrderNotFound(_)) => ErrorKind::NotFound,
            DomainError::Store(_) => ErrorKind::Collaborator,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            DomainError::DishNotFound(DishId::new()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            DomainError::Store(StoreError::TransactionConflict("could not serialize".into()))
                .kind(),
            ErrorKind::Collaborator
        );
        assert_eq!(
            DomainError::Store(StoreError::OrderNotFound(OrderId::new(7))).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            DomainError::Store(StoreError::OutOfRange {
                column: "actual_stock",
                value: "overflow".into(),
            })
            .kind(),
            ErrorKind::DataIntegrity
        );
        assert_eq!(
            DomainError::Stock(StockError::QuantityOverflow {
                ingredient_id: IngredientId::new(),
                ingredient_name: "Laitue".into(),
            })
            .kind(),
            ErrorKind::DataIntegrity
        );
        assert_eq!(
            DomainError::Order(OrderError::EmptyReference).kind(),
            ErrorKind::BusinessRule
        );
    }
}
