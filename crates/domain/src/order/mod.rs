//! Order aggregate and the stock-sufficiency guard.

mod aggregate;
mod service;
mod value_objects;

pub use aggregate::Order;
pub use service::OrderService;
pub use value_objects::{OrderLine, OrderReference};

use common::{DishId, IngredientId, OrderId, OrderStatus, StockValue};
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// A delivered order can no longer change status.
    #[error("Order {reference} is already delivered and cannot be set to {attempted}")]
    TerminalStateViolation {
        reference: OrderReference,
        attempted: OrderStatus,
    },

    /// An ingredient does not cover what the order needs.
    #[error(
        "Insufficient stock of {ingredient_name} ({ingredient_id}) for order {reference}: needed {needed}, available {}",
        display_available(.available)
    )]
    InsufficientStock {
        reference: OrderReference,
        ingredient_id: IngredientId,
        ingredient_name: String,
        needed: Decimal,
        available: Option<StockValue>,
    },

    /// Invalid quantity.
    #[error("Invalid quantity for dish {dish_id}: must be greater than 0")]
    InvalidQuantity { dish_id: DishId },

    /// Order reference is empty.
    #[error("Order reference must not be empty")]
    EmptyReference,

    /// Order has already been placed.
    #[error("Order {reference} has already been placed with id {id}")]
    AlreadyPlaced { reference: OrderReference, id: OrderId },
}

fn display_available(available: &Option<StockValue>) -> String {
    match available {
        Some(value) => value.to_string(),
        None => "none".to_string(),
    }
}
