//! Value objects for the order domain.

use common::DishId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::OrderError;

/// Human-readable order reference, e.g. `ORD00042`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderReference(String);

impl OrderReference {
    const PREFIX: &'static str = "ORD";

    /// Creates a reference from an existing string.
    pub fn new(reference: impl Into<String>) -> Result<Self, OrderError> {
        let reference = reference.into();
        if reference.trim().is_empty() {
            return Err(OrderError::EmptyReference);
        }
        Ok(Self(reference))
    }

    /// Generates a random reference of the form `ORD` followed by five digits.
    ///
    /// References are not guaranteed unique; the store rejects duplicates.
    pub fn generate() -> Self {
        let digits = Uuid::new_v4().as_u128() % 100_000;
        Self(format!("{}{:05}", Self::PREFIX, digits))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A dish ordered in a given quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    dish_id: DishId,
    quantity: u32,
}

impl OrderLine {
    /// Creates a new order line.
    ///
    /// # Errors
    ///
    /// Returns an error if quantity is zero.
    pub fn new(dish_id: DishId, quantity: u32) -> Result<Self, OrderError> {
        if quantity == 0 {
            return Err(OrderError::InvalidQuantity { dish_id });
        }
        Ok(Self { dish_id, quantity })
    }

    pub fn dish_id(&self) -> DishId {
        self.dish_id
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }
}
