//! Shared identifiers and value types for the stock ledger workspace.

mod catalog;
mod error;
mod quantity;
mod status;
mod types;

pub use catalog::Category;
pub use error::ParseSymbolError;
pub use quantity::{StockValue, Unit};
pub use status::{OrderStatus, OrderType};
pub use types::{DishId, IngredientId, MovementId, OrderId};
