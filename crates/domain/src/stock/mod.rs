//! Ingredient ledgers and point-in-time stock valuation.

mod ledger;
mod service;
mod valuation;

pub use ledger::Ledger;
pub use service::StockService;
pub use valuation::{DelegatedReduction, LocalReduction, ValuationMode, ValuationStrategy};

use common::{IngredientId, Unit};
use thiserror::Error;

/// Errors raised while valuing a ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StockError {
    /// The ledger mixes units; quantities are never converted.
    #[error("Ingredient {ingredient_name} ({ingredient_id}) has movements in several units: {}", join_units(.units))]
    MultipleUnits {
        ingredient_id: IngredientId,
        ingredient_name: String,
        units: Vec<Unit>,
    },

    /// A sum of quantities left the representable decimal range.
    #[error("Stock quantity of {ingredient_name} ({ingredient_id}) overflowed")]
    QuantityOverflow {
        ingredient_id: IngredientId,
        ingredient_name: String,
    },
}

fn join_units(units: &[Unit]) -> String {
    units
        .iter()
        .map(Unit::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
