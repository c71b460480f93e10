use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use common::{IngredientId, StockValue, Unit};
use rust_decimal::Decimal;
use stock_store::{IngredientRecord, StockMovement};

use super::StockError;

/// An ingredient together with its append-only movement history.
///
/// Movements are kept ordered by creation instant and unique by id. They are
/// never altered or removed once part of the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ledger {
    ingredient: IngredientRecord,
    movements: Vec<StockMovement>,
}

impl Ledger {
    /// Builds a ledger, ordering the movements by creation instant.
    ///
    /// When two movements share an id, the first one wins.
    pub fn new(ingredient: IngredientRecord, movements: Vec<StockMovement>) -> Self {
        let mut seen = HashSet::new();
        let mut movements: Vec<_> = movements
            .into_iter()
            .filter(|movement| seen.insert(movement.id()))
            .collect();
        movements.sort_by_key(StockMovement::created_at);

        Self {
            ingredient,
            movements,
        }
    }

    pub fn id(&self) -> IngredientId {
        self.ingredient.id
    }

    pub fn name(&self) -> &str {
        &self.ingredient.name
    }

    pub fn ingredient(&self) -> &IngredientRecord {
        &self.ingredient
    }

    pub fn movements(&self) -> &[StockMovement] {
        &self.movements
    }

    /// Returns the distinct units found across the whole history.
    pub fn units(&self) -> BTreeSet<Unit> {
        self.movements.iter().map(StockMovement::unit).collect()
    }

    /// Appends a movement, keeping the history ordered.
    ///
    /// Returns false and leaves the ledger untouched when a movement with
    /// the same id is already present.
    pub fn append(&mut self, movement: StockMovement) -> bool {
        if self.movements.iter().any(|existing| existing.id() == movement.id()) {
            return false;
        }

        let position = self
            .movements
            .partition_point(|existing| existing.created_at() <= movement.created_at());
        self.movements.insert(position, movement);
        true
    }

    /// Computes the quantity on hand at `at`, inclusive.
    ///
    /// Returns `Ok(None)` for a ledger without any movement. The unit check
    /// covers every movement, including those recorded after `at`.
    pub fn value_at(&self, at: DateTime<Utc>) -> Result<Option<StockValue>, StockError> {
        let units = self.units();
        if units.len() > 1 {
            return Err(StockError::MultipleUnits {
                ingredient_id: self.id(),
                ingredient_name: self.ingredient.name.clone(),
                units: units.into_iter().collect(),
            });
        }

        let Some(unit) = units.first().copied() else {
            return Ok(None);
        };

        let quantity = self
            .movements
            .iter()
            .filter(|movement| movement.created_at() <= at)
            .try_fold(Decimal::ZERO, |total, movement| {
                total.checked_add(movement.signed_quantity())
            })
            .ok_or_else(|| StockError::QuantityOverflow {
                ingredient_id: self.id(),
                ingredient_name: self.ingredient.name.clone(),
            })?;

        Ok(Some(StockValue::new(quantity, unit)))
    }
}
