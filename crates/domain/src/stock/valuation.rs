use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{ParseSymbolError, StockValue};
use stock_store::{IngredientRecord, StockTransaction, UnitTotal};

use super::{Ledger, StockError};
use crate::error::DomainError;

/// A way of computing the quantity of an ingredient on hand at an instant.
///
/// Every implementation must return the same value as [`Ledger::value_at`]
/// for the same stored history, and fail with
/// [`StockError::MultipleUnits`] in exactly the same cases.
#[async_trait]
pub trait ValuationStrategy: Send + Sync {
    /// Short label used in logs and metrics.
    fn name(&self) -> &'static str;

    /// Values `ingredient` at `at` (inclusive) inside the given transaction.
    async fn value_at(
        &self,
        tx: &mut dyn StockTransaction,
        ingredient: &IngredientRecord,
        at: DateTime<Utc>,
    ) -> Result<Option<StockValue>, DomainError>;
}

/// Loads the full movement history and reduces it in process.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalReduction;

#[async_trait]
impl ValuationStrategy for LocalReduction {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn value_at(
        &self,
        tx: &mut dyn StockTransaction,
        ingredient: &IngredientRecord,
        at: DateTime<Utc>,
    ) -> Result<Option<StockValue>, DomainError> {
        metrics::counter!("stock_valuations_total", "strategy" => self.name()).increment(1);

        let movements = tx.load_movements(ingredient.id).await?;
        tracing::debug!(
            strategy = self.name(),
            ingredient = %ingredient.name,
            movements = movements.len(),
            "Valuing ingredient"
        );

        let ledger = Ledger::new(ingredient.clone(), movements);
        Ok(ledger.value_at(at)?)
    }
}

/// Lets the store sum the movements per unit and folds the returned rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct DelegatedReduction;

#[async_trait]
impl ValuationStrategy for DelegatedReduction {
    fn name(&self) -> &'static str {
        "delegated"
    }

    async fn value_at(
        &self,
        tx: &mut dyn StockTransaction,
        ingredient: &IngredientRecord,
        at: DateTime<Utc>,
    ) -> Result<Option<StockValue>, DomainError> {
        metrics::counter!("stock_valuations_total", "strategy" => self.name()).increment(1);

        let rows = tx.delegated_value_at(ingredient.id, at).await?;
        tracing::debug!(
            strategy = self.name(),
            ingredient = %ingredient.name,
            unit_groups = rows.len(),
            "Valuing ingredient"
        );

        Ok(fold_unit_totals(ingredient, &rows)?)
    }
}

/// Folds the per-unit rows of a delegated valuation into a single value.
///
/// No row means the ingredient was never stocked; more than one row means
/// its history mixes units.
pub(crate) fn fold_unit_totals(
    ingredient: &IngredientRecord,
    rows: &[UnitTotal],
) -> Result<Option<StockValue>, StockError> {
    match rows {
        [] => Ok(None),
        [row] => Ok(Some(StockValue::new(row.quantity, row.unit))),
        _ => {
            let units: BTreeSet<_> = rows.iter().map(|row| row.unit).collect();
            Err(StockError::MultipleUnits {
                ingredient_id: ingredient.id,
                ingredient_name: ingredient.name.clone(),
                units: units.into_iter().collect(),
            })
        }
    }
}

/// Selects which [`ValuationStrategy`] a service uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValuationMode {
    #[default]
    Local,
    Delegated,
}

impl ValuationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValuationMode::Local => "local",
            ValuationMode::Delegated => "delegated",
        }
    }

    /// Returns the mode that computes the same value the other way.
    pub fn counterpart(&self) -> Self {
        match self {
            ValuationMode::Local => ValuationMode::Delegated,
            ValuationMode::Delegated => ValuationMode::Local,
        }
    }

    pub fn strategy(&self) -> Arc<dyn ValuationStrategy> {
        match self {
            ValuationMode::Local => Arc::new(LocalReduction),
            ValuationMode::Delegated => Arc::new(DelegatedReduction),
        }
    }
}

impl std::fmt::Display for ValuationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ValuationMode {
    type Err = ParseSymbolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(ValuationMode::Local),
            "delegated" => Ok(ValuationMode::Delegated),
            _ => Err(ParseSymbolError {
                kind: "valuation strategy",
                value: s.to_string(),
            }),
        }
    }
}
