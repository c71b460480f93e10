//! Point-in-time stock report over every ingredient.

use chrono::{DateTime, Utc};
use common::{IngredientId, StockValue};
use domain::{DomainError, StockError, ValuationMode};
use stock_store::{StockStore, StockTransaction};

/// Outcome of valuing one ingredient, possibly a data-integrity failure.
pub type Valuation = Result<Option<StockValue>, StockError>;

/// One line of the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportEntry {
    pub ingredient_id: IngredientId,
    pub name: String,
    /// Value computed with the configured strategy.
    pub value: Valuation,
    /// Value computed with the other strategy, for cross-checking.
    pub counterpart: Valuation,
}

impl ReportEntry {
    /// Returns true if both strategies produced the same outcome.
    pub fn agrees(&self) -> bool {
        self.value == self.counterpart
    }

    /// Writes the entry to the log.
    pub fn log(&self, mode: ValuationMode) {
        match &self.value {
            Ok(Some(value)) => {
                tracing::info!(ingredient = %self.name, strategy = %mode, %value, "Stock")
            }
            Ok(None) => {
                tracing::info!(ingredient = %self.name, strategy = %mode, "Never stocked")
            }
            Err(err) => tracing::error!(ingredient = %self.name, error = %err, "Cannot value"),
        }

        if !self.agrees() {
            tracing::warn!(
                ingredient = %self.name,
                value = ?self.value,
                counterpart = ?self.counterpart,
                "Valuation strategies disagree"
            );
        }
    }
}

/// Values every ingredient at `at` with `mode`, cross-checked with its
/// counterpart. Entries are ordered by ingredient name.
///
/// Both strategies read the same snapshot: the whole report runs in one
/// transaction, which is rolled back at the end. Ledgers mixing units are
/// reported in their entry; any other failure aborts the report.
pub async fn stock_report<S>(
    store: &S,
    mode: ValuationMode,
    at: DateTime<Utc>,
) -> Result<Vec<ReportEntry>, DomainError>
where
    S: StockStore,
{
    let mut tx = store.begin().await?;
    let result = report_in(tx.as_mut(), mode, at).await;
    if let Err(err) = tx.rollback().await {
        tracing::warn!(error = %err, "Rollback failed");
    }
    result
}

async fn report_in(
    tx: &mut dyn StockTransaction,
    mode: ValuationMode,
    at: DateTime<Utc>,
) -> Result<Vec<ReportEntry>, DomainError> {
    let primary = mode.strategy();
    let secondary = mode.counterpart().strategy();

    let ingredients = tx.list_ingredients().await?;
    let mut entries = Vec::with_capacity(ingredients.len());
    for ingredient in ingredients {
        let value = split(primary.value_at(&mut *tx, &ingredient, at).await)?;
        let counterpart = split(secondary.value_at(&mut *tx, &ingredient, at).await)?;

        entries.push(ReportEntry {
            ingredient_id: ingredient.id,
            name: ingredient.name,
            value,
            counterpart,
        });
    }

    Ok(entries)
}

fn split(result: Result<Option<StockValue>, DomainError>) -> Result<Valuation, DomainError> {
    match result {
        Ok(value) => Ok(Ok(value)),
        Err(DomainError::Stock(err)) => Ok(Err(err)),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use common::{Category, Unit};
    use rust_decimal::Decimal;
    use stock_store::{InMemoryStockStore, IngredientRecord, StockMovement};

    use super::*;
    use domain::StockService;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 5, 8, 0, 0).unwrap()
    }

    async fn seeded_store() -> InMemoryStockStore {
        let store = InMemoryStockStore::new();
        let stock = StockService::with_mode(store.clone(), ValuationMode::Local);

        stock
            .save_ingredient(
                IngredientRecord::new("Laitue", Category::Vegetable, Decimal::ZERO),
                vec![
                    StockMovement::inbound(t0(), Decimal::new(5, 0), Unit::Kg).unwrap(),
                    StockMovement::outbound(t0() + Duration::days(1), Decimal::new(2, 1), Unit::Kg)
                        .unwrap(),
                ],
            )
            .await
            .unwrap();
        stock
            .save_ingredient(
                IngredientRecord::new("Huile", Category::Other, Decimal::ZERO),
                vec![
                    StockMovement::inbound(t0(), Decimal::ONE, Unit::L).unwrap(),
                    StockMovement::inbound(t0(), Decimal::ONE, Unit::Pcs).unwrap(),
                ],
            )
            .await
            .unwrap();
        stock
            .save_ingredient(
                IngredientRecord::new("Sel", Category::Other, Decimal::ZERO),
                vec![],
            )
            .await
            .unwrap();

        store
    }

    #[tokio::test]
    async fn test_report_covers_every_ingredient() {
        let store = seeded_store().await;

        let entries = stock_report(&store, ValuationMode::Delegated, t0() + Duration::days(2))
            .await
            .unwrap();

        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["Huile", "Laitue", "Sel"]);
        assert!(entries.iter().all(ReportEntry::agrees));

        assert!(matches!(entries[0].value, Err(StockError::MultipleUnits { .. })));
        assert_eq!(
            entries[1].value,
            Ok(Some(StockValue::new(Decimal::new(48, 1), Unit::Kg)))
        );
        assert_eq!(entries[2].value, Ok(None));
    }

    #[tokio::test]
    async fn test_concurrent_writes_never_split_the_strategies() {
        let store = seeded_store().await;
        let stock = StockService::with_mode(store.clone(), ValuationMode::Local);
        let lettuce = stock.list_ledgers().await.unwrap()[1].id();
        let at = t0() + Duration::days(2);

        let writer = async {
            for _ in 0..20 {
                let delivery = StockMovement::inbound(t0(), Decimal::ONE, Unit::Kg).unwrap();
                stock.record_movement(lettuce, delivery).await.unwrap();
                tokio::task::yield_now().await;
            }
        };
        let reports = async {
            let mut reports = Vec::new();
            for _ in 0..20 {
                reports.push(stock_report(&store, ValuationMode::Delegated, at).await.unwrap());
                tokio::task::yield_now().await;
            }
            reports
        };
        let ((), reports) = tokio::join!(writer, reports);

        for entries in reports {
            assert!(entries.iter().all(ReportEntry::agrees));
        }
    }

    #[tokio::test]
    async fn test_empty_store_gives_empty_report() {
        let entries = stock_report(&InMemoryStockStore::new(), ValuationMode::Local, t0())
            .await
            .unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_disagreement_is_detected() {
        let entry = ReportEntry {
            ingredient_id: IngredientId::new(),
            name: "Laitue".to_string(),
            value: Ok(None),
            counterpart: Ok(Some(StockValue::new(Decimal::ZERO, Unit::Kg))),
        };
        assert!(!entry.agrees());
    }
}
