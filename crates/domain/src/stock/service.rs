//! Stock service: ledger persistence and valuation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::{DishId, IngredientId, StockValue};
use stock_store::{DishRecord, IngredientRecord, StockMovement, StockStore, StockTransaction};

use super::{Ledger, ValuationMode, ValuationStrategy};
use crate::error::DomainError;
use crate::transaction::{discard, finish};

/// Service for managing ingredient ledgers and dishes.
///
/// Every operation runs in its own store transaction.
pub struct StockService<S: StockStore> {
    store: S,
    strategy: Arc<dyn ValuationStrategy>,
}

impl<S: StockStore> StockService<S> {
    /// Creates a new stock service valuing with the given strategy.
    pub fn new(store: S, strategy: Arc<dyn ValuationStrategy>) -> Self {
        Self { store, strategy }
    }

    /// Creates a new stock service valuing with the strategy of `mode`.
    pub fn with_mode(store: S, mode: ValuationMode) -> Self {
        Self::new(store, mode.strategy())
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn strategy(&self) -> &Arc<dyn ValuationStrategy> {
        &self.strategy
    }

    /// Saves an ingredient and appends the given movements to its ledger.
    ///
    /// Metadata is inserted or updated. Movements whose id is already stored
    /// are skipped, so replaying the same batch is harmless. Returns the full
    /// ledger as stored after the commit.
    #[tracing::instrument(skip(self, ingredient, movements), fields(ingredient = %ingredient.name))]
    pub async fn save_ingredient(
        &self,
        ingredient: IngredientRecord,
        movements: Vec<StockMovement>,
    ) -> Result<Ledger, DomainError> {
        let mut tx = self.store.begin().await?;
        let result = Self::save_ingredient_in(tx.as_mut(), ingredient, &movements).await;
        finish(tx, result).await
    }

    async fn save_ingredient_in(
        tx: &mut dyn StockTransaction,
        ingredient: IngredientRecord,
        movements: &[StockMovement],
    ) -> Result<Ledger, DomainError> {
        tx.upsert_ingredient(&ingredient).await?;
        let inserted = tx.append_movements(ingredient.id, movements).await?;
        tracing::info!(
            ingredient_id = %ingredient.id,
            inserted,
            skipped = movements.len() - inserted,
            "Saved ingredient"
        );

        let stored = tx.load_movements(ingredient.id).await?;
        Ok(Ledger::new(ingredient, stored))
    }

    /// Appends a single movement to an existing ledger.
    #[tracing::instrument(skip(self, movement))]
    pub async fn record_movement(
        &self,
        ingredient_id: IngredientId,
        movement: StockMovement,
    ) -> Result<Ledger, DomainError> {
        let mut tx = self.store.begin().await?;
        let result = Self::record_movement_in(tx.as_mut(), ingredient_id, movement).await;
        finish(tx, result).await
    }

    async fn record_movement_in(
        tx: &mut dyn StockTransaction,
        ingredient_id: IngredientId,
        movement: StockMovement,
    ) -> Result<Ledger, DomainError> {
        let ingredient = tx
            .find_ingredient(ingredient_id)
            .await?
            .ok_or(DomainError::IngredientNotFound(ingredient_id))?;

        if tx.append_movements(ingredient_id, &[movement]).await? == 0 {
            tracing::debug!(%ingredient_id, "Movement already recorded");
        }

        let stored = tx.load_movements(ingredient_id).await?;
        Ok(Ledger::new(ingredient, stored))
    }

    /// Loads the ledger of an ingredient.
    #[tracing::instrument(skip(self))]
    pub async fn load_ledger(&self, ingredient_id: IngredientId) -> Result<Ledger, DomainError> {
        let mut tx = self.store.begin().await?;
        let result = Self::load_ledger_in(tx.as_mut(), ingredient_id).await;
        discard(tx, result).await
    }

    async fn load_ledger_in(
        tx: &mut dyn StockTransaction,
        ingredient_id: IngredientId,
    ) -> Result<Ledger, DomainError> {
        let ingredient = tx
            .find_ingredient(ingredient_id)
            .await?
            .ok_or(DomainError::IngredientNotFound(ingredient_id))?;
        let movements = tx.load_movements(ingredient_id).await?;
        Ok(Ledger::new(ingredient, movements))
    }

    /// Loads every ledger, ordered by ingredient name.
    #[tracing::instrument(skip(self))]
    pub async fn list_ledgers(&self) -> Result<Vec<Ledger>, DomainError> {
        let mut tx = self.store.begin().await?;
        let result = Self::list_ledgers_in(tx.as_mut()).await;
        discard(tx, result).await
    }

    async fn list_ledgers_in(tx: &mut dyn StockTransaction) -> Result<Vec<Ledger>, DomainError> {
        let ingredients = tx.list_ingredients().await?;
        let mut ledgers = Vec::with_capacity(ingredients.len());
        for ingredient in ingredients {
            let movements = tx.load_movements(ingredient.id).await?;
            ledgers.push(Ledger::new(ingredient, movements));
        }
        Ok(ledgers)
    }

    /// Computes the quantity of an ingredient on hand at `at`, inclusive.
    ///
    /// Returns `Ok(None)` when the ingredient has never been stocked.
    #[tracing::instrument(skip(self), fields(strategy = self.strategy.name()))]
    pub async fn value_at(
        &self,
        ingredient_id: IngredientId,
        at: DateTime<Utc>,
    ) -> Result<Option<StockValue>, DomainError> {
        let mut tx = self.store.begin().await?;
        let result = self.value_at_in(tx.as_mut(), ingredient_id, at).await;
        discard(tx, result).await
    }

    async fn value_at_in(
        &self,
        tx: &mut dyn StockTransaction,
        ingredient_id: IngredientId,
        at: DateTime<Utc>,
    ) -> Result<Option<StockValue>, DomainError> {
        let ingredient = tx
            .find_ingredient(ingredient_id)
            .await?
            .ok_or(DomainError::IngredientNotFound(ingredient_id))?;
        self.strategy.value_at(tx, &ingredient, at).await
    }

    /// Saves a dish; its stored recipe is replaced as a whole.
    #[tracing::instrument(skip(self, dish), fields(dish = %dish.name))]
    pub async fn save_dish(&self, dish: DishRecord) -> Result<DishRecord, DomainError> {
        let mut tx = self.store.begin().await?;
        let result = tx.upsert_dish(&dish).await.map_err(DomainError::from);
        finish(tx, result.map(|()| dish)).await
    }

    /// Loads a dish with its recipe.
    #[tracing::instrument(skip(self))]
    pub async fn find_dish(&self, dish_id: DishId) -> Result<Option<DishRecord>, DomainError> {
        let mut tx = self.store.begin().await?;
        let result = tx.find_dish(dish_id).await.map_err(DomainError::from);
        discard(tx, result).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use common::{Category, Unit};
    use rust_decimal::Decimal;
    use stock_store::{InMemoryStockStore, StoreError};

    use super::*;
    use crate::stock::StockError;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 5, 8, 0, 0).unwrap()
    }

    fn lettuce_movements() -> Vec<StockMovement> {
        vec![
            StockMovement::inbound(t0(), Decimal::new(5, 0), Unit::Kg).unwrap(),
            StockMovement::outbound(t0() + Duration::days(1), Decimal::new(2, 1), Unit::Kg)
                .unwrap(),
        ]
    }

    fn service(mode: ValuationMode) -> StockService<InMemoryStockStore> {
        StockService::with_mode(InMemoryStockStore::new(), mode)
    }

    #[tokio::test]
    async fn test_save_ingredient_returns_stored_ledger() {
        let service = service(ValuationMode::Local);
        let lettuce = IngredientRecord::new("Laitue", Category::Vegetable, Decimal::new(800, 0));

        let ledger = service
            .save_ingredient(lettuce.clone(), lettuce_movements())
            .await
            .unwrap();

        assert_eq!(ledger.id(), lettuce.id);
        assert_eq!(ledger.movements().len(), 2);
        assert_eq!(service.store().movement_count().await, 2);
    }

    #[tokio::test]
    async fn test_saving_twice_keeps_movements_and_updates_metadata() {
        let service = service(ValuationMode::Local);
        let mut lettuce = IngredientRecord::new("Laitue", Category::Vegetable, Decimal::ZERO);
        let movements = lettuce_movements();

        service
            .save_ingredient(lettuce.clone(), movements.clone())
            .await
            .unwrap();
        lettuce.price = Decimal::new(900, 0);
        let ledger = service.save_ingredient(lettuce, movements).await.unwrap();

        assert_eq!(ledger.ingredient().price, Decimal::new(900, 0));
        assert_eq!(ledger.movements().len(), 2);
    }

    #[tokio::test]
    async fn test_value_at_with_both_modes() {
        for mode in [ValuationMode::Local, ValuationMode::Delegated] {
            let service = service(mode);
            let lettuce = IngredientRecord::new("Laitue", Category::Vegetable, Decimal::ZERO);
            service
                .save_ingredient(lettuce.clone(), lettuce_movements())
                .await
                .unwrap();

            let value = service
                .value_at(lettuce.id, t0() + Duration::days(2))
                .await
                .unwrap()
                .unwrap();
            assert_eq!(value.to_string(), "4.80 KG", "mode {mode}");
        }
    }

    #[tokio::test]
    async fn test_value_of_unknown_ingredient() {
        let service = service(ValuationMode::Delegated);
        let err = service
            .value_at(IngredientId::new(), t0())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::IngredientNotFound(_)));
    }

    #[tokio::test]
    async fn test_record_movement_mixing_units_is_reported_at_valuation() {
        let service = service(ValuationMode::Local);
        let lettuce = IngredientRecord::new("Laitue", Category::Vegetable, Decimal::ZERO);
        service
            .save_ingredient(lettuce.clone(), lettuce_movements())
            .await
            .unwrap();

        let ledger = service
            .record_movement(
                lettuce.id,
                StockMovement::inbound(t0() + Duration::days(5), Decimal::ONE, Unit::Pcs)
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(ledger.movements().len(), 3);

        let err = service.value_at(lettuce.id, t0()).await.unwrap_err();
        assert!(matches!(
            err,
            DomainError::Stock(StockError::MultipleUnits { .. })
        ));
    }

    #[tokio::test]
    async fn test_record_movement_for_unknown_ingredient_persists_nothing() {
        let service = service(ValuationMode::Local);
        let movement = StockMovement::inbound(t0(), Decimal::ONE, Unit::Kg).unwrap();

        let err = service
            .record_movement(IngredientId::new(), movement)
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::IngredientNotFound(_)));
        assert_eq!(service.store().movement_count().await, 0);
    }

    #[tokio::test]
    async fn test_list_ledgers_is_ordered_by_name() {
        let service = service(ValuationMode::Local);
        for name in ["Tomate", "Laitue", "Oignon"] {
            service
                .save_ingredient(
                    IngredientRecord::new(name, Category::Vegetable, Decimal::ZERO),
                    vec![],
                )
                .await
                .unwrap();
        }

        let names: Vec<_> = service
            .list_ledgers()
            .await
            .unwrap()
            .iter()
            .map(|ledger| ledger.name().to_string())
            .collect();
        assert_eq!(names, ["Laitue", "Oignon", "Tomate"]);
    }

    #[tokio::test]
    async fn test_save_dish_requires_known_ingredients() {
        let service = service(ValuationMode::Local);
        let dish = DishRecord::new("Salade", Decimal::new(3500, 0))
            .with_ingredient(IngredientId::new(), Decimal::new(2, 1))
            .unwrap();

        let err = service.save_dish(dish.clone()).await.unwrap_err();
        assert!(matches!(
            err,
            DomainError::Store(StoreError::MissingReference { .. })
        ));
        assert!(service.find_dish(dish.id).await.unwrap().is_none());
    }
}
