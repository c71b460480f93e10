//! Order service: placement behind a stock-sufficiency check, and status
//! changes.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::{OrderId, OrderStatus};
use rust_decimal::Decimal;
use stock_store::{StockStore, StockTransaction};

use super::{Order, OrderError};
use crate::error::DomainError;
use crate::stock::{StockError, ValuationMode, ValuationStrategy};
use crate::transaction::{discard, finish};

/// Service for managing orders.
///
/// Sufficiency checks value ingredients with the configured strategy inside
/// the same transaction that persists the order.
pub struct OrderService<S: StockStore> {
    store: S,
    strategy: Arc<dyn ValuationStrategy>,
}

impl<S: StockStore> OrderService<S> {
    /// Creates a new order service valuing stock with the given strategy.
    pub fn new(store: S, strategy: Arc<dyn ValuationStrategy>) -> Self {
        Self { store, strategy }
    }

    /// Creates a new order service valuing stock with the strategy of `mode`.
    pub fn with_mode(store: S, mode: ValuationMode) -> Self {
        Self::new(store, mode.strategy())
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Places an order if every ingredient it needs is in stock.
    ///
    /// Each (order line, recipe line) pair needs `quantity_per_unit *
    /// line quantity` of its ingredient, compared with the stock on hand now.
    /// The first shortfall aborts the placement and nothing is written.
    /// Otherwise the order and its lines are stored in the same transaction
    /// and returned with their assigned id. No stock movement is recorded.
    #[tracing::instrument(skip(self, order), fields(reference = %order.reference()))]
    pub async fn place_order(&self, mut order: Order) -> Result<Order, DomainError> {
        if let Some(id) = order.id() {
            return Err(OrderError::AlreadyPlaced {
                reference: order.reference().clone(),
                id,
            }
            .into());
        }

        let mut tx = self.store.begin().await?;
        let result = self.place_order_in(tx.as_mut(), &order, Utc::now()).await;
        let id = match finish(tx, result).await {
            Ok(id) => id,
            Err(err) => {
                metrics::counter!("orders_rejected_total", "reason" => rejection_reason(&err))
                    .increment(1);
                return Err(err);
            }
        };

        order.assign_id(id);
        metrics::counter!("orders_placed_total").increment(1);
        tracing::info!(order_id = %id, lines = order.lines().len(), "Order placed");

        Ok(order)
    }

    async fn place_order_in(
        &self,
        tx: &mut dyn StockTransaction,
        order: &Order,
        at: DateTime<Utc>,
    ) -> Result<OrderId, DomainError> {
        self.check_sufficiency(tx, order, at).await?;
        Ok(tx.insert_order(&order.to_record()).await?)
    }

    async fn check_sufficiency(
        &self,
        tx: &mut dyn StockTransaction,
        order: &Order,
        at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        for line in order.lines() {
            let recipe = tx
                .load_recipe(line.dish_id())
                .await?
                .ok_or(DomainError::DishNotFound(line.dish_id()))?;

            for recipe_line in recipe {
                let ingredient = tx
                    .find_ingredient(recipe_line.ingredient_id())
                    .await?
                    .ok_or(DomainError::IngredientNotFound(recipe_line.ingredient_id()))?;
                let needed = recipe_line
                    .quantity_per_unit()
                    .checked_mul(Decimal::from(line.quantity()))
                    .ok_or_else(|| StockError::QuantityOverflow {
                        ingredient_id: ingredient.id,
                        ingredient_name: ingredient.name.clone(),
                    })?;

                let available = self.strategy.value_at(&mut *tx, &ingredient, at).await?;
                let sufficient = available.is_some_and(|value| value.quantity() >= needed);

                if !sufficient {
                    tracing::warn!(
                        reference = %order.reference(),
                        ingredient = %ingredient.name,
                        %needed,
                        "Insufficient stock"
                    );
                    return Err(OrderError::InsufficientStock {
                        reference: order.reference().clone(),
                        ingredient_id: ingredient.id,
                        ingredient_name: ingredient.name,
                        needed,
                        available,
                    }
                    .into());
                }
            }
        }

        Ok(())
    }

    /// Changes the status of a placed order.
    ///
    /// The stored order is locked while the change is applied. A delivered
    /// order keeps its status and the call fails.
    #[tracing::instrument(skip(self))]
    pub async fn update_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, DomainError> {
        let mut tx = self.store.begin().await?;
        let result = Self::update_status_in(tx.as_mut(), order_id, status).await;
        let order = finish(tx, result).await?;

        metrics::counter!("order_status_changes_total").increment(1);
        tracing::info!(%order_id, status = %order.status(), "Order status changed");

        Ok(order)
    }

    async fn update_status_in(
        tx: &mut dyn StockTransaction,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, DomainError> {
        let record = tx
            .find_order(order_id)
            .await?
            .ok_or(DomainError::OrderNotFound(order_id))?;
        let mut order = Order::try_from(record)?;

        order.set_status(status)?;
        tx.update_order_status(order_id, status).await?;

        Ok(order)
    }

    /// Loads an order by ID.
    ///
    /// Returns None if the order doesn't exist.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>, DomainError> {
        let mut tx = self.store.begin().await?;
        let result = match tx.find_order(order_id).await {
            Ok(record) => record
                .map(Order::try_from)
                .transpose()
                .map_err(DomainError::from),
            Err(err) => Err(err.into()),
        };
        discard(tx, result).await
    }
}

fn rejection_reason(err: &DomainError) -> &'static str {
    match err {
        DomainError::Order(OrderError::InsufficientStock { .. }) => "insufficient_stock",
        DomainError::Order(_) => "invalid_order",
        DomainError::Stock(_) => "inconsistent_stock",
        DomainError::DishNotFound(_) => "dish_not_found",
        DomainError::IngredientNotFound(_) => "ingredient_not_found",
        DomainError::OrderNotFound(_) | DomainError::Store(_) => "store",
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use common::{Category, DishId, OrderType, Unit};
    use stock_store::{DishRecord, IngredientRecord, InMemoryStockStore, StockMovement};

    use super::*;
    use crate::order::OrderLine;

    async fn seed(store: &InMemoryStockStore, quantity: Decimal) -> DishRecord {
        seed_recipe(store, quantity, Decimal::ONE).await
    }

    async fn seed_recipe(
        store: &InMemoryStockStore,
        quantity: Decimal,
        per_unit: Decimal,
    ) -> DishRecord {
        let flour = IngredientRecord::new("Farine", Category::Other, Decimal::new(150, 0));
        let dish = DishRecord::new("Crêpe", Decimal::new(2000, 0))
            .with_ingredient(flour.id, per_unit)
            .unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.upsert_ingredient(&flour).await.unwrap();
        let delivery =
            StockMovement::inbound(Utc::now() - Duration::minutes(1), quantity, Unit::Kg).unwrap();
        tx.append_movements(flour.id, &[delivery]).await.unwrap();
        tx.upsert_dish(&dish).await.unwrap();
        tx.commit().await.unwrap();

        dish
    }

    #[tokio::test]
    async fn test_exact_stock_is_sufficient() {
        let store = InMemoryStockStore::new();
        let dish = seed(&store, Decimal::new(3, 0)).await;
        let service = OrderService::with_mode(store, ValuationMode::Local);

        let order = Order::create(OrderType::EatIn, vec![OrderLine::new(dish.id, 3).unwrap()]);
        let placed = service.place_order(order).await.unwrap();

        assert!(placed.is_placed());
    }

    #[tokio::test]
    async fn test_largest_recipe_times_largest_quantity_is_a_shortfall() {
        let store = InMemoryStockStore::new();
        let largest = stock_store::record::quantity_limit() - Decimal::new(1, 4);
        let dish = seed_recipe(&store, largest, largest).await;
        let service = OrderService::with_mode(store, ValuationMode::Delegated);

        let order = Order::create(
            OrderType::EatIn,
            vec![OrderLine::new(dish.id, u32::MAX).unwrap()],
        );
        let err = service.place_order(order).await.unwrap_err();

        assert!(matches!(
            err,
            DomainError::Order(OrderError::InsufficientStock { ref needed, .. })
                if *needed == largest * Decimal::from(u32::MAX)
        ));
        assert_eq!(service.store().order_count().await, 0);
    }

    #[tokio::test]
    async fn test_quantity_beyond_the_stored_range_is_not_placed() {
        let store = InMemoryStockStore::new();
        let dish = seed(&store, Decimal::new(3_000_000_000, 0)).await;
        let service = OrderService::with_mode(store, ValuationMode::Local);

        let quantity = i32::MAX as u32 + 1;
        let order = Order::create(
            OrderType::EatIn,
            vec![OrderLine::new(dish.id, quantity).unwrap()],
        );
        let err = service.place_order(order).await.unwrap_err();

        assert_eq!(err.kind(), crate::ErrorKind::DataIntegrity);
        assert_eq!(service.store().order_count().await, 0);
    }

    #[tokio::test]
    async fn test_placing_twice_fails() {
        let store = InMemoryStockStore::new();
        let dish = seed(&store, Decimal::new(10, 0)).await;
        let service = OrderService::with_mode(store, ValuationMode::Delegated);

        let order = Order::create(OrderType::TakeAway, vec![OrderLine::new(dish.id, 1).unwrap()]);
        let placed = service.place_order(order).await.unwrap();
        let err = service.place_order(placed).await.unwrap_err();

        assert!(matches!(
            err,
            DomainError::Order(OrderError::AlreadyPlaced { .. })
        ));
        assert_eq!(service.store().order_count().await, 1);
    }

    #[tokio::test]
    async fn test_unknown_dish_is_rejected() {
        let service = OrderService::with_mode(InMemoryStockStore::new(), ValuationMode::Local);
        let dish_id = DishId::new();

        let order = Order::create(OrderType::EatIn, vec![OrderLine::new(dish_id, 1).unwrap()]);
        let err = service.place_order(order).await.unwrap_err();

        assert!(matches!(err, DomainError::DishNotFound(id) if id == dish_id));
        assert_eq!(service.store().order_count().await, 0);
    }

    #[tokio::test]
    async fn test_empty_order_is_placed() {
        let service = OrderService::with_mode(InMemoryStockStore::new(), ValuationMode::Local);
        let placed = service
            .place_order(Order::create(OrderType::EatIn, vec![]))
            .await
            .unwrap();
        assert!(placed.is_placed());
    }

    #[tokio::test]
    async fn test_update_unknown_order() {
        let service = OrderService::with_mode(InMemoryStockStore::new(), ValuationMode::Local);
        let err = service
            .update_status(OrderId::new(42), OrderStatus::Ready)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::OrderNotFound(_)));
    }

    #[tokio::test]
    async fn test_get_unknown_order_is_none() {
        let service = OrderService::with_mode(InMemoryStockStore::new(), ValuationMode::Local);
        assert!(service.get_order(OrderId::new(1)).await.unwrap().is_none());
    }
}
