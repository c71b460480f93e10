use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    DishId, DishRecord, IngredientId, IngredientRecord, MovementId, OrderId, OrderRecord,
    OrderStatus, Result, StockMovement, StoreError, Unit, UnitTotal,
    store::{StockStore, StockTransaction},
};

#[derive(Debug, Clone, Default)]
struct StoreState {
    ingredients: HashMap<IngredientId, IngredientRecord>,
    movements: HashMap<IngredientId, Vec<StockMovement>>,
    movement_ids: HashSet<MovementId>,
    dishes: HashMap<DishId, DishRecord>,
    orders: BTreeMap<OrderId, OrderRecord>,
    last_order_id: i64,
}

/// In-memory stock store implementation for testing.
///
/// Provides the same interface as the PostgreSQL implementation. A
/// transaction holds the store-wide lock from `begin` until it is committed,
/// rolled back or dropped, and stages its writes on a private copy, so
/// transactions are fully serialized and writes are visible all at once.
#[derive(Clone, Default)]
pub struct InMemoryStockStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryStockStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of committed orders.
    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }

    /// Returns the total number of committed movements.
    pub async fn movement_count(&self) -> usize {
        self.state.lock().await.movement_ids.len()
    }

    /// Clears all data.
    pub async fn clear(&self) {
        *self.state.lock().await = StoreState::default();
    }
}

#[async_trait]
impl StockStore for InMemoryStockStore {
    async fn begin(&self) -> Result<Box<dyn StockTransaction>> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(InMemoryTransaction { guard, staged }))
    }
}

/// Transaction over an [`InMemoryStockStore`].
pub struct InMemoryTransaction {
    guard: OwnedMutexGuard<StoreState>,
    staged: StoreState,
}

#[async_trait]
impl StockTransaction for InMemoryTransaction {
    async fn find_ingredient(&mut self, id: IngredientId) -> Result<Option<IngredientRecord>> {
        Ok(self.staged.ingredients.get(&id).cloned())
    }

    async fn list_ingredients(&mut self) -> Result<Vec<IngredientRecord>> {
        let mut ingredients: Vec<_> = self.staged.ingredients.values().cloned().collect();
        ingredients.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(ingredients)
    }

    async fn upsert_ingredient(&mut self, ingredient: &IngredientRecord) -> Result<()> {
        self.staged
            .ingredients
            .insert(ingredient.id, ingredient.clone());
        Ok(())
    }

    async fn load_movements(&mut self, id: IngredientId) -> Result<Vec<StockMovement>> {
        let mut movements = self.staged.movements.get(&id).cloned().unwrap_or_default();
        movements.sort_by_key(|m| m.created_at);
        Ok(movements)
    }

    async fn append_movements(
        &mut self,
        id: IngredientId,
        movements: &[StockMovement],
    ) -> Result<usize> {
        if !self.staged.ingredients.contains_key(&id) {
            return Err(StoreError::MissingReference {
                constraint: "stock_movement_id_ingredient_fkey".to_string(),
            });
        }

        let mut inserted = 0;
        for movement in movements {
            // ON CONFLICT (id) DO NOTHING
            if self.staged.movement_ids.insert(movement.id) {
                self.staged
                    .movements
                    .entry(id)
                    .or_default()
                    .push(movement.clone());
                inserted += 1;
            }
        }

        Ok(inserted)
    }

    async fn delegated_value_at(
        &mut self,
        id: IngredientId,
        at: DateTime<Utc>,
    ) -> Result<Vec<UnitTotal>> {
        let mut groups: BTreeMap<Unit, Decimal> = BTreeMap::new();
        for movement in self.staged.movements.get(&id).into_iter().flatten() {
            let total = groups.entry(movement.unit).or_insert(Decimal::ZERO);
            if movement.created_at <= at {
                let signed = movement.signed_quantity();
                match total.checked_add(signed) {
                    Some(sum) => *total = sum,
                    None => {
                        return Err(StoreError::OutOfRange {
                            column: "actual_stock",
                            value: format!("{total} + {signed}"),
                        });
                    }
                }
            }
        }

        Ok(groups
            .into_iter()
            .map(|(unit, quantity)| UnitTotal { unit, quantity })
            .collect())
    }

    async fn find_dish(&mut self, id: DishId) -> Result<Option<DishRecord>> {
        Ok(self.staged.dishes.get(&id).cloned())
    }

    async fn upsert_dish(&mut self, dish: &DishRecord) -> Result<()> {
        if dish
            .recipe
            .iter()
            .any(|line| !self.staged.ingredients.contains_key(&line.ingredient_id))
        {
            return Err(StoreError::MissingReference {
                constraint: "dish_ingredient_id_ingredient_fkey".to_string(),
            });
        }

        self.staged.dishes.insert(dish.id, dish.clone());
        Ok(())
    }

    async fn insert_order(&mut self, order: &OrderRecord) -> Result<OrderId> {
        if self
            .staged
            .orders
            .values()
            .any(|o| o.reference == order.reference)
        {
            return Err(StoreError::DuplicateOrderReference(order.reference.clone()));
        }

        for line in &order.lines {
            line.stored_quantity()?;
        }

        if order
            .lines
            .iter()
            .any(|line| !self.staged.dishes.contains_key(&line.dish_id))
        {
            return Err(StoreError::MissingReference {
                constraint: "dish_order_id_dish_fkey".to_string(),
            });
        }

        self.staged.last_order_id += 1;
        let id = OrderId::new(self.staged.last_order_id);

        let mut stored = order.clone();
        stored.id = Some(id);
        self.staged.orders.insert(id, stored);

        Ok(id)
    }

    async fn find_order(&mut self, id: OrderId) -> Result<Option<OrderRecord>> {
        Ok(self.staged.orders.get(&id).cloned())
    }

    async fn update_order_status(&mut self, id: OrderId, status: OrderStatus) -> Result<()> {
        let order = self
            .staged
            .orders
            .get_mut(&id)
            .ok_or(StoreError::OrderNotFound(id))?;
        order.status = status;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let InMemoryTransaction { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
