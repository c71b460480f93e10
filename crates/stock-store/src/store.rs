use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    DishId, DishRecord, IngredientId, IngredientRecord, OrderId, OrderRecord, OrderStatus, RecipeLine,
    Result, StockMovement, UnitTotal,
};

/// Core trait for stock store implementations.
///
/// A store hands out transactions; every read and write goes through one so
/// that a sufficiency check and the write it guards commit or fail together.
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait StockStore: Send + Sync {
    /// Opens a new transaction.
    ///
    /// Two transactions that read and write the same ledgers are serialized:
    /// the first to commit wins and the other fails with
    /// `TransactionConflict` (or waits, for stores that lock eagerly).
    async fn begin(&self) -> Result<Box<dyn StockTransaction>>;
}

/// A unit of work against the store.
///
/// Dropping a transaction without calling [`StockTransaction::commit`] rolls
/// it back.
#[async_trait]
pub trait StockTransaction: Send {
    /// Retrieves an ingredient's metadata.
    async fn find_ingredient(&mut self, id: IngredientId) -> Result<Option<IngredientRecord>>;

    /// Retrieves all ingredients, ordered by name.
    async fn list_ingredients(&mut self) -> Result<Vec<IngredientRecord>>;

    /// Inserts or updates an ingredient's metadata. Movements are untouched.
    async fn upsert_ingredient(&mut self, ingredient: &IngredientRecord) -> Result<()>;

    /// Retrieves all movements of an ingredient, oldest first.
    async fn load_movements(&mut self, id: IngredientId) -> Result<Vec<StockMovement>>;

    /// Appends movements to an ingredient's ledger.
    ///
    /// A movement whose id is already stored is skipped, never updated.
    /// Returns the number of movements actually inserted.
    async fn append_movements(
        &mut self,
        id: IngredientId,
        movements: &[StockMovement],
    ) -> Result<usize>;

    /// Computes the net quantity of an ingredient inside the store.
    ///
    /// Returns one row per distinct unit among *all* of the ingredient's
    /// movements, holding the sum of entries minus exits created at or before
    /// `at` (zero when none qualify). An ingredient without movements yields
    /// no rows.
    async fn delegated_value_at(
        &mut self,
        id: IngredientId,
        at: DateTime<Utc>,
    ) -> Result<Vec<UnitTotal>>;

    /// Retrieves a dish with its recipe.
    async fn find_dish(&mut self, id: DishId) -> Result<Option<DishRecord>>;

    /// Inserts or updates a dish; the stored recipe is replaced as a whole.
    async fn upsert_dish(&mut self, dish: &DishRecord) -> Result<()>;

    /// Retrieves the recipe of a dish, or None when the dish is unknown.
    async fn load_recipe(&mut self, id: DishId) -> Result<Option<Vec<RecipeLine>>> {
        Ok(self.find_dish(id).await?.map(|dish| dish.recipe))
    }

    /// Inserts a new order with its lines and returns the assigned id.
    ///
    /// `order.id` is ignored.
    async fn insert_order(&mut self, order: &OrderRecord) -> Result<OrderId>;

    /// Retrieves an order with its lines, locking it for the rest of the
    /// transaction.
    async fn find_order(&mut self, id: OrderId) -> Result<Option<OrderRecord>>;

    /// Overwrites the status of a stored order.
    async fn update_order_status(&mut self, id: OrderId, status: OrderStatus) -> Result<()>;

    /// Makes every write of this transaction visible at once.
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Discards every write of this transaction.
    async fn rollback(self: Box<Self>) -> Result<()>;
}
