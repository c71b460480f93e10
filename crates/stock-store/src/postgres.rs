use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::ParseSymbolError;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgPoolOptions, postgres::PgRow};
use uuid::Uuid;

use crate::{
    DishId, DishRecord, IngredientId, IngredientRecord, MovementId, OrderId, OrderLineRecord,
    OrderRecord, OrderStatus, RecipeLine, Result, StockMovement, StoreError, UnitTotal,
    store::{StockStore, StockTransaction},
};

/// PostgreSQL-backed stock store implementation.
///
/// The store is an explicit handle around a connection pool: open it with
/// [`PostgresStockStore::connect`] (or wrap an existing pool) and release it
/// with [`PostgresStockStore::close`].
#[derive(Clone)]
pub struct PostgresStockStore {
    pool: PgPool,
}

impl PostgresStockStore {
    /// Creates a new PostgreSQL stock store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool to the given database.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        tracing::info!(max_connections, "Connected to PostgreSQL");
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        tracing::info!("Database migrations applied");
        Ok(())
    }

    /// Closes every connection of the pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl StockStore for PostgresStockStore {
    async fn begin(&self) -> Result<Box<dyn StockTransaction>> {
        let mut tx = self.pool.begin().await?;

        // Serializable isolation: a concurrent transaction that depletes the
        // stock this one has read makes one of the two fail with 40001.
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await?;

        Ok(Box::new(PostgresTransaction { tx }))
    }
}

/// Transaction over a [`PostgresStockStore`].
pub struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
}

fn parse_symbol<T>(column: &'static str, value: String) -> Result<T>
where
    T: FromStr<Err = ParseSymbolError>,
{
    value
        .parse()
        .map_err(|_| StoreError::Decode { column, value })
}

fn row_to_ingredient(row: PgRow) -> Result<IngredientRecord> {
    Ok(IngredientRecord {
        id: IngredientId::from_uuid(row.try_get::<Uuid, _>("id")?),
        name: row.try_get("name")?,
        category: parse_symbol("category", row.try_get("category")?)?,
        price: row.try_get("price")?,
    })
}

fn row_to_movement(row: PgRow) -> Result<StockMovement> {
    Ok(StockMovement {
        id: MovementId::from_uuid(row.try_get::<Uuid, _>("id")?),
        movement_type: parse_symbol("type", row.try_get("type")?)?,
        created_at: row.try_get("creation_datetime")?,
        quantity: row.try_get("quantity")?,
        unit: parse_symbol("unit", row.try_get("unit")?)?,
    })
}

fn row_to_order_line(row: PgRow) -> Result<OrderLineRecord> {
    let quantity: i32 = row.try_get("quantity")?;
    Ok(OrderLineRecord {
        dish_id: DishId::from_uuid(row.try_get::<Uuid, _>("id_dish")?),
        quantity: u32::try_from(quantity).map_err(|_| StoreError::Decode {
            column: "quantity",
            value: quantity.to_string(),
        })?,
    })
}

#[async_trait]
impl StockTransaction for PostgresTransaction {
    async fn find_ingredient(&mut self, id: IngredientId) -> Result<Option<IngredientRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, category, price
            FROM ingredient
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(row_to_ingredient).transpose()
    }

    async fn list_ingredients(&mut self) -> Result<Vec<IngredientRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, category, price
            FROM ingredient
            ORDER BY name ASC
            "#,
        )
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter().map(row_to_ingredient).collect()
    }

    async fn upsert_ingredient(&mut self, ingredient: &IngredientRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO ingredient (id, name, category, price)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                category = EXCLUDED.category,
                price = EXCLUDED.price
            "#,
        )
        .bind(ingredient.id.as_uuid())
        .bind(&ingredient.name)
        .bind(ingredient.category.as_str())
        .bind(ingredient.price)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn load_movements(&mut self, id: IngredientId) -> Result<Vec<StockMovement>> {
        let rows = sqlx::query(
            r#"
            SELECT id, type, creation_datetime, quantity, unit
            FROM stock_movement
            WHERE id_ingredient = $1
            ORDER BY creation_datetime ASC, seq ASC
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter().map(row_to_movement).collect()
    }

    async fn append_movements(
        &mut self,
        id: IngredientId,
        movements: &[StockMovement],
    ) -> Result<usize> {
        let mut inserted = 0;
        for movement in movements {
            let result = sqlx::query(
                r#"
                INSERT INTO stock_movement (id, id_ingredient, quantity, unit, type, creation_datetime)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (id) DO NOTHING
                "#,
            )
            .bind(movement.id.as_uuid())
            .bind(id.as_uuid())
            .bind(movement.quantity)
            .bind(movement.unit.as_str())
            .bind(movement.movement_type.as_str())
            .bind(movement.created_at)
            .execute(&mut *self.tx)
            .await?;

            inserted += result.rows_affected() as usize;
        }

        tracing::debug!(
            ingredient_id = %id,
            inserted,
            skipped = movements.len() - inserted,
            "Appended movements"
        );
        Ok(inserted)
    }

    async fn delegated_value_at(
        &mut self,
        id: IngredientId,
        at: DateTime<Utc>,
    ) -> Result<Vec<UnitTotal>> {
        // The unit groups span every movement so that a second unit recorded
        // after `at` is still reported.
        let rows = sqlx::query(
            r#"
            SELECT
                unit,
                COALESCE(SUM(
                    CASE
                        WHEN creation_datetime > $2 THEN 0
                        WHEN type = 'OUT' THEN -quantity
                        ELSE quantity
                    END
                ), 0) AS actual_stock
            FROM stock_movement
            WHERE id_ingredient = $1
            GROUP BY unit
            ORDER BY unit
            "#,
        )
        .bind(id.as_uuid())
        .bind(at)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(UnitTotal {
                    unit: parse_symbol("unit", row.try_get("unit")?)?,
                    quantity: row.try_get::<Decimal, _>("actual_stock")?,
                })
            })
            .collect()
    }

    async fn find_dish(&mut self, id: DishId) -> Result<Option<DishRecord>> {
        let Some(row) = sqlx::query(
            r#"
            SELECT id, name, selling_price
            FROM dish
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?
        else {
            return Ok(None);
        };

        let recipe_rows = sqlx::query(
            r#"
            SELECT id_ingredient, quantity_required
            FROM dish_ingredient
            WHERE id_dish = $1
            ORDER BY position ASC
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await?;

        let recipe = recipe_rows
            .into_iter()
            .map(|row| {
                Ok(RecipeLine {
                    ingredient_id: IngredientId::from_uuid(
                        row.try_get::<Uuid, _>("id_ingredient")?,
                    ),
                    quantity_per_unit: row.try_get("quantity_required")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(DishRecord {
            id: DishId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            selling_price: row.try_get("selling_price")?,
            recipe,
        }))
    }

    async fn upsert_dish(&mut self, dish: &DishRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO dish (id, name, selling_price)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                selling_price = EXCLUDED.selling_price
            "#,
        )
        .bind(dish.id.as_uuid())
        .bind(&dish.name)
        .bind(dish.selling_price)
        .execute(&mut *self.tx)
        .await?;

        sqlx::query("DELETE FROM dish_ingredient WHERE id_dish = $1")
            .bind(dish.id.as_uuid())
            .execute(&mut *self.tx)
            .await?;

        for (position, line) in dish.recipe.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO dish_ingredient (id_dish, id_ingredient, quantity_required, position)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(dish.id.as_uuid())
            .bind(line.ingredient_id.as_uuid())
            .bind(line.quantity_per_unit)
            .bind(position as i32)
            .execute(&mut *self.tx)
            .await?;
        }

        Ok(())
    }

    async fn insert_order(&mut self, order: &OrderRecord) -> Result<OrderId> {
        let quantities = order
            .lines
            .iter()
            .map(OrderLineRecord::stored_quantity)
            .collect::<Result<Vec<_>>>()?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO "order" (reference, type, status, creation_datetime)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(&order.reference)
        .bind(order.order_type.as_str())
        .bind(order.status.as_str())
        .bind(order.created_at)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("order_reference_key")
            {
                return StoreError::DuplicateOrderReference(order.reference.clone());
            }
            StoreError::from(e)
        })?;

        for (position, (line, quantity)) in order.lines.iter().zip(quantities).enumerate() {
            sqlx::query(
                r#"
                INSERT INTO dish_order (id_order, id_dish, quantity, position)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(id)
            .bind(line.dish_id.as_uuid())
            .bind(quantity)
            .bind(position as i32)
            .execute(&mut *self.tx)
            .await?;
        }

        Ok(OrderId::new(id))
    }

    async fn find_order(&mut self, id: OrderId) -> Result<Option<OrderRecord>> {
        let Some(row) = sqlx::query(
            r#"
            SELECT id, reference, type, status, creation_datetime
            FROM "order"
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id.as_i64())
        .fetch_optional(&mut *self.tx)
        .await?
        else {
            return Ok(None);
        };

        let lines = sqlx::query(
            r#"
            SELECT id_dish, quantity
            FROM dish_order
            WHERE id_order = $1
            ORDER BY position ASC
            "#,
        )
        .bind(id.as_i64())
        .fetch_all(&mut *self.tx)
        .await?
        .into_iter()
        .map(row_to_order_line)
        .collect::<Result<Vec<_>>>()?;

        Ok(Some(OrderRecord {
            id: Some(OrderId::new(row.try_get("id")?)),
            reference: row.try_get("reference")?,
            created_at: row.try_get("creation_datetime")?,
            order_type: parse_symbol("type", row.try_get("type")?)?,
            status: parse_symbol("status", row.try_get("status")?)?,
            lines,
        }))
    }

    async fn update_order_status(&mut self, id: OrderId, status: OrderStatus) -> Result<()> {
        let result = sqlx::query(r#"UPDATE "order" SET status = $1 WHERE id = $2"#)
            .bind(status.as_str())
            .bind(id.as_i64())
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::OrderNotFound(id));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
