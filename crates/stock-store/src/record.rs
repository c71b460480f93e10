use std::str::FromStr;

use chrono::{DateTime, Utc};
use common::ParseSymbolError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    Category, DishId, IngredientId, MovementId, OrderId, OrderStatus, OrderType, StoreError, Unit,
};

/// Most decimal places a stored quantity may carry.
pub const MAX_QUANTITY_SCALE: u32 = 4;

/// Exclusive bound on the magnitude of a stored quantity, `10^10`.
pub fn quantity_limit() -> Decimal {
    Decimal::new(10_000_000_000, 0)
}

/// Errors raised when building a record with invalid values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("Movement quantity must not be negative, got {0}")]
    NegativeQuantity(Decimal),

    #[error("Quantity {0} is out of range: at most 4 decimal places and below 10^10")]
    QuantityOutOfRange(Decimal),

    #[error("Recipe quantity for ingredient {ingredient_id} must be positive, got {quantity}")]
    NonPositiveRecipeQuantity {
        ingredient_id: IngredientId,
        quantity: Decimal,
    },
}

fn check_quantity_range(quantity: Decimal) -> Result<(), RecordError> {
    if quantity.normalize().scale() > MAX_QUANTITY_SCALE || quantity.abs() >= quantity_limit() {
        return Err(RecordError::QuantityOutOfRange(quantity));
    }
    Ok(())
}

/// Direction of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MovementType {
    /// Stock entering (delivery, restock).
    In,
    /// Stock leaving (consumption, waste).
    Out,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::In => "IN",
            MovementType::Out => "OUT",
        }
    }
}

impl std::fmt::Display for MovementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MovementType {
    type Err = ParseSymbolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IN" => Ok(MovementType::In),
            "OUT" => Ok(MovementType::Out),
            other => Err(ParseSymbolError {
                kind: "movement type",
                value: other.to_string(),
            }),
        }
    }
}

/// A single dated, directional, quantified stock event.
///
/// Movements are immutable once recorded: stores only ever insert them,
/// and an insert for an id that already exists is ignored. Outside this
/// crate a movement can only be built through [`StockMovement::new`], so
/// every movement a store sees has a non-negative quantity that fits the
/// stored precision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockMovement {
    pub(crate) id: MovementId,
    pub(crate) movement_type: MovementType,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) quantity: Decimal,
    pub(crate) unit: Unit,
}

impl StockMovement {
    /// Creates a movement with a fresh id.
    pub fn new(
        movement_type: MovementType,
        created_at: DateTime<Utc>,
        quantity: Decimal,
        unit: Unit,
    ) -> Result<Self, RecordError> {
        if quantity < Decimal::ZERO {
            return Err(RecordError::NegativeQuantity(quantity));
        }
        check_quantity_range(quantity)?;

        Ok(Self {
            id: MovementId::new(),
            movement_type,
            created_at,
            quantity,
            unit,
        })
    }

    /// Creates an entry movement.
    pub fn inbound(
        created_at: DateTime<Utc>,
        quantity: Decimal,
        unit: Unit,
    ) -> Result<Self, RecordError> {
        Self::new(MovementType::In, created_at, quantity, unit)
    }

    /// Creates an exit movement.
    pub fn outbound(
        created_at: DateTime<Utc>,
        quantity: Decimal,
        unit: Unit,
    ) -> Result<Self, RecordError> {
        Self::new(MovementType::Out, created_at, quantity, unit)
    }

    /// Replaces the generated id, used when replaying a known movement.
    pub fn with_id(mut self, id: MovementId) -> Self {
        self.id = id;
        self
    }

    pub fn id(&self) -> MovementId {
        self.id
    }

    pub fn movement_type(&self) -> MovementType {
        self.movement_type
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn quantity(&self) -> Decimal {
        self.quantity
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    /// Returns the quantity with exits counted negatively.
    pub fn signed_quantity(&self) -> Decimal {
        match self.movement_type {
            MovementType::In => self.quantity,
            MovementType::Out => -self.quantity,
        }
    }
}

/// Metadata of a stock-keeping ingredient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientRecord {
    pub id: IngredientId,
    pub name: String,
    pub category: Category,
    pub price: Decimal,
}

impl IngredientRecord {
    pub fn new(name: impl Into<String>, category: Category, price: Decimal) -> Self {
        Self {
            id: IngredientId::new(),
            name: name.into(),
            category,
            price,
        }
    }
}

/// Quantity of one ingredient needed to prepare one unit of a dish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeLine {
    pub(crate) ingredient_id: IngredientId,
    pub(crate) quantity_per_unit: Decimal,
}

impl RecipeLine {
    pub fn new(ingredient_id: IngredientId, quantity_per_unit: Decimal) -> Result<Self, RecordError> {
        if quantity_per_unit <= Decimal::ZERO {
            return Err(RecordError::NonPositiveRecipeQuantity {
                ingredient_id,
                quantity: quantity_per_unit,
            });
        }
        check_quantity_range(quantity_per_unit)?;

        Ok(Self {
            ingredient_id,
            quantity_per_unit,
        })
    }

    pub fn ingredient_id(&self) -> IngredientId {
        self.ingredient_id
    }

    pub fn quantity_per_unit(&self) -> Decimal {
        self.quantity_per_unit
    }
}

/// A dish and its recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DishRecord {
    pub id: DishId,
    pub name: String,
    pub selling_price: Decimal,
    pub recipe: Vec<RecipeLine>,
}

impl DishRecord {
    pub fn new(name: impl Into<String>, selling_price: Decimal) -> Self {
        Self {
            id: DishId::new(),
            name: name.into(),
            selling_price,
            recipe: Vec::new(),
        }
    }

    /// Adds a recipe line.
    pub fn with_ingredient(
        mut self,
        ingredient_id: IngredientId,
        quantity_per_unit: Decimal,
    ) -> Result<Self, RecordError> {
        self.recipe
            .push(RecipeLine::new(ingredient_id, quantity_per_unit)?);
        Ok(self)
    }
}

/// One row of a delegated valuation: the signed sum of a unit group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitTotal {
    pub unit: Unit,
    pub quantity: Decimal,
}

/// A dish ordered in a given quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineRecord {
    pub dish_id: DishId,
    pub quantity: u32,
}

impl OrderLineRecord {
    /// Returns the quantity as stored in the `INTEGER` quantity column.
    pub fn stored_quantity(&self) -> Result<i32, StoreError> {
        i32::try_from(self.quantity).map_err(|_| StoreError::OutOfRange {
            column: "dish_order.quantity",
            value: self.quantity.to_string(),
        })
    }
}

/// Stored form of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    /// None until the store assigns an id on insert.
    pub id: Option<OrderId>,
    pub reference: String,
    pub created_at: DateTime<Utc>,
    pub order_type: OrderType,
    pub status: OrderStatus,
    pub lines: Vec<OrderLineRecord>,
}
