pub mod error;
pub mod memory;
pub mod postgres;
pub mod record;
pub mod store;

pub use common::{Category, DishId, IngredientId, MovementId, OrderId, OrderStatus, OrderType, Unit};
pub use error::{Result, StoreError};
pub use memory::InMemoryStockStore;
pub use postgres::PostgresStockStore;
pub use record::{
    DishRecord, IngredientRecord, MovementType, OrderLineRecord, OrderRecord, RecipeLine,
    RecordError, StockMovement, UnitTotal,
};
pub use store::{StockStore, StockTransaction};
