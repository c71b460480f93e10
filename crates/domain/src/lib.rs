//! Domain layer for the stock ledger system.
//!
//! This crate provides:
//! - [`Ledger`]: an ingredient's movement history and its point-in-time value
//! - [`ValuationStrategy`]: in-process and store-delegated valuation
//! - [`Order`]: the order aggregate with its terminal delivered state
//! - [`StockService`] and [`OrderService`]: transactional operations over a
//!   [`stock_store::StockStore`]

pub mod error;
pub mod order;
pub mod stock;
mod transaction;

pub use error::{DomainError, ErrorKind};
pub use order::{Order, OrderError, OrderLine, OrderReference, OrderService};
pub use stock::{
    DelegatedReduction, Ledger, LocalReduction, StockError, StockService, ValuationMode,
    ValuationStrategy,
};
