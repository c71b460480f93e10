//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::{OrderId, OrderStatus, OrderType};
use serde::{Deserialize, Serialize};
use stock_store::{OrderLineRecord, OrderRecord};

use super::{OrderError, OrderLine, OrderReference};

/// Order aggregate root.
///
/// An order starts in [`OrderStatus::Created`] without an id; the store
/// assigns one when the order is placed. Once delivered the order is frozen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Store-assigned identifier, None until placed.
    id: Option<OrderId>,

    reference: OrderReference,

    created_at: DateTime<Utc>,

    order_type: OrderType,

    status: OrderStatus,

    /// Lines in the order they were given.
    lines: Vec<OrderLine>,
}

impl Order {
    /// Creates a new, unplaced order.
    pub fn new(reference: OrderReference, order_type: OrderType, lines: Vec<OrderLine>) -> Self {
        Self {
            id: None,
            reference,
            created_at: Utc::now(),
            order_type,
            status: OrderStatus::Created,
            lines,
        }
    }

    /// Creates a new, unplaced order with a generated reference.
    pub fn create(order_type: OrderType, lines: Vec<OrderLine>) -> Self {
        Self::new(OrderReference::generate(), order_type, lines)
    }

    /// Overrides the creation instant.
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn id(&self) -> Option<OrderId> {
        self.id
    }

    pub fn reference(&self) -> &OrderReference {
        &self.reference
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn order_type(&self) -> OrderType {
        self.order_type
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    /// Returns true if the order has been placed.
    pub fn is_placed(&self) -> bool {
        self.id.is_some()
    }

    /// Sets the order status.
    ///
    /// Any status may follow any non-terminal one. A delivered order rejects
    /// every change, including setting it to delivered again, and keeps its
    /// status.
    pub fn set_status(&mut self, status: OrderStatus) -> Result<(), OrderError> {
        if self.status.is_terminal() {
            return Err(OrderError::TerminalStateViolation {
                reference: self.reference.clone(),
                attempted: status,
            });
        }

        self.status = status;
        Ok(())
    }

    pub(crate) fn assign_id(&mut self, id: OrderId) {
        self.id = Some(id);
    }

    /// Converts the order into its stored form.
    pub fn to_record(&self) -> OrderRecord {
        OrderRecord {
            id: self.id,
            reference: self.reference.as_str().to_string(),
            created_at: self.created_at,
            order_type: self.order_type,
            status: self.status,
            lines: self
                .lines
                .iter()
                .map(|line| OrderLineRecord {
                    dish_id: line.dish_id(),
                    quantity: line.quantity(),
                })
                .collect(),
        }
    }
}

impl TryFrom<OrderRecord> for Order {
    type Error = OrderError;

    fn try_from(record: OrderRecord) -> Result<Self, Self::Error> {
        let lines = record
            .lines
            .into_iter()
            .map(|line| OrderLine::new(line.dish_id, line.quantity))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            id: record.id,
            reference: OrderReference::new(record.reference)?,
            created_at: record.created_at,
            order_type: record.order_type,
            status: record.status,
            lines,
        })
    }
}
