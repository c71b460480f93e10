//! Order status and order type.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ParseSymbolError;

/// The status of an order in its lifecycle.
///
/// ```text
/// Created ──► InPreparation ──► Ready ──► Delivered
///    ▲              │             │           │
///    └──────────────┴─────────────┘           ✕ (terminal)
/// ```
///
/// Any non-terminal status may be overwritten with any other status; once an
/// order is `Delivered` no further transition is allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Order has been taken and not yet started.
    #[default]
    Created,

    /// The kitchen is preparing the order.
    InPreparation,

    /// The order is ready to be handed over.
    Ready,

    /// The order was handed to the customer (terminal state).
    Delivered,
}

impl OrderStatus {
    /// Returns true if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered)
    }

    /// Returns the stored symbol for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "CREATED",
            OrderStatus::InPreparation => "IN_PREPARATION",
            OrderStatus::Ready => "READY",
            OrderStatus::Delivered => "DELIVERED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ParseSymbolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATED" => Ok(OrderStatus::Created),
            "IN_PREPARATION" => Ok(OrderStatus::InPreparation),
            "READY" => Ok(OrderStatus::Ready),
            "DELIVERED" => Ok(OrderStatus::Delivered),
            other => Err(ParseSymbolError::new("order status", other)),
        }
    }
}

/// How the order is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    #[default]
    EatIn,
    TakeAway,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::EatIn => "EAT_IN",
            OrderType::TakeAway => "TAKE_AWAY",
        }
    }
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OrderType {
    type Err = ParseSymbolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EAT_IN" => Ok(OrderType::EatIn),
            "TAKE_AWAY" => Ok(OrderType::TakeAway),
            other => Err(ParseSymbolError::new("order type", other)),
        }
    }
}
