//! Units of measure and the stock value pair.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ParseSymbolError;

/// Unit of measure for a stock quantity.
///
/// Units are never converted into each other: a ledger holding two units is
/// inconsistent data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Unit {
    /// Pieces.
    Pcs,
    /// Kilograms.
    Kg,
    /// Litres.
    L,
}

impl Unit {
    /// Returns the stored symbol for this unit.
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Pcs => "PCS",
            Unit::Kg => "KG",
            Unit::L => "L",
        }
    }
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Unit {
    type Err = ParseSymbolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PCS" => Ok(Unit::Pcs),
            "KG" => Ok(Unit::Kg),
            "L" => Ok(Unit::L),
            other => Err(ParseSymbolError::new("unit", other)),
        }
    }
}

/// A quantity expressed in a single unit.
///
/// The quantity is the net of entries and exits and may be negative when the
/// recorded movements do not match physical reality; it is never clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StockValue {
    quantity: Decimal,
    unit: Unit,
}

impl StockValue {
    pub fn new(quantity: Decimal, unit: Unit) -> Self {
        Self { quantity, unit }
    }

    pub fn quantity(&self) -> Decimal {
        self.quantity
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }
}

impl std::fmt::Display for StockValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2} {}", self.quantity, self.unit)
    }
}
