use thiserror::Error;

/// Returned when a stored or configured symbol does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} symbol: {value:?}")]
pub struct ParseSymbolError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseSymbolError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
