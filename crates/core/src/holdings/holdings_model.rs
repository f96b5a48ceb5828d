//! Holding domain models.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{errors::ValidationError, Error, Result};

/// Server-assigned holding identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HoldingId(pub i64);

impl fmt::Display for HoldingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for HoldingId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Domain model representing one holding.
///
/// Quantity and average price are fixed once the server has acknowledged the
/// holding. There is no edit operation: remove and add again instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    pub id: HoldingId,
    /// Symbol as entered; domestic issues may be a bare six-digit code.
    pub symbol: String,
    pub quantity: Decimal,
    /// Cost basis per unit.
    pub average_price: Decimal,
    pub notes: Option<String>,
}

impl Holding {
    /// Total amount paid for the position. Saturates at `Decimal::MAX`
    /// instead of overflowing.
    pub fn cost_basis(&self) -> Decimal {
        self.average_price.saturating_mul(self.quantity)
    }
}

/// Input model for creating a new holding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHolding {
    pub symbol: String,
    pub quantity: Decimal,
    pub average_price: Decimal,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewHolding {
    pub fn new(symbol: impl Into<String>, quantity: Decimal, average_price: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            quantity,
            average_price,
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Validates the new holding data.
    pub fn validate(&self) -> Result<()> {
        if self.symbol.trim().is_empty() {
            return Err(Error::Validation(ValidationError::MissingField(
                "symbol".to_string(),
            )));
        }
        if self.quantity <= Decimal::ZERO {
            return Err(Error::Validation(ValidationError::InvalidInput(
                "Quantity must be greater than zero".to_string(),
            )));
        }
        if self.average_price <= Decimal::ZERO {
            return Err(Error::Validation(ValidationError::InvalidInput(
                "Average price must be greater than zero".to_string(),
            )));
        }
        Ok(())
    }

    /// Canonical form sent to the server: trimmed, upper-cased symbol and
    /// blank notes dropped.
    pub fn normalized(self) -> Self {
        let notes = self
            .notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        Self {
            symbol: self.symbol.trim().to_uppercase(),
            quantity: self.quantity,
            average_price: self.average_price,
            notes,
        }
    }
}
