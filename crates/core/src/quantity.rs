//! Item quantity value object.
//!
//! A stored document always carries a quantity of at least 1: the last
//! decrement deletes the document instead of writing zero. `Quantity`
//! encodes that boundary, `decremented()` returning `None` means "remove
//! the document".

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Quantity of an inventory item. Always >= 1 while the item exists.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(u32);

impl Quantity {
    pub const ONE: Quantity = Quantity(1);

    pub fn new(value: u32) -> DomainResult<Self> {
        if value == 0 {
            return Err(DomainError::validation("quantity must be at least 1"));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// Quantity after adding one.
    pub fn incremented(self) -> DomainResult<Self> {
        self.0
            .checked_add(1)
            .map(Quantity)
            .ok_or_else(|| DomainError::invariant("quantity overflow"))
    }

    /// Quantity after removing one, or `None` when this was the last unit
    /// (the document must be deleted, never stored at zero).
    pub fn decremented(self) -> Option<Self> {
        match self.0 {
            1 => None,
            n => Some(Quantity(n - 1)),
        }
    }
}

impl core::fmt::Display for Quantity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}
