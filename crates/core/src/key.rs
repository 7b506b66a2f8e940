//! Normalized item key.
//!
//! The document store is keyed by item name, and identity is
//! case/whitespace-insensitive: `"Apple"` and `" apple "` address the same
//! document. `ItemKey` is the only way to produce a store key, so every
//! store operation goes through the same normalization.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Normalized item name, used as the document key.
///
/// Invariants:
/// - trimmed (no leading/trailing whitespace)
/// - lower-cased
/// - non-empty
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemKey(String);

impl ItemKey {
    /// Normalize a raw name into a key.
    ///
    /// Rejects names that are empty after trimming; no store call should be
    /// made for such input.
    pub fn new(raw: &str) -> DomainResult<Self> {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(DomainError::validation("item name cannot be empty"));
        }
        Ok(Self(normalized))
    }

    /// Wrap a string that is already normalized (e.g. read back from the store).
    ///
    /// Re-normalizes defensively; a key that round-trips through the store
    /// must compare equal to one built from user input.
    pub fn from_stored(stored: &str) -> DomainResult<Self> {
        Self::new(stored)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for ItemKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ItemKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
