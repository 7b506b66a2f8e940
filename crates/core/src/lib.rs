//! `stockroom-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod key;
pub mod quantity;

pub use error::{DomainError, DomainResult};
pub use key::ItemKey;
pub use quantity::Quantity;
