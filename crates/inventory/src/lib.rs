//! `stockroom-inventory` — the item model and pure inventory logic.
//!
//! Infrastructure (store adapters, the mutation service) lives in
//! `stockroom-infra`; this crate holds the shapes they move around and the
//! logic that needs no IO.

pub mod filter;
pub mod item;

pub use filter::filter;
pub use item::{ImageRef, Item, ItemEdit, ItemRecord, NewItem};
