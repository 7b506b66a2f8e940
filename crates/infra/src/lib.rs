//! Infrastructure layer: store adapters and the inventory mutation service.

pub mod blob_store;
pub mod document_store;
pub mod error;
pub mod service;

pub use error::StoreError;
pub use service::{Decremented, InventoryService, ServiceError};

#[cfg(test)]
mod integration_tests;
