//! Shared tracing/logging setup for binaries and tests.

/// Initialize process-wide observability.
///
/// Safe to call more than once; later calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Tracing configuration (filters, output format).
pub mod tracing;
