//! Integration test crate for Timeweave.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It depends on the timeweave crates to verify they work together.

#[cfg(test)]
mod timeline;

#[cfg(test)]
mod serialization;

/// Route library `tracing` output to the test harness. Filtered by `RUST_LOG`.
#[cfg(test)]
pub(crate) fn init_tracing() {
    use std::sync::Once;

    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
