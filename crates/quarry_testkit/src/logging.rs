//! Tracing setup for tests.

use std::sync::Once;

static INIT: Once = Once::new();

/// Initializes a test-friendly tracing subscriber, once per process.
///
/// Honors `RUST_LOG`; output goes through the test writer so it interleaves
/// with captured test output. Safe to call from every test.
pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
