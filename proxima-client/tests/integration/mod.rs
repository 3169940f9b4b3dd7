//! Integration tests for proxima-client.
//!
//! - `engine_tests` - one engine against a scripted broker and mock links
//! - `end_to_end_tests` - clients talking through a real broker socket

pub mod engine_tests;

use tracing::Level;

/// Initialize tracing for tests (call once per test).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}
