// tests/common/mod.rs

pub use driverwatch_test_utils::init_tracing;

use std::time::Duration;

/// Poll `check` every 10ms until it returns true or ~2s elapse.
#[allow(dead_code)]
pub async fn eventually<F: FnMut() -> bool>(mut check: F) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
