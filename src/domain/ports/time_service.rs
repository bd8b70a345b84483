use async_trait::async_trait;
use std::time::Duration;

/// Suspends the caller; lets retry backoff run without real delays in tests.
#[async_trait]
pub trait TimeService: Send + Sync {
    async fn sleep(&self, duration: Duration);
}
