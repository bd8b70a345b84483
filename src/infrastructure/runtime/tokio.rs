use crate::domain::ports::task_spawner::TaskSpawner;
use crate::domain::ports::time_service::TimeService;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::time::Duration;

/// Spawns onto the ambient Tokio runtime; the join handle is dropped so the
/// task outlives whoever started it.
#[derive(Clone, Debug, Default)]
pub struct TokioTaskSpawner;

impl TokioTaskSpawner {
    pub fn new() -> Self {
        Self
    }
}

impl TaskSpawner for TokioTaskSpawner {
    fn spawn(&self, future: BoxFuture<'static, ()>) {
        tokio::spawn(future);
    }
}

/// Real sleeps on the Tokio timer.
#[derive(Clone, Debug, Default)]
pub struct TokioTimeService;

impl TokioTimeService {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TimeService for TokioTimeService {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
