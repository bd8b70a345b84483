use futures::future::BoxFuture;

/// Runs futures detached from the caller.
///
/// Holiday fetches are spawned through this so that a cancelled request does
/// not cancel a fetch other requests are waiting on.
pub trait TaskSpawner: Send + Sync {
    fn spawn(&self, future: BoxFuture<'static, ()>);
}
