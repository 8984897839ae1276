use super::*;

pub mod stepdown;

use std::marker::PhantomData;
use tokio::sync::Notify;
use tokio::task::AbortHandle;

/// Wrapper around a `AbortHandle` that aborts it is dropped.
pub struct ThreadHandle(pub AbortHandle);

impl Drop for ThreadHandle {
    fn drop(&mut self) {
        self.0.abort();
    }
}

#[derive(Clone)]
pub struct EventProducer<T> {
    inner: Arc<Notify>,
    phantom: PhantomData<T>,
}

impl<T> EventProducer<T> {
    /// An event produced while nobody is waiting is kept until the next wait.
    pub fn push_event(&self, _: T) {
        self.inner.notify_one();
    }
}

#[derive(Clone)]
pub struct EventConsumer<T> {
    inner: Arc<Notify>,
    phantom: PhantomData<T>,
}

impl<T> EventConsumer<T> {
    /// Return if events are produced or timeout.
    /// Returns true if an event was consumed.
    pub async fn consume_events(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.inner.notified())
            .await
            .is_ok()
    }
}

pub fn notify<T>() -> (EventProducer<T>, EventConsumer<T>) {
    let inner = Arc::new(Notify::new());
    (
        EventProducer {
            inner: inner.clone(),
            phantom: PhantomData,
        },
        EventConsumer {
            inner,
            phantom: PhantomData,
        },
    )
}

/// New entries are waiting to be replicated.
#[derive(Clone)]
pub struct ReplicationEvent;

/// The log has been extended and should be committed.
#[derive(Clone)]
pub struct CommitEvent;
