use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::future::{abortable, AbortHandle};
use tokio::sync::watch;

/// Cancellable delayed emit. Scheduling always aborts the pending emit first,
/// so only a value followed by a full quiet period is published.
///
/// Must be used from within a tokio runtime.
pub struct Debouncer<T> {
    delay: Duration,
    pending: Mutex<Option<AbortHandle>>,
    tx: Arc<watch::Sender<Option<T>>>,
}

impl<T> Debouncer<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(delay: Duration) -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            delay,
            pending: Mutex::new(None),
            tx: Arc::new(tx),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<T>> {
        self.tx.subscribe()
    }

    /// Last emitted value
    pub fn latest(&self) -> Option<T> {
        self.tx.borrow().clone()
    }

    pub fn schedule(&self, value: T) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = pending.take() {
            previous.abort();
        }

        let tx = self.tx.clone();
        let delay = self.delay;
        let (task, handle) = abortable(async move {
            tokio::time::sleep(delay).await;
            tx.send_replace(Some(value));
        });
        tokio::spawn(task);
        *pending = Some(handle);
    }

    /// Publish immediately, dropping anything pending
    pub fn emit_now(&self, value: T) {
        self.cancel();
        self.tx.send_replace(Some(value));
    }

    pub fn cancel(&self) {
        if let Some(previous) = self.pending.lock().unwrap_or_else(PoisonError::into_inner).take() {
            previous.abort();
        }
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(previous) = self.pending.lock().unwrap_or_else(PoisonError::into_inner).take() {
            previous.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{sleep, timeout, Instant};

    #[tokio::test(start_paused = true)]
    async fn emits_once_after_quiet_period() {
        let debouncer = Debouncer::new(Duration::from_millis(500));
        let mut rx = debouncer.subscribe();
        let start = Instant::now();

        debouncer.schedule("s");
        sleep(Duration::from_millis(100)).await;
        debouncer.schedule("st");
        sleep(Duration::from_millis(100)).await;
        debouncer.schedule("status");

        rx.changed().await.unwrap();
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(700) && elapsed < Duration::from_millis(702), "{:?}", elapsed);
        assert_eq!(*rx.borrow_and_update(), Some("status"));

        // Nothing else is pending
        assert!(timeout(Duration::from_secs(5), rx.changed()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_drops_pending_value() {
        let debouncer = Debouncer::new(Duration::from_millis(50));
        let mut rx = debouncer.subscribe();

        debouncer.schedule(1);
        debouncer.cancel();

        assert!(timeout(Duration::from_secs(1), rx.changed()).await.is_err());
        assert_eq!(debouncer.latest(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn emit_now_supersedes_pending() {
        let debouncer = Debouncer::new(Duration::from_millis(50));
        let mut rx = debouncer.subscribe();

        debouncer.schedule(1);
        debouncer.emit_now(2);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), Some(2));

        assert!(timeout(Duration::from_secs(1), rx.changed()).await.is_err());
    }
}
