//! Admission barrier for asynchronous dispatch.
//!
//! `go --start N` opens a barrier that admits tasks in batches of `N`
//! (`0` = no limit). Once `N` tasks have been admitted, the next `go cmd`
//! blocks until that whole batch has finished, then starts a new batch.
//! `go --wait` closes the barrier and waits for every task it admitted.

use std::future::Future;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;

use crate::error::{InterpError, InterpResult};

/// Tasks admitted since the barrier last drained.
#[derive(Debug)]
struct Batch {
    admitted: usize,
    tracker: TaskTracker,
}

impl Batch {
    fn new() -> Self {
        Self {
            admitted: 0,
            tracker: TaskTracker::new(),
        }
    }
}

/// Bounded fan-out for `go` tasks.
#[derive(Debug)]
pub struct AdmissionBarrier {
    capacity: usize,
    batch: Mutex<Batch>,
    tracker: TaskTracker,
}

impl AdmissionBarrier {
    /// Open a barrier admitting batches of `capacity` tasks (0 = unbounded).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            batch: Mutex::new(Batch::new()),
            tracker: TaskTracker::new(),
        }
    }

    /// Configured capacity; 0 means unbounded.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Tasks admitted and not yet finished.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Admit `task` as a tracked member of the barrier.
    ///
    /// When the current batch is full the caller blocks until every task in
    /// it has finished.
    pub async fn spawn<F>(&self, task: F) -> InterpResult<JoinHandle<()>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.tracker.is_closed() {
            return Err(InterpError::Concurrency("barrier is draining".into()));
        }

        let mut batch = self.batch.lock().await;
        if self.capacity > 0 && batch.admitted >= self.capacity {
            tracing::debug!(capacity = self.capacity, "admission blocked until batch drains");
            batch.tracker.close();
            batch.tracker.wait().await;
            *batch = Batch::new();
        }
        batch.admitted += 1;

        tracing::debug!(in_flight = self.in_flight() + 1, batch = batch.admitted, "task admitted");
        Ok(self.tracker.spawn(batch.tracker.track_future(task)))
    }

    /// Stop admitting and wait until every admitted task has finished.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        tracing::debug!("barrier drained");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn unbounded_admits_everything() {
        let barrier = AdmissionBarrier::new(0);
        let done = Arc::new(AtomicUsize::new(0));
        for _ in 0..5 {
            let done = done.clone();
            barrier
                .spawn(async move {
                    done.fetch_add(1, Ordering::SeqCst);
                })
                .await
                .unwrap();
        }
        barrier.drain().await;
        assert_eq!(done.load(Ordering::SeqCst), 5);
        assert_eq!(barrier.in_flight(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn capacity_holds_extra_tasks() {
        let barrier = Arc::new(AdmissionBarrier::new(2));
        let (tx, rx) = tokio::sync::watch::channel(false);

        for _ in 0..2 {
            let mut rx = rx.clone();
            barrier
                .spawn(async move {
                    let _ = rx.wait_for(|release| *release).await;
                })
                .await
                .unwrap();
        }
        assert_eq!(barrier.in_flight(), 2);

        let third = {
            let barrier = barrier.clone();
            tokio::spawn(async move { barrier.spawn(async {}).await.map(|_| ()) })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!third.is_finished(), "third task admitted while at capacity");

        tx.send(true).unwrap();
        third.await.unwrap().unwrap();
        barrier.drain().await;
        assert_eq!(barrier.in_flight(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn full_batch_must_drain_before_next_admission() {
        let barrier = Arc::new(AdmissionBarrier::new(2));
        let (first_tx, first_rx) = tokio::sync::oneshot::channel::<()>();
        let (second_tx, second_rx) = tokio::sync::oneshot::channel::<()>();

        barrier.spawn(async move { let _ = first_rx.await; }).await.unwrap();
        barrier.spawn(async move { let _ = second_rx.await; }).await.unwrap();

        let third = {
            let barrier = barrier.clone();
            tokio::spawn(async move { barrier.spawn(async {}).await.map(|_| ()) })
        };

        first_tx.send(()).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(barrier.in_flight(), 1);
        assert!(!third.is_finished(), "a free slot alone must not admit the next task");

        second_tx.send(()).unwrap();
        third.await.unwrap().unwrap();
        barrier.drain().await;
        assert_eq!(barrier.in_flight(), 0);
    }

    #[tokio::test]
    async fn spawn_after_drain_is_rejected() {
        let barrier = AdmissionBarrier::new(1);
        barrier.drain().await;
        let err = barrier.spawn(async {}).await.unwrap_err();
        assert!(matches!(err, InterpError::Concurrency(_)));
    }
}
