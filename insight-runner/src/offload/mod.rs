//! Bounded worker pool for blocking inference work.
//!
//! Model calls block for seconds to minutes. They run on a fixed set of
//! long-lived worker threads fed from one FIFO queue, and their results come
//! back to the async side through a oneshot channel, so the runtime threads
//! never block on them.
//!
//! There is no cancellation: dropping a [`JobHandle`] only discards the
//! result, the job itself still runs to completion.

use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::task::{Context, Poll};
use std::thread;

use tokio::sync::oneshot;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Failures of the pool itself, as opposed to failures of the work.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OffloadError {
    #[error("offloaded job panicked: {0}")]
    Panicked(String),

    #[error("offload pool is shut down")]
    Closed,
}

#[derive(Debug, Default)]
struct Counters {
    queued: AtomicUsize,
    running: AtomicUsize,
}

/// Fixed-size pool of worker threads.
pub struct OffloadPool {
    tx: Mutex<Option<mpsc::Sender<Job>>>,
    capacity: usize,
    counters: Arc<Counters>,
}

impl OffloadPool {
    /// Start `capacity` worker threads (at least one).
    pub fn new(capacity: usize) -> std::io::Result<Self> {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel::<Job>();
        let shared_rx = Arc::new(Mutex::new(rx));

        for index in 0..capacity {
            let rx = shared_rx.clone();
            thread::Builder::new()
                .name(format!("offload-{}", index))
                .spawn(move || loop {
                    // Only one idle worker waits on the queue at a time, so jobs
                    // are taken in submission order.
                    let job = {
                        let guard = rx.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                        guard.recv()
                    };

                    match job {
                        Ok(job) => job(),
                        Err(_) => break,
                    }
                })?;
        }

        tracing::info!(workers = capacity, "Offload pool started");

        Ok(Self {
            tx: Mutex::new(Some(tx)),
            capacity,
            counters: Arc::new(Counters::default()),
        })
    }

    /// Queue a blocking job and get a handle to its result.
    ///
    /// Enqueueing happens before this returns, so jobs spawned one after the
    /// other start in that order.
    pub fn spawn<F, T>(&self, f: F) -> Result<JobHandle<T>, OffloadError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (result_tx, result_rx) = oneshot::channel();
        let counters = self.counters.clone();

        let job: Job = Box::new(move || {
            counters.queued.fetch_sub(1, Ordering::SeqCst);
            counters.running.fetch_add(1, Ordering::SeqCst);

            let outcome = panic::catch_unwind(AssertUnwindSafe(f))
                .map_err(|payload| OffloadError::Panicked(panic_message(payload.as_ref())));

            counters.running.fetch_sub(1, Ordering::SeqCst);
            // The awaiting side may be gone; the result is simply dropped then.
            let _ = result_tx.send(outcome);
        });

        let guard = self.tx.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let sender = guard.as_ref().ok_or(OffloadError::Closed)?;

        self.counters.queued.fetch_add(1, Ordering::SeqCst);
        if sender.send(job).is_err() {
            self.counters.queued.fetch_sub(1, Ordering::SeqCst);
            return Err(OffloadError::Closed);
        }

        Ok(JobHandle { rx: result_rx })
    }

    /// Run a blocking job on the pool and await its result.
    pub async fn submit<F, T>(&self, f: F) -> Result<T, OffloadError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        self.spawn(f)?.await
    }

    /// Stop accepting jobs. Queued jobs still run; workers exit once the
    /// queue is drained.
    pub fn shutdown(&self) {
        let mut guard = self.tx.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if guard.take().is_some() {
            tracing::debug!("Offload pool shutting down");
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Jobs waiting for a free worker.
    pub fn queued(&self) -> usize {
        self.counters.queued.load(Ordering::SeqCst)
    }

    /// Jobs currently executing.
    pub fn running(&self) -> usize {
        self.counters.running.load(Ordering::SeqCst)
    }
}

impl Drop for OffloadPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Pending result of an offloaded job.
#[derive(Debug)]
pub struct JobHandle<T> {
    rx: oneshot::Receiver<Result<T, OffloadError>>,
}

impl<T> Future for JobHandle<T> {
    type Output = Result<T, OffloadError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(OffloadError::Closed)))
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
