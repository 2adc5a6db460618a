//! Delivery executor.
//!
//! Publication paths shape payloads synchronously and hand the actual
//! session sends to an executor so a slow serialization target never holds
//! a registry lock. Two modes: inline on the caller, or an ordered worker
//! on the tokio runtime. Both preserve submission order, which together
//! with each session's own outbound FIFO gives per-session delivery order.

use tokio::sync::mpsc;
use tracing::debug;

type Job = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Clone)]
enum Inner {
    Inline,
    Pool(mpsc::UnboundedSender<Job>),
}

/// Abstracts where delivery side effects run.
#[derive(Debug, Clone)]
pub struct FeedExecutor {
    inner: Inner,
}

impl FeedExecutor {
    /// Run every submitted task on the submitting thread.
    pub fn inline() -> Self {
        Self { inner: Inner::Inline }
    }

    /// Run tasks on a background worker, in submission order. Must be
    /// called from within a tokio runtime.
    pub fn pool() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                job();
            }
        });
        Self { inner: Inner::Pool(tx) }
    }

    /// Submit one task. Never blocks.
    pub fn submit(&self, job: impl FnOnce() + Send + 'static) {
        match &self.inner {
            Inner::Inline => job(),
            Inner::Pool(tx) => {
                if tx.send(Box::new(job)).is_err() {
                    debug!("delivery executor stopped; dropping task");
                }
            }
        }
    }
}
