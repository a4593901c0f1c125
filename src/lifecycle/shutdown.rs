//! Shutdown coordination for the dispatcher.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

/// Coordinator for graceful shutdown.
///
/// A broadcast channel the transport and background tasks subscribe to.
/// Clones share the same channel.
#[derive(Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
    triggered: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            triggered: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Fire the signal. Later calls are no-ops.
    pub fn trigger(&self) {
        if !self.triggered.swap(true, Ordering::SeqCst) {
            let _ = self.tx.send(());
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Number of tasks still listening.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Await `task`, giving up `grace` after shutdown fires.
    /// Returns `None` when the grace period ran out.
    pub async fn drain<F: Future>(&self, grace: Duration, task: F) -> Option<F::Output> {
        tokio::pin!(task);
        let mut rx = self.subscribe();
        if !self.is_triggered() {
            tokio::select! {
                out = &mut task => return Some(out),
                _ = rx.recv() => {}
            }
        }
        match tokio::time::timeout(grace, task).await {
            Ok(out) => Some(out),
            Err(_) => {
                tracing::warn!(grace_secs = grace.as_secs(), "Shutdown grace period elapsed");
                None
            }
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
