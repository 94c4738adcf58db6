// src/exec/interrupt.rs

//! Run-wide interrupt signal built on a `tokio::sync::watch` channel.

use std::sync::Arc;

use tokio::sync::watch;

/// Sending side of the interrupt signal.
///
/// Cloning is cheap; all clones trigger the same signal. Interrupting is
/// sticky: once set it stays set.
#[derive(Debug, Clone)]
pub struct InterruptHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl InterruptHandle {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Ask the run (and every job that listens) to stop.
    pub fn interrupt(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_interrupted(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> InterruptSignal {
        InterruptSignal {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for InterruptHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving side of the interrupt signal.
#[derive(Debug, Clone)]
pub struct InterruptSignal {
    rx: watch::Receiver<bool>,
}

impl InterruptSignal {
    pub fn is_interrupted(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once the run has been interrupted. Never resolves otherwise.
    pub async fn wait(&mut self) {
        if self.rx.wait_for(|set| *set).await.is_err() {
            // Every handle is gone, so nobody can interrupt any more.
            std::future::pending::<()>().await;
        }
    }
}
