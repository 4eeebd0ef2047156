//! Stop Signal - shared cancellation for the read loop
//!
//! Unlike a bare flag, waiters are woken as soon as the signal fires, so a
//! loop parked on a silent device still observes the stop.

use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone)]
pub struct StopSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl StopSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Fire the signal. Idempotent.
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once `stop` has been called (immediately if it already was)
    pub async fn stopped(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this cannot fail
        let _ = rx.wait_for(|stopped| *stopped).await;
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_stop_wakes_waiter() {
        let signal = StopSignal::new();
        let waiter = {
            let signal = signal.clone();
            tokio::spawn(async move { signal.stopped().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!signal.is_stopped());
        signal.stop();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake")
            .unwrap();
        assert!(signal.is_stopped());
    }

    #[tokio::test]
    async fn test_already_stopped_resolves_immediately() {
        let signal = StopSignal::new();
        signal.stop();
        signal.stop();
        tokio::time::timeout(Duration::from_millis(100), signal.stopped())
            .await
            .expect("should resolve");
    }
}
