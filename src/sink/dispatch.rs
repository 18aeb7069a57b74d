//! Notification dispatcher
//!
//! Bounded queue in front of a small worker pool. Delivery is best-effort:
//! when the queue is full the notification is dropped with a warning, so a
//! slow notifier can never stall frame processing.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

use crate::models::SignalType;

/// Outbound notification
#[derive(Debug, Clone)]
pub struct Notification {
    pub event_id: u64,
    pub stream_id: String,
    pub platform: String,
    pub streamer_name: String,
    pub signal: SignalType,
    pub matched: BTreeSet<String>,
    /// Annotated snapshot for visual alerts
    pub image: Option<Vec<u8>>,
    /// Transcript for audio alerts
    pub transcript: Option<String>,
}

/// Delivery seam
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification);
}

/// Notifier that only logs, for deployments without a webhook
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, n: &Notification) {
        tracing::info!(
            event_id = n.event_id,
            stream_id = %n.stream_id,
            signal = n.signal.as_str(),
            matched = ?n.matched,
            "Alert notification"
        );
    }
}

/// NotificationDispatcher - queue handle shared by all sessions
#[derive(Clone)]
pub struct NotificationDispatcher {
    tx: mpsc::Sender<Notification>,
}

impl NotificationDispatcher {
    /// Spawn `workers` delivery tasks over a queue of `queue_size`
    pub fn start(notifier: Arc<dyn Notifier>, queue_size: usize, workers: usize) -> Self {
        let (tx, rx) = mpsc::channel::<Notification>(queue_size);
        let rx = Arc::new(Mutex::new(rx));

        for worker_id in 0..workers.max(1) {
            let rx = rx.clone();
            let notifier = notifier.clone();
            tokio::spawn(async move {
                loop {
                    let notification = {
                        let mut rx = rx.lock().await;
                        rx.recv().await
                    };
                    match notification {
                        Some(n) => notifier.notify(&n).await,
                        None => break,
                    }
                }
                tracing::debug!(worker_id = worker_id, "Notification worker stopped");
            });
        }

        Self { tx }
    }

    /// Enqueue without blocking; drops on a full queue
    pub fn dispatch(&self, notification: Notification) {
        if let Err(e) = self.tx.try_send(notification) {
            match e {
                mpsc::error::TrySendError::Full(n) => {
                    tracing::warn!(
                        event_id = n.event_id,
                        stream_id = %n.stream_id,
                        "Notification dropped: queue full"
                    );
                }
                mpsc::error::TrySendError::Closed(_) => {
                    tracing::warn!("Notification dropped: dispatcher stopped");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    fn notification(event_id: u64) -> Notification {
        Notification {
            event_id,
            stream_id: "room-1".to_string(),
            platform: "generic".to_string(),
            streamer_name: "someone".to_string(),
            signal: SignalType::Visual,
            matched: BTreeSet::from(["person".to_string()]),
            image: None,
            transcript: None,
        }
    }

    struct CountingNotifier {
        delivered: AtomicUsize,
    }

    #[async_trait]
    impl Notifier for CountingNotifier {
        async fn notify(&self, _n: &Notification) {
            self.delivered.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct BlockedNotifier {
        release: Arc<Notify>,
    }

    #[async_trait]
    impl Notifier for BlockedNotifier {
        async fn notify(&self, _n: &Notification) {
            self.release.notified().await;
        }
    }

    #[tokio::test]
    async fn test_delivers_queued_notifications() {
        let notifier = Arc::new(CountingNotifier {
            delivered: AtomicUsize::new(0),
        });
        let dispatcher = NotificationDispatcher::start(notifier.clone(), 8, 2);

        for i in 0..5 {
            dispatcher.dispatch(notification(i));
        }

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(notifier.delivered.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_full_queue_drops_instead_of_blocking() {
        let release = Arc::new(Notify::new());
        let notifier = Arc::new(BlockedNotifier {
            release: release.clone(),
        });
        let dispatcher = NotificationDispatcher::start(notifier, 1, 1);

        // First is taken by the (blocked) worker, second fills the queue,
        // the rest drop without blocking this task
        dispatcher.dispatch(notification(1));
        tokio::time::sleep(Duration::from_millis(100)).await;
        dispatcher.dispatch(notification(2));
        dispatcher.dispatch(notification(3));
        dispatcher.dispatch(notification(4));

        release.notify_waiters();
    }
}
