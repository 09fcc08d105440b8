use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use thiserror::Error;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use warung_core::domain::customer::chat_id_for;
use warung_core::domain::notification::Notification;

use crate::transport::ChannelTransport;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("notification queue is full (capacity {capacity})")]
    Full { capacity: usize },
}

/// Bounded buffer of outbound notifications.
///
/// Producers append; the delivery loop swaps the whole buffer out, so each
/// notification is handed to the transport at most once.
pub struct NotificationQueue {
    pending: Mutex<Vec<Notification>>,
    capacity: usize,
}

impl NotificationQueue {
    pub fn new(capacity: usize) -> Self {
        Self { pending: Mutex::new(Vec::new()), capacity: capacity.max(1) }
    }

    fn pending(&self) -> MutexGuard<'_, Vec<Notification>> {
        match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Fails when a push right now would be rejected.
    pub fn ensure_capacity(&self) -> Result<(), QueueError> {
        if self.pending().len() >= self.capacity {
            return Err(QueueError::Full { capacity: self.capacity });
        }
        Ok(())
    }

    /// Returns the queue depth after the push.
    pub fn enqueue(&self, notification: Notification) -> Result<usize, QueueError> {
        let mut pending = self.pending();
        if pending.len() >= self.capacity {
            return Err(QueueError::Full { capacity: self.capacity });
        }
        pending.push(notification);
        Ok(pending.len())
    }

    pub fn drain(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.pending())
    }

    pub fn len(&self) -> usize {
        self.pending().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
}

pub struct DeliveryLoop {
    queue: Arc<NotificationQueue>,
    transport: Arc<dyn ChannelTransport>,
    interval: Duration,
}

impl DeliveryLoop {
    pub fn new(
        queue: Arc<NotificationQueue>,
        transport: Arc<dyn ChannelTransport>,
        interval: Duration,
    ) -> Self {
        Self { queue, transport, interval }
    }

    /// Sends everything queued right now. Failures are logged and dropped.
    pub async fn run_cycle(&self) -> DeliveryReport {
        let batch = self.queue.drain();
        let mut report = DeliveryReport::default();
        if batch.is_empty() {
            return report;
        }

        for notification in batch {
            let chat_id = chat_id_for(&notification.customer_id);
            match self.transport.send_message(&chat_id, &notification.message).await {
                Ok(()) => report.delivered += 1,
                Err(error) => {
                    report.failed += 1;
                    warn!(
                        event_name = "egress.notification.failed",
                        customer_id = %notification.customer_id,
                        error = %error,
                        "notification delivery failed; dropping"
                    );
                }
            }
        }

        info!(
            event_name = "egress.notification.cycle",
            delivered = report.delivered,
            failed = report.failed,
            "notification cycle finished"
        );
        report
    }

    /// Drains on every tick until `shutdown` resolves, then drains once more.
    pub async fn run<F>(self, shutdown: F)
    where
        F: Future<Output = ()> + Send,
    {
        let mut ticker = tokio::time::interval(self.interval.max(Duration::from_millis(10)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_cycle().await;
                }
                () = &mut shutdown => {
                    debug!(pending = self.queue.len(), "delivery loop stopping");
                    self.run_cycle().await;
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use warung_core::domain::notification::Notification;

    use super::{DeliveryLoop, NotificationQueue, QueueError};
    use crate::transport::tests::ScriptedTransport;
    use crate::transport::TransportError;

    #[test]
    fn enqueue_rejects_when_full() {
        let queue = NotificationQueue::new(2);
        assert_eq!(queue.enqueue(Notification::new("628111", "a")), Ok(1));
        assert_eq!(queue.enqueue(Notification::new("628111", "b")), Ok(2));
        assert_eq!(
            queue.enqueue(Notification::new("628111", "c")),
            Err(QueueError::Full { capacity: 2 })
        );
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.ensure_capacity(), Err(QueueError::Full { capacity: 2 }));

        queue.drain();
        assert_eq!(queue.ensure_capacity(), Ok(()));
    }

    #[tokio::test]
    async fn cycle_delivers_each_notification_once_even_when_one_fails() {
        let queue = Arc::new(NotificationQueue::new(10));
        queue.enqueue(Notification::new("628111", "first")).expect("enqueue");
        queue.enqueue(Notification::new("0822", "second")).expect("enqueue");
        queue.enqueue(Notification::new("628333@c.us", "third")).expect("enqueue");

        let transport = Arc::new(ScriptedTransport::with_script(
            vec![],
            vec![],
            vec![Ok(()), Err(TransportError::Send("bridge offline".to_owned())), Ok(())],
        ));
        let delivery =
            DeliveryLoop::new(queue.clone(), transport.clone(), Duration::from_secs(5));

        let report = delivery.run_cycle().await;
        assert_eq!(report.delivered, 2);
        assert_eq!(report.failed, 1);
        assert!(queue.is_empty());
        assert_eq!(
            transport.sent().await,
            vec![
                ("628111@c.us".to_owned(), "first".to_owned()),
                ("628333@c.us".to_owned(), "third".to_owned()),
            ]
        );

        let second = delivery.run_cycle().await;
        assert_eq!(second.delivered + second.failed, 0);
        assert_eq!(transport.sent().await.len(), 2);
    }

    #[tokio::test]
    async fn run_drains_remaining_items_on_shutdown() {
        let queue = Arc::new(NotificationQueue::new(10));
        let transport = Arc::new(ScriptedTransport::default());
        let delivery =
            DeliveryLoop::new(queue.clone(), transport.clone(), Duration::from_secs(3_600));

        queue.enqueue(Notification::new("628111", "late")).expect("enqueue");
        delivery.run(async {}).await;

        assert!(queue.is_empty());
        assert_eq!(transport.sent().await.len(), 1);
    }
}
