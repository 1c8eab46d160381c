//! One broadcast channel, one event type.
//!
//! The agent loop publishes exactly one event per cycle; any number of
//! subscribers (dashboard, logger, test harness) consume their own
//! receiver. Publishing never blocks on subscribers; a slow subscriber
//! lags and loses old events rather than stalling the loop.

use recc_core::ObservabilityEvent;
use tokio::sync::broadcast;
use tracing::trace;

#[derive(Clone, Debug)]
pub struct ObservabilityBus {
    tx: broadcast::Sender<ObservabilityEvent>,
}

impl ObservabilityBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// FIFO per subscriber from the point of subscription.
    pub fn subscribe(&self) -> broadcast::Receiver<ObservabilityEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// A send error only means nobody is listening; that is fine.
    pub fn publish(&self, event: ObservabilityEvent) {
        match self.tx.send(event) {
            Ok(n) => trace!(subscribers = n, "event published"),
            Err(_) => trace!("event published with no subscribers"),
        }
    }
}

impl Default for ObservabilityBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recc_core::{EmotionVector, MemoryMetrics};

    fn event(cycle: u64) -> ObservabilityEvent {
        ObservabilityEvent {
            cycle,
            timestamp: String::new(),
            prompt: None,
            response: None,
            emotional_state: EmotionVector::default(),
            memory_metrics: MemoryMetrics::default(),
            reflection_snapshot: Vec::new(),
            thresholds: Vec::new(),
        }
    }

    #[tokio::test]
    async fn subscribers_receive_events_in_publish_order() {
        let bus = ObservabilityBus::new(16);
        let mut rx = bus.subscribe();
        for cycle in 0..5 {
            bus.publish(event(cycle));
        }
        for cycle in 0..5 {
            assert_eq!(rx.recv().await.unwrap().cycle, cycle);
        }
    }

    #[tokio::test]
    async fn publishing_without_subscribers_does_not_panic() {
        let bus = ObservabilityBus::new(4);
        bus.publish(event(0));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn each_subscriber_gets_its_own_stream() {
        let bus = ObservabilityBus::new(16);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        bus.publish(event(1));
        assert_eq!(a.recv().await.unwrap().cycle, 1);
        assert_eq!(b.recv().await.unwrap().cycle, 1);
    }
}
