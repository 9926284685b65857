//! 消息总线核心实现

use parking_lot::Mutex;
use shared::message::BusMessage;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Outbound port for realtime events
pub trait EventPublisher: Send + Sync {
    /// Fire and forget
    fn publish(&self, msg: BusMessage);
}

/// 消息总线 - broadcast 通道上的进程内发布端
#[derive(Debug, Clone)]
pub struct MessageBus {
    tx: broadcast::Sender<BusMessage>,
    shutdown_token: CancellationToken,
}

impl MessageBus {
    /// 默认容量 1024
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// 订阅所有已发布的消息
    pub fn subscribe(&self) -> broadcast::Receiver<BusMessage> {
        self.tx.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// 获取关闭令牌 (用于监控关闭信号)
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown_token
    }

    pub fn shutdown(&self) {
        tracing::info!("Shutting down message bus");
        self.shutdown_token.cancel();
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventPublisher for MessageBus {
    fn publish(&self, msg: BusMessage) {
        let event = msg.event.name();
        let topic = msg.topic.to_string();
        match self.tx.send(msg) {
            Ok(receivers) => tracing::debug!(event, topic, receivers, "event published"),
            Err(_) => tracing::warn!(event, topic, "no subscribers, event dropped"),
        }
    }
}

/// In-process publisher that keeps every message, for tests and tooling
#[derive(Debug, Clone, Default)]
pub struct MemoryPublisher {
    messages: Arc<Mutex<Vec<BusMessage>>>,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything published so far
    pub fn messages(&self) -> Vec<BusMessage> {
        self.messages.lock().clone()
    }

    /// Drain recorded messages
    pub fn take(&self) -> Vec<BusMessage> {
        std::mem::take(&mut *self.messages.lock())
    }

    /// Count of messages carrying the given event name
    pub fn count(&self, event: &str) -> usize {
        self.messages
            .lock()
            .iter()
            .filter(|m| m.event.name() == event)
            .count()
    }
}

impl EventPublisher for MemoryPublisher {
    fn publish(&self, msg: BusMessage) {
        self.messages.lock().push(msg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::message::{RealtimeEvent, TableStatusPayload, Topic};
    use shared::models::TableStatus;

    fn table_event() -> RealtimeEvent {
        RealtimeEvent::TableStatusChanged(TableStatusPayload {
            table_id: 1,
            table_number: "A1".into(),
            status: TableStatus::Occupied,
            session_id: None,
        })
    }

    #[tokio::test]
    async fn test_subscriber_receives_published_message() {
        let bus = MessageBus::new();
        let mut rx = bus.subscribe();

        bus.publish(BusMessage::new(Topic::Broadcast, table_event()));

        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.topic, Topic::Broadcast);
        assert_eq!(msg.event.name(), "table.status_changed");
    }

    #[test]
    fn test_publish_without_subscribers_does_not_fail() {
        let bus = MessageBus::new();
        assert_eq!(bus.receiver_count(), 0);
        bus.publish(BusMessage::new(Topic::Waiter, table_event()));
    }

    #[test]
    fn test_memory_publisher_records() {
        let publisher = MemoryPublisher::new();
        publisher.publish(BusMessage::new(Topic::Waiter, table_event()));
        publisher.publish(BusMessage::new(Topic::Broadcast, table_event()));
        assert_eq!(publisher.count("table.status_changed"), 2);
        assert_eq!(publisher.take().len(), 2);
        assert!(publisher.messages().is_empty());
    }
}
