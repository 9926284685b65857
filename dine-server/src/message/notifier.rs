//! Topic helpers over the publisher port

use super::EventPublisher;
use shared::message::{BusMessage, RealtimeEvent, Topic};
use std::sync::Arc;

/// 通知器 - 按受众选择主题
#[derive(Clone)]
pub struct Notifier {
    publisher: Arc<dyn EventPublisher>,
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier").finish_non_exhaustive()
    }
}

impl Notifier {
    pub fn new(publisher: Arc<dyn EventPublisher>) -> Self {
        Self { publisher }
    }

    pub fn emit(&self, topic: Topic, event: RealtimeEvent) {
        self.publisher.publish(BusMessage::new(topic, event));
    }

    pub fn waiter(&self, event: RealtimeEvent) {
        self.emit(Topic::Waiter, event);
    }

    pub fn kitchen(&self, event: RealtimeEvent) {
        self.emit(Topic::Kitchen, event);
    }

    /// 服务员 + 厨房
    pub fn staff(&self, event: RealtimeEvent) {
        self.emit(Topic::Waiter, event.clone());
        self.emit(Topic::Kitchen, event);
    }

    /// 顾客会话主题
    pub fn session(&self, session_key: &str, event: RealtimeEvent) {
        self.emit(Topic::session(session_key), event);
    }

    pub fn broadcast(&self, event: RealtimeEvent) {
        self.emit(Topic::Broadcast, event);
    }
}
