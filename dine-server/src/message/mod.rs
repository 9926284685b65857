//! 实时通知
//!
//! The engine publishes a [`BusMessage`] after every committed transition.
//! Delivery is best effort: a failed send is logged and never undoes the
//! state change that produced it.
//!
//! ```text
//! service ──▶ Notifier ──▶ EventPublisher ──▶ MessageBus (broadcast)
//!                                                 │
//!                                    WebSocket / SSE gateways (external)
//! ```

mod bus;
mod notifier;

pub use bus::{EventPublisher, MemoryPublisher, MessageBus};
pub use notifier::Notifier;
pub use shared::message::{BusMessage, RealtimeEvent, Topic};
