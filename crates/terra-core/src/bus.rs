use serde::Serialize;
use std::sync::Arc;
use terra_types::message::Message;
use tokio::sync::broadcast;
use tracing::{trace, warn};

/// 事件总线
///
/// 基于 broadcast 的尽力而为扇出：不持久化、不重放，订阅之前发布的消息
/// 永远收不到。发布方从不阻塞，也不会因为没有订阅者而失败。
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Message>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Message> {
        self.sender.subscribe()
    }

    /// 发布消息，返回收到消息的订阅者数量
    ///
    /// 没有订阅者时返回 0；慢订阅者会收到 `Lagged`，不会拖住发布方。
    pub fn publish(&self, message: Message) -> usize {
        let topic = message.topic.clone();
        match self.sender.send(message) {
            Ok(receivers) => {
                trace!(topic = %topic, receivers, "Event published");
                receivers
            }
            Err(_) => {
                trace!(topic = %topic, "Event dropped, no subscribers");
                0
            }
        }
    }

    /// 序列化负载并发布
    pub fn publish_payload<T: Serialize>(&self, topic: &str, payload: &T) -> usize {
        match Message::from_payload(topic, payload) {
            Ok(message) => self.publish(message),
            Err(e) => {
                warn!(topic = %topic, error = %e, "Failed to serialize event payload");
                0
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

pub type SharedEventBus = Arc<EventBus>;
