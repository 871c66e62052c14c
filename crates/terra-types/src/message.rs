use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 事件总线上传递的消息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub topic: String,
    pub payload: serde_json::Value,
    /// 发布时间（毫秒）
    pub timestamp: i64,
}

impl Message {
    pub fn new(topic: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            topic: topic.into(),
            payload,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// 从可序列化的负载构建消息
    pub fn from_payload<T: Serialize>(
        topic: impl Into<String>,
        payload: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::new(topic, serde_json::to_value(payload)?))
    }

    pub fn is(&self, topic: &str) -> bool {
        self.topic == topic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct Probe {
        region_id: String,
        new_alerts: usize,
    }

    #[test]
    fn test_from_payload_keeps_field_names() {
        let msg = Message::from_payload(
            "region_status_update",
            &Probe {
                region_id: "reg_1".to_string(),
                new_alerts: 0,
            },
        )
        .unwrap();

        assert!(msg.is("region_status_update"));
        assert_eq!(msg.payload, json!({"region_id": "reg_1", "new_alerts": 0}));
        assert!(msg.timestamp > 0);
    }
}
