//! In-process pub/sub hub backing the chat change feed.
//!
//! Topics are plain strings. The chat domain publishes every message change to
//! the owning customer's topic and to the shared admin topic; the SSE route
//! subscribes a connection to exactly one of them.
//!
//! Delivery is best effort: publishing to a topic nobody listens to is a
//! no-op, and a slow receiver sees a `Lagged` error instead of old events.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

use crate::common::UserId;

/// Topic every admin connection subscribes to.
pub const ADMINS_TOPIC: &str = "admins";

/// Topic carrying the changes of one customer's conversations.
pub fn user_topic(user_id: UserId) -> String {
    format!("user:{}", user_id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct StreamStats {
    pub topics: usize,
    pub subscribers: usize,
}

/// Thread-safe, cloneable hub of topic-keyed broadcast channels.
#[derive(Clone)]
pub struct StreamHub {
    channels: Arc<RwLock<HashMap<String, broadcast::Sender<serde_json::Value>>>>,
    capacity: usize,
}

impl StreamHub {
    /// Create a hub with 256 buffered events per topic.
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
            capacity,
        }
    }

    /// Publish a JSON value to a topic. Returns how many receivers got it.
    pub async fn publish(&self, topic: &str, value: serde_json::Value) -> usize {
        let channels = self.channels.read().await;
        match channels.get(topic) {
            Some(tx) => tx.send(value).unwrap_or(0),
            None => 0,
        }
    }

    /// Publish the same value to several topics.
    pub async fn publish_many<I, S>(&self, topics: I, value: serde_json::Value) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut delivered = 0;
        for topic in topics {
            delivered += self.publish(topic.as_ref(), value.clone()).await;
        }
        delivered
    }

    /// Subscribe to a topic, creating its channel on first use.
    pub async fn subscribe(&self, topic: &str) -> broadcast::Receiver<serde_json::Value> {
        let mut channels = self.channels.write().await;
        let tx = channels
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0);
        tx.subscribe()
    }

    /// Live topics and the receivers attached to them.
    pub async fn stats(&self) -> StreamStats {
        let channels = self.channels.read().await;
        StreamStats {
            topics: channels.len(),
            subscribers: channels.values().map(|tx| tx.receiver_count()).sum(),
        }
    }

    /// Drop channels nobody listens to anymore.
    pub async fn cleanup(&self) {
        let mut channels = self.channels.write().await;
        channels.retain(|_, tx| tx.receiver_count() > 0);
    }
}

impl Default for StreamHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let hub = StreamHub::new();
        let mut rx = hub.subscribe(ADMINS_TOPIC).await;

        let value = json!({"type": "message_deleted"});
        assert_eq!(hub.publish(ADMINS_TOPIC, value.clone()).await, 1);
        assert_eq!(rx.recv().await.unwrap(), value);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_noop() {
        let hub = StreamHub::new();
        assert_eq!(hub.publish("user:nobody", json!({})).await, 0);
    }

    #[tokio::test]
    async fn test_publish_many_fans_out_per_topic() {
        let hub = StreamHub::new();
        let owner = UserId::new();
        let mut customer = hub.subscribe(&user_topic(owner)).await;
        let mut admin = hub.subscribe(ADMINS_TOPIC).await;

        let value = json!({"type": "message_inserted"});
        let delivered = hub
            .publish_many([user_topic(owner), ADMINS_TOPIC.to_string()], value.clone())
            .await;

        assert_eq!(delivered, 2);
        assert_eq!(customer.recv().await.unwrap(), value);
        assert_eq!(admin.recv().await.unwrap(), value);
    }

    #[tokio::test]
    async fn test_cleanup_removes_abandoned_topics() {
        let hub = StreamHub::new();
        let rx = hub.subscribe("user:ephemeral").await;
        assert_eq!(hub.channels.read().await.len(), 1);

        drop(rx);
        hub.cleanup().await;

        assert!(hub.channels.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_stats_count_topics_and_subscribers() {
        let hub = StreamHub::new();
        let _admin_a = hub.subscribe(ADMINS_TOPIC).await;
        let _admin_b = hub.subscribe(ADMINS_TOPIC).await;
        let customer = hub.subscribe(&user_topic(UserId::new())).await;

        assert_eq!(hub.stats().await, StreamStats { topics: 2, subscribers: 3 });

        drop(customer);
        hub.cleanup().await;
        assert_eq!(hub.stats().await, StreamStats { topics: 1, subscribers: 2 });
    }
}
