//! Pub/sub transport abstraction
//!
//! The coordinator never talks to a broker directly; it goes through
//! [`BusTransport`], which delivers raw messages into an ordinary channel.
//! Topics are `/`-separated; subscription patterns may use `+` to match
//! exactly one segment.

use crate::error::Result;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};

/// Buffered messages per subscription before slow consumers start missing.
const SUBSCRIPTION_BUFFER: usize = 256;

/// A raw message as carried by the bus.
#[derive(Debug, Clone)]
pub struct BusMessage {
    /// Full topic the message was published on
    pub topic: String,
    /// Serialized payload bytes
    pub payload: Vec<u8>,
}

/// Pub/sub transport capability.
///
/// Delivery quality (qos, reconnect, ordering between publishers) is the
/// transport's own; subscribers must tolerate duplicates and reordering.
#[async_trait::async_trait]
pub trait BusTransport: Send + Sync {
    /// Publish a payload on a topic.
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()>;

    /// Subscribe to a set of topic patterns.
    ///
    /// Returns one receiver carrying every message that matches any pattern.
    async fn subscribe(&self, patterns: &[String]) -> Result<mpsc::Receiver<BusMessage>>;
}

/// Whether a topic matches a pattern, segment by segment.
///
/// `+` matches exactly one segment; everything else matches literally.
#[must_use]
pub fn topic_matches(pattern: &str, topic: &str) -> bool {
    let mut pattern_segments = pattern.split('/');
    let mut topic_segments = topic.split('/');

    loop {
        match (pattern_segments.next(), topic_segments.next()) {
            (None, None) => return true,
            (Some(p), Some(t)) => {
                if p != "+" && p != t {
                    return false;
                }
            }
            _ => return false,
        }
    }
}

/// In-process transport over a broadcast channel.
///
/// Every subscription sees every published message that matches its patterns;
/// slow subscribers miss messages (lagged) rather than blocking publishers.
/// Used by tests and single-process swarms.
#[derive(Clone)]
pub struct ChannelTransport {
    sender: broadcast::Sender<BusMessage>,
}

impl ChannelTransport {
    /// Create a transport with the given broadcast capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }
}

impl Default for ChannelTransport {
    fn default() -> Self {
        Self::new(SUBSCRIPTION_BUFFER)
    }
}

#[async_trait::async_trait]
impl BusTransport for ChannelTransport {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        let message = BusMessage {
            topic: topic.to_string(),
            payload,
        };
        // send() errs when there are no subscribers, which is fine
        let _ = self.sender.send(message);
        Ok(())
    }

    async fn subscribe(&self, patterns: &[String]) -> Result<mpsc::Receiver<BusMessage>> {
        let patterns: Vec<String> = patterns.to_vec();
        let mut source = self.sender.subscribe();
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);

        tokio::spawn(async move {
            loop {
                match source.recv().await {
                    Ok(message) => {
                        if !patterns.iter().any(|p| topic_matches(p, &message.topic)) {
                            continue;
                        }
                        if tx.send(message).await.is_err() {
                            debug!("subscriber dropped, ending forward task");
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "subscriber lagged, messages dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_topic_matches_literal() {
        assert!(topic_matches("dev/tasks/new", "dev/tasks/new"));
        assert!(!topic_matches("dev/tasks/new", "dev/tasks/assigned"));
        assert!(!topic_matches("dev/tasks/new", "dev/tasks/new/extra"));
    }

    #[test]
    fn test_topic_matches_single_segment_wildcard() {
        assert!(topic_matches("dev/agents/+/status", "dev/agents/a1/status"));
        assert!(topic_matches("dev/agents/+/status", "dev/agents/a2/status"));
        assert!(!topic_matches("dev/agents/+/status", "dev/agents/status"));
        assert!(!topic_matches("dev/agents/+/status", "dev/agents/a1/b2/status"));
    }

    #[tokio::test]
    async fn test_channel_transport_routes_by_pattern() {
        let transport = Arc::new(ChannelTransport::default());
        let mut new_rx = transport
            .subscribe(&["dev/tasks/new".to_string()])
            .await
            .unwrap();
        let mut status_rx = transport
            .subscribe(&["dev/agents/+/status".to_string()])
            .await
            .unwrap();

        transport
            .publish("dev/tasks/new", b"task".to_vec())
            .await
            .unwrap();
        transport
            .publish("dev/agents/a1/status", b"status".to_vec())
            .await
            .unwrap();

        let msg = new_rx.recv().await.unwrap();
        assert_eq!(msg.topic, "dev/tasks/new");
        assert_eq!(msg.payload, b"task");

        let msg = status_rx.recv().await.unwrap();
        assert_eq!(msg.topic, "dev/agents/a1/status");
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        let transport = ChannelTransport::default();
        transport.publish("dev/broadcast", vec![]).await.unwrap();
    }

    #[tokio::test]
    async fn test_multiple_patterns_one_receiver() {
        let transport = ChannelTransport::default();
        let mut rx = transport
            .subscribe(&["dev/tasks/new".to_string(), "dev/broadcast".to_string()])
            .await
            .unwrap();

        transport.publish("dev/broadcast", b"b".to_vec()).await.unwrap();
        transport.publish("dev/tasks/other", b"x".to_vec()).await.unwrap();
        transport.publish("dev/tasks/new", b"n".to_vec()).await.unwrap();

        assert_eq!(rx.recv().await.unwrap().payload, b"b");
        // the non-matching topic was filtered out
        assert_eq!(rx.recv().await.unwrap().payload, b"n");
    }
}
