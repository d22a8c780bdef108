//! NATS-backed bus transport
//!
//! Maps `/`-separated swarm topics onto NATS subjects (`/` becomes `.`, the
//! `+` single-segment wildcard becomes `*`). Reconnection and delivery
//! semantics are the NATS client's own. Swarm names, agent ids, and task
//! types must not contain `.` or the mapping is ambiguous.

use crate::error::{Error, Result};
use crate::transport::{BusMessage, BusTransport};
use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Buffered messages before slow consumers start missing.
const SUBSCRIPTION_BUFFER: usize = 256;

fn topic_to_subject(topic: &str) -> String {
    topic.replace('/', ".").replace('+', "*")
}

fn subject_to_topic(subject: &str) -> String {
    subject.replace('.', "/")
}

/// Transport over a NATS connection.
pub struct NatsTransport {
    client: async_nats::Client,
}

impl NatsTransport {
    /// Connect to a NATS server.
    pub async fn connect(url: &str) -> Result<Self> {
        info!(url = %url, "connecting to NATS");
        let client = async_nats::connect(url)
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        Ok(Self { client })
    }

    /// Wrap an existing NATS client.
    #[must_use]
    pub fn from_client(client: async_nats::Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl BusTransport for NatsTransport {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        let subject = topic_to_subject(topic);
        self.client
            .publish(subject, payload.into())
            .await
            .map_err(|e| Error::Transport(e.to_string()))
    }

    async fn subscribe(&self, patterns: &[String]) -> Result<mpsc::Receiver<BusMessage>> {
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);

        for pattern in patterns {
            let subject = topic_to_subject(pattern);
            let mut subscriber = self
                .client
                .subscribe(subject.clone())
                .await
                .map_err(|e| Error::Transport(e.to_string()))?;
            debug!(subject = %subject, "subscribed");

            let tx = tx.clone();
            tokio::spawn(async move {
                while let Some(message) = subscriber.next().await {
                    let forwarded = BusMessage {
                        topic: subject_to_topic(&message.subject),
                        payload: message.payload.to_vec(),
                    };
                    if tx.send(forwarded).await.is_err() {
                        break;
                    }
                }
                if let Err(e) = subscriber.unsubscribe().await {
                    warn!(error = %e, subject = %subject, "failed to unsubscribe");
                }
            });
        }

        Ok(rx)
    }
}
