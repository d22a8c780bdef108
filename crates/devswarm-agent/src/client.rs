//! Swarm membership client
//!
//! Owns the bus connection for one agent: subscribes the swarm topics,
//! announces presence, heartbeats on a fixed interval, and forwards every
//! foreign envelope as a typed [`SwarmEvent`] into a single channel.

use crate::eligibility::Role;
use crate::envelope::{topics, Envelope};
use crate::error::Result;
use crate::task::Task;
use crate::transport::{BusMessage, BusTransport};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use sysinfo::System;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Default heartbeat period
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);

/// Grace period for the shutdown message to drain before disconnecting
const SHUTDOWN_FLUSH: Duration = Duration::from_millis(500);

/// Event channel depth
const EVENT_BUFFER: usize = 256;

/// Fully-resolved swarm membership configuration.
#[derive(Debug, Clone)]
pub struct SwarmConfig {
    /// Bus namespace shared by cooperating agents
    pub swarm: String,
    /// Unique id for this agent process
    pub agent_id: String,
    /// Role determining claimable task types
    pub role: Role,
    /// Heartbeat period
    pub heartbeat_interval: Duration,
}

impl SwarmConfig {
    /// Create a configuration with the default heartbeat interval.
    #[must_use]
    pub fn new(swarm: impl Into<String>, agent_id: impl Into<String>, role: Role) -> Self {
        Self {
            swarm: swarm.into(),
            agent_id: agent_id.into(),
            role,
            heartbeat_interval: HEARTBEAT_INTERVAL,
        }
    }

    /// Override the heartbeat period.
    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }
}

/// Event delivered to the coordinator's single handler.
#[derive(Debug)]
pub enum SwarmEvent {
    /// A foreign envelope arrived on a subscribed topic
    Message {
        /// Full topic
        topic: String,
        /// Parsed envelope
        envelope: Envelope,
    },
    /// A locally started executor finished
    TaskFinished {
        /// The task that was executing
        task: Task,
        /// Executor output or error
        outcome: Result<Value>,
        /// Execution wall time in milliseconds
        duration_ms: u64,
    },
    /// A bus publish failed inside the client
    TransportError(String),
}

/// Bus-facing side of one swarm agent.
pub struct SwarmClient {
    config: SwarmConfig,
    transport: Arc<dyn BusTransport>,
    events_tx: mpsc::Sender<SwarmEvent>,
    started_at: Instant,
    reader: JoinHandle<()>,
    heartbeat: JoinHandle<()>,
}

impl SwarmClient {
    /// Connect to the swarm: subscribe, register, start heartbeating.
    ///
    /// Returns the client and the receiver carrying every [`SwarmEvent`].
    pub async fn connect(
        config: SwarmConfig,
        transport: Arc<dyn BusTransport>,
    ) -> Result<(Self, mpsc::Receiver<SwarmEvent>)> {
        info!(
            agent_id = %config.agent_id,
            role = %config.role,
            swarm = %config.swarm,
            "joining swarm"
        );

        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);

        let bus_rx = transport
            .subscribe(&topics::subscriptions(&config.swarm))
            .await?;
        let reader = tokio::spawn(reader_loop(
            bus_rx,
            events_tx.clone(),
            config.agent_id.clone(),
        ));

        publish_envelope(
            &transport,
            &config,
            topics::AGENTS_REGISTER,
            json!({
                "agent_id": config.agent_id,
                "role": config.role,
                "status": "online",
                "capabilities": config.role.capabilities(),
            }),
        )
        .await?;

        let started_at = Instant::now();
        let heartbeat = tokio::spawn(heartbeat_loop(
            transport.clone(),
            config.clone(),
            events_tx.clone(),
            started_at,
        ));

        Ok((
            Self {
                config,
                transport,
                events_tx,
                started_at,
                reader,
                heartbeat,
            },
            events_rx,
        ))
    }

    /// This agent's id.
    #[must_use]
    pub fn agent_id(&self) -> &str {
        &self.config.agent_id
    }

    /// This agent's role.
    #[must_use]
    pub fn role(&self) -> Role {
        self.config.role
    }

    /// The swarm namespace.
    #[must_use]
    pub fn swarm(&self) -> &str {
        &self.config.swarm
    }

    /// Time since the client connected.
    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Sender feeding the event channel, for internal event producers.
    #[must_use]
    pub fn event_sender(&self) -> mpsc::Sender<SwarmEvent> {
        self.events_tx.clone()
    }

    /// Publish an enveloped payload on a swarm-relative topic.
    pub async fn publish(&self, topic: &str, payload: Value) -> Result<()> {
        publish_envelope(&self.transport, &self.config, topic, payload).await
    }

    /// Leave the swarm gracefully.
    ///
    /// Announces the shutdown on the bus, gives the message a moment to
    /// drain, then stops the background tasks.
    pub async fn shutdown(self) -> Result<()> {
        info!(agent_id = %self.config.agent_id, "leaving swarm");
        self.heartbeat.abort();

        let result = self
            .publish(
                topics::AGENTS_SHUTDOWN,
                json!({
                    "reason": "graceful",
                    "uptime_secs": self.started_at.elapsed().as_secs(),
                }),
            )
            .await;

        tokio::time::sleep(SHUTDOWN_FLUSH).await;
        self.reader.abort();
        result
    }
}

async fn publish_envelope(
    transport: &Arc<dyn BusTransport>,
    config: &SwarmConfig,
    topic: &str,
    payload: Value,
) -> Result<()> {
    let envelope = Envelope::new(&config.agent_id, config.role, payload);
    let bytes = serde_json::to_vec(&envelope)?;
    transport
        .publish(&topics::qualify(&config.swarm, topic), bytes)
        .await
}

async fn reader_loop(
    mut bus_rx: mpsc::Receiver<BusMessage>,
    events_tx: mpsc::Sender<SwarmEvent>,
    own_id: String,
) {
    while let Some(message) = bus_rx.recv().await {
        let envelope: Envelope = match serde_json::from_slice(&message.payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(topic = %message.topic, error = %e, "failed to parse envelope");
                continue;
            }
        };

        if envelope.agent_id == own_id {
            continue;
        }

        debug!(topic = %message.topic, from = %envelope.agent_id, "message received");

        let event = SwarmEvent::Message {
            topic: message.topic,
            envelope,
        };
        if events_tx.send(event).await.is_err() {
            break;
        }
    }
}

async fn heartbeat_loop(
    transport: Arc<dyn BusTransport>,
    config: SwarmConfig,
    events_tx: mpsc::Sender<SwarmEvent>,
    started_at: Instant,
) {
    let mut interval = tokio::time::interval(config.heartbeat_interval);
    interval.tick().await; // first tick fires immediately

    let mut system = System::new();
    let pid = sysinfo::get_current_pid().ok();

    loop {
        interval.tick().await;

        let (memory_bytes, cpu_percent) = match pid {
            Some(pid) => {
                system.refresh_process(pid);
                system
                    .process(pid)
                    .map_or((0, 0.0), |p| (p.memory(), p.cpu_usage()))
            }
            None => (0, 0.0),
        };

        let payload = json!({
            "status": "alive",
            "uptime_secs": started_at.elapsed().as_secs(),
            "memory_bytes": memory_bytes,
            "cpu_percent": cpu_percent,
            "role": config.role,
        });

        if let Err(e) = publish_envelope(&transport, &config, topics::AGENTS_HEARTBEAT, payload).await
        {
            warn!(error = %e, "heartbeat publish failed");
            let _ = events_tx
                .send(SwarmEvent::TransportError(e.to_string()))
                .await;
        }
    }
}
