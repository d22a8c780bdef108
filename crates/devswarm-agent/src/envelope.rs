//! Wire envelope and swarm topic layout
//!
//! Every published message is wrapped in an [`Envelope`] carrying a unique
//! id, a wall-clock timestamp, and the sender's identity. Agents drop
//! envelopes whose `agent_id` is their own.

use crate::eligibility::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Message envelope shared by every topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Unique per message
    pub id: Uuid,
    /// Publish time
    pub timestamp: DateTime<Utc>,
    /// Publishing agent
    pub agent_id: String,
    /// Publishing agent's role
    pub role: Role,
    /// Topic-specific payload
    pub payload: serde_json::Value,
}

impl Envelope {
    /// Wrap a payload with a fresh id and the current time.
    #[must_use]
    pub fn new(agent_id: impl Into<String>, role: Role, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            agent_id: agent_id.into(),
            role,
            payload,
        }
    }
}

/// Topic names under a swarm namespace.
pub mod topics {
    /// Task announcements (swarm-relative)
    pub const TASKS_NEW: &str = "tasks/new";
    /// Task claims (swarm-relative)
    pub const TASKS_ASSIGNED: &str = "tasks/assigned";
    /// Successful completions (swarm-relative)
    pub const TASKS_COMPLETE: &str = "tasks/complete";
    /// Failed tasks (swarm-relative)
    pub const TASKS_FAILED: &str = "tasks/failed";
    /// Agent presence announcements (swarm-relative)
    pub const AGENTS_REGISTER: &str = "agents/register";
    /// Agent liveness (swarm-relative)
    pub const AGENTS_HEARTBEAT: &str = "agents/heartbeat";
    /// Graceful shutdown announcements (swarm-relative)
    pub const AGENTS_SHUTDOWN: &str = "agents/shutdown";
    /// Swarm-wide broadcast (swarm-relative)
    pub const BROADCAST: &str = "broadcast";

    /// Prefix a swarm-relative topic with the swarm namespace.
    ///
    /// Topics that already carry the prefix pass through unchanged.
    #[must_use]
    pub fn qualify(swarm: &str, topic: &str) -> String {
        if topic.starts_with(&format!("{swarm}/")) {
            topic.to_string()
        } else {
            format!("{swarm}/{topic}")
        }
    }

    /// Status topic for one agent.
    #[must_use]
    pub fn agent_status(agent_id: &str) -> String {
        format!("agents/{agent_id}/status")
    }

    /// The patterns every swarm member subscribes to.
    #[must_use]
    pub fn subscriptions(swarm: &str) -> Vec<String> {
        vec![
            qualify(swarm, TASKS_NEW),
            qualify(swarm, TASKS_ASSIGNED),
            qualify(swarm, "agents/+/status"),
            qualify(swarm, BROADCAST),
        ]
    }
}
