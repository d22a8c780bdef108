//! Task and task-report wire types

use crate::eligibility::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A unit of work announced on the bus.
///
/// Immutable once announced; the bus is the system of record and each agent
/// holds at most a transient copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique across the swarm
    pub task_id: String,
    /// Selects the executor and the eligible roles
    #[serde(rename = "type")]
    pub task_type: String,
    /// Opaque executor input
    #[serde(default)]
    pub payload: serde_json::Value,
    /// Optional scheduling hint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    /// Agent the announcer pinned the task to, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
}

impl Task {
    /// Create a task with just an id and type.
    #[must_use]
    pub fn new(task_id: impl Into<String>, task_type: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            task_type: task_type.into(),
            payload: serde_json::Value::Null,
            priority: None,
            assigned_to: None,
        }
    }

    /// Attach an executor payload.
    #[must_use]
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// Set the priority hint.
    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Pin the task to a specific agent.
    #[must_use]
    pub fn assigned_to(mut self, agent_id: impl Into<String>) -> Self {
        self.assigned_to = Some(agent_id.into());
        self
    }
}

/// Task priority hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Background work
    Low,
    /// Default
    Medium,
    /// Time-sensitive work
    High,
}

/// Claim message published on `tasks/assigned`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    /// Claimed task
    pub task_id: String,
    /// Claiming agent
    pub agent_id: String,
    /// Claiming agent's role
    pub role: Role,
    /// Claim time
    pub claimed_at: DateTime<Utc>,
}

/// Terminal task status on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Executor returned a result
    Success,
    /// Executor failed or the type was unknown
    Failed,
}

/// Completion message published on `tasks/complete`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionReport {
    /// Finished task
    pub task_id: String,
    /// Executing agent
    pub agent_id: String,
    /// Executing agent's role
    pub role: Role,
    /// Always `success`
    pub status: TaskStatus,
    /// Executor output, not inspected by the coordinator
    pub result: serde_json::Value,
    /// Execution wall time in milliseconds
    #[serde(rename = "duration")]
    pub duration_ms: u64,
    /// Report time
    pub completed_at: DateTime<Utc>,
}

/// Failure message published on `tasks/failed`.
///
/// No automatic retry follows; a supervisor must re-announce the task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureReport {
    /// Failed task
    pub task_id: String,
    /// Executing agent
    pub agent_id: String,
    /// Executing agent's role
    pub role: Role,
    /// Always `failed`
    pub status: TaskStatus,
    /// Executor error message
    pub error: String,
    /// Report time
    pub completed_at: DateTime<Utc>,
}
