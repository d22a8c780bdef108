//! Agent task coordinator
//!
//! Cooperatively distributes tasks across peer agents sharing a bus. Each
//! agent decides on its own whether to claim an announced task; duplicate
//! execution is avoided best-effort through assignment messages, not locks.
//! Two agents that both see an announcement before either claim propagates
//! may both run the task; that race is accepted.
//!
//! State machine per agent: `Idle` and `Busy`. At most one task executes at
//! a time; eligible announcements that arrive while busy are queued and
//! claimed on completion, without the agent ever appearing idle in between.

use crate::client::{SwarmClient, SwarmEvent};
use crate::eligibility::{EligibilityTable, Role};
use crate::envelope::{topics, Envelope};
use crate::error::{Error, Result};
use crate::executor::ExecutorRegistry;
use crate::task::{Assignment, CompletionReport, FailureReport, Task, TaskStatus};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// How long a shutdown waits for the in-flight task's report to go out
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Point-in-time coordinator state, published on `agents/{id}/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorStatus {
    /// This agent
    pub agent_id: String,
    /// This agent's role
    pub role: Role,
    /// Task currently executing, if any
    pub current_task: Option<String>,
    /// Backlog length
    pub queued_tasks: usize,
}

/// Per-agent task claim/execute/report loop.
pub struct TaskCoordinator {
    client: SwarmClient,
    events: mpsc::Receiver<SwarmEvent>,
    registry: ExecutorRegistry,
    eligibility: EligibilityTable,
    internal_tx: mpsc::Sender<SwarmEvent>,
    current_task: Option<String>,
    queue: VecDeque<Task>,
    stopping: bool,
}

impl TaskCoordinator {
    /// Create a coordinator over a connected client.
    ///
    /// `events` must be the receiver returned by the client's `connect`.
    #[must_use]
    pub fn new(
        client: SwarmClient,
        events: mpsc::Receiver<SwarmEvent>,
        registry: ExecutorRegistry,
        eligibility: EligibilityTable,
    ) -> Self {
        let internal_tx = client.event_sender();
        Self {
            client,
            events,
            registry,
            eligibility,
            internal_tx,
            current_task: None,
            queue: VecDeque::new(),
            stopping: false,
        }
    }

    /// Current state snapshot.
    #[must_use]
    pub fn status(&self) -> CoordinatorStatus {
        CoordinatorStatus {
            agent_id: self.client.agent_id().to_string(),
            role: self.client.role(),
            current_task: self.current_task.clone(),
            queued_tasks: self.queue.len(),
        }
    }

    /// Run until cancelled.
    ///
    /// On cancellation an in-flight task may finish and publish its report
    /// (bounded by a grace period); queued tasks are abandoned. The client's
    /// shutdown announcement goes out last.
    pub async fn run(mut self, token: CancellationToken) -> Result<()> {
        info!(
            agent_id = %self.client.agent_id(),
            role = %self.client.role(),
            "task coordinator started"
        );

        loop {
            let event = tokio::select! {
                _ = token.cancelled() => None,
                event = self.events.recv() => event,
            };
            let Some(event) = event else {
                break;
            };
            self.handle_event(event).await;
        }

        self.stopping = true;
        if self.current_task.is_some() {
            debug!("waiting for in-flight task before shutdown");
            let _ = tokio::time::timeout(SHUTDOWN_GRACE, async {
                while self.current_task.is_some() {
                    match self.events.recv().await {
                        Some(event @ SwarmEvent::TaskFinished { .. }) => {
                            self.handle_event(event).await;
                        }
                        Some(_) => {}
                        None => break,
                    }
                }
            })
            .await;
        }

        info!(agent_id = %self.client.agent_id(), "task coordinator stopping");
        self.client.shutdown().await
    }

    async fn handle_event(&mut self, event: SwarmEvent) {
        match event {
            SwarmEvent::Message { topic, envelope } => {
                if topic.ends_with("/tasks/new") {
                    self.handle_announcement(envelope).await;
                } else if topic.ends_with("/tasks/assigned") {
                    self.handle_foreign_assignment(&envelope);
                } else {
                    debug!(topic = %topic, "ignoring message");
                }
            }
            SwarmEvent::TaskFinished {
                task,
                outcome,
                duration_ms,
            } => {
                self.finish_task(task, outcome, duration_ms).await;
            }
            SwarmEvent::TransportError(message) => {
                error!(error = %message, "transport error reported");
            }
        }
    }

    async fn handle_announcement(&mut self, envelope: Envelope) {
        let task: Task = match serde_json::from_value(envelope.payload) {
            Ok(task) => task,
            Err(e) => {
                warn!(error = %e, "ignoring malformed task announcement");
                return;
            }
        };

        if self.current_task.is_some() {
            if !self.eligibility.is_eligible(self.client.role(), &task.task_type) {
                debug!(task_id = %task.task_id, task_type = %task.task_type, "busy, task not our role");
                return;
            }
            if self.current_task.as_deref() == Some(task.task_id.as_str())
                || self.queue.iter().any(|t| t.task_id == task.task_id)
            {
                debug!(task_id = %task.task_id, "duplicate announcement ignored");
                return;
            }
            info!(
                task_id = %task.task_id,
                queued = self.queue.len() + 1,
                "busy, queueing task"
            );
            self.queue.push_back(task);
            return;
        }

        if !self.claimable(&task) {
            debug!(
                task_id = %task.task_id,
                task_type = %task.task_type,
                "skipping task (role or assignment mismatch)"
            );
            return;
        }

        self.claim(task).await;
    }

    /// Another agent's claim: drop the task from our backlog if we held it.
    fn handle_foreign_assignment(&mut self, envelope: &Envelope) {
        let assignment: Assignment = match serde_json::from_value(envelope.payload.clone()) {
            Ok(assignment) => assignment,
            Err(e) => {
                warn!(error = %e, "ignoring malformed assignment");
                return;
            }
        };

        let before = self.queue.len();
        self.queue.retain(|t| t.task_id != assignment.task_id);
        if self.queue.len() < before {
            info!(
                task_id = %assignment.task_id,
                claimed_by = %assignment.agent_id,
                "task claimed by peer, removed from queue"
            );
        }
    }

    fn claimable(&self, task: &Task) -> bool {
        if !self.eligibility.is_eligible(self.client.role(), &task.task_type) {
            return false;
        }
        match &task.assigned_to {
            Some(agent) => agent == self.client.agent_id(),
            None => true,
        }
    }

    /// Claim a task: announce the assignment, go Busy, start the executor.
    async fn claim(&mut self, task: Task) {
        self.current_task = Some(task.task_id.clone());
        info!(
            task_id = %task.task_id,
            task_type = %task.task_type,
            priority = ?task.priority,
            "claiming task"
        );

        let assignment = Assignment {
            task_id: task.task_id.clone(),
            agent_id: self.client.agent_id().to_string(),
            role: self.client.role(),
            claimed_at: Utc::now(),
        };
        self.publish(topics::TASKS_ASSIGNED, serde_json::to_value(&assignment))
            .await;
        self.publish_status().await;

        let executor = self.registry.get(&task.task_type);
        let internal_tx = self.internal_tx.clone();
        tokio::spawn(async move {
            let started = std::time::Instant::now();
            let outcome = match executor {
                Some(executor) => executor.execute(task.payload.clone()).await,
                None => Err(Error::UnknownTaskType(task.task_type.clone())),
            };
            let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
            let _ = internal_tx
                .send(SwarmEvent::TaskFinished {
                    task,
                    outcome,
                    duration_ms,
                })
                .await;
        });
    }

    /// Publish the task report, then drain the backlog.
    ///
    /// The next claim never starts before this report is published, so each
    /// agent's claim → execute → report sequence stays totally ordered.
    async fn finish_task(&mut self, task: Task, outcome: Result<serde_json::Value>, duration_ms: u64) {
        match outcome {
            Ok(result) => {
                info!(task_id = %task.task_id, duration_ms, "task completed");
                let report = CompletionReport {
                    task_id: task.task_id.clone(),
                    agent_id: self.client.agent_id().to_string(),
                    role: self.client.role(),
                    status: TaskStatus::Success,
                    result,
                    duration_ms,
                    completed_at: Utc::now(),
                };
                self.publish(topics::TASKS_COMPLETE, serde_json::to_value(&report))
                    .await;
            }
            Err(err) => {
                warn!(task_id = %task.task_id, error = %err, "task failed");
                let report = FailureReport {
                    task_id: task.task_id.clone(),
                    agent_id: self.client.agent_id().to_string(),
                    role: self.client.role(),
                    status: TaskStatus::Failed,
                    error: err.to_string(),
                    completed_at: Utc::now(),
                };
                self.publish(topics::TASKS_FAILED, serde_json::to_value(&report))
                    .await;
            }
        }

        self.current_task = None;

        if !self.stopping {
            // Claimability is re-checked at dequeue time: a peer's assignment
            // may have raced ahead of the removal message.
            while let Some(next) = self.queue.pop_front() {
                if self.claimable(&next) {
                    self.claim(next).await;
                    return;
                }
                debug!(task_id = %next.task_id, "queued task no longer claimable, dropped");
            }
        }

        self.publish_status().await;
    }

    async fn publish_status(&self) {
        let status = self.status();
        self.publish(
            &topics::agent_status(self.client.agent_id()),
            serde_json::to_value(&status),
        )
        .await;
    }

    /// Publish with transport failures logged, never fatal to the agent.
    async fn publish(&self, topic: &str, payload: serde_json::Result<serde_json::Value>) {
        let payload = match payload {
            Ok(payload) => payload,
            Err(e) => {
                error!(topic = %topic, error = %e, "failed to encode payload");
                return;
            }
        };
        if let Err(e) = self.client.publish(topic, payload).await {
            warn!(topic = %topic, error = %e, "publish failed");
        }
    }
}
