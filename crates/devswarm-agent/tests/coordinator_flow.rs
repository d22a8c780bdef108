//! End-to-end coordinator behavior over the in-process transport.

use async_trait::async_trait;
use devswarm_agent::{
    BusMessage, BusTransport, ChannelTransport, EligibilityTable, Envelope, ExecutorRegistry,
    Priority, Result, Role, SwarmClient, SwarmConfig, Task, TaskCoordinator, TaskExecutor,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

const SWARM: &str = "devswarm-test";

/// Executor that returns immediately with a fixed result.
struct InstantExecutor(Value);

#[async_trait]
impl TaskExecutor for InstantExecutor {
    async fn execute(&self, _payload: Value) -> Result<Value> {
        Ok(self.0.clone())
    }
}

/// Executor that blocks until released, so tests can hold an agent Busy.
struct GatedExecutor {
    release: Arc<Notify>,
    result: Value,
}

#[async_trait]
impl TaskExecutor for GatedExecutor {
    async fn execute(&self, _payload: Value) -> Result<Value> {
        self.release.notified().await;
        Ok(self.result.clone())
    }
}

async fn spawn_agent(
    transport: &Arc<ChannelTransport>,
    agent_id: &str,
    role: Role,
    registry: ExecutorRegistry,
) -> CancellationToken {
    let config = SwarmConfig::new(SWARM, agent_id, role);
    let (client, events) = SwarmClient::connect(config, transport.clone() as Arc<dyn BusTransport>)
        .await
        .expect("connect failed");
    let coordinator = TaskCoordinator::new(client, events, registry, EligibilityTable::default());
    let token = CancellationToken::new();
    tokio::spawn(coordinator.run(token.clone()));
    token
}

async fn subscribe(transport: &Arc<ChannelTransport>, topic: &str) -> mpsc::Receiver<BusMessage> {
    transport
        .subscribe(&[format!("{SWARM}/{topic}")])
        .await
        .expect("subscribe failed")
}

async fn announce(transport: &Arc<ChannelTransport>, task: &Task) {
    let envelope = Envelope::new(
        "supervisor",
        Role::General,
        serde_json::to_value(task).expect("task encodes"),
    );
    transport
        .publish(
            &format!("{SWARM}/tasks/new"),
            serde_json::to_vec(&envelope).expect("envelope encodes"),
        )
        .await
        .expect("publish failed");
}

/// Receive the next envelope payload on a topic, failing after two seconds.
async fn recv_payload(rx: &mut mpsc::Receiver<BusMessage>) -> Value {
    let message = timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for message")
        .expect("bus closed");
    let envelope: Envelope = serde_json::from_slice(&message.payload).expect("invalid envelope");
    envelope.payload
}

async fn assert_no_message(rx: &mut mpsc::Receiver<BusMessage>) {
    let outcome = timeout(Duration::from_millis(300), rx.recv()).await;
    assert!(outcome.is_err(), "unexpected message: {outcome:?}");
}

#[tokio::test]
async fn test_claim_execute_complete_flow() {
    let transport = Arc::new(ChannelTransport::default());
    let mut assigned_rx = subscribe(&transport, "tasks/assigned").await;
    let mut complete_rx = subscribe(&transport, "tasks/complete").await;
    let mut shutdown_rx = subscribe(&transport, "agents/shutdown").await;

    let mut registry = ExecutorRegistry::new();
    registry.register(
        "deployment.deploy",
        Arc::new(InstantExecutor(json!({"status": "deployed"}))),
    );
    let token = spawn_agent(&transport, "deploy-1", Role::Deployment, registry).await;

    let task = Task::new("t1", "deployment.deploy")
        .with_payload(json!({"env": "prod"}))
        .with_priority(Priority::High);
    announce(&transport, &task).await;

    let assignment = recv_payload(&mut assigned_rx).await;
    assert_eq!(assignment["task_id"], "t1");
    assert_eq!(assignment["agent_id"], "deploy-1");
    assert_eq!(assignment["role"], "deployment");

    let completion = recv_payload(&mut complete_rx).await;
    assert_eq!(completion["task_id"], "t1");
    assert_eq!(completion["status"], "success");
    assert_eq!(completion["result"]["status"], "deployed");
    assert!(completion["duration"].is_u64());
    assert!(completion.get("completed_at").is_some());

    token.cancel();
    let shutdown = recv_payload(&mut shutdown_rx).await;
    assert_eq!(shutdown["reason"], "graceful");
}

#[tokio::test]
async fn test_testing_role_does_not_claim_code_review() {
    let transport = Arc::new(ChannelTransport::default());
    let mut assigned_rx = subscribe(&transport, "tasks/assigned").await;

    let mut registry = ExecutorRegistry::new();
    registry.register("testing.run", Arc::new(InstantExecutor(json!({"passed": 1}))));
    let _token = spawn_agent(&transport, "test-1", Role::Testing, registry).await;

    // Not in the testing role's eligibility set; must be skipped.
    announce(&transport, &Task::new("t1", "code.review")).await;
    // Eligible follow-up proves the first was skipped, not still pending.
    announce(&transport, &Task::new("t2", "testing.run")).await;

    let assignment = recv_payload(&mut assigned_rx).await;
    assert_eq!(assignment["task_id"], "t2");
}

#[tokio::test]
async fn test_review_role_claims_code_review() {
    let transport = Arc::new(ChannelTransport::default());
    let mut assigned_rx = subscribe(&transport, "tasks/assigned").await;

    let mut registry = ExecutorRegistry::new();
    registry.register(
        "code.review",
        Arc::new(InstantExecutor(json!({"approved": true}))),
    );
    let _token = spawn_agent(&transport, "review-1", Role::Review, registry).await;

    announce(&transport, &Task::new("t1", "code.review")).await;

    let assignment = recv_payload(&mut assigned_rx).await;
    assert_eq!(assignment["task_id"], "t1");
    assert_eq!(assignment["agent_id"], "review-1");
}

#[tokio::test]
async fn test_task_pinned_to_other_agent_not_claimed() {
    let transport = Arc::new(ChannelTransport::default());
    let mut assigned_rx = subscribe(&transport, "tasks/assigned").await;

    let mut registry = ExecutorRegistry::new();
    registry.register(
        "code.review",
        Arc::new(InstantExecutor(json!({"approved": true}))),
    );
    let _token = spawn_agent(&transport, "review-1", Role::Review, registry).await;

    announce(
        &transport,
        &Task::new("t1", "code.review").assigned_to("someone-else"),
    )
    .await;
    announce(
        &transport,
        &Task::new("t2", "code.review").assigned_to("review-1"),
    )
    .await;

    // t1 is pinned elsewhere even though the role matches; t2 is pinned to us.
    let assignment = recv_payload(&mut assigned_rx).await;
    assert_eq!(assignment["task_id"], "t2");
}

#[tokio::test]
async fn test_busy_agent_queues_then_drains() {
    let transport = Arc::new(ChannelTransport::default());
    let mut assigned_rx = subscribe(&transport, "tasks/assigned").await;
    let mut complete_rx = subscribe(&transport, "tasks/complete").await;

    let release = Arc::new(Notify::new());
    let mut registry = ExecutorRegistry::new();
    registry.register(
        "deployment.deploy",
        Arc::new(GatedExecutor {
            release: release.clone(),
            result: json!({"status": "deployed"}),
        }),
    );
    let _token = spawn_agent(&transport, "deploy-1", Role::Deployment, registry).await;

    announce(&transport, &Task::new("t1", "deployment.deploy")).await;
    let assignment = recv_payload(&mut assigned_rx).await;
    assert_eq!(assignment["task_id"], "t1");

    // Arrives while Busy: queued, no claim message.
    announce(&transport, &Task::new("t2", "deployment.deploy")).await;
    assert_no_message(&mut assigned_rx).await;

    release.notify_one();
    let completion = recv_payload(&mut complete_rx).await;
    assert_eq!(completion["task_id"], "t1");

    // The queued task is claimed without a fresh announcement.
    let assignment = recv_payload(&mut assigned_rx).await;
    assert_eq!(assignment["task_id"], "t2");

    release.notify_one();
    let completion = recv_payload(&mut complete_rx).await;
    assert_eq!(completion["task_id"], "t2");
}

#[tokio::test]
async fn test_peer_assignment_removes_queued_task() {
    let transport = Arc::new(ChannelTransport::default());
    let mut assigned_rx = subscribe(&transport, "tasks/assigned").await;
    let mut complete_rx = subscribe(&transport, "tasks/complete").await;

    let release = Arc::new(Notify::new());
    let mut registry = ExecutorRegistry::new();
    registry.register(
        "deployment.deploy",
        Arc::new(GatedExecutor {
            release: release.clone(),
            result: json!({"status": "deployed"}),
        }),
    );
    let _token = spawn_agent(&transport, "deploy-1", Role::Deployment, registry).await;

    announce(&transport, &Task::new("t1", "deployment.deploy")).await;
    let assignment = recv_payload(&mut assigned_rx).await;
    assert_eq!(assignment["task_id"], "t1");

    announce(&transport, &Task::new("t2", "deployment.deploy")).await;
    assert_no_message(&mut assigned_rx).await;

    // A peer wins the race for t2 while it sits in our queue.
    let peer_claim = Envelope::new(
        "deploy-2",
        Role::Deployment,
        json!({
            "task_id": "t2",
            "agent_id": "deploy-2",
            "role": "deployment",
            "claimed_at": chrono::Utc::now(),
        }),
    );
    transport
        .publish(
            &format!("{SWARM}/tasks/assigned"),
            serde_json::to_vec(&peer_claim).unwrap(),
        )
        .await
        .unwrap();

    // Let the removal land before the in-flight task finishes.
    tokio::time::sleep(Duration::from_millis(100)).await;

    release.notify_one();
    let completion = recv_payload(&mut complete_rx).await;
    assert_eq!(completion["task_id"], "t1");

    // t2 was removed silently; no claim is attempted for it.
    assert_no_message(&mut assigned_rx).await;

    // The agent is Idle again and claims fresh work normally.
    announce(&transport, &Task::new("t3", "deployment.deploy")).await;
    let assignment = recv_payload(&mut assigned_rx).await;
    assert_eq!(assignment["task_id"], "t3");
}

#[tokio::test]
async fn test_unknown_task_type_reports_failure() {
    let transport = Arc::new(ChannelTransport::default());
    let mut assigned_rx = subscribe(&transport, "tasks/assigned").await;
    let mut failed_rx = subscribe(&transport, "tasks/failed").await;

    // Unknown types fall back to the general role, so this agent claims it,
    // but no executor exists and the task fails.
    let _token = spawn_agent(&transport, "gen-1", Role::General, ExecutorRegistry::new()).await;

    announce(&transport, &Task::new("t1", "mystery.op")).await;

    let assignment = recv_payload(&mut assigned_rx).await;
    assert_eq!(assignment["task_id"], "t1");

    let failure = recv_payload(&mut failed_rx).await;
    assert_eq!(failure["task_id"], "t1");
    assert_eq!(failure["status"], "failed");
    assert!(failure["error"]
        .as_str()
        .unwrap()
        .contains("unknown task type: mystery.op"));
}

#[tokio::test]
async fn test_status_published_on_transitions() {
    let transport = Arc::new(ChannelTransport::default());
    let mut status_rx = subscribe(&transport, "agents/+/status").await;
    let mut complete_rx = subscribe(&transport, "tasks/complete").await;

    let mut registry = ExecutorRegistry::new();
    registry.register(
        "monitoring.health",
        Arc::new(InstantExecutor(json!({"status": "healthy"}))),
    );
    let _token = spawn_agent(&transport, "mon-1", Role::Monitoring, registry).await;

    announce(&transport, &Task::new("t1", "monitoring.health")).await;

    let busy = recv_payload(&mut status_rx).await;
    assert_eq!(busy["agent_id"], "mon-1");
    assert_eq!(busy["current_task"], "t1");
    assert_eq!(busy["queued_tasks"], 0);

    recv_payload(&mut complete_rx).await;

    let idle = recv_payload(&mut status_rx).await;
    assert!(idle["current_task"].is_null());
    assert_eq!(idle["queued_tasks"], 0);
}
