//! devswarm Agent - swarm task coordination over a pub/sub bus
//!
//! This crate provides the multi-agent layer for devswarm:
//! - Transport: pub/sub abstraction with NATS and in-process backends
//! - Envelope: wire envelope and swarm topic layout
//! - Eligibility: roles, capabilities, and the task-type eligibility table
//! - Executor: type-dispatch registry of replaceable task executors
//! - Client: swarm membership (register, heartbeat, graceful shutdown)
//! - Coordinator: the per-agent claim/execute/report state machine
//!
//! One process runs one coordinator; agents cooperate only through bus
//! messages, never shared memory.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod coordinator;
pub mod eligibility;
pub mod envelope;
pub mod error;
pub mod executor;
pub mod nats;
pub mod task;
pub mod transport;

pub use client::{SwarmClient, SwarmConfig, SwarmEvent, HEARTBEAT_INTERVAL};
pub use coordinator::{CoordinatorStatus, TaskCoordinator};
pub use eligibility::{EligibilityTable, Role};
pub use envelope::{topics, Envelope};
pub use error::{Error, Result};
pub use executor::{ExecutorRegistry, SimulatedExecutor, TaskExecutor};
pub use nats::NatsTransport;
pub use task::{Assignment, CompletionReport, FailureReport, Priority, Task, TaskStatus};
pub use transport::{topic_matches, BusMessage, BusTransport, ChannelTransport};
