//! Agent roles and the task-type eligibility table
//!
//! Which roles may claim which task types is pure data: a static mapping
//! consulted at claim time, not branching logic. The table is a constructor
//! parameter so deployments can reshape it without touching the coordinator.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Agent role, fixed enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Fallback role; handles unknown task types
    General,
    /// Deploy/rollback work
    Deployment,
    /// Test runs and coverage
    Testing,
    /// Code review
    Review,
    /// Scans and audits
    Security,
    /// Health and alert checks
    Monitoring,
    /// Docs generation
    Documentation,
    /// Migrations and backups
    Database,
}

impl Role {
    /// All roles, in a stable order.
    pub const ALL: &'static [Role] = &[
        Role::General,
        Role::Deployment,
        Role::Testing,
        Role::Review,
        Role::Security,
        Role::Monitoring,
        Role::Documentation,
        Role::Database,
    ];

    /// Lowercase wire name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Deployment => "deployment",
            Self::Testing => "testing",
            Self::Review => "review",
            Self::Security => "security",
            Self::Monitoring => "monitoring",
            Self::Documentation => "documentation",
            Self::Database => "database",
        }
    }

    /// Capability strings advertised in the register message.
    #[must_use]
    pub fn capabilities(&self) -> &'static [&'static str] {
        match self {
            Self::General => &["code-generation", "chat"],
            Self::Deployment => &["deploy", "rollback", "containers"],
            Self::Testing => &["test-runner", "coverage", "integration-tests"],
            Self::Review => &["code-review", "linting", "security-scan"],
            Self::Security => &["vulnerability-scan", "dependency-check", "compliance"],
            Self::Monitoring => &["health-check", "metrics", "alerts"],
            Self::Documentation => &["docs-generation", "api-docs", "readme"],
            Self::Database => &["migrations", "backups", "optimization"],
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .iter()
            .copied()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| Error::UnknownRole(s.to_string()))
    }
}

/// Task-type → allowed-roles table.
///
/// Task types not present in the table require the fallback roles
/// (`general` by default).
#[derive(Debug, Clone)]
pub struct EligibilityTable {
    rules: HashMap<String, Vec<Role>>,
    fallback: Vec<Role>,
}

impl EligibilityTable {
    /// Build a table from explicit rules and a fallback role set.
    #[must_use]
    pub fn new(rules: HashMap<String, Vec<Role>>, fallback: Vec<Role>) -> Self {
        Self { rules, fallback }
    }

    /// Roles allowed to claim a task type.
    #[must_use]
    pub fn allowed_roles(&self, task_type: &str) -> &[Role] {
        self.rules
            .get(task_type)
            .map_or(&self.fallback, Vec::as_slice)
    }

    /// Whether a role may claim a task type.
    #[must_use]
    pub fn is_eligible(&self, role: Role, task_type: &str) -> bool {
        self.allowed_roles(task_type).contains(&role)
    }
}

impl Default for EligibilityTable {
    fn default() -> Self {
        let rules: HashMap<String, Vec<Role>> = [
            ("code.review", vec![Role::Review, Role::General]),
            ("code.generate", vec![Role::General]),
            ("deployment.deploy", vec![Role::Deployment]),
            ("deployment.rollback", vec![Role::Deployment]),
            ("testing.run", vec![Role::Testing]),
            ("testing.coverage", vec![Role::Testing]),
            ("security.scan", vec![Role::Security, Role::Review]),
            ("security.audit", vec![Role::Security]),
            ("monitoring.health", vec![Role::Monitoring]),
            ("monitoring.alerts", vec![Role::Monitoring]),
            ("documentation.generate", vec![Role::Documentation, Role::General]),
            ("database.migrate", vec![Role::Database]),
            ("database.backup", vec![Role::Database]),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        Self::new(rules, vec![Role::General])
    }
}
