//! Deployment and restart policies

use crate::commons::{Delay, KeyValue};

/// Restart condition, shared by the service `restart` field and
/// `deploy.restart_policy`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartCondition {
    /// Never restart (service level)
    No,
    /// Never restart (deploy level)
    None,
    /// Restart on non-zero exit
    OnFailure,
    /// Always restart
    Always,
    /// Restart unless explicitly stopped
    UnlessStopped,
    /// Restart regardless of exit status (deploy level)
    Any,
}

impl RestartCondition {
    /// Parse a restart keyword
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "no" => Some(RestartCondition::No),
            "none" => Some(RestartCondition::None),
            "on-failure" => Some(RestartCondition::OnFailure),
            "always" => Some(RestartCondition::Always),
            "unless-stopped" => Some(RestartCondition::UnlessStopped),
            "any" => Some(RestartCondition::Any),
            _ => None,
        }
    }
}

impl std::fmt::Display for RestartCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RestartCondition::No => write!(f, "no"),
            RestartCondition::None => write!(f, "none"),
            RestartCondition::OnFailure => write!(f, "on-failure"),
            RestartCondition::Always => write!(f, "always"),
            RestartCondition::UnlessStopped => write!(f, "unless-stopped"),
            RestartCondition::Any => write!(f, "any"),
        }
    }
}

/// Restart policy for deployed replicas
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestartPolicy {
    /// Condition
    pub condition: RestartCondition,
    /// Delay between attempts
    pub delay: Option<Delay>,
    /// Maximum attempts
    pub max_attempts: Option<u32>,
    /// Window used to decide whether a restart succeeded
    pub window: Option<Delay>,
}

impl RestartPolicy {
    /// Create a restart policy
    pub fn new(condition: RestartCondition) -> Self {
        Self {
            condition,
            delay: None,
            max_attempts: None,
            window: None,
        }
    }
}

/// What to do when an update fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureAction {
    /// Pause the rollout
    Pause,
    /// Keep going
    Continue,
    /// Roll back (update_config only)
    Rollback,
}

impl FailureAction {
    /// Parse a failure action keyword
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pause" => Some(FailureAction::Pause),
            "continue" => Some(FailureAction::Continue),
            "rollback" => Some(FailureAction::Rollback),
            _ => None,
        }
    }
}

impl std::fmt::Display for FailureAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureAction::Pause => write!(f, "pause"),
            FailureAction::Continue => write!(f, "continue"),
            FailureAction::Rollback => write!(f, "rollback"),
        }
    }
}

/// Operation order during a rollout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOrder {
    /// Stop the old task before starting the new one
    StopFirst,
    /// Start the new task before stopping the old one
    StartFirst,
}

impl UpdateOrder {
    /// Parse an order keyword
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "stop-first" => Some(UpdateOrder::StopFirst),
            "start-first" => Some(UpdateOrder::StartFirst),
            _ => None,
        }
    }
}

impl std::fmt::Display for UpdateOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpdateOrder::StopFirst => write!(f, "stop-first"),
            UpdateOrder::StartFirst => write!(f, "start-first"),
        }
    }
}

/// Rollout settings, used for both rollbacks and updates
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RollbackConfig {
    /// Containers updated at a time
    pub parallelism: Option<u32>,
    /// Wait between groups
    pub delay: Option<Delay>,
    /// Failure action
    pub failure_action: Option<FailureAction>,
    /// Monitoring window after each task update
    pub monitor: Option<Delay>,
    /// Tolerated failure ratio
    pub max_failure_ratio: Option<f64>,
    /// Operation order
    pub order: Option<UpdateOrder>,
}

/// Update settings share the rollback shape
pub type UpdateConfig = RollbackConfig;

/// Replication mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployMode {
    /// One task per node
    Global,
    /// Fixed number of replicas
    Replicated,
}

impl DeployMode {
    /// Parse a mode keyword
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "global" => Some(DeployMode::Global),
            "replicated" => Some(DeployMode::Replicated),
            _ => None,
        }
    }
}

impl std::fmt::Display for DeployMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeployMode::Global => write!(f, "global"),
            DeployMode::Replicated => write!(f, "replicated"),
        }
    }
}

/// Placement constraints and preferences
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Placement {
    /// Maximum replicas per node
    pub max_replicas_per_node: Option<u32>,
    /// Constraint expressions, e.g. `node.role == manager`
    pub constraints: Vec<String>,
    /// Spread preferences
    pub preferences: Vec<String>,
}

impl Placement {
    /// Whether nothing is set
    pub fn is_empty(&self) -> bool {
        self.max_replicas_per_node.is_none()
            && self.constraints.is_empty()
            && self.preferences.is_empty()
    }
}

/// Upper resource bounds
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceLimits {
    /// CPU share, e.g. `0.50`
    pub cpus: Option<String>,
    /// Memory, e.g. `512M`
    pub memory: Option<String>,
    /// Process limit
    pub pids: Option<u64>,
}

/// Guaranteed resources
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceReservations {
    /// CPU share
    pub cpus: Option<String>,
    /// Memory
    pub memory: Option<String>,
}

/// Resource limits and reservations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resources {
    /// Limits
    pub limits: Option<ResourceLimits>,
    /// Reservations
    pub reservations: Option<ResourceReservations>,
}

/// Deployment specification
#[derive(Debug, Clone, Default)]
pub struct Deploy {
    /// Replica count
    pub replicas: Option<u32>,
    /// Service labels
    pub labels: Vec<KeyValue>,
    /// Replication mode
    pub mode: Option<DeployMode>,
    /// Placement
    pub placement: Option<Placement>,
    /// Resources
    pub resources: Option<Resources>,
    /// Restart policy
    pub restart_policy: Option<RestartPolicy>,
    /// Rollback settings
    pub rollback_config: Option<RollbackConfig>,
    /// Update settings
    pub update_config: Option<UpdateConfig>,
}

impl Deploy {
    /// Deploy a fixed number of replicas
    pub fn replicated(replicas: u32) -> Self {
        Self {
            replicas: Some(replicas),
            mode: Some(DeployMode::Replicated),
            ..Self::default()
        }
    }

    /// Set restart policy
    pub fn restart_policy(mut self, policy: RestartPolicy) -> Self {
        self.restart_policy = Some(policy);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restart_condition_keywords() {
        for keyword in ["no", "none", "on-failure", "always", "unless-stopped", "any"] {
            let condition = RestartCondition::parse(keyword).unwrap();
            assert_eq!(condition.to_string(), keyword);
        }
        assert!(RestartCondition::parse("sometimes").is_none());
    }

    #[test]
    fn test_placement_is_empty() {
        assert!(Placement::default().is_empty());
        let placement = Placement {
            constraints: vec!["node.role == manager".to_string()],
            ..Default::default()
        };
        assert!(!placement.is_empty());
    }
}
