//! Container health checks

use crate::commons::Delay;

/// Health check run inside a service container
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HealthCheck {
    /// Test command, including its `CMD`/`CMD-SHELL`/`NONE` marker
    pub test: Vec<String>,
    /// Time between checks
    pub interval: Option<Delay>,
    /// Time before a check is considered hung
    pub timeout: Option<Delay>,
    /// Consecutive failures before unhealthy
    pub retries: Option<u32>,
    /// Initialisation grace period
    pub start_period: Option<Delay>,
    /// Time between checks during the start period
    pub start_interval: Option<Delay>,
    /// Disable the image's health check
    pub disable: bool,
}

impl HealthCheck {
    /// Exec-form check, `["CMD", args...]`
    pub fn cmd<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut test = vec!["CMD".to_string()];
        test.extend(args.into_iter().map(Into::into));
        Self {
            test,
            ..Self::default()
        }
    }

    /// Shell-form check, `["CMD-SHELL", command]`
    pub fn shell(command: &str) -> Self {
        Self {
            test: vec!["CMD-SHELL".to_string(), command.to_string()],
            ..Self::default()
        }
    }

    /// Set interval
    pub fn interval(mut self, interval: Delay) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Set timeout
    pub fn timeout(mut self, timeout: Delay) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set retries
    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    /// Whether this check has anything to emit
    pub fn is_empty(&self) -> bool {
        self.test.is_empty() && !self.disable
    }
}
