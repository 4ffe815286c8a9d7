//! Build specification

use crate::commons::{ByteValue, KeyValue};

/// How to build a service image instead of pulling one
#[derive(Debug, Clone, Default)]
pub struct Build {
    /// Build context
    pub context: String,
    /// Dockerfile path
    pub dockerfile: Option<String>,
    /// Build arguments
    pub args: Vec<KeyValue>,
    /// SSH agent sockets or keys
    pub ssh: Vec<KeyValue>,
    /// Extra hosts
    pub extra_hosts: Vec<String>,
    /// Privileged build
    pub privileged: Option<bool>,
    /// Image labels
    pub labels: Vec<KeyValue>,
    /// Disable the build cache
    pub no_cache: Option<bool>,
    /// Always pull base images
    pub pull: Option<bool>,
    /// Size of /dev/shm during the build
    pub shm_size: Option<ByteValue>,
    /// Target stage
    pub target: Option<String>,
    /// Build secrets
    pub secrets: Vec<String>,
    /// Additional tags
    pub tags: Vec<String>,
    /// Target platforms
    pub platforms: Vec<String>,
}

impl Build {
    /// Build from a context directory
    pub fn new(context: &str) -> Self {
        Self {
            context: context.to_string(),
            ..Self::default()
        }
    }

    /// Set dockerfile
    pub fn dockerfile(mut self, dockerfile: &str) -> Self {
        self.dockerfile = Some(dockerfile.to_string());
        self
    }

    /// Set target stage
    pub fn target(mut self, target: &str) -> Self {
        self.target = Some(target.to_string());
        self
    }

    /// Add build argument
    pub fn arg(mut self, key: &str, value: &str) -> Self {
        self.args.push(KeyValue::new(key, Some(value)));
        self
    }
}
