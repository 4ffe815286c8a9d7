//! Service aggregate
//!
//! A service describes one deployable unit. Scalar settings are plain public
//! fields; references to networks, secrets, environment entries, volumes and
//! other services are kept by natural key and can only be changed through the
//! owning [`Compose`](crate::compose::Compose), which keeps them in step with
//! its top-level entity sets.

pub mod build;
pub mod deploy;
pub mod healthcheck;
pub mod image;
pub mod port;

pub use build::Build;
pub use deploy::{
    Deploy, DeployMode, FailureAction, Placement, ResourceLimits, ResourceReservations,
    Resources, RestartCondition, RestartPolicy, RollbackConfig, UpdateConfig, UpdateOrder,
};
pub use healthcheck::HealthCheck;
pub use image::{Image, PullPolicy};
pub use port::{PortMapping, Protocol};

use crate::commons::{id, Entity, EntitySet, KeyValue};
use crate::compose::volume::Binding;
use crate::error::{ComposeError, Result};

/// Service definition
#[derive(Debug, Clone)]
pub struct Service {
    /// Service ID
    pub id: String,
    /// Service name
    pub name: String,
    image: Option<Image>,
    build: Option<Build>,
    /// Container name
    pub container_name: Option<String>,
    /// Published ports
    pub ports: Vec<PortMapping>,
    /// Attach to log output
    pub attach: Option<bool>,
    /// Command tokens
    pub command: Option<Vec<String>>,
    /// Entrypoint tokens
    pub entrypoint: Option<Vec<String>>,
    /// Config names
    pub configs: Vec<String>,
    /// Deployment specification
    pub deploy: Option<Deploy>,
    /// DNS servers
    pub dns: Vec<String>,
    /// Health check
    pub healthcheck: Option<HealthCheck>,
    /// Hostname
    pub hostname: Option<String>,
    /// Labels
    pub labels: Vec<KeyValue>,
    /// Privileged mode
    pub privileged: bool,
    /// Pull policy
    pub pull_policy: Option<PullPolicy>,
    /// Read only root filesystem
    pub read_only: Option<bool>,
    /// Restart policy
    pub restart: Option<RestartCondition>,
    /// Working directory
    pub working_dir: Option<String>,
    /// Network mode, passed through verbatim
    pub network_mode: Option<String>,
    pub(crate) bindings: EntitySet<Binding>,
    pub(crate) environment: Option<EntitySet<String>>,
    pub(crate) secrets: EntitySet<String>,
    pub(crate) depends_on: EntitySet<String>,
    pub(crate) networks: EntitySet<String>,
}

impl Service {
    /// Create a service with nothing but a name
    pub fn new(name: &str) -> Self {
        Self {
            id: id::generate(id::SERVICE),
            name: name.to_string(),
            image: None,
            build: None,
            container_name: None,
            ports: Vec::new(),
            attach: None,
            command: None,
            entrypoint: None,
            configs: Vec::new(),
            deploy: None,
            dns: Vec::new(),
            healthcheck: None,
            hostname: None,
            labels: Vec::new(),
            privileged: false,
            pull_policy: None,
            read_only: None,
            restart: None,
            working_dir: None,
            network_mode: None,
            bindings: EntitySet::new(),
            environment: None,
            secrets: EntitySet::new(),
            depends_on: EntitySet::new(),
            networks: EntitySet::new(),
        }
    }

    /// Start building a service
    pub fn builder(name: &str) -> ServiceBuilder {
        ServiceBuilder::new(name)
    }

    /// Image reference
    pub fn image(&self) -> Option<&Image> {
        self.image.as_ref()
    }

    /// Build specification
    pub fn build(&self) -> Option<&Build> {
        self.build.as_ref()
    }

    /// Set the image, rejected when a build is already set
    pub fn set_image(&mut self, image: Image) -> Result<()> {
        if self.build.is_some() {
            return Err(both_image_and_build(&self.name));
        }
        self.image = Some(image);
        Ok(())
    }

    /// Set the build, rejected when an image is already set
    pub fn set_build(&mut self, build: Build) -> Result<()> {
        if self.image.is_some() {
            return Err(both_image_and_build(&self.name));
        }
        self.build = Some(build);
        Ok(())
    }

    /// Drop both image and build
    pub fn clear_source(&mut self) {
        self.image = None;
        self.build = None;
    }

    /// Bind mounts
    pub fn bindings(&self) -> &EntitySet<Binding> {
        &self.bindings
    }

    /// Referenced environment keys, absent until the first one is attached
    pub fn environment(&self) -> Option<&EntitySet<String>> {
        self.environment.as_ref()
    }

    /// Referenced secret names
    pub fn secrets(&self) -> &EntitySet<String> {
        &self.secrets
    }

    /// Names of the services this one depends on
    pub fn depends_on(&self) -> &EntitySet<String> {
        &self.depends_on
    }

    /// Attached network names
    pub fn networks(&self) -> &EntitySet<String> {
        &self.networks
    }

    pub(crate) fn attach_env(&mut self, key: &str) {
        self.environment
            .get_or_insert_with(EntitySet::new)
            .add(key.to_string());
    }
}

impl Entity for Service {
    fn key(&self) -> &str {
        &self.name
    }
}

fn both_image_and_build(name: &str) -> ComposeError {
    ComposeError::InvalidArgument(format!(
        "Service '{}' cannot have both an image and build",
        name
    ))
}

/// Builder for [`Service`] that validates image/build exclusivity
#[derive(Debug, Clone)]
pub struct ServiceBuilder {
    service: Service,
    image: Option<Image>,
    build: Option<Build>,
}

impl ServiceBuilder {
    /// Create a builder
    pub fn new(name: &str) -> Self {
        Self {
            service: Service::new(name),
            image: None,
            build: None,
        }
    }

    /// Set image
    pub fn image(mut self, image: Image) -> Self {
        self.image = Some(image);
        self
    }

    /// Set build
    pub fn build_spec(mut self, build: Build) -> Self {
        self.build = Some(build);
        self
    }

    /// Set container name
    pub fn container_name(mut self, name: &str) -> Self {
        self.service.container_name = Some(name.to_string());
        self
    }

    /// Add port mapping
    pub fn port(mut self, port: PortMapping) -> Self {
        self.service.ports.push(port);
        self
    }

    /// Set command
    pub fn command<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.service.command = Some(tokens.into_iter().map(Into::into).collect());
        self
    }

    /// Set entrypoint
    pub fn entrypoint<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.service.entrypoint = Some(tokens.into_iter().map(Into::into).collect());
        self
    }

    /// Set deploy specification
    pub fn deploy(mut self, deploy: Deploy) -> Self {
        self.service.deploy = Some(deploy);
        self
    }

    /// Set health check
    pub fn healthcheck(mut self, healthcheck: HealthCheck) -> Self {
        self.service.healthcheck = Some(healthcheck);
        self
    }

    /// Set hostname
    pub fn hostname(mut self, hostname: &str) -> Self {
        self.service.hostname = Some(hostname.to_string());
        self
    }

    /// Add label
    pub fn label(mut self, key: &str, value: &str) -> Self {
        self.service.labels.push(KeyValue::new(key, Some(value)));
        self
    }

    /// Set privileged
    pub fn privileged(mut self, privileged: bool) -> Self {
        self.service.privileged = privileged;
        self
    }

    /// Set read only root filesystem
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.service.read_only = Some(read_only);
        self
    }

    /// Set restart policy
    pub fn restart(mut self, restart: RestartCondition) -> Self {
        self.service.restart = Some(restart);
        self
    }

    /// Set working directory
    pub fn working_dir(mut self, dir: &str) -> Self {
        self.service.working_dir = Some(dir.to_string());
        self
    }

    /// Set network mode
    pub fn network_mode(mut self, mode: &str) -> Self {
        self.service.network_mode = Some(mode.to_string());
        self
    }

    /// Finish, failing when both image and build were given
    pub fn build(self) -> Result<Service> {
        let mut service = self.service;
        if self.image.is_some() && self.build.is_some() {
            return Err(both_image_and_build(&service.name));
        }
        service.image = self.image;
        service.build = self.build;
        Ok(service)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_and_build_are_exclusive() {
        let result = Service::builder("web")
            .image(Image::new("nginx"))
            .build_spec(Build::new("."))
            .build();
        assert!(matches!(result, Err(ComposeError::InvalidArgument(_))));
    }

    #[test]
    fn test_builder_sets_fields() {
        let service = Service::builder("web")
            .image(Image::parse("nginx:1.25"))
            .port(PortMapping::new(8080, 80))
            .command(["nginx", "-g", "daemon off;"])
            .network_mode("host")
            .build()
            .unwrap();

        assert_eq!(service.name, "web");
        assert_eq!(service.image().unwrap().tag, "1.25");
        assert_eq!(service.ports.len(), 1);
        assert_eq!(service.command.as_ref().unwrap().len(), 3);
        assert_eq!(service.network_mode.as_deref(), Some("host"));
        assert!(service.id.starts_with("ser_"));
        assert!(service.environment().is_none());
    }

    #[test]
    fn test_setters_keep_exclusivity() {
        let mut service = Service::builder("api")
            .build_spec(Build::new("./api"))
            .build()
            .unwrap();
        assert!(service.set_image(Image::new("api")).is_err());

        service.clear_source();
        service.set_image(Image::new("api")).unwrap();
        assert!(service.set_build(Build::new("./api")).is_err());
        assert!(service.build().is_none());
    }

    #[test]
    fn test_attach_env_creates_set_lazily() {
        let mut service = Service::new("db");
        service.attach_env("POSTGRES_USER");
        service.attach_env("POSTGRES_USER");
        assert_eq!(service.environment().unwrap().len(), 1);
    }
}
