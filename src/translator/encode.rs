//! Descriptor to tree
//!
//! Output always uses one canonical shape: name lists for references,
//! `KEY=VALUE` lists for environment and labels, mappings for driver options.
//! Empty groups and false flags are left out.

use crate::commons::KeyValue;
use crate::compose::network::Network;
use crate::compose::secret::{Secret, SecretSource};
use crate::compose::service::{Build, Deploy, HealthCheck, RollbackConfig, Service};
use crate::compose::volume::Volume;
use crate::compose::Compose;
use serde_yaml::{Mapping, Value};

/// Mapping under construction that skips empty values
#[derive(Default)]
struct Node(Mapping);

impl Node {
    fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(Value::from(key), value.into());
    }

    fn opt<V: Into<Value>>(&mut self, key: &str, value: Option<V>) {
        if let Some(value) = value {
            self.set(key, value);
        }
    }

    fn text<T: ToString>(&mut self, key: &str, value: Option<&T>) {
        self.opt(key, value.map(ToString::to_string));
    }

    fn flag(&mut self, key: &str, value: bool) {
        if value {
            self.set(key, true);
        }
    }

    fn list<I, S>(&mut self, key: &str, items: I)
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        let items: Vec<Value> = items
            .into_iter()
            .map(|item| Value::from(item.to_string()))
            .collect();
        if !items.is_empty() {
            self.set(key, Value::Sequence(items));
        }
    }

    fn child(&mut self, key: &str, node: Node) {
        if !node.0.is_empty() {
            self.set(key, Value::Mapping(node.0));
        }
    }

    fn into_value(self) -> Value {
        Value::Mapping(self.0)
    }
}

fn options(pairs: &[KeyValue]) -> Node {
    let mut node = Node::default();
    for pair in pairs {
        let value = pair.value.clone().map(Value::from).unwrap_or(Value::Null);
        node.set(&pair.key, value);
    }
    node
}

/// Encode a descriptor
pub(crate) fn encode(compose: &Compose) -> Value {
    let mut root = Node::default();
    root.opt("name", compose.name.clone());
    root.text("version", compose.version.as_ref());

    let mut services = Mapping::new();
    for service in compose.services() {
        services.insert(
            Value::from(service.name.clone()),
            encode_service(compose, service),
        );
    }
    // Always present so the output decodes again
    root.set("services", Value::Mapping(services));

    let mut networks = Node::default();
    for network in compose.networks() {
        networks.set(&network.name, encode_network(network));
    }
    root.child("networks", networks);

    let mut volumes = Node::default();
    for volume in compose.volumes().iter().filter(|v| !v.is_simple()) {
        volumes.set(&volume.name, encode_volume(volume));
    }
    root.child("volumes", volumes);

    let mut secrets = Node::default();
    for secret in compose.secrets() {
        secrets.set(&secret.name, encode_secret(secret));
    }
    root.child("secrets", secrets);

    root.into_value()
}

fn encode_network(network: &Network) -> Value {
    let mut node = Node::default();
    node.set("driver", network.driver.to_string());
    node.child("driver_opts", options(&network.driver_opts));
    node.flag("attachable", network.attachable);
    node.flag("external", network.external);
    node.flag("internal", network.internal);
    node.list("labels", &network.labels);
    node.into_value()
}

fn encode_volume(volume: &Volume) -> Value {
    let mut node = Node::default();
    node.set("driver", volume.driver.to_string());
    node.child("driver_opts", options(&volume.driver_opts));
    node.list("labels", &volume.labels);
    node.flag("external", volume.external);
    node.into_value()
}

fn encode_secret(secret: &Secret) -> Value {
    let mut node = Node::default();
    match secret.source() {
        Some(SecretSource::External) => node.set("external", true),
        Some(SecretSource::File(path)) => node.set("file", path.as_str()),
        Some(SecretSource::Environment(variable)) => node.set("environment", variable.as_str()),
        None => {}
    }
    node.into_value()
}

fn encode_service(compose: &Compose, service: &Service) -> Value {
    let mut node = Node::default();
    node.text("image", service.image());
    if let Some(build) = service.build() {
        node.child("build", encode_build(build));
    }
    node.opt("container_name", service.container_name.clone());
    if let Some(command) = &service.command {
        node.set("command", tokens(command));
    }
    if let Some(entrypoint) = &service.entrypoint {
        node.set("entrypoint", tokens(entrypoint));
    }
    node.list("ports", &service.ports);
    node.list("volumes", service.bindings());
    if let Some(environment) = service.environment() {
        node.list(
            "environment",
            environment.iter().filter_map(|key| compose.env(key)),
        );
    }
    node.list("secrets", service.secrets());
    node.list("networks", service.networks());
    node.opt("network_mode", service.network_mode.clone());
    node.list("depends_on", service.depends_on());
    if let Some(healthcheck) = service.healthcheck.as_ref().filter(|h| !h.is_empty()) {
        node.child("healthcheck", encode_healthcheck(healthcheck));
    }
    if let Some(deploy) = &service.deploy {
        node.child("deploy", encode_deploy(deploy));
    }
    node.text("restart", service.restart.as_ref());
    node.opt("hostname", service.hostname.clone());
    node.opt("working_dir", service.working_dir.clone());
    node.list("labels", &service.labels);
    node.list("dns", &service.dns);
    node.list("configs", &service.configs);
    node.flag("privileged", service.privileged);
    node.opt("read_only", service.read_only);
    node.opt("attach", service.attach);
    node.text("pull_policy", service.pull_policy.as_ref());
    node.into_value()
}

fn tokens(tokens: &[String]) -> Value {
    Value::Sequence(tokens.iter().cloned().map(Value::from).collect())
}

fn encode_build(build: &Build) -> Node {
    let mut node = Node::default();
    node.set("context", build.context.as_str());
    node.opt("dockerfile", build.dockerfile.clone());
    node.list("args", &build.args);
    node.list("ssh", &build.ssh);
    node.list("extra_hosts", &build.extra_hosts);
    node.opt("privileged", build.privileged);
    node.list("labels", &build.labels);
    node.opt("no_cache", build.no_cache);
    node.opt("pull", build.pull);
    node.text("shm_size", build.shm_size.as_ref());
    node.opt("target", build.target.clone());
    node.list("secrets", &build.secrets);
    node.list("tags", &build.tags);
    node.list("platforms", &build.platforms);
    node
}

fn encode_healthcheck(healthcheck: &HealthCheck) -> Node {
    let mut node = Node::default();
    node.list("test", &healthcheck.test);
    node.text("interval", healthcheck.interval.as_ref());
    node.text("timeout", healthcheck.timeout.as_ref());
    node.opt("retries", healthcheck.retries);
    node.text("start_period", healthcheck.start_period.as_ref());
    node.text("start_interval", healthcheck.start_interval.as_ref());
    node.flag("disable", healthcheck.disable);
    node
}

fn encode_deploy(deploy: &Deploy) -> Node {
    let mut node = Node::default();
    node.text("mode", deploy.mode.as_ref());
    node.opt("replicas", deploy.replicas);
    node.list("labels", &deploy.labels);
    if let Some(placement) = deploy.placement.as_ref().filter(|p| !p.is_empty()) {
        let mut child = Node::default();
        child.opt("max_replicas_per_node", placement.max_replicas_per_node);
        child.list("constraints", &placement.constraints);
        let preferences: Vec<Value> = placement
            .preferences
            .iter()
            .map(|spread| {
                let mut preference = Node::default();
                preference.set("spread", spread.as_str());
                preference.into_value()
            })
            .collect();
        if !preferences.is_empty() {
            child.set("preferences", Value::Sequence(preferences));
        }
        node.child("placement", child);
    }
    if let Some(resources) = &deploy.resources {
        let mut child = Node::default();
        if let Some(limits) = &resources.limits {
            let mut limit = Node::default();
            limit.opt("cpus", limits.cpus.clone());
            limit.opt("memory", limits.memory.clone());
            limit.opt("pids", limits.pids);
            child.child("limits", limit);
        }
        if let Some(reservations) = &resources.reservations {
            let mut reservation = Node::default();
            reservation.opt("cpus", reservations.cpus.clone());
            reservation.opt("memory", reservations.memory.clone());
            child.child("reservations", reservation);
        }
        node.child("resources", child);
    }
    if let Some(policy) = &deploy.restart_policy {
        let mut child = Node::default();
        child.set("condition", policy.condition.to_string());
        child.text("delay", policy.delay.as_ref());
        child.opt("max_attempts", policy.max_attempts);
        child.text("window", policy.window.as_ref());
        node.child("restart_policy", child);
    }
    if let Some(rollback) = &deploy.rollback_config {
        node.child("rollback_config", encode_rollout(rollback));
    }
    if let Some(update) = &deploy.update_config {
        node.child("update_config", encode_rollout(update));
    }
    node
}

fn encode_rollout(config: &RollbackConfig) -> Node {
    let mut node = Node::default();
    node.opt("parallelism", config.parallelism);
    node.text("delay", config.delay.as_ref());
    node.text("failure_action", config.failure_action.as_ref());
    node.text("monitor", config.monitor.as_ref());
    node.opt("max_failure_ratio", config.max_failure_ratio);
    node.text("order", config.order.as_ref());
    node
}
