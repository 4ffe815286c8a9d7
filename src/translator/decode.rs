//! Tree to descriptor
//!
//! Decoding runs in three passes so that every reference can be resolved
//! against entities that already exist:
//!
//! 1. top-level networks, volumes and secrets
//! 2. services with their scalar settings and host-path mounts
//! 3. service references: networks, dependencies, named-volume mounts,
//!    secrets and environment entries
//!
//! References that do not resolve are dropped with a debug log.

use super::shape;
use crate::commons::Env;
use crate::compose::network::{Network, NetworkDriver};
use crate::compose::secret::{Secret, SecretOptions};
use crate::compose::service::{
    Build, Deploy, DeployMode, FailureAction, HealthCheck, Image, Placement, PortMapping,
    Protocol, PullPolicy, ResourceLimits, ResourceReservations, Resources, RestartCondition,
    RestartPolicy, RollbackConfig, Service, UpdateOrder,
};
use crate::compose::volume::{AccessMode, BindSource, Binding, Volume, VolumeDriver};
use crate::compose::{Compose, ComposeVersion};
use crate::error::{ComposeError, Result};
use serde_yaml::Value;

/// Mount specification, before its source is resolved
#[derive(Debug, Clone, PartialEq)]
struct Mount {
    source: String,
    target: Option<String>,
    mode: AccessMode,
    local: bool,
}

impl Mount {
    fn parse(item: &Value) -> Option<Self> {
        match item {
            Value::Mapping(_) => Self::parse_long(item),
            other => shape::scalar(other).map(|raw| Self::parse_short(&raw)),
        }
    }

    /// `source[:target[:options]]`
    fn parse_short(raw: &str) -> Self {
        let mut segments = raw.splitn(3, ':');
        let source = segments.next().unwrap_or_default().to_string();
        let (target, mode) = match (segments.next(), segments.next()) {
            (Some(mode @ ("ro" | "rw")), None) => (None, AccessMode::parse(mode)),
            (target, mode) => (
                target.map(str::to_string),
                mode.map(AccessMode::parse).unwrap_or_default(),
            ),
        };
        let local = is_host_path(&source);
        Self {
            source,
            target,
            mode,
            local,
        }
    }

    /// `{type, source, target, read_only}`
    fn parse_long(item: &Value) -> Option<Self> {
        let kind = shape::string(item, "type");
        let local = match kind.as_deref() {
            Some("bind") => true,
            Some("volume") => false,
            Some(other) => {
                tracing::debug!("Skipping {} mount", other);
                return None;
            }
            None => false,
        };
        let source = shape::string(item, "source")?;
        let mode = if shape::boolean(item, "read_only").unwrap_or(false) {
            AccessMode::ReadOnly
        } else {
            AccessMode::ReadWrite
        };
        Some(Self {
            local: local || is_host_path(&source),
            source,
            target: shape::string(item, "target"),
            mode,
        })
    }

    fn into_binding(self) -> Binding {
        let source = if self.local {
            BindSource::Path(self.source)
        } else {
            BindSource::Volume(self.source)
        };
        Binding::with_source(source, self.target.as_deref()).mode(self.mode)
    }
}

fn is_host_path(source: &str) -> bool {
    source.starts_with('/') || source.starts_with('.')
}

/// Relation fields of one service, normalized as soon as the service is read
#[derive(Debug, Default)]
struct Relations {
    networks: Vec<String>,
    depends_on: Vec<String>,
    secrets: Vec<String>,
    environment: Vec<(String, Option<String>)>,
    named_mounts: Vec<Mount>,
}

impl Relations {
    fn normalize(body: &Value) -> (Self, Vec<Mount>) {
        let (local, named): (Vec<Mount>, Vec<Mount>) = mounts(shape::field(body, "volumes"))
            .into_iter()
            .partition(|mount| mount.local);
        let relations = Self {
            networks: shape::names(shape::field(body, "networks")),
            depends_on: shape::names(shape::field(body, "depends_on")),
            secrets: shape::references(shape::field(body, "secrets")),
            environment: shape::pairs(shape::field(body, "environment")),
            named_mounts: named,
        };
        (relations, local)
    }
}

fn mounts(node: Option<&Value>) -> Vec<Mount> {
    match node {
        Some(Value::Sequence(items)) => items.iter().filter_map(Mount::parse).collect(),
        _ => Vec::new(),
    }
}

/// Decode a compose tree
pub(crate) fn decode(input: &Value) -> Result<Compose> {
    let services = match shape::field(input, "services") {
        Some(services @ Value::Mapping(_)) => services,
        _ => return Err(ComposeError::MissingServices),
    };

    let mut compose = Compose::new();
    compose.name = shape::string(input, "name");
    compose.version = shape::string(input, "version").and_then(|raw| {
        let version = ComposeVersion::parse(&raw);
        if version.is_none() {
            tracing::warn!("Ignoring invalid version '{}'", raw);
        }
        version
    });

    for (name, body) in shape::entries(shape::field(input, "networks")) {
        compose.networks.add(decode_network(&name, body));
    }
    for (name, body) in shape::entries(shape::field(input, "volumes")) {
        compose.volumes.add(decode_volume(&name, body));
    }
    for (name, body) in shape::entries(shape::field(input, "secrets")) {
        compose.secrets.add(decode_secret(&name, body)?);
    }

    let mut pending = Vec::new();
    for (name, body) in shape::entries(Some(services)) {
        let (relations, local) = Relations::normalize(body);
        let mut service = decode_service(&name, body)?;
        for mount in local {
            service.bindings.add(mount.into_binding());
        }
        compose.services.add(service);
        pending.push((name, relations));
    }

    for (name, relations) in pending {
        link(&mut compose, &name, relations);
    }

    tracing::debug!(
        "Decoded {} services, {} networks, {} volumes, {} secrets",
        compose.services.len(),
        compose.networks.len(),
        compose.volumes.len(),
        compose.secrets.len()
    );
    Ok(compose)
}

/// Resolve the references of one service
fn link(compose: &mut Compose, name: &str, relations: Relations) {
    let networks = resolved(name, "network", relations.networks, |n| compose.networks.has(n));
    let depends_on = resolved(name, "service", relations.depends_on, |n| compose.services.has(n));
    let secrets = resolved(name, "secret", relations.secrets, |n| compose.secrets.has(n));
    let mounts: Vec<Mount> = relations
        .named_mounts
        .into_iter()
        .filter(|mount| {
            let found = compose.volumes.has(&mount.source);
            if !found {
                tracing::debug!("Service {}: dropping unknown volume {}", name, mount.source);
            }
            found
        })
        .collect();

    let mut keys = Vec::new();
    for (key, value) in relations.environment {
        match compose.envs.get(&key) {
            Some(existing) if existing.value != value => tracing::warn!(
                "Service {}: {} differs from the first declaration, keeping '{}'",
                name,
                key,
                existing.value.as_deref().unwrap_or_default()
            ),
            Some(_) => {}
            None => {
                compose.envs.add(Env::new(&key, value.as_deref()));
            }
        }
        keys.push(key);
    }

    let Some(service) = compose.services.get_mut(name) else {
        return;
    };
    service.networks.extend(networks);
    service.depends_on.extend(depends_on);
    service.secrets.extend(secrets);
    for mount in mounts {
        service.bindings.add(mount.into_binding());
    }
    for key in keys {
        service.attach_env(&key);
    }
}

fn resolved<F>(service: &str, kind: &str, names: Vec<String>, exists: F) -> Vec<String>
where
    F: Fn(&str) -> bool,
{
    names
        .into_iter()
        .filter(|name| {
            let found = exists(name);
            if !found {
                tracing::debug!("Service {}: dropping unknown {} {}", service, kind, name);
            }
            found
        })
        .collect()
}

fn decode_network(name: &str, body: &Value) -> Network {
    let mut network = Network::new(name);
    if let Some(driver) = shape::string(body, "driver") {
        network.driver = NetworkDriver::from(driver.as_str());
    }
    network.driver_opts = shape::key_values(shape::field(body, "driver_opts"));
    network.attachable = shape::boolean(body, "attachable").unwrap_or(false);
    network.external = shape::external(body).unwrap_or(false);
    network.internal = shape::boolean(body, "internal").unwrap_or(false);
    network.labels = shape::key_values(shape::field(body, "labels"));
    network
}

fn decode_volume(name: &str, body: &Value) -> Volume {
    let mut volume = Volume::new(name);
    if let Some(driver) = shape::string(body, "driver") {
        volume.driver = VolumeDriver::from(driver.as_str());
    }
    volume.driver_opts = shape::key_values(shape::field(body, "driver_opts"));
    volume.labels = shape::key_values(shape::field(body, "labels"));
    volume.external = shape::external(body).unwrap_or(false);
    volume
}

fn decode_secret(name: &str, body: &Value) -> Result<Secret> {
    Secret::try_new(SecretOptions {
        name: name.to_string(),
        external: shape::external(body),
        file: shape::string(body, "file"),
        environment: shape::string(body, "environment"),
    })
}

fn decode_service(name: &str, body: &Value) -> Result<Service> {
    let mut builder = Service::builder(name);
    if let Some(image) = shape::string(body, "image") {
        builder = builder.image(Image::parse(&image));
    }
    match shape::field(body, "build") {
        Some(build @ Value::Mapping(_)) => builder = builder.build_spec(decode_build(build)),
        Some(other) => {
            if let Some(context) = shape::scalar(other) {
                builder = builder.build_spec(Build::new(&context));
            }
        }
        None => {}
    }

    let mut service = builder.build()?;
    service.container_name = shape::string(body, "container_name");
    service.command = shape::tokens(shape::field(body, "command"));
    service.entrypoint = shape::tokens(shape::field(body, "entrypoint"));
    service.ports = ports(name, shape::field(body, "ports"));
    service.attach = shape::boolean(body, "attach");
    service.configs = shape::references(shape::field(body, "configs"));
    service.dns = shape::strings(shape::field(body, "dns"));
    service.hostname = shape::string(body, "hostname");
    service.labels = shape::key_values(shape::field(body, "labels"));
    service.privileged = shape::boolean(body, "privileged").unwrap_or(false);
    service.pull_policy = shape::keyword(body, "pull_policy", PullPolicy::parse);
    service.read_only = shape::boolean(body, "read_only");
    service.restart = shape::string(body, "restart").and_then(|raw| {
        // `on-failure:3` carries a retry count we do not model
        let keyword = raw.split(':').next().unwrap_or_default();
        let condition = RestartCondition::parse(keyword);
        if condition.is_none() {
            tracing::warn!("Service {}: ignoring unknown restart '{}'", name, raw);
        }
        condition
    });
    service.working_dir = shape::string(body, "working_dir");
    service.network_mode = shape::string(body, "network_mode");
    service.healthcheck = shape::field(body, "healthcheck").map(decode_healthcheck);
    service.deploy = shape::field(body, "deploy").map(decode_deploy);
    Ok(service)
}

fn ports(service: &str, node: Option<&Value>) -> Vec<PortMapping> {
    let Some(Value::Sequence(items)) = node else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let parsed = match item {
                Value::Mapping(_) => long_port(item),
                other => match shape::scalar(other) {
                    Some(raw) => PortMapping::parse(&raw),
                    None => Err(ComposeError::InvalidArgument(
                        "port must be a string or mapping".to_string(),
                    )),
                },
            };
            match parsed {
                Ok(port) => Some(port),
                Err(e) => {
                    tracing::warn!("Service {}: skipping port: {}", service, e);
                    None
                }
            }
        })
        .collect()
}

/// `{target, published, host_ip, protocol}`
fn long_port(item: &Value) -> Result<PortMapping> {
    let port = |key: &str| -> Result<Option<u16>> {
        match shape::unsigned(item, key) {
            Some(n) => u16::try_from(n)
                .map(Some)
                .map_err(|_| ComposeError::InvalidArgument(format!("{} {} out of range", key, n))),
            None => Ok(None),
        }
    };
    let target = port("target")?
        .ok_or_else(|| ComposeError::InvalidArgument("port has no target".to_string()))?;
    let published = port("published")?.unwrap_or(target);

    let mut mapping = PortMapping::new(published, target);
    if let Some(ip) = shape::string(item, "host_ip") {
        mapping = mapping.host_ip(&ip);
    }
    if let Some(protocol) = shape::string(item, "protocol") {
        mapping = mapping.protocol(protocol.parse::<Protocol>()?);
    }
    Ok(mapping)
}

fn decode_build(body: &Value) -> Build {
    let mut build = Build::new(&shape::string(body, "context").unwrap_or_else(|| ".".to_string()));
    build.dockerfile = shape::string(body, "dockerfile");
    build.args = shape::key_values(shape::field(body, "args"));
    build.ssh = shape::key_values(shape::field(body, "ssh"));
    build.extra_hosts = match shape::field(body, "extra_hosts") {
        Some(Value::Mapping(_)) => shape::pairs(shape::field(body, "extra_hosts"))
            .into_iter()
            .map(|(host, ip)| format!("{}:{}", host, ip.unwrap_or_default()))
            .collect(),
        other => shape::strings(other),
    };
    build.privileged = shape::boolean(body, "privileged");
    build.labels = shape::key_values(shape::field(body, "labels"));
    build.no_cache = shape::boolean(body, "no_cache");
    build.pull = shape::boolean(body, "pull");
    build.shm_size = shape::string(body, "shm_size").and_then(|raw| match raw.parse() {
        Ok(size) => Some(size),
        Err(e) => {
            tracing::warn!("Ignoring shm_size: {}", e);
            None
        }
    });
    build.target = shape::string(body, "target");
    build.secrets = shape::references(shape::field(body, "secrets"));
    build.tags = shape::strings(shape::field(body, "tags"));
    build.platforms = shape::strings(shape::field(body, "platforms"));
    build
}

fn decode_healthcheck(body: &Value) -> HealthCheck {
    let test = match shape::field(body, "test") {
        Some(Value::Sequence(_)) => shape::strings(shape::field(body, "test")),
        Some(other) => match shape::scalar(other) {
            Some(command) => HealthCheck::shell(&command).test,
            None => Vec::new(),
        },
        None => Vec::new(),
    };
    HealthCheck {
        test,
        interval: shape::delay(body, "interval"),
        timeout: shape::delay(body, "timeout"),
        retries: shape::unsigned32(body, "retries"),
        start_period: shape::delay(body, "start_period"),
        start_interval: shape::delay(body, "start_interval"),
        disable: shape::boolean(body, "disable").unwrap_or(false),
    }
}

fn decode_deploy(body: &Value) -> Deploy {
    Deploy {
        replicas: shape::unsigned32(body, "replicas"),
        labels: shape::key_values(shape::field(body, "labels")),
        mode: shape::keyword(body, "mode", DeployMode::parse),
        placement: shape::field(body, "placement").map(decode_placement),
        resources: shape::field(body, "resources").map(|resources| Resources {
            limits: shape::field(resources, "limits").map(|limits| ResourceLimits {
                cpus: shape::string(limits, "cpus"),
                memory: shape::string(limits, "memory"),
                pids: shape::unsigned(limits, "pids"),
            }),
            reservations: shape::field(resources, "reservations").map(|reservations| {
                ResourceReservations {
                    cpus: shape::string(reservations, "cpus"),
                    memory: shape::string(reservations, "memory"),
                }
            }),
        }),
        restart_policy: shape::field(body, "restart_policy").map(|policy| {
            let condition = shape::keyword(policy, "condition", RestartCondition::parse)
                .unwrap_or(RestartCondition::Any);
            RestartPolicy {
                condition,
                delay: shape::delay(policy, "delay"),
                max_attempts: shape::unsigned32(policy, "max_attempts"),
                window: shape::delay(policy, "window"),
            }
        }),
        rollback_config: shape::field(body, "rollback_config").map(decode_rollout),
        update_config: shape::field(body, "update_config").map(decode_rollout),
    }
}

fn decode_placement(body: &Value) -> Placement {
    let preferences = match shape::field(body, "preferences") {
        Some(Value::Sequence(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::Mapping(_) => shape::string(item, "spread"),
                other => shape::scalar(other),
            })
            .collect(),
        _ => Vec::new(),
    };
    Placement {
        max_replicas_per_node: shape::unsigned32(body, "max_replicas_per_node"),
        constraints: shape::strings(shape::field(body, "constraints")),
        preferences,
    }
}

fn decode_rollout(body: &Value) -> RollbackConfig {
    RollbackConfig {
        parallelism: shape::unsigned32(body, "parallelism"),
        delay: shape::delay(body, "delay"),
        failure_action: shape::keyword(body, "failure_action", FailureAction::parse),
        monitor: shape::delay(body, "monitor"),
        max_failure_ratio: shape::float(body, "max_failure_ratio"),
        order: shape::keyword(body, "order", UpdateOrder::parse),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(text: &str) -> Value {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn test_short_mount_syntax() {
        let local = Mount::parse_short("./site:/usr/share/nginx/html:ro");
        assert!(local.local);
        assert_eq!(local.target.as_deref(), Some("/usr/share/nginx/html"));
        assert_eq!(local.mode, AccessMode::ReadOnly);

        let named = Mount::parse_short("db_data:/var/lib/postgresql/data");
        assert!(!named.local);
        assert_eq!(named.mode, AccessMode::ReadWrite);

        let anonymous = Mount::parse_short("/node_modules");
        assert!(anonymous.local);
        assert!(anonymous.target.is_none());

        let locked = Mount::parse_short("/node_modules:ro");
        assert!(locked.target.is_none());
        assert_eq!(locked.mode, AccessMode::ReadOnly);
    }

    #[test]
    fn test_long_mount_syntax() {
        let bind = Mount::parse(&yaml(
            "{type: bind, source: ./static, target: /opt/static, read_only: true}",
        ))
        .unwrap();
        assert!(bind.local);
        assert_eq!(bind.mode, AccessMode::ReadOnly);

        let volume = Mount::parse(&yaml("{type: volume, source: data, target: /data}")).unwrap();
        assert!(!volume.local);

        assert!(Mount::parse(&yaml("{type: tmpfs, target: /tmp}")).is_none());
    }

    #[test]
    fn test_long_port_syntax() {
        let port = long_port(&yaml(
            "{target: 80, published: 8080, host_ip: 127.0.0.1, protocol: udp}",
        ))
        .unwrap();
        assert_eq!(port.to_string(), "127.0.0.1:8080:80/udp");

        assert!(long_port(&yaml("{published: 8080}")).is_err());
        assert!(long_port(&yaml("{target: 70000}")).is_err());
    }

    #[test]
    fn test_bad_ports_are_skipped() {
        let node = yaml(r#"["8080:80", "abc", {target: 443}]"#);
        let ports = ports("web", Some(&node));
        assert_eq!(ports.len(), 2);
        assert_eq!(ports[1].host_port, 443);
    }

    #[test]
    fn test_healthcheck_string_test_runs_in_shell() {
        let check = decode_healthcheck(&yaml(
            "{test: 'curl -f http://localhost', interval: 1m30s, retries: 3}",
        ));
        assert_eq!(check.test, vec!["CMD-SHELL", "curl -f http://localhost"]);
        assert_eq!(check.interval.unwrap().to_string(), "90s");
        assert_eq!(check.retries, Some(3));
    }

    #[test]
    fn test_deploy_sections() {
        let deploy = decode_deploy(&yaml(
            r#"
mode: replicated
replicas: 2
resources:
  limits: {cpus: '0.50', memory: 50M, pids: 1}
  reservations: {cpus: '0.25', memory: 20M}
restart_policy: {condition: on-failure, delay: 5s, max_attempts: 3}
placement:
  constraints: [node.role == manager]
  preferences: [{spread: node.labels.zone}]
update_config: {parallelism: 2, order: start-first, max_failure_ratio: 0.1}
"#,
        ));
        assert_eq!(deploy.mode, Some(DeployMode::Replicated));
        assert_eq!(deploy.replicas, Some(2));
        let limits = deploy.resources.unwrap().limits.unwrap();
        assert_eq!(limits.cpus.as_deref(), Some("0.50"));
        assert_eq!(limits.pids, Some(1));
        let policy = deploy.restart_policy.unwrap();
        assert_eq!(policy.condition, RestartCondition::OnFailure);
        assert_eq!(policy.max_attempts, Some(3));
        let placement = deploy.placement.unwrap();
        assert_eq!(placement.preferences, vec!["node.labels.zone"]);
        let update = deploy.update_config.unwrap();
        assert_eq!(update.order, Some(UpdateOrder::StartFirst));
        assert_eq!(update.max_failure_ratio, Some(0.1));
    }

    #[test]
    fn test_build_string_and_mapping() {
        let tree = yaml(
            r#"
services:
  api:
    build: ./api
  worker:
    build:
      context: ./worker
      dockerfile: Dockerfile.dev
      args: {RUST_VERSION: "1.80"}
      shm_size: 2gb
"#,
        );
        let compose = decode(&tree).unwrap();
        assert_eq!(compose.service("api").unwrap().build().unwrap().context, "./api");
        let worker = compose.service("worker").unwrap().build().unwrap();
        assert_eq!(worker.dockerfile.as_deref(), Some("Dockerfile.dev"));
        assert_eq!(worker.args[0].to_string(), "RUST_VERSION=1.80");
        assert_eq!(worker.shm_size.unwrap().to_string(), "2gb");
    }

    #[test]
    fn test_image_with_build_is_rejected() {
        let tree = yaml("services: {web: {image: nginx, build: .}}");
        assert!(matches!(decode(&tree), Err(ComposeError::InvalidArgument(_))));
    }

    #[test]
    fn test_conflicting_secret_is_rejected() {
        let tree = yaml(
            "services: {web: {image: nginx}}\nsecrets: {token: {external: true, file: ./token}}",
        );
        assert!(matches!(decode(&tree), Err(ComposeError::InvalidArgument(_))));
    }

    #[test]
    fn test_missing_services() {
        assert!(matches!(decode(&yaml("networks: {}")), Err(ComposeError::MissingServices)));
        assert!(matches!(decode(&yaml("services: [web]")), Err(ComposeError::MissingServices)));
    }

    #[test]
    fn test_first_environment_declaration_wins() {
        let tree = yaml(
            r#"
services:
  api:
    image: api
    environment: [MODE=prod]
  worker:
    image: worker
    environment: {MODE: dev}
"#,
        );
        let compose = decode(&tree).unwrap();
        assert_eq!(compose.envs().len(), 1);
        assert_eq!(compose.env("MODE").unwrap().value.as_deref(), Some("prod"));
        assert_eq!(compose.envs_of("worker")[0].value.as_deref(), Some("prod"));
    }
}
