//! Deployment descriptor, the root of the entity graph

use super::network::Network;
use super::secret::Secret;
use super::service::Service;
use super::volume::{BindSource, Binding, Volume};
use crate::commons::{Entity, EntitySet, Env};
use crate::error::{ComposeError, Result};
use crate::translator::Translator;
use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};

/// Format versions recognised by compose tooling
pub const KNOWN_VERSIONS: &[&str] = &[
    "2.0", "2.1", "2.2", "2.3", "2.4", "3.0", "3.1", "3.2", "3.3", "3.4", "3.5", "3.6", "3.7",
    "3.8",
];

/// Descriptor format version, kept verbatim as written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeVersion(String);

impl ComposeVersion {
    /// Accept any positive numeric-looking value
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        match raw.parse::<f64>() {
            Ok(number) if number > 0.0 => Some(Self(raw.to_string())),
            _ => None,
        }
    }

    /// Version text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is one of [`KNOWN_VERSIONS`]
    pub fn is_known(&self) -> bool {
        KNOWN_VERSIONS.contains(&self.0.as_str())
    }
}

impl std::fmt::Display for ComposeVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Deployment descriptor.
///
/// Owns the five top-level entity sets. Every reference a service holds
/// (network, secret, environment entry, depended-on service, volume binding)
/// names a member of the matching set; the mutation methods below are the only
/// way to change those references and keep that true, removing dangling
/// references when an entity is removed.
#[derive(Debug, Clone, Default)]
pub struct Compose {
    /// Project name
    pub name: Option<String>,
    /// Format version
    pub version: Option<ComposeVersion>,
    pub(crate) services: EntitySet<Service>,
    pub(crate) networks: EntitySet<Network>,
    pub(crate) volumes: EntitySet<Volume>,
    pub(crate) secrets: EntitySet<Secret>,
    pub(crate) envs: EntitySet<Env>,
}

impl Compose {
    /// Create an empty descriptor
    pub fn new() -> Self {
        Self::default()
    }

    /// Set project name
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Set format version
    pub fn with_version(mut self, version: ComposeVersion) -> Self {
        self.version = Some(version);
        self
    }

    /// Services
    pub fn services(&self) -> &EntitySet<Service> {
        &self.services
    }

    /// Networks
    pub fn networks(&self) -> &EntitySet<Network> {
        &self.networks
    }

    /// Volumes
    pub fn volumes(&self) -> &EntitySet<Volume> {
        &self.volumes
    }

    /// Secrets
    pub fn secrets(&self) -> &EntitySet<Secret> {
        &self.secrets
    }

    /// Environment entries
    pub fn envs(&self) -> &EntitySet<Env> {
        &self.envs
    }

    /// Service by name
    pub fn service(&self, name: &str) -> Option<&Service> {
        self.services.get(name)
    }

    /// Mutable service by name
    pub fn service_mut(&mut self, name: &str) -> Option<&mut Service> {
        self.services.get_mut(name)
    }

    /// Network by name
    pub fn network(&self, name: &str) -> Option<&Network> {
        self.networks.get(name)
    }

    /// Mutable network by name; renaming through it is not supported
    pub fn network_mut(&mut self, name: &str) -> Option<&mut Network> {
        self.networks.get_mut(name)
    }

    /// Volume by name
    pub fn volume(&self, name: &str) -> Option<&Volume> {
        self.volumes.get(name)
    }

    /// Mutable volume by name; renaming through it is not supported
    pub fn volume_mut(&mut self, name: &str) -> Option<&mut Volume> {
        self.volumes.get_mut(name)
    }

    /// Secret by name
    pub fn secret(&self, name: &str) -> Option<&Secret> {
        self.secrets.get(name)
    }

    /// Environment entry by key
    pub fn env(&self, key: &str) -> Option<&Env> {
        self.envs.get(key)
    }

    /// Mutable environment entry by key. A value change is seen by every
    /// service referencing the key.
    pub fn env_mut(&mut self, key: &str) -> Option<&mut Env> {
        self.envs.get_mut(key)
    }

    fn ensure_services(&self, names: &[&str]) -> Result<()> {
        match names.iter().find(|name| !self.services.has(name)) {
            Some(missing) => Err(ComposeError::ServiceNotFound(missing.to_string())),
            None => Ok(()),
        }
    }

    /// Add a network and attach it to the given services
    pub fn add_network(&mut self, network: Network, to: &[&str]) -> Result<()> {
        self.ensure_services(to)?;
        let name = network.name.clone();
        if !self.networks.add(network) {
            tracing::debug!("Network {} already declared", name);
        }
        for service in self.services.iter_mut().filter(|s| to.contains(&s.name.as_str())) {
            service.networks.add(name.clone());
        }
        Ok(())
    }

    /// Remove a network and detach it from every service
    pub fn remove_network(&mut self, name: &str) -> Option<Network> {
        for service in self.services.iter_mut() {
            service.networks.delete(name);
        }
        self.networks.delete(name)
    }

    /// Add a service.
    ///
    /// References the service carries that do not resolve in this descriptor
    /// are dropped, and volumes named by its bindings are declared. Returns
    /// false when a service with the same name already exists.
    pub fn add_service(&mut self, mut service: Service) -> bool {
        if self.services.has(&service.name) {
            return false;
        }

        let networks = &self.networks;
        service.networks.retain(|name| networks.has(name));
        let secrets = &self.secrets;
        service.secrets.retain(|name| secrets.has(name));
        let services = &self.services;
        service.depends_on.retain(|name| services.has(name));
        if let Some(environment) = service.environment.as_mut() {
            let envs = &self.envs;
            environment.retain(|key| envs.has(key));
        }
        for binding in service.bindings.iter_mut() {
            if let Some(volume) = binding.take_volume() {
                let name = volume.name.clone();
                if self.volumes.add(volume) {
                    tracing::debug!("Declared volume {} for service {}", name, service.name);
                }
            }
        }

        self.services.add(service)
    }

    /// Remove a service and drop it from every depends-on list
    pub fn remove_service(&mut self, name: &str) -> Option<Service> {
        for service in self.services.iter_mut() {
            service.depends_on.delete(name);
        }
        self.services.delete(name)
    }

    /// Make `service` depend on `on`; both must be in the descriptor
    pub fn add_dependency(&mut self, service: &str, on: &str) -> Result<()> {
        self.ensure_services(&[service, on])?;
        if let Some(dependent) = self.services.get_mut(service) {
            dependent.depends_on.add(on.to_string());
        }
        Ok(())
    }

    /// Attach a binding to the given services, declaring its volume if needed
    pub fn add_binding(&mut self, mut binding: Binding, to: &[&str]) -> Result<()> {
        self.ensure_services(to)?;
        if let Some(volume) = binding.take_volume() {
            self.volumes.add(volume);
        }
        for service in self.services.iter_mut().filter(|s| to.contains(&s.name.as_str())) {
            service.bindings.add(binding.clone());
        }
        Ok(())
    }

    /// Detach a binding, by id, from one service
    pub fn remove_binding(&mut self, binding_id: &str, from: &str) -> Result<Option<Binding>> {
        let service = self
            .services
            .get_mut(from)
            .ok_or_else(|| ComposeError::ServiceNotFound(from.to_string()))?;
        Ok(service.bindings.delete(binding_id))
    }

    /// Remove a volume together with every binding that mounts it.
    ///
    /// A host-path binding whose path is exactly the volume name counts as
    /// mounting it too.
    pub fn remove_volume(&mut self, name: &str) -> Option<Volume> {
        for service in self.services.iter_mut() {
            service.bindings.retain(|binding| match &binding.source {
                BindSource::Volume(source) | BindSource::Path(source) => source != name,
            });
        }
        self.volumes.delete(name)
    }

    /// Add a secret and grant it to the given services
    pub fn add_secret(&mut self, secret: Secret, to: &[&str]) -> Result<()> {
        self.ensure_services(to)?;
        let name = secret.name.clone();
        self.secrets.add(secret);
        for service in self.services.iter_mut().filter(|s| to.contains(&s.name.as_str())) {
            service.secrets.add(name.clone());
        }
        Ok(())
    }

    /// Remove a secret and revoke it from every service
    pub fn remove_secret(&mut self, name: &str) -> Option<Secret> {
        for service in self.services.iter_mut() {
            service.secrets.delete(name);
        }
        self.secrets.delete(name)
    }

    /// Add an environment entry and reference it from the given services.
    ///
    /// When the key is already declared the existing entry stays canonical.
    pub fn add_env(&mut self, env: Env, to: &[&str]) -> Result<()> {
        self.ensure_services(to)?;
        let key = env.key.clone();
        self.envs.add(env);
        for service in self.services.iter_mut().filter(|s| to.contains(&s.name.as_str())) {
            service.attach_env(&key);
        }
        Ok(())
    }

    /// Remove an environment entry from the descriptor and every service
    pub fn remove_env(&mut self, key: &str) -> Option<Env> {
        for service in self.services.iter_mut() {
            if let Some(environment) = service.environment.as_mut() {
                environment.delete(key);
            }
        }
        self.envs.delete(key)
    }

    /// Networks attached to a service
    pub fn networks_of(&self, service: &str) -> Vec<&Network> {
        self.resolve(service, |s| s.networks(), &self.networks)
    }

    /// Secrets granted to a service
    pub fn secrets_of(&self, service: &str) -> Vec<&Secret> {
        self.resolve(service, |s| s.secrets(), &self.secrets)
    }

    /// Services a service depends on
    pub fn dependencies_of(&self, service: &str) -> Vec<&Service> {
        self.resolve(service, |s| s.depends_on(), &self.services)
    }

    /// Environment entries referenced by a service
    pub fn envs_of(&self, service: &str) -> Vec<&Env> {
        match self.services.get(service).and_then(|s| s.environment()) {
            Some(keys) => keys.iter().filter_map(|key| self.envs.get(key)).collect(),
            None => Vec::new(),
        }
    }

    /// Volumes mounted by a service
    pub fn volumes_of(&self, service: &str) -> Vec<&Volume> {
        match self.services.get(service) {
            Some(s) => s
                .bindings()
                .iter()
                .filter_map(|b| b.volume_name())
                .filter_map(|name| self.volumes.get(name))
                .collect(),
            None => Vec::new(),
        }
    }

    fn resolve<'a, T, F>(&'a self, service: &str, refs: F, set: &'a EntitySet<T>) -> Vec<&'a T>
    where
        T: Entity,
        F: Fn(&'a Service) -> &'a EntitySet<String>,
    {
        match self.services.get(service) {
            Some(s) => refs(s).iter().filter_map(|name| set.get(name)).collect(),
            None => Vec::new(),
        }
    }

    /// SHA-256 fingerprint of the canonical encoding
    pub fn hash(&self) -> Result<String> {
        let text = serde_yaml::to_string(self)?;
        Ok(hex::encode(Sha256::digest(text.as_bytes())))
    }

    /// Structural equality through [`Compose::hash`]
    pub fn equal(&self, other: &Compose) -> Result<bool> {
        Ok(self.hash()? == other.hash()?)
    }
}

impl Serialize for Compose {
    /// Serializes the canonical tree produced by [`Translator::encode`]
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        Translator::encode(self).serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::network::NetworkDriver;
    use crate::compose::service::Image;
    use crate::compose::volume::VolumeDriver;
    use serde_yaml::Value;

    fn with_services(names: &[&str]) -> Compose {
        let mut compose = Compose::new();
        for name in names {
            compose.add_service(Service::new(name));
        }
        compose
    }

    #[test]
    fn test_add_network_twice_keeps_one() {
        let mut compose = Compose::new();
        compose.add_network(Network::new("test-network"), &[]).unwrap();
        compose.add_network(Network::new("test-network"), &[]).unwrap();
        assert_eq!(compose.networks().len(), 1);

        compose.remove_network("test-network");
        assert!(compose.networks().is_empty());
    }

    #[test]
    fn test_remove_network_cascades() {
        let mut compose = with_services(&["s1", "s2"]);
        compose.add_network(Network::new("front"), &["s1"]).unwrap();

        assert!(compose.service("s1").unwrap().networks().has("front"));
        assert!(!compose.service("s2").unwrap().networks().has("front"));

        compose.remove_network("front");
        assert!(!compose.service("s1").unwrap().networks().has("front"));
        assert!(compose.network("front").is_none());
    }

    #[test]
    fn test_add_network_to_unknown_service_changes_nothing() {
        let mut compose = with_services(&["s1"]);
        let result = compose.add_network(Network::new("front"), &["s1", "ghost"]);
        assert!(matches!(result, Err(ComposeError::ServiceNotFound(name)) if name == "ghost"));
        assert!(compose.networks().is_empty());
        assert!(compose.service("s1").unwrap().networks().is_empty());
    }

    #[test]
    fn test_network_edits_are_shared() {
        let mut compose = with_services(&["s1"]);
        compose.add_network(Network::new("front"), &["s1"]).unwrap();
        compose.network_mut("front").unwrap().driver = NetworkDriver::Macvlan;

        let attached = compose.networks_of("s1");
        assert_eq!(attached.len(), 1);
        assert_eq!(attached[0].driver, NetworkDriver::Macvlan);
    }

    #[test]
    fn test_remove_service_strips_dependencies() {
        let mut compose = with_services(&["serv1", "serv2"]);
        compose.add_dependency("serv1", "serv2").unwrap();
        assert_eq!(compose.service("serv1").unwrap().depends_on().len(), 1);
        assert_eq!(compose.dependencies_of("serv1")[0].name, "serv2");

        compose.remove_service("serv2");
        assert!(compose.service("serv1").unwrap().depends_on().is_empty());
        assert!(compose.add_dependency("serv1", "serv2").is_err());
    }

    #[test]
    fn test_readded_service_drops_dangling_references() {
        let mut compose = with_services(&["web"]);
        compose.add_network(Network::new("front"), &["web"]).unwrap();
        let web = compose.remove_service("web").unwrap();
        compose.remove_network("front");

        assert!(compose.add_service(web));
        assert!(compose.service("web").unwrap().networks().is_empty());
    }

    #[test]
    fn test_binding_and_volume_cascade() {
        let mut compose = with_services(&["test-service"]);
        let volume = Volume::new("volume");
        let binding = Binding::volume(&volume, "/conf");
        let binding_id = binding.id.clone();

        compose.add_binding(binding, &["test-service"]).unwrap();
        assert!(compose.service("test-service").unwrap().bindings().has(&binding_id));
        assert!(compose.volume("volume").is_some());

        compose.remove_volume("volume");
        assert!(!compose.service("test-service").unwrap().bindings().has(&binding_id));
        assert!(compose.volume("volume").is_none());
    }

    #[test]
    fn test_add_binding_adopts_the_bound_volume() {
        let mut compose = with_services(&["db"]);
        let volume = Volume::new("data").driver(VolumeDriver::Zfs).external(true);
        compose
            .add_binding(Binding::volume(&volume, "/var/lib/data"), &["db"])
            .unwrap();

        let stored = compose.volume("data").unwrap();
        assert_eq!(stored.driver, VolumeDriver::Zfs);
        assert!(stored.external);

        let tree = Translator::encode(&compose);
        assert_eq!(tree["volumes"]["data"]["driver"], Value::from("zfs"));
        assert_eq!(tree["volumes"]["data"]["external"], Value::Bool(true));

        let decoded = Translator::decode(&tree).unwrap();
        assert_eq!(decoded.service("db").unwrap().bindings().len(), 1);
        assert!(decoded.volume("data").unwrap().external);
    }

    #[test]
    fn test_add_binding_keeps_an_existing_volume() {
        let mut compose = with_services(&["db"]);
        let labelled = Volume::new("data").label("backup", "daily");
        compose
            .add_binding(Binding::volume(&labelled, "/a"), &[])
            .unwrap();
        compose
            .add_binding(Binding::volume(&Volume::new("data"), "/b"), &["db"])
            .unwrap();

        assert_eq!(compose.volumes().len(), 1);
        assert_eq!(compose.volume("data").unwrap().labels.len(), 1);
    }

    #[test]
    fn test_add_service_adopts_volumes_of_its_bindings() {
        let mut compose = Compose::new();
        let mut service = Service::new("db");
        service.bindings.add(Binding::volume(
            &Volume::new("data").driver_opt("type", "nfs"),
            "/var/lib/data",
        ));
        assert!(compose.add_service(service));

        let stored = compose.volume("data").unwrap();
        assert_eq!(stored.driver_opts.len(), 1);
        assert_eq!(compose.volumes_of("db").len(), 1);
    }

    #[test]
    fn test_simple_volume_binding_is_lost_through_encoding() {
        let mut compose = with_services(&["db"]);
        compose
            .add_binding(Binding::volume(&Volume::new("data"), "/var/lib/data"), &["db"])
            .unwrap();
        assert_eq!(compose.service("db").unwrap().bindings().len(), 1);

        let tree = Translator::encode(&compose);
        assert!(tree.get("volumes").is_none());

        let decoded = Translator::decode(&tree).unwrap();
        assert!(decoded.service("db").unwrap().bindings().is_empty());
        assert!(decoded.volumes().is_empty());
    }

    #[test]
    fn test_serializes_as_canonical_tree() {
        let mut compose = with_services(&["web"]);
        compose.add_network(Network::new("front"), &["web"]).unwrap();

        let text = serde_yaml::to_string(&compose).unwrap();
        let tree: Value = serde_yaml::from_str(&text).unwrap();
        assert_eq!(tree, Translator::encode(&compose));
        assert!(!text.contains("net_"));
    }

    #[test]
    fn test_remove_volume_keeps_unrelated_bindings() {
        let mut compose = with_services(&["db"]);
        compose
            .add_binding(Binding::path("./data", "/var/lib/data"), &["db"])
            .unwrap();
        compose
            .add_binding(Binding::path("cache", "/cache"), &["db"])
            .unwrap();
        compose.add_binding(Binding::volume(&Volume::new("cache"), "/c2"), &["db"]).unwrap();

        compose.remove_volume("cache");
        let bindings = compose.service("db").unwrap().bindings();
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings.iter().next().unwrap().to_string(), "./data:/var/lib/data");
    }

    #[test]
    fn test_remove_binding() {
        let mut compose = with_services(&["web"]);
        let binding = Binding::path("./site", "/usr/share/nginx/html");
        let id = binding.id.clone();
        compose.add_binding(binding, &["web"]).unwrap();

        assert!(compose.remove_binding(&id, "web").unwrap().is_some());
        assert!(compose.service("web").unwrap().bindings().is_empty());
        assert!(compose.remove_binding(&id, "ghost").is_err());
    }

    #[test]
    fn test_secret_cascade() {
        let mut compose = with_services(&["test-service"]);
        compose
            .add_secret(Secret::new("secret"), &["test-service"])
            .unwrap();

        assert!(compose.service("test-service").unwrap().secrets().has("secret"));
        assert!(compose.secret("secret").is_some());

        compose.remove_secret("secret");
        assert!(!compose.service("test-service").unwrap().secrets().has("secret"));
        assert!(compose.secret("secret").is_none());
    }

    #[test]
    fn test_env_is_shared_and_cascades() {
        let mut compose = with_services(&["api", "worker"]);
        compose
            .add_env(Env::new("DATABASE_URL", Some("postgres://db")), &["api", "worker"])
            .unwrap();

        compose.env_mut("DATABASE_URL").unwrap().value = Some("postgres://replica".to_string());
        for service in ["api", "worker"] {
            let envs = compose.envs_of(service);
            assert_eq!(envs.len(), 1);
            assert_eq!(envs[0].value.as_deref(), Some("postgres://replica"));
        }

        compose.remove_env("DATABASE_URL");
        assert!(compose.envs().is_empty());
        assert!(compose.service("api").unwrap().environment().unwrap().is_empty());
    }

    #[test]
    fn test_hash_is_stable_and_structural() {
        let build = || {
            let mut compose = Compose::new().with_name("shop");
            compose.add_service(Service::new("serv1"));
            compose.add_service(
                Service::builder("serv2")
                    .image(Image::new("nginx"))
                    .build()
                    .unwrap(),
            );
            compose
        };

        let first = build();
        let second = build();
        assert_eq!(first.hash().unwrap(), first.hash().unwrap());
        assert!(first.equal(&second).unwrap());

        let mut changed = build();
        changed.service_mut("serv1").unwrap().hostname = Some("one".to_string());
        assert!(!first.equal(&changed).unwrap());
        assert_eq!(first.hash().unwrap().len(), 64);
    }

    #[test]
    fn test_version_parse() {
        let version = ComposeVersion::parse("3.8").unwrap();
        assert!(version.is_known());
        assert_eq!(version.to_string(), "3.8");

        let odd = ComposeVersion::parse("3.99").unwrap();
        assert!(!odd.is_known());
        assert!(ComposeVersion::parse("latest").is_none());
        assert!(ComposeVersion::parse("0").is_none());
    }
}
