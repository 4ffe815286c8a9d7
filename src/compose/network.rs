//! Network entity

use crate::commons::{id, Entity, KeyValue};

/// Network driver types
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum NetworkDriver {
    /// Bridge network (default)
    #[default]
    Bridge,
    /// Host network
    Host,
    /// Overlay network (for Swarm)
    Overlay,
    /// IPvlan network
    Ipvlan,
    /// Macvlan network
    Macvlan,
    /// No networking
    None,
    /// Third-party driver
    Custom(String),
}

impl From<&str> for NetworkDriver {
    fn from(s: &str) -> Self {
        match s {
            "bridge" => NetworkDriver::Bridge,
            "host" => NetworkDriver::Host,
            "overlay" => NetworkDriver::Overlay,
            "ipvlan" => NetworkDriver::Ipvlan,
            "macvlan" => NetworkDriver::Macvlan,
            "none" => NetworkDriver::None,
            other => NetworkDriver::Custom(other.to_string()),
        }
    }
}

impl std::fmt::Display for NetworkDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NetworkDriver::Bridge => write!(f, "bridge"),
            NetworkDriver::Host => write!(f, "host"),
            NetworkDriver::Overlay => write!(f, "overlay"),
            NetworkDriver::Ipvlan => write!(f, "ipvlan"),
            NetworkDriver::Macvlan => write!(f, "macvlan"),
            NetworkDriver::None => write!(f, "none"),
            NetworkDriver::Custom(name) => write!(f, "{}", name),
        }
    }
}

/// Network declared at the top level of a descriptor
#[derive(Debug, Clone)]
pub struct Network {
    /// Network ID
    pub id: String,
    /// Network name
    pub name: String,
    /// Network driver
    pub driver: NetworkDriver,
    /// Driver options
    pub driver_opts: Vec<KeyValue>,
    /// Attachable by standalone containers
    pub attachable: bool,
    /// Created outside of the descriptor
    pub external: bool,
    /// Internal network (no external access)
    pub internal: bool,
    /// Network labels
    pub labels: Vec<KeyValue>,
}

impl Network {
    /// Create a new network with default settings
    pub fn new(name: &str) -> Self {
        Self {
            id: id::generate(id::NETWORK),
            name: name.to_string(),
            driver: NetworkDriver::default(),
            driver_opts: Vec::new(),
            attachable: false,
            external: false,
            internal: false,
            labels: Vec::new(),
        }
    }

    /// Set network driver
    pub fn driver(mut self, driver: NetworkDriver) -> Self {
        self.driver = driver;
        self
    }

    /// Add driver option
    pub fn driver_opt(mut self, key: &str, value: &str) -> Self {
        self.driver_opts.push(KeyValue::new(key, Some(value)));
        self
    }

    /// Add label
    pub fn label(mut self, key: &str, value: &str) -> Self {
        self.labels.push(KeyValue::new(key, Some(value)));
        self
    }

    /// Set attachable
    pub fn attachable(mut self, attachable: bool) -> Self {
        self.attachable = attachable;
        self
    }

    /// Set external
    pub fn external(mut self, external: bool) -> Self {
        self.external = external;
        self
    }

    /// Set internal
    pub fn internal(mut self, internal: bool) -> Self {
        self.internal = internal;
        self
    }
}

impl Entity for Network {
    fn key(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_defaults() {
        let network = Network::new("backend");
        assert_eq!(network.driver, NetworkDriver::Bridge);
        assert!(!network.attachable);
        assert!(!network.external);
        assert!(network.id.starts_with("net_"));
    }

    #[test]
    fn test_driver_round_trips_through_text() {
        for name in ["bridge", "host", "overlay", "ipvlan", "macvlan", "none", "weave"] {
            assert_eq!(NetworkDriver::from(name).to_string(), name);
        }
        assert_eq!(
            NetworkDriver::from("weave"),
            NetworkDriver::Custom("weave".to_string())
        );
    }
}
