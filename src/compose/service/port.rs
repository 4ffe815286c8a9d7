//! Port mappings

use crate::error::{ComposeError, Result};

/// Transport protocol
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Protocol {
    /// TCP (default)
    #[default]
    Tcp,
    /// UDP
    Udp,
}

impl std::str::FromStr for Protocol {
    type Err = ComposeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "tcp" => Ok(Protocol::Tcp),
            "udp" => Ok(Protocol::Udp),
            other => Err(ComposeError::InvalidArgument(format!(
                "unknown protocol '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::Tcp => write!(f, "tcp"),
            Protocol::Udp => write!(f, "udp"),
        }
    }
}

/// Published port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortMapping {
    /// Port inside the container
    pub container_port: u16,
    /// Port on the host
    pub host_port: u16,
    /// Host interface to bind to
    pub host_ip: Option<String>,
    /// Protocol, unset means the runtime default (tcp)
    pub protocol: Option<Protocol>,
}

impl PortMapping {
    /// Map a host port to a container port
    pub fn new(host_port: u16, container_port: u16) -> Self {
        Self {
            container_port,
            host_port,
            host_ip: None,
            protocol: None,
        }
    }

    /// Set host IP
    pub fn host_ip(mut self, host_ip: &str) -> Self {
        self.host_ip = Some(host_ip.to_string());
        self
    }

    /// Set protocol
    pub fn protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = Some(protocol);
        self
    }

    /// Parse the short syntax `[hostIp:]hostPort:containerPort[/protocol]`.
    ///
    /// A bare port publishes the same port number on the host.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let (ports, protocol) = match raw.rsplit_once('/') {
            Some((ports, protocol)) => (ports, Some(protocol.parse::<Protocol>()?)),
            None => (raw, None),
        };

        let mut segments = ports.rsplitn(3, ':');
        let container = segments.next().unwrap_or_default();
        let host = segments.next();
        let host_ip = segments.next();

        let container_port = parse_port(container, raw)?;
        let host_port = match host {
            Some(host) => parse_port(host, raw)?,
            None => container_port,
        };

        Ok(Self {
            container_port,
            host_port,
            host_ip: host_ip.map(str::to_string),
            protocol,
        })
    }
}

fn parse_port(segment: &str, raw: &str) -> Result<u16> {
    segment
        .parse()
        .map_err(|_| ComposeError::InvalidArgument(format!("invalid port mapping '{}'", raw)))
}

impl std::fmt::Display for PortMapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ip) = &self.host_ip {
            write!(f, "{}:", ip)?;
        }
        write!(f, "{}:{}", self.host_port, self.container_port)?;
        if let Some(protocol) = &self.protocol {
            write!(f, "/{}", protocol)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_udp_mapping() {
        let port = PortMapping::parse("5001:5000/udp").unwrap();
        assert_eq!(port.host_port, 5001);
        assert_eq!(port.container_port, 5000);
        assert_eq!(port.protocol, Some(Protocol::Udp));
    }

    #[test]
    fn test_parse_bare_port() {
        let port = PortMapping::parse("80").unwrap();
        assert_eq!(port.host_port, 80);
        assert_eq!(port.container_port, 80);
        assert_eq!(port.protocol, None);
        assert_eq!(port.host_ip, None);
    }

    #[test]
    fn test_parse_host_ip() {
        let port = PortMapping::parse("127.0.0.1:8080:80/tcp").unwrap();
        assert_eq!(port.host_ip.as_deref(), Some("127.0.0.1"));
        assert_eq!(port.host_port, 8080);
        assert_eq!(port.container_port, 80);
        assert_eq!(port.to_string(), "127.0.0.1:8080:80/tcp");
    }

    #[test]
    fn test_parse_invalid() {
        assert!(PortMapping::parse("3000-3005:3000-3005").is_err());
        assert!(PortMapping::parse("80/sctp").is_err());
        assert!(PortMapping::parse("127.0.0.1::80").is_err());
    }
}
