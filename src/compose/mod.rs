//! Compose descriptor entity graph
//!
//! A [`Compose`] descriptor owns its networks, volumes, secrets, environment
//! entries and services. Services refer to the others by name, and the
//! descriptor keeps those references consistent as entities come and go.

pub mod descriptor;
pub mod network;
pub mod parser;
pub mod secret;
pub mod service;
pub mod volume;

pub use descriptor::{Compose, ComposeVersion, KNOWN_VERSIONS};
pub use network::{Network, NetworkDriver};
pub use parser::{ComposeParser, DEFAULT_COMPOSE_FILES};
pub use secret::{Secret, SecretOptions, SecretSource};
pub use service::{Service, ServiceBuilder};
pub use volume::{AccessMode, BindSource, Binding, BindingKind, Volume, VolumeDriver};
