//! Volumes and bind mounts

use crate::commons::{id, Entity, KeyValue};

/// Volume driver types
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum VolumeDriver {
    /// Local filesystem driver
    #[default]
    Local,
    /// OverlayFS
    Overlay2,
    /// FUSE OverlayFS
    FuseOverlayfs,
    /// Btrfs
    Btrfs,
    /// ZFS
    Zfs,
    /// VFS
    Vfs,
    /// Third-party driver
    Custom(String),
}

impl From<&str> for VolumeDriver {
    fn from(s: &str) -> Self {
        match s {
            "local" => VolumeDriver::Local,
            "overlay2" => VolumeDriver::Overlay2,
            "fuse-overlayfs" => VolumeDriver::FuseOverlayfs,
            "btrfs" => VolumeDriver::Btrfs,
            "zfs" => VolumeDriver::Zfs,
            "vfs" => VolumeDriver::Vfs,
            other => VolumeDriver::Custom(other.to_string()),
        }
    }
}

impl std::fmt::Display for VolumeDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VolumeDriver::Local => write!(f, "local"),
            VolumeDriver::Overlay2 => write!(f, "overlay2"),
            VolumeDriver::FuseOverlayfs => write!(f, "fuse-overlayfs"),
            VolumeDriver::Btrfs => write!(f, "btrfs"),
            VolumeDriver::Zfs => write!(f, "zfs"),
            VolumeDriver::Vfs => write!(f, "vfs"),
            VolumeDriver::Custom(name) => write!(f, "{}", name),
        }
    }
}

/// Named volume declared at the top level of a descriptor
#[derive(Debug, Clone)]
pub struct Volume {
    /// Volume ID
    pub id: String,
    /// Volume name
    pub name: String,
    /// Volume driver
    pub driver: VolumeDriver,
    /// Driver options
    pub driver_opts: Vec<KeyValue>,
    /// Volume labels
    pub labels: Vec<KeyValue>,
    /// Created outside of the descriptor
    pub external: bool,
}

impl Volume {
    /// Create a new volume
    pub fn new(name: &str) -> Self {
        Self {
            id: id::generate(id::VOLUME),
            name: name.to_string(),
            driver: VolumeDriver::default(),
            driver_opts: Vec::new(),
            labels: Vec::new(),
            external: false,
        }
    }

    /// Set driver
    pub fn driver(mut self, driver: VolumeDriver) -> Self {
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

    /// Set external
    pub fn external(mut self, external: bool) -> Self {
        self.external = external;
        self
    }

    /// A simple volume has nothing but a name and needs no top-level entry
    pub fn is_simple(&self) -> bool {
        self.driver == VolumeDriver::Local
            && self.driver_opts.is_empty()
            && self.labels.is_empty()
            && !self.external
    }
}

impl Entity for Volume {
    fn key(&self) -> &str {
        &self.name
    }
}

/// Mount access mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AccessMode {
    /// Read-write (default)
    #[default]
    ReadWrite,
    /// Read-only
    ReadOnly,
}

impl AccessMode {
    /// Parse a mount option list such as `ro`, `rw` or `ro,z`.
    ///
    /// Anything that does not ask for read-only access is read-write.
    pub fn parse(options: &str) -> Self {
        if options.split(',').any(|opt| opt.trim() == "ro") {
            AccessMode::ReadOnly
        } else {
            AccessMode::ReadWrite
        }
    }
}

impl std::fmt::Display for AccessMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccessMode::ReadWrite => write!(f, "rw"),
            AccessMode::ReadOnly => write!(f, "ro"),
        }
    }
}

/// Where a bind mount takes its data from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindSource {
    /// Host path
    Path(String),
    /// Reference to a descriptor volume, by name
    Volume(String),
}

impl BindSource {
    /// Raw source text as written in a mount specification
    pub fn as_str(&self) -> &str {
        match self {
            BindSource::Path(path) => path,
            BindSource::Volume(name) => name,
        }
    }
}

/// Kind of bind mount, derived from its source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    /// Host path mounted into the container
    Local,
    /// Named volume mounted into the container
    NamedVolume,
}

/// Attachment of a path or named volume into a service container
#[derive(Debug, Clone)]
pub struct Binding {
    /// Binding ID
    pub id: String,
    /// Source path or volume
    pub source: BindSource,
    /// Target path inside the container
    pub target: Option<String>,
    /// Access mode
    pub mode: AccessMode,
    /// Volume declaration carried until the binding joins a descriptor
    declared: Option<Box<Volume>>,
}

impl Binding {
    /// Bind a host path
    pub fn path(source: &str, target: &str) -> Self {
        Self::with_source(BindSource::Path(source.to_string()), Some(target))
    }

    /// Bind a named volume.
    ///
    /// The volume travels with the binding so that a descriptor which does
    /// not declare it yet can adopt it with its driver and options intact.
    pub fn volume(volume: &Volume, target: &str) -> Self {
        let mut binding =
            Self::with_source(BindSource::Volume(volume.name.clone()), Some(target));
        binding.declared = Some(Box::new(volume.clone()));
        binding
    }

    /// Create a binding from an explicit source
    pub fn with_source(source: BindSource, target: Option<&str>) -> Self {
        Self {
            id: id::generate(id::BINDING),
            source,
            target: target.map(str::to_string),
            mode: AccessMode::default(),
            declared: None,
        }
    }

    /// Set access mode
    pub fn mode(mut self, mode: AccessMode) -> Self {
        self.mode = mode;
        self
    }

    /// Kind of this binding
    pub fn kind(&self) -> BindingKind {
        match self.source {
            BindSource::Path(_) => BindingKind::Local,
            BindSource::Volume(_) => BindingKind::NamedVolume,
        }
    }

    /// Name of the referenced volume, if any
    pub fn volume_name(&self) -> Option<&str> {
        match &self.source {
            BindSource::Volume(name) => Some(name),
            BindSource::Path(_) => None,
        }
    }

    /// Volume this binding needs declared, leaving only the name reference.
    ///
    /// Returns the volume given to [`Binding::volume`] the first time, a bare
    /// volume of the same name after that, and `None` for host paths.
    pub(crate) fn take_volume(&mut self) -> Option<Volume> {
        let name = self.volume_name()?.to_string();
        Some(
            self.declared
                .take()
                .map(|volume| *volume)
                .unwrap_or_else(|| Volume::new(&name)),
        )
    }
}

impl PartialEq for Binding {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Binding {}

impl Entity for Binding {
    fn key(&self) -> &str {
        &self.id
    }
}

impl std::fmt::Display for Binding {
    /// Short mount syntax: `source[:target][:ro]`
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.source.as_str())?;
        if let Some(target) = &self.target {
            write!(f, ":{}", target)?;
        }
        if self.mode == AccessMode::ReadOnly {
            write!(f, ":{}", self.mode)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_simplicity() {
        assert!(Volume::new("data").is_simple());
        assert!(!Volume::new("data").external(true).is_simple());
        assert!(!Volume::new("data").driver(VolumeDriver::Zfs).is_simple());
        assert!(!Volume::new("data").label("backup", "daily").is_simple());
        assert!(!Volume::new("data").driver_opt("type", "nfs").is_simple());
    }

    #[test]
    fn test_binding_kind_is_derived_from_source() {
        let volume = Volume::new("db_data");
        let named = Binding::volume(&volume, "/var/lib/postgresql/data");
        let local = Binding::path("./data", "/data");

        assert_eq!(named.kind(), BindingKind::NamedVolume);
        assert_eq!(named.volume_name(), Some("db_data"));
        assert_eq!(local.kind(), BindingKind::Local);
        assert_eq!(local.volume_name(), None);
    }

    #[test]
    fn test_binding_display() {
        let rw = Binding::path("./nginx.conf", "/etc/nginx/nginx.conf");
        assert_eq!(rw.to_string(), "./nginx.conf:/etc/nginx/nginx.conf");

        let ro = Binding::path("./nginx.conf", "/etc/nginx/nginx.conf").mode(AccessMode::ReadOnly);
        assert_eq!(ro.to_string(), "./nginx.conf:/etc/nginx/nginx.conf:ro");

        let anonymous = Binding::with_source(BindSource::Path("/node_modules".to_string()), None);
        assert_eq!(anonymous.to_string(), "/node_modules");

        let locked = Binding::with_source(BindSource::Path("/node_modules".to_string()), None)
            .mode(AccessMode::ReadOnly);
        assert_eq!(locked.to_string(), "/node_modules:ro");
    }

    #[test]
    fn test_volume_binding_carries_its_volume_once() {
        let volume = Volume::new("data").driver(VolumeDriver::Zfs).external(true);
        let mut binding = Binding::volume(&volume, "/var/lib/data");

        let declared = binding.take_volume().unwrap();
        assert_eq!(declared.driver, VolumeDriver::Zfs);
        assert!(declared.external);

        let again = binding.take_volume().unwrap();
        assert_eq!(again.name, "data");
        assert!(again.is_simple());

        assert!(Binding::path("./data", "/data").take_volume().is_none());
    }

    #[test]
    fn test_access_mode_parse() {
        assert_eq!(AccessMode::parse("ro"), AccessMode::ReadOnly);
        assert_eq!(AccessMode::parse("ro,z"), AccessMode::ReadOnly);
        assert_eq!(AccessMode::parse("rw"), AccessMode::ReadWrite);
        assert_eq!(AccessMode::parse("cached"), AccessMode::ReadWrite);
    }
}
