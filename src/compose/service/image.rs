//! Image references

/// Tag used when a reference does not name one
pub const DEFAULT_TAG: &str = "latest";

/// Image reference, `name[:tag]` or `name@digest`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    /// Repository name, including registry and namespace
    pub name: String,
    /// Tag
    pub tag: String,
    /// Content digest, takes precedence over the tag when set
    pub digest: Option<String>,
}

impl Image {
    /// Create a reference to `name:latest`
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            tag: DEFAULT_TAG.to_string(),
            digest: None,
        }
    }

    /// Set tag
    pub fn tag(mut self, tag: &str) -> Self {
        self.tag = tag.to_string();
        self
    }

    /// Parse a reference.
    ///
    /// The tag is whatever follows the last `:`, unless that part contains a
    /// `/`, in which case the colon belonged to a registry port.
    pub fn parse(reference: &str) -> Self {
        if let Some((name, digest)) = reference.split_once('@') {
            return Self {
                digest: Some(digest.to_string()),
                ..Self::new(name)
            };
        }

        match reference.rsplit_once(':') {
            Some((name, tag)) if !tag.contains('/') && !tag.is_empty() => Self::new(name).tag(tag),
            Some((name, tag)) if tag.is_empty() => Self::new(name),
            _ => Self::new(reference),
        }
    }
}

impl std::fmt::Display for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.digest {
            Some(digest) => write!(f, "{}@{}", self.name, digest),
            None => write!(f, "{}:{}", self.name, self.tag),
        }
    }
}

/// Image pull policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullPolicy {
    /// Always pull
    Always,
    /// Never pull
    Never,
    /// Pull when missing locally
    Missing,
    /// Build instead of pulling
    Build,
}

impl PullPolicy {
    /// Parse a pull policy keyword
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "always" => Some(PullPolicy::Always),
            "never" => Some(PullPolicy::Never),
            "missing" | "if_not_present" => Some(PullPolicy::Missing),
            "build" => Some(PullPolicy::Build),
            _ => None,
        }
    }
}

impl std::fmt::Display for PullPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PullPolicy::Always => write!(f, "always"),
            PullPolicy::Never => write!(f, "never"),
            PullPolicy::Missing => write!(f, "missing"),
            PullPolicy::Build => write!(f, "build"),
        }
    }
}
