//! Secret entity

use crate::commons::{id, Entity};
use crate::error::{ComposeError, Result};

/// Where a secret's content comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretSource {
    /// Managed outside of the descriptor
    External,
    /// Read from a file
    File(String),
    /// Read from an environment variable
    Environment(String),
}

/// Raw secret settings, validated by [`Secret::try_new`]
#[derive(Debug, Clone, Default)]
pub struct SecretOptions {
    /// Secret name
    pub name: String,
    /// External flag
    pub external: Option<bool>,
    /// File path
    pub file: Option<String>,
    /// Environment variable name
    pub environment: Option<String>,
}

/// Secret declared at the top level of a descriptor
#[derive(Debug, Clone)]
pub struct Secret {
    /// Secret ID
    pub id: String,
    /// Secret name
    pub name: String,
    source: Option<SecretSource>,
}

impl Secret {
    /// Secret without a declared source
    pub fn new(name: &str) -> Self {
        Self {
            id: id::generate(id::SECRET),
            name: name.to_string(),
            source: None,
        }
    }

    /// Secret read from a file
    pub fn file(name: &str, path: &str) -> Self {
        Self {
            source: Some(SecretSource::File(path.to_string())),
            ..Self::new(name)
        }
    }

    /// Secret read from an environment variable
    pub fn environment(name: &str, variable: &str) -> Self {
        Self {
            source: Some(SecretSource::Environment(variable.to_string())),
            ..Self::new(name)
        }
    }

    /// Secret managed outside of the descriptor
    pub fn external(name: &str) -> Self {
        Self {
            source: Some(SecretSource::External),
            ..Self::new(name)
        }
    }

    /// Build a secret from raw settings.
    ///
    /// At most one of external, file and environment may be given; an
    /// `external: false` flag does not count as a source.
    pub fn try_new(options: SecretOptions) -> Result<Self> {
        let mut sources = Vec::new();
        if options.external == Some(true) {
            sources.push(SecretSource::External);
        }
        if let Some(file) = options.file {
            sources.push(SecretSource::File(file));
        }
        if let Some(variable) = options.environment {
            sources.push(SecretSource::Environment(variable));
        }

        if sources.len() > 1 {
            return Err(ComposeError::InvalidArgument(format!(
                "Secret '{}' must be either external, or have a file or be defined by an environment variable",
                options.name
            )));
        }

        Ok(Self {
            source: sources.pop(),
            ..Self::new(&options.name)
        })
    }

    /// Declared source
    pub fn source(&self) -> Option<&SecretSource> {
        self.source.as_ref()
    }
}

impl Entity for Secret {
    fn key(&self) -> &str {
        &self.name
    }
}
