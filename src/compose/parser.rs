//! Compose file reading and writing

use super::Compose;
use crate::error::{ComposeError, Result};
use crate::translator::Translator;
use serde_yaml::Value;
use std::path::{Path, PathBuf};

/// Default compose file names
pub const DEFAULT_COMPOSE_FILES: &[&str] = &[
    "compose.yaml",
    "compose.yml",
    "docker-compose.yaml",
    "docker-compose.yml",
];

/// Compose file parser
pub struct ComposeParser;

impl ComposeParser {
    /// Find compose file in directory
    pub fn find_compose_file(dir: &Path) -> Option<PathBuf> {
        DEFAULT_COMPOSE_FILES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.exists())
    }

    /// Parse compose file from path
    pub fn parse_file(path: &Path) -> Result<Compose> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ComposeError::Parse(format!("Failed to read {}: {}", path.display(), e))
        })?;

        tracing::debug!("Parsing {}", path.display());
        Self::parse_str(&content)
    }

    /// Parse compose text. JSON is a subset of YAML, so both are accepted.
    pub fn parse_str(content: &str) -> Result<Compose> {
        let tree: Value = serde_yaml::from_str(content)
            .map_err(|e| ComposeError::Parse(format!("Failed to parse YAML: {}", e)))?;
        Translator::decode(&tree)
    }

    /// Canonical YAML text
    pub fn to_yaml(compose: &Compose) -> Result<String> {
        Ok(serde_yaml::to_string(compose)?)
    }

    /// Canonical JSON text
    pub fn to_json(compose: &Compose) -> Result<String> {
        Ok(serde_json::to_string_pretty(compose)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_parse_simple_compose() {
        let yaml = r#"
version: "3.8"
services:
  web:
    image: nginx:latest
    ports:
      - "80:80"
  db:
    image: postgres:13
    environment:
      POSTGRES_PASSWORD: secret
"#;

        let compose = ComposeParser::parse_str(yaml).unwrap();
        assert_eq!(compose.services().len(), 2);
        assert!(compose.service("web").is_some());
        assert!(compose.service("db").is_some());
        assert_eq!(compose.version.as_ref().unwrap().as_str(), "3.8");
    }

    #[test]
    fn test_parse_json() {
        let json = r#"{"services": {"web": {"image": "nginx", "ports": ["8080:80"]}}}"#;
        let compose = ComposeParser::parse_str(json).unwrap();
        assert_eq!(compose.service("web").unwrap().ports[0].host_port, 8080);
    }

    #[test]
    fn test_parse_invalid_text() {
        let result = ComposeParser::parse_str("services: [unclosed");
        assert!(matches!(result, Err(ComposeError::Parse(_))));
    }

    #[test]
    fn test_find_compose_file_prefers_compose_yaml() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ComposeParser::find_compose_file(dir.path()).is_none());

        fs::write(dir.path().join("docker-compose.yml"), "services: {}").unwrap();
        fs::write(dir.path().join("compose.yaml"), "services: {}").unwrap();

        let found = ComposeParser::find_compose_file(dir.path()).unwrap();
        assert_eq!(found.file_name().unwrap(), "compose.yaml");
    }

    #[test]
    fn test_parse_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("compose.yml");
        fs::write(&path, "name: demo\nservices:\n  app:\n    image: alpine\n").unwrap();

        let compose = ComposeParser::parse_file(&path).unwrap();
        assert_eq!(compose.name.as_deref(), Some("demo"));

        let missing = ComposeParser::parse_file(&dir.path().join("nope.yml"));
        assert!(matches!(missing, Err(ComposeError::Parse(_))));
    }

    #[test]
    fn test_output_formats() {
        let compose = ComposeParser::parse_str("services: {app: {image: 'alpine:3'}}").unwrap();

        let yaml = ComposeParser::to_yaml(&compose).unwrap();
        assert_eq!(yaml, "services:\n  app:\n    image: alpine:3\n");

        let json: serde_json::Value =
            serde_json::from_str(&ComposeParser::to_json(&compose).unwrap()).unwrap();
        assert_eq!(json["services"]["app"]["image"], "alpine:3");
    }
}
