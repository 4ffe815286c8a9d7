//! Attribute-value pairs and environment entries

use super::entity_set::Entity;
use super::id;

/// Named, optionally valued setting.
///
/// Used for labels, build arguments and driver options. Every pair carries its
/// own identity: two pairs with the same key and value are still distinct.
#[derive(Debug, Clone)]
pub struct KeyValue {
    /// Instance id
    pub id: String,
    /// Key
    pub key: String,
    /// Value
    pub value: Option<String>,
}

impl KeyValue {
    /// Create a new pair
    pub fn new(key: &str, value: Option<&str>) -> Self {
        Self {
            id: id::generate(id::KEY_VALUE),
            key: key.to_string(),
            value: value.map(str::to_string),
        }
    }

    /// Parse `KEY=VALUE` or a bare `KEY`, splitting on the first `=`
    pub fn parse(raw: &str) -> Self {
        match raw.split_once('=') {
            Some((key, value)) => Self::new(key, Some(value)),
            None => Self::new(raw, None),
        }
    }
}

impl PartialEq for KeyValue {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for KeyValue {}

impl Entity for KeyValue {
    fn key(&self) -> &str {
        &self.id
    }
}

impl std::fmt::Display for KeyValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}={}", self.key, value),
            None => write!(f, "{}", self.key),
        }
    }
}

/// Environment entry.
///
/// Unlike [`KeyValue`], entries are deduplicated by key inside a descriptor so
/// that every service declaring a variable shares one canonical entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Env {
    /// Instance id
    pub id: String,
    /// Variable name
    pub key: String,
    /// Variable value
    pub value: Option<String>,
}

impl Env {
    /// Create a new environment entry
    pub fn new(key: &str, value: Option<&str>) -> Self {
        Self {
            id: id::generate(id::ENV),
            key: key.to_string(),
            value: value.map(str::to_string),
        }
    }

    /// Parse `KEY=VALUE` or a bare `KEY`, splitting on the first `=`
    pub fn parse(raw: &str) -> Self {
        match raw.split_once('=') {
            Some((key, value)) => Self::new(key, Some(value)),
            None => Self::new(raw, None),
        }
    }
}

impl Entity for Env {
    fn key(&self) -> &str {
        &self.key
    }
}

impl std::fmt::Display for Env {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}={}", self.key, value),
            None => write!(f, "{}", self.key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commons::EntitySet;

    #[test]
    fn test_key_value_identity() {
        let a = KeyValue::new("tier", Some("web"));
        let b = KeyValue::new("tier", Some("web"));
        assert_ne!(a, b);
        assert_eq!(a, a.clone());

        let mut set = EntitySet::new();
        set.add(a);
        set.add(b);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_parse_splits_on_first_equals() {
        let kv = KeyValue::parse("FLASK_SERVER_ADDR=backend:9091=x");
        assert_eq!(kv.key, "FLASK_SERVER_ADDR");
        assert_eq!(kv.value.as_deref(), Some("backend:9091=x"));

        let bare = KeyValue::parse("DEBUG");
        assert_eq!(bare.key, "DEBUG");
        assert!(bare.value.is_none());
        assert_eq!(bare.to_string(), "DEBUG");
    }

    #[test]
    fn test_env_dedup_by_key() {
        let mut set = EntitySet::new();
        assert!(set.add(Env::new("FOO", Some("bar"))));
        assert!(!set.add(Env::new("FOO", Some("baz"))));
        assert_eq!(set.get("FOO").unwrap().value.as_deref(), Some("bar"));
        assert!(set.get("FOO").unwrap().id.starts_with("env_"));
    }

    #[test]
    fn test_env_display() {
        assert_eq!(Env::parse("PORT=8000").to_string(), "PORT=8000");
        assert_eq!(Env::parse("EMPTY=").to_string(), "EMPTY=");
        assert_eq!(Env::parse("FLAG").to_string(), "FLAG");
    }
}
