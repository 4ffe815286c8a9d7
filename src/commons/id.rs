//! Opaque identifiers for entity instances

use uuid::Uuid;

/// Prefix for network ids
pub const NETWORK: &str = "net";
/// Prefix for volume ids
pub const VOLUME: &str = "vol";
/// Prefix for service ids
pub const SERVICE: &str = "ser";
/// Prefix for binding ids
pub const BINDING: &str = "bin";
/// Prefix for environment entry ids
pub const ENV: &str = "env";
/// Prefix for secret ids
pub const SECRET: &str = "sec";
/// Prefix for attribute-value pair ids
pub const KEY_VALUE: &str = "kv";

/// Generate a new identifier tagged with the entity kind.
///
/// Identifiers are only meant to tell instances apart; they never take part in
/// deduplication or in the encoded tree.
pub fn generate(kind: &str) -> String {
    format!("{}_{}", kind, Uuid::new_v4())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_prefixed_and_distinct() {
        let a = generate(NETWORK);
        let b = generate(NETWORK);
        assert!(a.starts_with("net_"));
        assert_ne!(a, b);
    }
}
