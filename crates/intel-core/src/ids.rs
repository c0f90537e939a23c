//! Identifier helpers (C1).
//!
//! Every id in this workspace is an opaque string — callers never parse
//! structure out of one, so a `Uuid` rendered as a hyphenated string is
//! sufficient everywhere an id is needed.

use uuid::Uuid;

/// Generates a fresh opaque identifier, e.g. for `query_id` or `event_id`.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a correlation id in the `req-<random>` shape used when a caller
/// doesn't supply one (§3 Query.correlation_id).
pub fn correlation_id() -> String {
    format!("req-{}", Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_id_is_unique() {
        assert_ne!(new_id(), new_id());
    }

    #[test]
    fn correlation_id_has_prefix() {
        let id = correlation_id();
        assert!(id.starts_with("req-"));
        assert_eq!(id.len(), "req-".len() + 32);
    }
}
