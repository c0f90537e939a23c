use sha2::{Digest, Sha256};

/// Namespace prefix every cache key lives under (§4.6), distinct from the
/// knowledge store's own namespace so the two can share a Redis instance
/// without key collisions.
const PREFIX: &str = "intel:cache:";

/// `"intel:cache:" + sha256(text + ":" + depth_as_string)` (§4.6).
pub fn cache_key(text: &str, depth_as_string: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hasher.update(b":");
    hasher.update(depth_as_string.as_bytes());
    format!("{PREFIX}{:x}", hasher.finalize())
}

/// The glob `clear_all` scans for.
pub fn scan_pattern() -> &'static str {
    "intel:cache:*"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_deterministic_and_namespaced() {
        let a = cache_key("rust async runtimes", "standard");
        let b = cache_key("rust async runtimes", "standard");
        assert_eq!(a, b);
        assert!(a.starts_with("intel:cache:"));
    }

    #[test]
    fn different_depth_yields_different_key() {
        let shallow = cache_key("rust async runtimes", "shallow");
        let standard = cache_key("rust async runtimes", "standard");
        assert_ne!(shallow, standard);
    }
}
