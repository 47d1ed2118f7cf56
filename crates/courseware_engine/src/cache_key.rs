use sha2::{Digest, Sha256};

/// Deterministic, filesystem-safe key for a request URL: lowercase hex SHA-256.
pub fn cache_key(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest.iter() {
        use std::fmt::Write;
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}

#[cfg(test)]
mod tests {
    use super::cache_key;

    #[test]
    fn key_is_stable_and_distinct() {
        let a = cache_key("https://lms.example/app.js");
        assert_eq!(a, cache_key("https://lms.example/app.js"));
        assert_ne!(a, cache_key("https://lms.example/app.css"));
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
