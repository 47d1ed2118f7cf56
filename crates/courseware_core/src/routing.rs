use url::Url;

/// Paths stored into the static generation at install time.
pub const PRECACHE_PATHS: &[&str] = &["/", "/manifest.json"];

/// Cached document served when the network is unreachable.
pub const FALLBACK_DOCUMENT: &str = "/";

pub const STATIC_CACHE_PREFIX: &str = "courseware-static-";

const DEFAULT_NO_CACHE_PATTERNS: &[&str] = &[
    "/api/",
    "localhost:8080",
    "/auth/",
    "/login",
    "/admin",
    "/empleado",
    "/instructor",
];

const DEFAULT_STATIC_EXTENSIONS: &[&str] = &[".js", ".css", ".png", ".jpg", ".svg", ".ico"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Always go to the network; the cache is never read or written.
    Bypass,
    /// Serve a cached copy when present, otherwise fetch and store.
    CacheFirst,
    /// Fetch first, fall back to the cached root document.
    NetworkFirst,
}

/// Ordered request classification rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingRules {
    no_cache_patterns: Vec<String>,
    static_extensions: Vec<String>,
}

impl Default for RoutingRules {
    fn default() -> Self {
        Self {
            no_cache_patterns: DEFAULT_NO_CACHE_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
            static_extensions: DEFAULT_STATIC_EXTENSIONS
                .iter()
                .map(|e| e.to_string())
                .collect(),
        }
    }
}

impl RoutingRules {
    /// Adds the remote backend's host to the bypass list.
    pub fn with_backend_host(mut self, host: impl Into<String>) -> Self {
        let host = host.into();
        if !host.is_empty() && !self.no_cache_patterns.contains(&host) {
            self.no_cache_patterns.push(host);
        }
        self
    }

    pub fn no_cache_patterns(&self) -> &[String] {
        &self.no_cache_patterns
    }

    pub fn classify(&self, url: &str) -> CachePolicy {
        if self
            .no_cache_patterns
            .iter()
            .any(|pattern| url.contains(pattern.as_str()))
        {
            return CachePolicy::Bypass;
        }
        let path = url_path(url).to_ascii_lowercase();
        if self
            .static_extensions
            .iter()
            .any(|ext| path.ends_with(ext.as_str()))
        {
            CachePolicy::CacheFirst
        } else {
            CachePolicy::NetworkFirst
        }
    }
}

fn url_path(raw: &str) -> String {
    if let Ok(parsed) = Url::parse(raw) {
        return parsed.path().to_string();
    }
    // Relative reference: drop query and fragment by hand.
    let end = raw.find(|c: char| c == '?' || c == '#').unwrap_or(raw.len());
    raw[..end].to_string()
}

/// Cache generation naming; exactly one name is current.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheGenerations {
    current: String,
}

impl CacheGenerations {
    pub fn for_version(version: &str) -> Self {
        Self {
            current: format!("{STATIC_CACHE_PREFIX}{version}"),
        }
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    /// Every existing generation other than the current one.
    pub fn stale<'a, I>(&self, existing: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        existing
            .into_iter()
            .filter(|name| **name != self.current)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_path_strips_query_and_fragment() {
        assert_eq!(url_path("/app.js?v=3#x"), "/app.js");
        assert_eq!(url_path("https://a.example/b/c.css?x"), "/b/c.css");
    }
}
