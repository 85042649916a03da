//! Client configuration.

use std::time::Duration;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default lifetime of cached reads.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Default number of cached entries.
pub const DEFAULT_CACHE_CAPACITY: u64 = 1_000;

/// Where the upstream services live and how reads are cached.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the REST backend, without trailing slash.
    pub api_url: String,
    /// Base URL of the recommendation service, without trailing slash.
    pub recommend_url: String,
    pub timeout: Duration,
    pub cache_ttl: Duration,
    pub cache_capacity: u64,
}

impl ClientConfig {
    /// Config with default timeout and cache settings.
    #[must_use]
    pub fn new(api_url: impl Into<String>, recommend_url: impl Into<String>) -> Self {
        Self {
            api_url: trim_base(api_url.into()),
            recommend_url: trim_base(recommend_url.into()),
            timeout: DEFAULT_TIMEOUT,
            cache_ttl: DEFAULT_CACHE_TTL,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }
}

fn trim_base(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slashes_trimmed() {
        let config = ClientConfig::new("http://api.local/api/", "http://rec.local//");
        assert_eq!(config.api_url, "http://api.local/api");
        assert_eq!(config.recommend_url, "http://rec.local");
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
    }
}
