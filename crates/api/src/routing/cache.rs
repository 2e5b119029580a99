//! In-memory site cache with TTL
//!
//! Caches the directory reads the resolver makes (candidate sites per host
//! and a summary of the whole directory). Matching against the request path
//! always runs on top of the cached candidates.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use hostcms_shared::Site;

/// Default cache TTL (5 minutes)
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Cache entry with expiration
#[derive(Clone)]
struct CacheEntry<T> {
    value: T,
    expires_at: Instant,
}

impl<T> CacheEntry<T> {
    fn new(value: T, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() > self.expires_at
    }
}

/// Directory-wide facts the single-site shortcut depends on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectorySummary {
    pub site_count: i64,
    /// Set when the directory holds exactly one site
    pub only_site: Option<Site>,
}

/// Thread-safe in-memory site cache
pub struct SiteCache {
    /// Maps canonical host -> sites registered at that host (empty when none)
    hosts: RwLock<HashMap<String, CacheEntry<Vec<Site>>>>,
    summary: RwLock<Option<CacheEntry<DirectorySummary>>>,
    ttl: Duration,
}

impl Default for SiteCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SiteCache {
    /// Create a new cache with default TTL
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_CACHE_TTL)
    }

    /// Create a new cache with custom TTL
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            hosts: RwLock::new(HashMap::new()),
            summary: RwLock::new(None),
            ttl,
        }
    }

    /// Cached candidates for a host, `None` if missing or expired
    pub fn get_host(&self, host: &str) -> Option<Vec<Site>> {
        let hosts = self.hosts.read().ok()?;
        let entry = hosts.get(host)?;

        if entry.is_expired() {
            None
        } else {
            Some(entry.value.clone())
        }
    }

    /// Cache the candidates for a host
    pub fn set_host(&self, host: &str, sites: Vec<Site>) {
        if let Ok(mut hosts) = self.hosts.write() {
            hosts.insert(host.to_string(), CacheEntry::new(sites, self.ttl));
        }
    }

    /// Cached directory summary
    pub fn get_summary(&self) -> Option<DirectorySummary> {
        let summary = self.summary.read().ok()?;
        summary
            .as_ref()
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.value.clone())
    }

    pub fn set_summary(&self, summary: DirectorySummary) {
        if let Ok(mut slot) = self.summary.write() {
            *slot = Some(CacheEntry::new(summary, self.ttl));
        }
    }

    /// Drop everything. Any site write can flip the single-site shortcut or
    /// move a site between hosts, so writers call this.
    pub fn clear(&self) {
        if let Ok(mut hosts) = self.hosts.write() {
            hosts.clear();
        }
        if let Ok(mut summary) = self.summary.write() {
            *summary = None;
        }
    }

    /// Clear expired entries (call periodically for memory management)
    pub fn cleanup(&self) {
        if let Ok(mut hosts) = self.hosts.write() {
            hosts.retain(|_, entry| !entry.is_expired());
        }
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        if let Ok(hosts) = self.hosts.read() {
            let total = hosts.len();
            let expired = hosts.values().filter(|e| e.is_expired()).count();
            CacheStats {
                total_entries: total,
                expired_entries: expired,
                active_entries: total - expired,
            }
        } else {
            CacheStats::default()
        }
    }
}

/// Cache statistics
#[derive(Default, Debug)]
pub struct CacheStats {
    pub total_entries: usize,
    pub expired_entries: usize,
    pub active_entries: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostcms_shared::SiteId;
    use std::thread::sleep;
    use time::OffsetDateTime;

    fn site(identifier: &str) -> Site {
        let now = OffsetDateTime::now_utc();
        Site {
            id: SiteId::new(),
            identifier: identifier.to_string(),
            hostname: "test.example".to_string(),
            path: String::new(),
            label: identifier.to_string(),
            is_mirrored: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_cache_get_set() {
        let cache = SiteCache::new();
        let s = site("a");

        assert!(cache.get_host("test.example").is_none());

        cache.set_host("test.example", vec![s.clone()]);
        assert_eq!(cache.get_host("test.example"), Some(vec![s]));
    }

    #[test]
    fn test_cache_negative() {
        let cache = SiteCache::new();

        // Cache a negative result (no site at this host)
        cache.set_host("unknown.example", Vec::new());
        assert_eq!(cache.get_host("unknown.example"), Some(Vec::new()));
    }

    #[test]
    fn test_cache_expiration() {
        let cache = SiteCache::with_ttl(Duration::from_millis(50));

        cache.set_host("test.example", vec![site("a")]);
        cache.set_summary(DirectorySummary {
            site_count: 2,
            only_site: None,
        });
        assert!(cache.get_host("test.example").is_some());
        assert_eq!(cache.get_summary().map(|s| s.site_count), Some(2));

        // Wait for expiration
        sleep(Duration::from_millis(60));
        assert!(cache.get_host("test.example").is_none());
        assert!(cache.get_summary().is_none());
        assert_eq!(cache.stats().expired_entries, 1);

        cache.cleanup();
        assert_eq!(cache.stats().total_entries, 0);
    }

    #[test]
    fn test_cache_clear() {
        let cache = SiteCache::new();
        let a = site("a");
        cache.set_host("a.example", vec![a.clone()]);
        cache.set_summary(DirectorySummary {
            site_count: 1,
            only_site: Some(a),
        });

        cache.clear();

        assert!(cache.get_host("a.example").is_none());
        assert!(cache.get_summary().is_none());
    }
}
