//! Host + Path to Site Resolution
//!
//! Resolves an incoming (host, path) pair to exactly one site:
//! - A directory holding a single site answers every request with it
//! - Alias hosts are mapped onto their canonical host first
//! - Among the sites on a host, the first whose path prefix covers the
//!   request path wins; a site without a path is the host's catch-all

use std::sync::Arc;

use serde::Serialize;

use hostcms_shared::{Site, SiteDirectory, SiteError};

use super::{AliasMap, DirectorySummary, SiteCache};

/// Result of resolving a request to a site
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedSite {
    pub site: Site,
    /// The branch of the algorithm that matched
    pub resolution_type: ResolutionType,
}

/// How the site was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionType {
    /// The directory holds exactly one site
    SingleSite,
    /// The request path falls under the site's path prefix
    PathPrefix,
    /// The site has no path prefix and nothing more specific matched
    CatchAll,
}

/// Site resolver with caching
#[derive(Clone)]
pub struct SiteResolver {
    directory: Arc<dyn SiteDirectory>,
    cache: Arc<SiteCache>,
    aliases: Arc<AliasMap>,
}

impl SiteResolver {
    /// Create a new site resolver
    pub fn new(directory: Arc<dyn SiteDirectory>, aliases: AliasMap) -> Self {
        Self::with_cache(directory, aliases, Arc::new(SiteCache::new()))
    }

    /// Create a new site resolver with custom cache
    pub fn with_cache(
        directory: Arc<dyn SiteDirectory>,
        aliases: AliasMap,
        cache: Arc<SiteCache>,
    ) -> Self {
        Self {
            directory,
            cache,
            aliases: Arc::new(aliases),
        }
    }

    /// Resolve a request host and path to a site.
    ///
    /// Performs no writes to the directory, so any number of resolutions can
    /// run concurrently.
    pub async fn resolve(
        &self,
        host: &str,
        path: Option<&str>,
    ) -> Result<ResolvedSite, ResolveError> {
        let path = path.unwrap_or("");

        // Single-site directories skip host and path matching entirely
        let summary = self.summary().await?;
        if summary.site_count == 1 {
            if let Some(site) = summary.only_site {
                tracing::debug!(site_id = %site.id, "Resolved single site");
                return Ok(ResolvedSite {
                    site,
                    resolution_type: ResolutionType::SingleSite,
                });
            }
        }

        let host = normalize_host(host);
        let canonical = self.aliases.canonical(&host).to_string();

        let candidates = match self.cache.get_host(&canonical) {
            Some(sites) => sites,
            None => {
                let sites = self.directory.sites_by_hostname(&canonical).await?;
                // Unknown hosts are not cached, arbitrary Host headers would grow the map
                if !sites.is_empty() {
                    self.cache.set_host(&canonical, sites.clone());
                }
                sites
            }
        };

        match match_site(&candidates, path) {
            Some((site, resolution_type)) => {
                tracing::debug!(
                    host = %host,
                    canonical_host = %canonical,
                    path = %path,
                    site_id = %site.id,
                    resolution = ?resolution_type,
                    "Resolved site"
                );
                Ok(ResolvedSite {
                    site: site.clone(),
                    resolution_type,
                })
            }
            None => Err(ResolveError::NotFound {
                host,
                path: path.to_string(),
            }),
        }
    }

    async fn summary(&self) -> Result<DirectorySummary, ResolveError> {
        if let Some(summary) = self.cache.get_summary() {
            return Ok(summary);
        }

        let site_count = self.directory.count_sites().await?;
        let only_site = if site_count == 1 {
            self.directory.first_site().await?
        } else {
            None
        };
        let summary = DirectorySummary {
            site_count,
            only_site,
        };
        self.cache.set_summary(summary.clone());
        Ok(summary)
    }

    /// Drop every cached directory read
    pub fn invalidate_all(&self) {
        self.cache.clear();
    }

    /// Get the site cache for statistics/management
    pub fn cache(&self) -> &SiteCache {
        &self.cache
    }

    pub fn aliases(&self) -> &AliasMap {
        &self.aliases
    }
}

/// Pick a site among the candidates registered at one host.
///
/// Candidates are scanned in order. A catch-all is remembered but scanning
/// continues; the first site whose path prefix covers the request path is
/// returned immediately. Prefixes are compared per segment, so `/blog`
/// covers `/blog` and `/blog/post` but not `/blogger`.
pub fn match_site<'a>(candidates: &'a [Site], path: &str) -> Option<(&'a Site, ResolutionType)> {
    let request = with_trailing_slash(&rooted(path.split('?').next().unwrap_or("")));

    let mut best = None;
    for site in candidates {
        if site.is_catch_all() {
            best = Some((site, ResolutionType::CatchAll));
        } else if request.starts_with(&with_trailing_slash(&rooted(&site.path))) {
            return Some((site, ResolutionType::PathPrefix));
        }
    }
    best
}

/// Normalize a host header value
fn normalize_host(host: &str) -> String {
    // Port is kept, sites may be registered as host:port
    host.trim().to_lowercase()
}

fn rooted(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

fn with_trailing_slash(path: &str) -> String {
    if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{}/", path)
    }
}

/// Errors that can occur during site resolution
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("No site found for host '{host}' and path '{path}'")]
    NotFound { host: String, path: String },

    #[error("Storage error: {0}")]
    Storage(#[from] SiteError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostcms_shared::{MemoryStore, SiteFields};

    fn fields(identifier: &str, hostname: &str, path: &str) -> SiteFields {
        SiteFields {
            identifier: identifier.to_string(),
            hostname: hostname.to_string(),
            path: hostcms_shared::validation::clean_path(Some(path)),
            label: identifier.to_string(),
            is_mirrored: false,
        }
    }

    async fn resolver_with(sites: &[(&str, &str, &str)], aliases: AliasMap) -> SiteResolver {
        let store = MemoryStore::new();
        for (identifier, hostname, path) in sites {
            store
                .insert_site(fields(identifier, hostname, path))
                .await
                .unwrap();
        }
        SiteResolver::new(Arc::new(store), aliases)
    }

    async fn resolved_identifier(resolver: &SiteResolver, host: &str, path: &str) -> Option<String> {
        resolver
            .resolve(host, Some(path))
            .await
            .ok()
            .map(|r| r.site.identifier)
    }

    #[tokio::test]
    async fn test_single_site_shortcut() {
        let resolver = resolver_with(&[("only", "only.example", "/docs")], AliasMap::new()).await;

        for (host, path) in [("anything.example", "/"), ("", ""), ("only.example", "/nope")] {
            let resolved = resolver.resolve(host, Some(path)).await.unwrap();
            assert_eq!(resolved.site.identifier, "only");
            assert_eq!(resolved.resolution_type, ResolutionType::SingleSite);
        }
        let resolved = resolver.resolve("x", None).await.unwrap();
        assert_eq!(resolved.site.identifier, "only");
    }

    #[tokio::test]
    async fn test_alias_normalization() {
        let aliases = AliasMap::new().with_entry("canon.example", ["alt.example"]);
        let resolver = resolver_with(
            &[("canon", "canon.example", ""), ("other", "other.example", "")],
            aliases,
        )
        .await;

        assert_eq!(
            resolved_identifier(&resolver, "alt.example", "/").await,
            Some("canon".to_string())
        );
        assert_eq!(
            resolved_identifier(&resolver, "ALT.example", "/").await,
            Some("canon".to_string())
        );
    }

    #[tokio::test]
    async fn test_mixed_case_registration_resolves_lowercase_host() {
        let store = Arc::new(MemoryStore::new());
        for draft in [("main", "Example.COM"), ("other", "other.example")] {
            let fields = hostcms_shared::prepare_site(hostcms_shared::SiteDraft {
                identifier: Some(draft.0.to_string()),
                hostname: Some(draft.1.to_string()),
                ..Default::default()
            })
            .unwrap();
            store.insert_site(fields).await.unwrap();
        }
        let resolver = SiteResolver::new(store, AliasMap::new());

        assert_eq!(
            resolved_identifier(&resolver, "example.com", "/").await,
            Some("main".to_string())
        );
        assert_eq!(
            resolved_identifier(&resolver, "EXAMPLE.com", "/").await,
            Some("main".to_string())
        );
    }

    #[tokio::test]
    async fn test_prefix_precedence() {
        let resolver = resolver_with(&[("a", "h", ""), ("b", "h", "/blog")], AliasMap::new()).await;

        assert_eq!(
            resolved_identifier(&resolver, "h", "/blog/post-1").await,
            Some("b".to_string())
        );
        assert_eq!(
            resolved_identifier(&resolver, "h", "/blog").await,
            Some("b".to_string())
        );
        assert_eq!(
            resolved_identifier(&resolver, "h", "/about").await,
            Some("a".to_string())
        );
        // segment comparison, not raw substring
        assert_eq!(
            resolved_identifier(&resolver, "h", "/blogger").await,
            Some("a".to_string())
        );
        // query string does not take part in matching
        assert_eq!(
            resolved_identifier(&resolver, "h", "/blog?page=2").await,
            Some("b".to_string())
        );
    }

    #[tokio::test]
    async fn test_prefix_wins_when_registered_before_catch_all() {
        let resolver = resolver_with(&[("b", "h", "/blog"), ("a", "h", "")], AliasMap::new()).await;

        assert_eq!(
            resolved_identifier(&resolver, "h", "/blog/x").await,
            Some("b".to_string())
        );
        assert_eq!(
            resolved_identifier(&resolver, "h", "/").await,
            Some("a".to_string())
        );
    }

    #[tokio::test]
    async fn test_no_match() {
        let resolver = resolver_with(
            &[("a", "a.example", ""), ("b", "b.example", "/blog")],
            AliasMap::new(),
        )
        .await;

        let err = resolver.resolve("unknown.example", Some("/")).await.unwrap_err();
        assert!(matches!(err, ResolveError::NotFound { .. }));

        // host exists but has no catch-all and the prefix does not match
        let err = resolver.resolve("b.example", Some("/about")).await.unwrap_err();
        assert!(matches!(err, ResolveError::NotFound { .. }));

        // empty path against a prefixed-only host
        assert!(resolver.resolve("b.example", None).await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_hosts_are_not_cached() {
        let resolver = resolver_with(
            &[("a", "a.example", ""), ("b", "b.example", "")],
            AliasMap::new(),
        )
        .await;

        for n in 0..5 {
            let host = format!("random-{}.example", n);
            assert!(resolver.resolve(&host, Some("/")).await.is_err());
        }
        assert_eq!(resolver.cache().stats().total_entries, 0);

        assert!(resolver.resolve("a.example", Some("/")).await.is_ok());
        assert_eq!(resolver.cache().stats().total_entries, 1);
    }

    #[tokio::test]
    async fn test_normalized_path_matches_like_clean_path() {
        let messy = resolver_with(&[("a", "h", ""), ("b", "h", "//blog//")], AliasMap::new()).await;
        let clean = resolver_with(&[("a", "h", ""), ("b", "h", "/blog")], AliasMap::new()).await;

        for path in ["/blog", "/blog/", "/blog/post", "/about", "/blogs"] {
            assert_eq!(
                resolved_identifier(&messy, "h", path).await,
                resolved_identifier(&clean, "h", path).await,
                "path {}",
                path
            );
        }
    }

    #[tokio::test]
    async fn test_cache_invalidation_picks_up_new_sites() {
        let store = Arc::new(MemoryStore::new());
        store.insert_site(fields("a", "a.example", "")).await.unwrap();
        let resolver = SiteResolver::new(store.clone(), AliasMap::new());

        // single-site shortcut is cached
        assert!(resolver.resolve("b.example", Some("/")).await.is_ok());

        store.insert_site(fields("b", "b.example", "")).await.unwrap();
        resolver.invalidate_all();

        let resolved = resolver.resolve("b.example", Some("/")).await.unwrap();
        assert_eq!(resolved.site.identifier, "b");
        assert_eq!(resolved.resolution_type, ResolutionType::CatchAll);
    }

    #[test]
    fn test_normalize_host() {
        assert_eq!(normalize_host(" Example.COM "), "example.com");
        assert_eq!(normalize_host("example.com:8080"), "example.com:8080");
    }

    #[test]
    fn test_match_site_relative_prefix() {
        let now = time::OffsetDateTime::now_utc();
        let site = Site {
            id: hostcms_shared::SiteId::new(),
            identifier: "en".to_string(),
            hostname: "h".to_string(),
            path: "en".to_string(),
            label: "En".to_string(),
            is_mirrored: false,
            created_at: now,
            updated_at: now,
        };
        let candidates = vec![site];
        assert!(match_site(&candidates, "/en/page").is_some());
        assert!(match_site(&candidates, "/de/page").is_none());
    }
}
