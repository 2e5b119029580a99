//! Host + path based site routing
//!
//! This module handles resolving incoming requests to sites, enabling
//! several sites to share a deployment:
//! - Dedicated hosts: docs.example.com
//! - Alias hosts: www.example.com -> example.com
//! - Path prefixes on a shared host: example.com/blog, example.com/en

mod aliases;
mod cache;
mod site_resolver;

pub use aliases::AliasMap;
pub use cache::{CacheStats, DirectorySummary, SiteCache};
pub use site_resolver::{match_site, ResolutionType, ResolveError, ResolvedSite, SiteResolver};
