//! Shared application state

use std::sync::Arc;
use std::time::Duration;

use hostcms_shared::{ContentStore, MemoryStore, PgStore, SiteDirectory};
use sqlx::PgPool;

use crate::config::Config;
use crate::mirror::{MirrorSynchronizer, SyncConfig};
use crate::routing::{SiteCache, SiteResolver};
use crate::sites::SiteService;

/// State handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub directory: Arc<dyn SiteDirectory>,
    pub content: Arc<dyn ContentStore>,
    pub resolver: SiteResolver,
    pub synchronizer: MirrorSynchronizer,
    pub sites: SiteService,
}

impl AppState {
    /// Wire the resolver, synchronizer and site service over the given stores
    pub fn new(
        config: Config,
        directory: Arc<dyn SiteDirectory>,
        content: Arc<dyn ContentStore>,
    ) -> Self {
        let cache = Arc::new(SiteCache::with_ttl(Duration::from_secs(
            config.site_cache_ttl_secs,
        )));
        let resolver =
            SiteResolver::with_cache(directory.clone(), config.hostname_aliases.clone(), cache);
        let synchronizer = MirrorSynchronizer::new(
            directory.clone(),
            content.clone(),
            SyncConfig {
                max_nodes: config.mirror_max_nodes,
                timeout: Duration::from_millis(config.mirror_sync_timeout_ms),
            },
        );
        let sites = SiteService::new(
            directory.clone(),
            resolver.clone(),
            synchronizer.clone(),
            config.mirror_single_pair,
        );

        Self {
            config: Arc::new(config),
            directory,
            content,
            resolver,
            synchronizer,
            sites,
        }
    }

    /// State backed by PostgreSQL
    pub fn with_pool(config: Config, pool: PgPool) -> Self {
        let store = Arc::new(PgStore::new(pool));
        Self::new(config, store.clone(), store)
    }

    /// State backed by the in-memory store
    pub fn in_memory(config: Config) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::new(config, store.clone(), store)
    }
}
