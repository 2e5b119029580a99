//! Storage seams for sites and their structural content
//!
//! `SiteDirectory` is the tenant registry, `ContentStore` holds layouts,
//! pages and snippets. Both are implemented for PostgreSQL and in memory.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;

use crate::error::SiteResult;
use crate::types::{ContentKind, ContentNode, NodeId, Site, SiteId};
use crate::validation::SiteFields;

/// Registry of sites
#[async_trait]
pub trait SiteDirectory: Send + Sync {
    /// Total number of registered sites
    async fn count_sites(&self) -> SiteResult<i64>;

    /// First site in creation order
    async fn first_site(&self) -> SiteResult<Option<Site>>;

    /// All sites in creation order
    async fn list_sites(&self) -> SiteResult<Vec<Site>>;

    async fn find_site(&self, id: SiteId) -> SiteResult<Option<Site>>;

    /// Sites registered at `hostname`, in creation order
    async fn sites_by_hostname(&self, hostname: &str) -> SiteResult<Vec<Site>>;

    /// Mirrored sites ordered by identifier
    async fn mirrored_sites(&self) -> SiteResult<Vec<Site>>;

    /// Insert a new site. Fails with `Conflict` on a duplicate identifier
    /// or hostname + path pair.
    async fn insert_site(&self, fields: SiteFields) -> SiteResult<Site>;

    /// Overwrite the stored fields of an existing site
    async fn update_site(&self, id: SiteId, fields: SiteFields) -> SiteResult<Site>;

    /// Set the mirror flag directly, bypassing every lifecycle hook
    async fn update_mirror_flag(&self, id: SiteId, is_mirrored: bool) -> SiteResult<()>;

    /// Delete a site together with everything it owns.
    /// Returns false when the site did not exist.
    async fn delete_site(&self, id: SiteId) -> SiteResult<bool>;

    /// Cheap connectivity probe
    async fn ping(&self) -> SiteResult<()>;
}

/// Structural content owned by sites
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Parentless nodes of a kind, ordered by position
    async fn roots_of(&self, site_id: SiteId, kind: ContentKind) -> SiteResult<Vec<ContentNode>>;

    /// Direct children of a node, ordered by position
    async fn children_of(&self, node_id: NodeId) -> SiteResult<Vec<ContentNode>>;

    /// Every node of a kind, ordered by position
    async fn nodes_of(&self, site_id: SiteId, kind: ContentKind) -> SiteResult<Vec<ContentNode>>;

    async fn find_node(&self, id: NodeId) -> SiteResult<Option<ContentNode>>;

    /// Node of a kind whose mirror key (page full path, or identifier) matches
    async fn find_by_mirror_key(
        &self,
        site_id: SiteId,
        kind: ContentKind,
        key: &str,
    ) -> SiteResult<Option<ContentNode>>;

    /// Insert or replace a node by id
    async fn save_node(&self, node: ContentNode) -> SiteResult<ContentNode>;

    async fn count_nodes(&self, site_id: SiteId, kind: ContentKind) -> SiteResult<i64>;
}
