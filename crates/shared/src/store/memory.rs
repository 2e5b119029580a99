//! In-memory store
//!
//! Keeps sites and content in insertion order behind a single lock. Used by
//! tests and by deployments that run without a database.

use async_trait::async_trait;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use super::{ContentStore, SiteDirectory};
use crate::error::{SiteError, SiteResult};
use crate::types::{ContentKind, ContentNode, NodeId, Site, SiteId};
use crate::validation::SiteFields;

#[derive(Default)]
struct Inner {
    /// Creation order
    sites: Vec<Site>,
    /// Insertion order
    nodes: Vec<ContentNode>,
}

impl Inner {
    fn check_unique(&self, fields: &SiteFields, except: Option<SiteId>) -> SiteResult<()> {
        let others = self.sites.iter().filter(|s| Some(s.id) != except);
        for site in others {
            if site.identifier == fields.identifier {
                return Err(SiteError::Conflict(format!(
                    "identifier '{}' is already taken",
                    fields.identifier
                )));
            }
            if site.hostname == fields.hostname && site.path == fields.path {
                return Err(SiteError::Conflict(format!(
                    "hostname '{}' with path '{}' is already taken",
                    fields.hostname, fields.path
                )));
            }
        }
        Ok(())
    }

    /// One node per (site, kind, mirror key); a site has a single root page
    fn check_node_unique(&self, node: &ContentNode) -> SiteResult<()> {
        let taken = self.nodes.iter().any(|n| {
            n.id != node.id
                && n.site_id == node.site_id
                && n.kind == node.kind
                && n.mirror_key() == node.mirror_key()
        });
        if taken {
            return Err(SiteError::Conflict(format!(
                "{} '{}' already exists in site {}",
                node.kind,
                node.mirror_key(),
                node.site_id
            )));
        }
        Ok(())
    }

    fn sorted(mut nodes: Vec<ContentNode>) -> Vec<ContentNode> {
        // stable, so equal positions keep insertion order
        nodes.sort_by_key(|n| n.position);
        nodes
    }
}

/// Thread-safe in-memory implementation of both storage traits
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SiteDirectory for MemoryStore {
    async fn count_sites(&self) -> SiteResult<i64> {
        let inner = self.inner.read().await;
        Ok(inner.sites.len() as i64)
    }

    async fn first_site(&self) -> SiteResult<Option<Site>> {
        let inner = self.inner.read().await;
        Ok(inner.sites.first().cloned())
    }

    async fn list_sites(&self) -> SiteResult<Vec<Site>> {
        let inner = self.inner.read().await;
        Ok(inner.sites.clone())
    }

    async fn find_site(&self, id: SiteId) -> SiteResult<Option<Site>> {
        let inner = self.inner.read().await;
        Ok(inner.sites.iter().find(|s| s.id == id).cloned())
    }

    async fn sites_by_hostname(&self, hostname: &str) -> SiteResult<Vec<Site>> {
        let inner = self.inner.read().await;
        Ok(inner
            .sites
            .iter()
            .filter(|s| s.hostname == hostname)
            .cloned()
            .collect())
    }

    async fn mirrored_sites(&self) -> SiteResult<Vec<Site>> {
        let inner = self.inner.read().await;
        let mut sites: Vec<Site> = inner.sites.iter().filter(|s| s.is_mirrored).cloned().collect();
        sites.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        Ok(sites)
    }

    async fn insert_site(&self, fields: SiteFields) -> SiteResult<Site> {
        let mut inner = self.inner.write().await;
        inner.check_unique(&fields, None)?;

        let now = OffsetDateTime::now_utc();
        let site = Site {
            id: SiteId::new(),
            identifier: fields.identifier,
            hostname: fields.hostname,
            path: fields.path,
            label: fields.label,
            is_mirrored: fields.is_mirrored,
            created_at: now,
            updated_at: now,
        };
        inner.sites.push(site.clone());
        Ok(site)
    }

    async fn update_site(&self, id: SiteId, fields: SiteFields) -> SiteResult<Site> {
        let mut inner = self.inner.write().await;
        inner.check_unique(&fields, Some(id))?;

        let site = inner
            .sites
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| SiteError::NotFound(format!("site {}", id)))?;
        site.identifier = fields.identifier;
        site.hostname = fields.hostname;
        site.path = fields.path;
        site.label = fields.label;
        site.is_mirrored = fields.is_mirrored;
        site.updated_at = OffsetDateTime::now_utc();
        Ok(site.clone())
    }

    async fn update_mirror_flag(&self, id: SiteId, is_mirrored: bool) -> SiteResult<()> {
        let mut inner = self.inner.write().await;
        if let Some(site) = inner.sites.iter_mut().find(|s| s.id == id) {
            site.is_mirrored = is_mirrored;
        }
        Ok(())
    }

    async fn delete_site(&self, id: SiteId) -> SiteResult<bool> {
        let mut inner = self.inner.write().await;
        let before = inner.sites.len();
        inner.sites.retain(|s| s.id != id);
        if inner.sites.len() == before {
            return Ok(false);
        }
        inner.nodes.retain(|n| n.site_id != id);
        Ok(true)
    }

    async fn ping(&self) -> SiteResult<()> {
        Ok(())
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn roots_of(&self, site_id: SiteId, kind: ContentKind) -> SiteResult<Vec<ContentNode>> {
        let inner = self.inner.read().await;
        Ok(Inner::sorted(
            inner
                .nodes
                .iter()
                .filter(|n| n.site_id == site_id && n.kind == kind && n.parent_id.is_none())
                .cloned()
                .collect(),
        ))
    }

    async fn children_of(&self, node_id: NodeId) -> SiteResult<Vec<ContentNode>> {
        let inner = self.inner.read().await;
        Ok(Inner::sorted(
            inner
                .nodes
                .iter()
                .filter(|n| n.parent_id == Some(node_id))
                .cloned()
                .collect(),
        ))
    }

    async fn nodes_of(&self, site_id: SiteId, kind: ContentKind) -> SiteResult<Vec<ContentNode>> {
        let inner = self.inner.read().await;
        Ok(Inner::sorted(
            inner
                .nodes
                .iter()
                .filter(|n| n.site_id == site_id && n.kind == kind)
                .cloned()
                .collect(),
        ))
    }

    async fn find_node(&self, id: NodeId) -> SiteResult<Option<ContentNode>> {
        let inner = self.inner.read().await;
        Ok(inner.nodes.iter().find(|n| n.id == id).cloned())
    }

    async fn find_by_mirror_key(
        &self,
        site_id: SiteId,
        kind: ContentKind,
        key: &str,
    ) -> SiteResult<Option<ContentNode>> {
        let inner = self.inner.read().await;
        Ok(inner
            .nodes
            .iter()
            .find(|n| n.site_id == site_id && n.kind == kind && n.mirror_key() == key)
            .cloned())
    }

    async fn save_node(&self, node: ContentNode) -> SiteResult<ContentNode> {
        let mut inner = self.inner.write().await;
        if !inner.sites.iter().any(|s| s.id == node.site_id) {
            return Err(SiteError::NotFound(format!("site {}", node.site_id)));
        }
        inner.check_node_unique(&node)?;
        match inner.nodes.iter_mut().find(|n| n.id == node.id) {
            Some(existing) => *existing = node.clone(),
            None => inner.nodes.push(node.clone()),
        }
        Ok(node)
    }

    async fn count_nodes(&self, site_id: SiteId, kind: ContentKind) -> SiteResult<i64> {
        let inner = self.inner.read().await;
        Ok(inner
            .nodes
            .iter()
            .filter(|n| n.site_id == site_id && n.kind == kind)
            .count() as i64)
    }
}
