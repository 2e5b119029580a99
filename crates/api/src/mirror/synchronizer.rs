//! Mirror synchronization
//!
//! When a site becomes mirrored, it and its partner (the first other
//! mirrored site by identifier) re-converge on a common structure: every
//! layout, page and snippet of each side is pushed to the other side.
//! Each participant's trees are reloaded from storage right before they are
//! walked, so the second side sees what the first side just wrote.

use std::sync::Arc;
use std::time::Duration;

use hostcms_shared::content::{load_tree, sync_mirror, NodeSyncOutcome};
use hostcms_shared::{ContentKind, ContentStore, NodeId, Site, SiteDirectory, SiteError, SiteId};
use serde::Serialize;

use super::MirrorLocks;

/// Bounds for a single synchronization run
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Maximum nodes visited across all trees of both sites
    pub max_nodes: usize,
    /// Wall-clock limit for the whole run, lock wait included
    pub timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_nodes: 10_000,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Nodes visited per site
#[derive(Debug, Clone, Default, Serialize)]
pub struct SiteSyncSummary {
    pub site_id: SiteId,
    pub layouts: usize,
    pub pages: usize,
    pub snippets: usize,
}

impl SiteSyncSummary {
    fn record(&mut self, kind: ContentKind) {
        match kind {
            ContentKind::Layout => self.layouts += 1,
            ContentKind::Page => self.pages += 1,
            ContentKind::Snippet => self.snippets += 1,
        }
    }
}

/// Outcome of a synchronization run
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub trigger_id: SiteId,
    pub partner_id: Option<SiteId>,
    pub sites: Vec<SiteSyncSummary>,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
}

impl SyncReport {
    fn new(trigger_id: SiteId, partner_id: Option<SiteId>) -> Self {
        Self {
            trigger_id,
            partner_id,
            sites: Vec::new(),
            created: 0,
            updated: 0,
            unchanged: 0,
        }
    }

    /// Nodes visited so far
    pub fn visited(&self) -> usize {
        self.sites
            .iter()
            .map(|s| s.layouts + s.pages + s.snippets)
            .sum()
    }

    /// True when the run changed nothing on either side
    pub fn is_noop(&self) -> bool {
        self.created == 0 && self.updated == 0
    }
}

/// Keeps the structure of mirrored sites in step
#[derive(Clone)]
pub struct MirrorSynchronizer {
    directory: Arc<dyn SiteDirectory>,
    content: Arc<dyn ContentStore>,
    locks: Arc<MirrorLocks>,
    config: SyncConfig,
}

impl MirrorSynchronizer {
    pub fn new(
        directory: Arc<dyn SiteDirectory>,
        content: Arc<dyn ContentStore>,
        config: SyncConfig,
    ) -> Self {
        Self {
            directory,
            content,
            locks: Arc::new(MirrorLocks::new()),
            config,
        }
    }

    /// Per-pair lock registry
    pub fn locks(&self) -> &MirrorLocks {
        &self.locks
    }

    /// Hook for a write that flipped `is_mirrored` to true on `site`.
    ///
    /// A failing node stops the run; nodes synchronized before it stay
    /// synchronized.
    pub async fn on_mirror_flag_set(&self, site: &Site) -> Result<SyncReport, SyncError> {
        let timeout = self.config.timeout;
        match tokio::time::timeout(timeout, self.run(site)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!(site_id = %site.id, timeout = ?timeout, "Mirror sync timed out");
                Err(SyncError::TimedOut {
                    after_ms: timeout.as_millis() as u64,
                })
            }
        }
    }

    /// The mirrored site `site` pairs with: lowest identifier other than itself
    pub async fn find_partner(&self, site: &Site) -> Result<Option<Site>, SyncError> {
        let others: Vec<Site> = self
            .directory
            .mirrored_sites()
            .await?
            .into_iter()
            .filter(|s| s.id != site.id)
            .collect();

        if others.len() > 1 {
            tracing::warn!(
                site_id = %site.id,
                mirrored = others.len() + 1,
                partner = %others[0].identifier,
                "More than two mirrored sites, pairing with the lowest identifier"
            );
        }
        Ok(others.into_iter().next())
    }

    async fn run(&self, site: &Site) -> Result<SyncReport, SyncError> {
        let partner = self.find_partner(site).await?;
        let partner_id = partner.as_ref().map(|p| p.id);
        let _guard = self.locks.acquire(site.id, partner_id).await;

        tracing::info!(
            site_id = %site.id,
            partner_id = ?partner_id,
            "Starting mirror sync"
        );

        let mut report = SyncReport::new(site.id, partner_id);
        let participants: Vec<(SiteId, Option<SiteId>)> = match partner_id {
            Some(partner_id) if partner_id != site.id => {
                vec![(site.id, Some(partner_id)), (partner_id, Some(site.id))]
            }
            _ => vec![(site.id, None)],
        };

        for (source, target) in participants {
            let mut summary = SiteSyncSummary {
                site_id: source,
                ..Default::default()
            };
            let result = self.sync_site(source, target, &mut summary, &mut report).await;
            report.sites.push(summary);
            if let Err(err) = result {
                tracing::error!(
                    site_id = %site.id,
                    source_id = %source,
                    visited = report.visited(),
                    error = %err,
                    "Mirror sync stopped"
                );
                return Err(err);
            }
        }

        tracing::info!(
            site_id = %site.id,
            partner_id = ?partner_id,
            visited = report.visited(),
            created = report.created,
            updated = report.updated,
            "Mirror sync finished"
        );
        Ok(report)
    }

    /// Push every layout, page and snippet of `source` to `target`
    async fn sync_site(
        &self,
        source: SiteId,
        target: Option<SiteId>,
        summary: &mut SiteSyncSummary,
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        // layouts first: pages point at their layout's counterpart
        for kind in ContentKind::ALL {
            let visited = report.visited() + summary_total(summary);
            let remaining = self.config.max_nodes.saturating_sub(visited);
            let tree = load_tree(self.content.as_ref(), source, kind, remaining).await?;
            if tree.is_truncated() || tree.len() > remaining {
                return Err(SyncError::TooManyNodes {
                    limit: self.config.max_nodes,
                });
            }

            for node in tree.flatten() {
                if let Some(target) = target {
                    let outcome = sync_mirror(self.content.as_ref(), node, target)
                        .await
                        .map_err(|source| SyncError::NodeFailed {
                            kind,
                            node_id: node.id,
                            synced: report.visited() + summary_total(summary),
                            source,
                        })?;
                    match outcome {
                        NodeSyncOutcome::Created => report.created += 1,
                        NodeSyncOutcome::Updated => report.updated += 1,
                        NodeSyncOutcome::Unchanged => report.unchanged += 1,
                    }
                }
                summary.record(kind);
            }
        }
        Ok(())
    }
}

fn summary_total(summary: &SiteSyncSummary) -> usize {
    summary.layouts + summary.pages + summary.snippets
}

/// Errors that can occur during mirror synchronization
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Failed to sync {kind} {node_id} after {synced} nodes: {source}")]
    NodeFailed {
        kind: ContentKind,
        node_id: NodeId,
        /// Nodes already synchronized when the failure happened
        synced: usize,
        #[source]
        source: SiteError,
    },

    #[error("Mirror sync exceeds {limit} nodes")]
    TooManyNodes { limit: usize },

    #[error("Mirror sync timed out after {after_ms}ms")]
    TimedOut { after_ms: u64 },

    #[error("Storage error: {0}")]
    Storage(#[from] SiteError),
}
