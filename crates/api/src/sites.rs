//! Site lifecycle
//!
//! Every site write goes through `SiteService`, which runs the defaulting
//! and validation pipeline, persists, refreshes the resolver cache and fires
//! the mirror hooks:
//! - `on_mirror_flag_set` after a write that turned `is_mirrored` on
//! - `before_tenant_destroy` before a site and its content are deleted

use std::sync::Arc;

use serde::Serialize;

use hostcms_shared::{
    prepare_site, Site, SiteChanges, SiteDirectory, SiteDraft, SiteError, SiteFields, SiteId,
};

use crate::mirror::{MirrorSynchronizer, SyncError, SyncReport};
use crate::routing::SiteResolver;

/// A persisted site plus the mirror sync its write triggered, if any
#[derive(Debug, Clone, Serialize)]
pub struct SiteWrite {
    pub site: Site,
    pub mirror_sync: Option<SyncReport>,
}

#[derive(Clone)]
pub struct SiteService {
    directory: Arc<dyn SiteDirectory>,
    resolver: SiteResolver,
    synchronizer: MirrorSynchronizer,
    /// Reject writes that would leave more than two mirrored sites
    single_pair: bool,
}

impl SiteService {
    pub fn new(
        directory: Arc<dyn SiteDirectory>,
        resolver: SiteResolver,
        synchronizer: MirrorSynchronizer,
        single_pair: bool,
    ) -> Self {
        Self {
            directory,
            resolver,
            synchronizer,
            single_pair,
        }
    }

    pub async fn list(&self) -> Result<Vec<Site>, SiteServiceError> {
        Ok(self.directory.list_sites().await?)
    }

    pub async fn get(&self, id: SiteId) -> Result<Site, SiteServiceError> {
        self.directory
            .find_site(id)
            .await?
            .ok_or_else(|| SiteError::NotFound(format!("site {}", id)).into())
    }

    /// Register a new site
    pub async fn create(&self, draft: SiteDraft) -> Result<SiteWrite, SiteServiceError> {
        let fields = prepare_site(draft)?;
        if fields.is_mirrored {
            self.check_mirror_pairs(None).await?;
        }

        let site = self.directory.insert_site(fields).await?;
        self.resolver.invalidate_all();
        tracing::info!(
            site_id = %site.id,
            identifier = %site.identifier,
            hostname = %site.hostname,
            path = %site.path,
            "Site created"
        );

        // a new record counts as a transition from unset
        self.after_save(site, false).await
    }

    /// Apply changes to an existing site
    pub async fn update(
        &self,
        id: SiteId,
        changes: SiteChanges,
    ) -> Result<SiteWrite, SiteServiceError> {
        let previous = self.get(id).await?;
        let fields: SiteFields = prepare_site(changes.apply_to(SiteDraft::from(&previous)))?;
        if fields.is_mirrored && !previous.is_mirrored {
            self.check_mirror_pairs(Some(id)).await?;
        }

        let site = self.directory.update_site(id, fields).await?;
        self.resolver.invalidate_all();
        tracing::info!(site_id = %site.id, identifier = %site.identifier, "Site updated");

        self.after_save(site, previous.is_mirrored).await
    }

    /// Delete a site and everything it owns. The site's own mirror flag is
    /// cleared first so its partner's content is left alone.
    pub async fn destroy(&self, id: SiteId) -> Result<(), SiteServiceError> {
        let site = self.get(id).await?;
        self.before_tenant_destroy(&site).await?;

        if !self.directory.delete_site(id).await? {
            return Err(SiteError::NotFound(format!("site {}", id)).into());
        }
        self.resolver.invalidate_all();
        tracing::info!(site_id = %id, identifier = %site.identifier, "Site destroyed");
        Ok(())
    }

    /// Clear the site's mirror flag without going through `update`, so no
    /// mirror hook fires.
    pub async fn before_tenant_destroy(&self, site: &Site) -> Result<(), SiteServiceError> {
        if site.is_mirrored {
            self.directory.update_mirror_flag(site.id, false).await?;
            tracing::info!(site_id = %site.id, "Cleared mirror flag before destroy");
        }
        Ok(())
    }

    async fn after_save(
        &self,
        site: Site,
        was_mirrored: bool,
    ) -> Result<SiteWrite, SiteServiceError> {
        if !site.is_mirrored || was_mirrored {
            return Ok(SiteWrite {
                site,
                mirror_sync: None,
            });
        }

        match self.synchronizer.on_mirror_flag_set(&site).await {
            Ok(report) => Ok(SiteWrite {
                site,
                mirror_sync: Some(report),
            }),
            Err(source) => Err(SiteServiceError::MirrorSync {
                site: Box::new(site),
                source,
            }),
        }
    }

    async fn check_mirror_pairs(&self, except: Option<SiteId>) -> Result<(), SiteServiceError> {
        if !self.single_pair {
            return Ok(());
        }
        let mirrored = self
            .directory
            .mirrored_sites()
            .await?
            .into_iter()
            .filter(|s| Some(s.id) != except)
            .count();
        if mirrored >= 2 {
            return Err(SiteError::Conflict(
                "two sites are already mirrored; unmirror one first".to_string(),
            )
            .into());
        }
        Ok(())
    }
}

/// Errors from the site lifecycle
#[derive(Debug, thiserror::Error)]
pub enum SiteServiceError {
    #[error(transparent)]
    Site(#[from] SiteError),

    /// The write succeeded but synchronizing its mirror partner did not
    #[error("Site {} saved but mirror sync failed: {source}", .site.identifier)]
    MirrorSync {
        site: Box<Site>,
        #[source]
        source: SyncError,
    },
}
