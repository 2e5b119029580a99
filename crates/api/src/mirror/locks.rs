//! Per-pair locks for mirror synchronization
//!
//! Two flag flips that touch the same pair of sites must not interleave
//! their traversals. Each unordered pair (or a lone site without a partner)
//! gets its own async mutex, held for the whole synchronization run.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use hostcms_shared::SiteId;

/// Unordered pair key; a lone site is `(site, None)`
type PairKey = (SiteId, Option<SiteId>);

fn pair_key(site: SiteId, partner: Option<SiteId>) -> PairKey {
    match partner {
        Some(partner) if partner < site => (partner, Some(site)),
        _ => (site, partner),
    }
}

/// Registry of per-pair mutexes
#[derive(Default)]
pub struct MirrorLocks {
    locks: Mutex<HashMap<PairKey, Arc<Mutex<()>>>>,
}

impl MirrorLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to the pair
    pub async fn acquire(&self, site: SiteId, partner: Option<SiteId>) -> OwnedMutexGuard<()> {
        let key = pair_key(site, partner);
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry(key).or_insert_with(|| Arc::new(Mutex::new(()))))
        };

        if lock.try_lock().is_err() {
            tracing::debug!(
                site_id = %site,
                partner_id = ?partner,
                "Mirror sync already running for pair, waiting"
            );
        }
        lock.lock_owned().await
    }

    /// Drop locks nobody is holding or waiting on
    pub async fn prune(&self) {
        let mut locks = self.locks.lock().await;
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    pub async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }
}
