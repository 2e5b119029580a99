//! Structural replication between mirrored sites

mod locks;
mod synchronizer;

pub use locks::MirrorLocks;
pub use synchronizer::{MirrorSynchronizer, SiteSyncSummary, SyncConfig, SyncError, SyncReport};
