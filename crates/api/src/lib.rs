//! HostCMS API Library
//!
//! Site resolution, mirror synchronization, the site lifecycle and the HTTP
//! surface of the HostCMS server.

pub mod auth;
pub mod config;
pub mod error;
pub mod mirror;
pub mod routes;
pub mod routing;
pub mod sites;
pub mod state;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use mirror::{MirrorSynchronizer, SyncError, SyncReport};
pub use routing::{ResolveError, ResolvedSite, SiteCache, SiteResolver};
pub use sites::{SiteService, SiteServiceError, SiteWrite};
pub use state::AppState;
