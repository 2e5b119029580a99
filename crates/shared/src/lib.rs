//! HostCMS Shared Types and Storage
//!
//! This crate contains the site and content types, validation rules, and
//! storage backends shared across HostCMS.

pub mod content;
pub mod db;
pub mod error;
pub mod store;
pub mod types;
pub mod validation;

pub use db::*;
pub use error::*;
pub use store::{ContentStore, MemoryStore, PgStore, SiteDirectory};
pub use types::*;
pub use validation::{prepare_site, SiteFields};
