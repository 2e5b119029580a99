//! Common types used across HostCMS

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use time::OffsetDateTime;
use uuid::Uuid;

// =============================================================================
// ID Wrappers
// =============================================================================

/// Site ID wrapper
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct SiteId(pub Uuid);

impl SiteId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SiteId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for SiteId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Content node ID wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct NodeId(pub Uuid);

impl NodeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for NodeId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// =============================================================================
// Sites
// =============================================================================

/// A single CMS site (tenant) as persisted in the directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Site {
    pub id: SiteId,
    /// Unique slug
    pub identifier: String,
    /// Hostname with optional `:port`
    pub hostname: String,
    /// Path prefix, empty for the host's catch-all site
    pub path: String,
    pub label: String,
    pub is_mirrored: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Site {
    /// True when this site answers every path on its host
    pub fn is_catch_all(&self) -> bool {
        self.path.trim().is_empty()
    }
}

/// Site fields before defaults, normalization and validation are applied
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteDraft {
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub is_mirrored: bool,
}

impl From<&Site> for SiteDraft {
    fn from(site: &Site) -> Self {
        Self {
            identifier: Some(site.identifier.clone()),
            hostname: Some(site.hostname.clone()),
            path: Some(site.path.clone()),
            label: Some(site.label.clone()),
            is_mirrored: site.is_mirrored,
        }
    }
}

/// Partial update of a site; `None` leaves the field untouched
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SiteChanges {
    pub identifier: Option<String>,
    pub hostname: Option<String>,
    pub path: Option<String>,
    pub label: Option<String>,
    pub is_mirrored: Option<bool>,
}

impl SiteChanges {
    /// Overlay these changes on a draft built from the stored record
    pub fn apply_to(self, mut draft: SiteDraft) -> SiteDraft {
        if let Some(identifier) = self.identifier {
            draft.identifier = Some(identifier);
        }
        if let Some(hostname) = self.hostname {
            draft.hostname = Some(hostname);
        }
        if let Some(path) = self.path {
            draft.path = Some(path);
        }
        if let Some(label) = self.label {
            draft.label = Some(label);
        }
        if let Some(is_mirrored) = self.is_mirrored {
            draft.is_mirrored = is_mirrored;
        }
        draft
    }
}

// =============================================================================
// Structural content
// =============================================================================

/// Kind of structural content owned by a site
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "VARCHAR", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Layout,
    Page,
    Snippet,
}

impl ContentKind {
    pub const ALL: [ContentKind; 3] = [Self::Layout, Self::Page, Self::Snippet];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Layout => "layout",
            Self::Page => "page",
            Self::Snippet => "snippet",
        }
    }

    /// Layouts and pages form trees, snippets are a flat collection
    pub fn is_tree(&self) -> bool {
        !matches!(self, Self::Snippet)
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A layout, page or snippet record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ContentNode {
    pub id: NodeId,
    pub site_id: SiteId,
    pub kind: ContentKind,
    pub parent_id: Option<NodeId>,
    /// Pages only: the layout the page renders with
    pub layout_id: Option<NodeId>,
    /// Layout or snippet identifier, page slug
    pub identifier: String,
    /// Pages only, empty for other kinds
    pub full_path: String,
    pub label: String,
    pub content: String,
    pub position: i32,
    pub is_published: bool,
}

impl ContentNode {
    /// Build a new, parentless node
    pub fn new(site_id: SiteId, kind: ContentKind, identifier: impl Into<String>) -> Self {
        let identifier = identifier.into();
        let full_path = match kind {
            ContentKind::Page => page_full_path(None, &identifier),
            _ => String::new(),
        };
        Self {
            id: NodeId::new(),
            site_id,
            kind,
            parent_id: None,
            layout_id: None,
            label: identifier.clone(),
            identifier,
            full_path,
            content: String::new(),
            position: 0,
            is_published: true,
        }
    }

    /// Attach this node under `parent`, recomputing the full path for pages
    pub fn with_parent(mut self, parent: &ContentNode) -> Self {
        self.parent_id = Some(parent.id);
        if self.kind == ContentKind::Page {
            self.full_path = page_full_path(Some(&parent.full_path), &self.identifier);
        }
        self
    }

    pub fn with_position(mut self, position: i32) -> Self {
        self.position = position;
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_layout(mut self, layout: &ContentNode) -> Self {
        self.layout_id = Some(layout.id);
        self
    }

    /// Key used to find this node's counterpart in a mirrored site
    pub fn mirror_key(&self) -> &str {
        match self.kind {
            ContentKind::Page => &self.full_path,
            _ => &self.identifier,
        }
    }
}

/// Full path of a page given its parent's full path and its own slug
pub fn page_full_path(parent_full_path: Option<&str>, slug: &str) -> String {
    let Some(parent) = parent_full_path else {
        return "/".to_string();
    };
    let joined = format!("{}/{}", parent, slug);
    let mut path = String::with_capacity(joined.len());
    for c in joined.chars() {
        if c == '/' && path.ends_with('/') {
            continue;
        }
        path.push(c);
    }
    path
}
