//! Structural content trees
//!
//! Loading a tree from storage and flattening it into a traversal order are
//! separate steps: `load_tree` always goes back to the store, `flatten` is a
//! pure function of the loaded shape.

use serde::Serialize;

use crate::error::{SiteError, SiteResult};
use crate::store::ContentStore;
use crate::types::{ContentKind, ContentNode, NodeId, SiteId};

#[derive(Debug, Clone)]
struct TreeEntry {
    node: ContentNode,
    children: Vec<usize>,
}

/// A freshly loaded layout tree, page tree or snippet list
#[derive(Debug, Clone)]
pub struct ContentTree {
    pub site_id: SiteId,
    pub kind: ContentKind,
    entries: Vec<TreeEntry>,
    roots: Vec<usize>,
    truncated: bool,
}

impl ContentTree {
    /// Number of loaded nodes
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when loading stopped at the node limit
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn roots(&self) -> impl Iterator<Item = &ContentNode> {
        self.roots.iter().map(|&i| &self.entries[i].node)
    }

    /// Every root in order, followed by the descendants of each root in
    /// pre-order. A parent always comes before its children.
    pub fn flatten(&self) -> Vec<&ContentNode> {
        let mut out: Vec<&ContentNode> = Vec::with_capacity(self.entries.len());
        out.extend(self.roots());

        for &root in &self.roots {
            let mut stack: Vec<usize> = self.entries[root].children.iter().rev().copied().collect();
            while let Some(index) = stack.pop() {
                let entry = &self.entries[index];
                out.push(&entry.node);
                stack.extend(entry.children.iter().rev().copied());
            }
        }
        out
    }
}

/// Load the current tree of `kind` for a site from storage.
///
/// Stops once more than `max_nodes` nodes are loaded and marks the tree as
/// truncated.
pub async fn load_tree(
    store: &dyn ContentStore,
    site_id: SiteId,
    kind: ContentKind,
    max_nodes: usize,
) -> SiteResult<ContentTree> {
    let mut tree = ContentTree {
        site_id,
        kind,
        entries: Vec::new(),
        roots: Vec::new(),
        truncated: false,
    };

    let roots = if kind.is_tree() {
        store.roots_of(site_id, kind).await?
    } else {
        store.nodes_of(site_id, kind).await?
    };
    for node in roots {
        tree.roots.push(tree.entries.len());
        tree.entries.push(TreeEntry {
            node,
            children: Vec::new(),
        });
    }

    if !kind.is_tree() {
        tree.truncated = tree.entries.len() > max_nodes;
        return Ok(tree);
    }

    // breadth-first expansion; child indices are recorded on their parent
    let mut next = 0;
    while next < tree.entries.len() {
        if tree.entries.len() > max_nodes {
            tree.truncated = true;
            break;
        }
        let children = store.children_of(tree.entries[next].node.id).await?;
        for child in children {
            let index = tree.entries.len();
            tree.entries.push(TreeEntry {
                node: child,
                children: Vec::new(),
            });
            tree.entries[next].children.push(index);
        }
        next += 1;
    }

    Ok(tree)
}

/// What a node-level mirror sync did to the counterpart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeSyncOutcome {
    Created,
    Updated,
    Unchanged,
}

/// Bring the counterpart of `node` in `target_site` in line with it.
///
/// The counterpart is found by mirror key and created when missing. Its
/// identifier, full path, position, parent and layout follow the source;
/// label is only copied on creation and body content stays per-site.
pub async fn sync_mirror(
    store: &dyn ContentStore,
    node: &ContentNode,
    target_site: SiteId,
) -> SiteResult<NodeSyncOutcome> {
    if node.site_id == target_site {
        return Ok(NodeSyncOutcome::Unchanged);
    }

    let parent_id = match node.parent_id {
        Some(parent_id) => {
            let parent = store
                .find_node(parent_id)
                .await?
                .ok_or_else(|| SiteError::NotFound(format!("parent {} of {}", parent_id, node.id)))?;
            let counterpart = store
                .find_by_mirror_key(target_site, node.kind, parent.mirror_key())
                .await?
                .ok_or_else(|| {
                    SiteError::NotFound(format!(
                        "{} '{}' has no counterpart in site {}",
                        node.kind,
                        parent.mirror_key(),
                        target_site
                    ))
                })?;
            Some(counterpart.id)
        }
        None => None,
    };

    let layout_id = match node.layout_id {
        Some(layout_id) => match store.find_node(layout_id).await? {
            Some(layout) => store
                .find_by_mirror_key(target_site, ContentKind::Layout, layout.mirror_key())
                .await?
                .map(|counterpart| counterpart.id),
            None => None,
        },
        None => None,
    };

    let existing = store
        .find_by_mirror_key(target_site, node.kind, node.mirror_key())
        .await?;
    let outcome = if existing.is_some() {
        NodeSyncOutcome::Updated
    } else {
        NodeSyncOutcome::Created
    };

    let mut mirror = existing.clone().unwrap_or_else(|| ContentNode {
        id: NodeId::new(),
        site_id: target_site,
        kind: node.kind,
        parent_id: None,
        layout_id: None,
        identifier: String::new(),
        full_path: String::new(),
        label: node.label.clone(),
        content: String::new(),
        position: 0,
        is_published: false,
    });
    mirror.identifier = node.identifier.clone();
    mirror.full_path = node.full_path.clone();
    mirror.parent_id = parent_id;
    mirror.layout_id = layout_id;
    mirror.position = node.position;

    if existing.as_ref() == Some(&mirror) {
        return Ok(NodeSyncOutcome::Unchanged);
    }

    store.save_node(mirror).await?;
    tracing::debug!(
        kind = %node.kind,
        key = %node.mirror_key(),
        target_site = %target_site,
        outcome = ?outcome,
        "Mirrored node"
    );
    Ok(outcome)
}

/// True when the site owns no pages
pub async fn no_pages(store: &dyn ContentStore, site_id: SiteId) -> SiteResult<bool> {
    Ok(store.count_nodes(site_id, ContentKind::Page).await? == 0)
}

/// The published page at `full_path`
pub async fn find_published_page(
    store: &dyn ContentStore,
    site_id: SiteId,
    full_path: &str,
) -> SiteResult<ContentNode> {
    let path = normalize_page_path(full_path);
    store
        .find_by_mirror_key(site_id, ContentKind::Page, &path)
        .await?
        .filter(|page| page.is_published)
        .ok_or_else(|| SiteError::NotFound(format!("page {}", path)))
}

/// Pages sharing one parent
#[derive(Debug, Clone, Serialize)]
pub struct PageGroup {
    pub parent_id: Option<NodeId>,
    pub pages: Vec<ContentNode>,
}

/// Pages grouped by parent, groups ordered by first appearance
pub async fn pages_grouped_by_parent(
    store: &dyn ContentStore,
    site_id: SiteId,
) -> SiteResult<Vec<PageGroup>> {
    let mut groups: Vec<PageGroup> = Vec::new();
    for page in store.nodes_of(site_id, ContentKind::Page).await? {
        match groups.iter_mut().find(|g| g.parent_id == page.parent_id) {
            Some(group) => group.pages.push(page),
            None => groups.push(PageGroup {
                parent_id: page.parent_id,
                pages: vec![page],
            }),
        }
    }
    Ok(groups)
}

/// Set each listed page's position to its index in `page_ids`.
///
/// Ids that are unknown, belong to another site or are not pages are
/// skipped. Returns how many pages were updated.
pub async fn reorder_pages(
    store: &dyn ContentStore,
    site_id: SiteId,
    page_ids: &[NodeId],
) -> SiteResult<usize> {
    let mut updated = 0;
    for (index, id) in page_ids.iter().enumerate() {
        let Some(mut page) = store.find_node(*id).await? else {
            continue;
        };
        if page.site_id != site_id || page.kind != ContentKind::Page {
            continue;
        }
        page.position = i32::try_from(index)
            .map_err(|_| SiteError::Validation("too many pages to reorder".to_string()))?;
        store.save_node(page).await?;
        updated += 1;
    }
    tracing::debug!(site_id = %site_id, updated, "Reordered pages");
    Ok(updated)
}

/// Request path to page full path: no query, no repeated or trailing slash
fn normalize_page_path(path: &str) -> String {
    let path = path.split('?').next().unwrap_or("");
    let mut normalized = String::from("/");
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        normalized.push_str(segment);
    }
    normalized
}
