//! PostgreSQL store

use async_trait::async_trait;
use sqlx::PgPool;

use super::{ContentStore, SiteDirectory};
use crate::error::{SiteError, SiteResult};
use crate::types::{ContentKind, ContentNode, NodeId, Site, SiteId};
use crate::validation::SiteFields;

const SITE_COLUMNS: &str =
    "id, identifier, hostname, path, label, is_mirrored, created_at, updated_at";

const NODE_COLUMNS: &str = "id, site_id, kind, parent_id, layout_id, identifier, full_path, \
                            label, content, position, is_published";

/// Store backed by the `sites` and `content_nodes` tables
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SiteDirectory for PgStore {
    async fn count_sites(&self) -> SiteResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sites")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn first_site(&self) -> SiteResult<Option<Site>> {
        let site = sqlx::query_as::<_, Site>(&format!(
            "SELECT {} FROM sites ORDER BY created_at, id LIMIT 1",
            SITE_COLUMNS
        ))
        .fetch_optional(&self.pool)
        .await?;
        Ok(site)
    }

    async fn list_sites(&self) -> SiteResult<Vec<Site>> {
        let sites = sqlx::query_as::<_, Site>(&format!(
            "SELECT {} FROM sites ORDER BY created_at, id",
            SITE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(sites)
    }

    async fn find_site(&self, id: SiteId) -> SiteResult<Option<Site>> {
        let site = sqlx::query_as::<_, Site>(&format!(
            "SELECT {} FROM sites WHERE id = $1",
            SITE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(site)
    }

    async fn sites_by_hostname(&self, hostname: &str) -> SiteResult<Vec<Site>> {
        let sites = sqlx::query_as::<_, Site>(&format!(
            "SELECT {} FROM sites WHERE hostname = $1 ORDER BY created_at, id",
            SITE_COLUMNS
        ))
        .bind(hostname)
        .fetch_all(&self.pool)
        .await?;
        Ok(sites)
    }

    async fn mirrored_sites(&self) -> SiteResult<Vec<Site>> {
        let sites = sqlx::query_as::<_, Site>(&format!(
            "SELECT {} FROM sites WHERE is_mirrored = TRUE ORDER BY identifier",
            SITE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(sites)
    }

    async fn insert_site(&self, fields: SiteFields) -> SiteResult<Site> {
        let site = sqlx::query_as::<_, Site>(&format!(
            r#"
            INSERT INTO sites (id, identifier, hostname, path, label, is_mirrored)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            SITE_COLUMNS
        ))
        .bind(SiteId::new())
        .bind(&fields.identifier)
        .bind(&fields.hostname)
        .bind(&fields.path)
        .bind(&fields.label)
        .bind(fields.is_mirrored)
        .fetch_one(&self.pool)
        .await?;
        Ok(site)
    }

    async fn update_site(&self, id: SiteId, fields: SiteFields) -> SiteResult<Site> {
        sqlx::query_as::<_, Site>(&format!(
            r#"
            UPDATE sites
            SET identifier = $2, hostname = $3, path = $4, label = $5,
                is_mirrored = $6, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            SITE_COLUMNS
        ))
        .bind(id)
        .bind(&fields.identifier)
        .bind(&fields.hostname)
        .bind(&fields.path)
        .bind(&fields.label)
        .bind(fields.is_mirrored)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| SiteError::NotFound(format!("site {}", id)))
    }

    async fn update_mirror_flag(&self, id: SiteId, is_mirrored: bool) -> SiteResult<()> {
        sqlx::query("UPDATE sites SET is_mirrored = $2 WHERE id = $1")
            .bind(id)
            .bind(is_mirrored)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_site(&self, id: SiteId) -> SiteResult<bool> {
        // content_nodes, site_files and site_categories cascade
        let result = sqlx::query("DELETE FROM sites WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> SiteResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl ContentStore for PgStore {
    async fn roots_of(&self, site_id: SiteId, kind: ContentKind) -> SiteResult<Vec<ContentNode>> {
        let nodes = sqlx::query_as::<_, ContentNode>(&format!(
            r#"
            SELECT {} FROM content_nodes
            WHERE site_id = $1 AND kind = $2 AND parent_id IS NULL
            ORDER BY position, created_at
            "#,
            NODE_COLUMNS
        ))
        .bind(site_id)
        .bind(kind)
        .fetch_all(&self.pool)
        .await?;
        Ok(nodes)
    }

    async fn children_of(&self, node_id: NodeId) -> SiteResult<Vec<ContentNode>> {
        let nodes = sqlx::query_as::<_, ContentNode>(&format!(
            "SELECT {} FROM content_nodes WHERE parent_id = $1 ORDER BY position, created_at",
            NODE_COLUMNS
        ))
        .bind(node_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(nodes)
    }

    async fn nodes_of(&self, site_id: SiteId, kind: ContentKind) -> SiteResult<Vec<ContentNode>> {
        let nodes = sqlx::query_as::<_, ContentNode>(&format!(
            r#"
            SELECT {} FROM content_nodes
            WHERE site_id = $1 AND kind = $2
            ORDER BY position, created_at
            "#,
            NODE_COLUMNS
        ))
        .bind(site_id)
        .bind(kind)
        .fetch_all(&self.pool)
        .await?;
        Ok(nodes)
    }

    async fn find_node(&self, id: NodeId) -> SiteResult<Option<ContentNode>> {
        let node = sqlx::query_as::<_, ContentNode>(&format!(
            "SELECT {} FROM content_nodes WHERE id = $1",
            NODE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(node)
    }

    async fn find_by_mirror_key(
        &self,
        site_id: SiteId,
        kind: ContentKind,
        key: &str,
    ) -> SiteResult<Option<ContentNode>> {
        let key_column = match kind {
            ContentKind::Page => "full_path",
            _ => "identifier",
        };
        let node = sqlx::query_as::<_, ContentNode>(&format!(
            "SELECT {} FROM content_nodes WHERE site_id = $1 AND kind = $2 AND {} = $3 LIMIT 1",
            NODE_COLUMNS, key_column
        ))
        .bind(site_id)
        .bind(kind)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(node)
    }

    async fn save_node(&self, node: ContentNode) -> SiteResult<ContentNode> {
        let saved = sqlx::query_as::<_, ContentNode>(&format!(
            r#"
            INSERT INTO content_nodes
                (id, site_id, kind, parent_id, layout_id, identifier, full_path,
                 label, content, position, is_published)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (id) DO UPDATE SET
                parent_id = EXCLUDED.parent_id,
                layout_id = EXCLUDED.layout_id,
                identifier = EXCLUDED.identifier,
                full_path = EXCLUDED.full_path,
                label = EXCLUDED.label,
                content = EXCLUDED.content,
                position = EXCLUDED.position,
                is_published = EXCLUDED.is_published,
                updated_at = NOW()
            RETURNING {}
            "#,
            NODE_COLUMNS
        ))
        .bind(node.id)
        .bind(node.site_id)
        .bind(node.kind)
        .bind(node.parent_id)
        .bind(node.layout_id)
        .bind(&node.identifier)
        .bind(&node.full_path)
        .bind(&node.label)
        .bind(&node.content)
        .bind(node.position)
        .bind(node.is_published)
        .fetch_one(&self.pool)
        .await?;
        Ok(saved)
    }

    async fn count_nodes(&self, site_id: SiteId, kind: ContentKind) -> SiteResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM content_nodes WHERE site_id = $1 AND kind = $2")
                .bind(site_id)
                .bind(kind)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}
