//! Site management routes (admin token required)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use hostcms_shared::content::{
    find_published_page, pages_grouped_by_parent, reorder_pages, PageGroup,
};
use hostcms_shared::{ContentNode, NodeId, Site, SiteChanges, SiteDraft, SiteId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::sites::SiteWrite;
use crate::state::AppState;

/// List all sites
pub async fn list_sites(State(state): State<AppState>) -> ApiResult<Json<Vec<Site>>> {
    Ok(Json(state.sites.list().await?))
}

/// Register a new site
pub async fn create_site(
    State(state): State<AppState>,
    Json(draft): Json<SiteDraft>,
) -> ApiResult<(StatusCode, Json<SiteWrite>)> {
    let written = state.sites.create(draft).await?;
    Ok((StatusCode::CREATED, Json(written)))
}

pub async fn get_site(
    State(state): State<AppState>,
    Path(site_id): Path<Uuid>,
) -> ApiResult<Json<Site>> {
    Ok(Json(state.sites.get(SiteId::from(site_id)).await?))
}

pub async fn update_site(
    State(state): State<AppState>,
    Path(site_id): Path<Uuid>,
    Json(changes): Json<SiteChanges>,
) -> ApiResult<Json<SiteWrite>> {
    Ok(Json(state.sites.update(SiteId::from(site_id), changes).await?))
}

/// Delete a site with all of its content
pub async fn delete_site(
    State(state): State<AppState>,
    Path(site_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.sites.destroy(SiteId::from(site_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Pages of a site grouped by parent
pub async fn list_pages(
    State(state): State<AppState>,
    Path(site_id): Path<Uuid>,
) -> ApiResult<Json<Vec<PageGroup>>> {
    let site = state.sites.get(SiteId::from(site_id)).await?;
    let groups = pages_grouped_by_parent(state.content.as_ref(), site.id).await?;
    Ok(Json(groups))
}

#[derive(Debug, Deserialize)]
pub struct PageLookupQuery {
    pub path: Option<String>,
}

/// Published page at a full path
pub async fn lookup_page(
    State(state): State<AppState>,
    Path(site_id): Path<Uuid>,
    Query(query): Query<PageLookupQuery>,
) -> ApiResult<Json<ContentNode>> {
    let path = query
        .path
        .ok_or_else(|| ApiError::BadRequest("path is required".to_string()))?;
    let site = state.sites.get(SiteId::from(site_id)).await?;
    let page = find_published_page(state.content.as_ref(), site.id, &path).await?;
    Ok(Json(page))
}

#[derive(Debug, Deserialize)]
pub struct ReorderPagesRequest {
    pub page_ids: Vec<NodeId>,
}

#[derive(Debug, Serialize)]
pub struct ReorderPagesResponse {
    pub updated: usize,
}

/// Reposition pages in the order given; ids outside the site are ignored
pub async fn reorder_site_pages(
    State(state): State<AppState>,
    Path(site_id): Path<Uuid>,
    Json(request): Json<ReorderPagesRequest>,
) -> ApiResult<Json<ReorderPagesResponse>> {
    let site = state.sites.get(SiteId::from(site_id)).await?;
    let updated = reorder_pages(state.content.as_ref(), site.id, &request.page_ids).await?;
    Ok(Json(ReorderPagesResponse { updated }))
}
