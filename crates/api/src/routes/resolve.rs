//! Site resolution endpoints and middleware

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, Request, Uri},
    middleware::Next,
    response::Response,
    Extension, Json,
};
use hostcms_shared::content::find_published_page;
use hostcms_shared::{ContentNode, Site};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::routing::ResolvedSite;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ResolveQuery {
    pub host: Option<String>,
    pub path: Option<String>,
}

/// `GET /api/v1/resolve?host=&path=`
pub async fn resolve(
    State(state): State<AppState>,
    Query(query): Query<ResolveQuery>,
) -> ApiResult<Json<ResolvedSite>> {
    let host = query
        .host
        .ok_or_else(|| ApiError::BadRequest("host is required".to_string()))?;
    let resolved = state.resolver.resolve(&host, query.path.as_deref()).await?;
    Ok(Json(resolved))
}

/// Resolve the request's host and path to a site and attach it as a
/// `ResolvedSite` extension. Unresolvable requests get a 404.
pub async fn resolve_site(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let host = request_host(&request).unwrap_or_default();
    let path = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    let resolved = state.resolver.resolve(&host, Some(&path)).await?;
    tracing::debug!(
        host = %host,
        path = %path,
        site_id = %resolved.site.id,
        "Request bound to site"
    );
    request.extensions_mut().insert(resolved);
    Ok(next.run(request).await)
}

/// Host header, falling back to the URI authority
fn request_host(request: &Request<Body>) -> Option<String> {
    request
        .headers()
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
        .or_else(|| request.uri().authority().map(|a| a.as_str().to_string()))
}

#[derive(Debug, Serialize)]
pub struct PageResponse {
    pub site: Site,
    pub page: ContentNode,
}

/// Published page of the resolved site at the request path
pub async fn page(
    State(state): State<AppState>,
    Extension(resolved): Extension<ResolvedSite>,
    uri: Uri,
) -> ApiResult<Json<PageResponse>> {
    let page_path = strip_site_path(&resolved.site.path, uri.path());
    let page = find_published_page(state.content.as_ref(), resolved.site.id, &page_path).await?;
    Ok(Json(PageResponse {
        site: resolved.site,
        page,
    }))
}

/// Request path relative to the site's path prefix
fn strip_site_path(site_path: &str, request_path: &str) -> String {
    let prefix = site_path.trim_end_matches('/');
    if prefix.is_empty() {
        return request_path.to_string();
    }
    let prefix = if prefix.starts_with('/') {
        prefix.to_string()
    } else {
        format!("/{}", prefix)
    };
    match request_path.strip_prefix(prefix.as_str()) {
        Some("") => "/".to_string(),
        Some(rest) if rest.starts_with('/') => rest.to_string(),
        _ => request_path.to_string(),
    }
}
