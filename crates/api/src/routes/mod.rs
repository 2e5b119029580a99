//! API routes

pub mod health;
pub mod resolve;
pub mod sites;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, put},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::{auth::require_admin, state::AppState};

/// Create all API routes
pub fn create_router(state: AppState) -> Router {
    // Health check routes (at root level for infrastructure monitoring)
    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness));

    let public_api_routes = Router::new().route("/resolve", get(resolve::resolve));

    let admin_api_routes = Router::new()
        .route("/sites", get(sites::list_sites).post(sites::create_site))
        .route(
            "/sites/:site_id",
            get(sites::get_site)
                .patch(sites::update_site)
                .delete(sites::delete_site),
        )
        .route("/sites/:site_id/pages", get(sites::list_pages))
        .route("/sites/:site_id/pages/lookup", get(sites::lookup_page))
        .route("/sites/:site_id/pages/reorder", put(sites::reorder_site_pages))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    let api_v1_routes = Router::new()
        .merge(public_api_routes)
        .merge(admin_api_routes);

    // Content served for whichever site the Host header and path resolve to.
    // Nested, so handlers and the middleware see the path below `/page`.
    let site_routes = Router::new()
        .route("/", get(resolve::page))
        .route("/*path", get(resolve::page))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            resolve::resolve_site,
        ));

    Router::new()
        .merge(health_routes)
        .nest("/api/v1", api_v1_routes)
        .nest("/page", site_routes)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        response::Response,
    };
    use hostcms_shared::{ContentKind, ContentNode, NodeId, SiteDraft};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::Config;

    const TOKEN: &str = "0123456789abcdef0123456789abcdef";

    fn test_state() -> AppState {
        AppState::in_memory(Config {
            admin_api_token: Some(TOKEN.to_string()),
            ..Config::default()
        })
    }

    async fn seed_site(state: &AppState, identifier: &str, hostname: &str, path: &str) -> hostcms_shared::Site {
        state
            .sites
            .create(SiteDraft {
                identifier: Some(identifier.to_string()),
                hostname: Some(hostname.to_string()),
                path: Some(path.to_string()),
                ..Default::default()
            })
            .await
            .unwrap()
            .site
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn admin(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", TOKEN));
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        let app = create_router(test_state());

        let response = app.clone().oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "healthy");

        let response = app.clone().oneshot(get("/health/live")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.oneshot(get("/health/ready")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_resolve_endpoint() {
        let state = test_state();
        seed_site(&state, "main", "main.example", "").await;
        seed_site(&state, "blog", "main.example", "/blog").await;
        let app = create_router(state);

        let response = app
            .clone()
            .oneshot(get("/api/v1/resolve?host=MAIN.example&path=/blog/post-1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["site"]["identifier"], "blog");
        assert_eq!(body["resolution_type"], "path_prefix");

        let response = app
            .clone()
            .oneshot(get("/api/v1/resolve?host=other.example&path=/"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "SITE_NOT_FOUND");

        let response = app.oneshot(get("/api/v1/resolve")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_admin_routes_require_token() {
        let app = create_router(test_state());

        let response = app.clone().oneshot(get("/api/v1/sites")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let request = Request::builder()
            .uri("/api/v1/sites")
            .header(header::AUTHORIZATION, "Bearer wrong")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .oneshot(admin("GET", "/api/v1/sites", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_admin_routes_closed_without_configured_token() {
        let app = create_router(AppState::in_memory(Config::default()));
        let response = app
            .oneshot(admin("GET", "/api/v1/sites", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_site_crud() {
        let app = create_router(test_state());

        let response = app
            .clone()
            .oneshot(admin(
                "POST",
                "/api/v1/sites",
                Some(json!({ "hostname": "shop.example", "path": "/store/" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        assert_eq!(body["site"]["identifier"], "shop-example");
        assert_eq!(body["site"]["path"], "/store");
        let id = body["site"]["id"].as_str().unwrap().to_string();

        // duplicate identifier
        let response = app
            .clone()
            .oneshot(admin(
                "POST",
                "/api/v1/sites",
                Some(json!({ "identifier": "shop-example", "hostname": "other.example" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        // invalid hostname
        let response = app
            .clone()
            .oneshot(admin(
                "POST",
                "/api/v1/sites",
                Some(json!({ "identifier": "bad", "hostname": "no spaces" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .clone()
            .oneshot(admin(
                "PATCH",
                &format!("/api/v1/sites/{}", id),
                Some(json!({ "label": "Shop" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["site"]["label"], "Shop");

        let response = app
            .clone()
            .oneshot(admin("GET", &format!("/api/v1/sites/{}", id), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(admin("DELETE", &format!("/api/v1/sites/{}", id), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(admin("GET", &format!("/api/v1/sites/{}", id), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_mirror_flag_via_api_syncs_partner() {
        let state = test_state();
        let m1 = state
            .sites
            .create(SiteDraft {
                identifier: Some("m1".to_string()),
                is_mirrored: true,
                ..Default::default()
            })
            .await
            .unwrap()
            .site;
        state
            .content
            .save_node(ContentNode::new(m1.id, ContentKind::Layout, "default"))
            .await
            .unwrap();
        let m2 = seed_site(&state, "m2", "m2", "").await;
        let app = create_router(state.clone());

        let response = app
            .oneshot(admin(
                "PATCH",
                &format!("/api/v1/sites/{}", m2.id),
                Some(json!({ "is_mirrored": true })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["mirror_sync"]["partner_id"], m1.id.to_string());
        assert_eq!(
            state.content.count_nodes(m2.id, ContentKind::Layout).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_page_routes() {
        let state = test_state();
        let main = seed_site(&state, "main", "main.example", "").await;
        let blog = seed_site(&state, "blog", "main.example", "/blog").await;

        let root = ContentNode::new(main.id, ContentKind::Page, "index");
        let about = ContentNode::new(main.id, ContentKind::Page, "about").with_parent(&root);
        let mut draft = ContentNode::new(main.id, ContentKind::Page, "draft").with_parent(&root);
        draft.is_published = false;
        let blog_root = ContentNode::new(blog.id, ContentKind::Page, "index");
        let post = ContentNode::new(blog.id, ContentKind::Page, "post-1").with_parent(&blog_root);
        for node in [root, about, draft, blog_root, post] {
            state.content.save_node(node).await.unwrap();
        }
        let app = create_router(state);

        let host_get = |uri: &str| {
            Request::builder()
                .uri(uri)
                .header(header::HOST, "main.example")
                .body(Body::empty())
                .unwrap()
        };

        let response = app.clone().oneshot(host_get("/page/about")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["site"]["identifier"], "main");
        assert_eq!(body["page"]["full_path"], "/about");

        let response = app.clone().oneshot(host_get("/page/blog/post-1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["site"]["identifier"], "blog");
        assert_eq!(body["page"]["full_path"], "/post-1");

        let response = app.clone().oneshot(host_get("/page/draft")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let request = Request::builder()
            .uri("/page/about")
            .header(header::HOST, "unknown.example")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["error"]["code"], "SITE_NOT_FOUND");

        let response = app
            .clone()
            .oneshot(admin(
                "GET",
                &format!("/api/v1/sites/{}/pages", main.id),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let groups = json_body(response).await;
        assert_eq!(groups.as_array().unwrap().len(), 2);

        let response = app
            .oneshot(admin(
                "GET",
                &format!("/api/v1/sites/{}/pages/lookup?path=/about/", main.id),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["identifier"], "about");
    }

    #[tokio::test]
    async fn test_reorder_pages_route() {
        let state = test_state();
        let main = seed_site(&state, "main", "main.example", "").await;
        let other = seed_site(&state, "other", "other.example", "").await;

        let root = ContentNode::new(main.id, ContentKind::Page, "index");
        let a = ContentNode::new(main.id, ContentKind::Page, "a").with_parent(&root);
        let b = ContentNode::new(main.id, ContentKind::Page, "b")
            .with_parent(&root)
            .with_position(1);
        let foreign = ContentNode::new(other.id, ContentKind::Page, "index");
        let (a_id, b_id, foreign_id) = (a.id, b.id, foreign.id);
        for node in [root, a, b, foreign] {
            state.content.save_node(node).await.unwrap();
        }
        let app = create_router(state.clone());

        let response = app
            .oneshot(admin(
                "PUT",
                &format!("/api/v1/sites/{}/pages/reorder", main.id),
                Some(json!({ "page_ids": [b_id, foreign_id, a_id] })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["updated"], 2);

        let position = |id: NodeId| {
            let state = state.clone();
            async move { state.content.find_node(id).await.unwrap().unwrap().position }
        };
        assert_eq!(position(b_id).await, 0);
        assert_eq!(position(a_id).await, 2);
        assert_eq!(position(foreign_id).await, 0);
    }
}
