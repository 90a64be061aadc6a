//! HTTP surface tests driven through the routers with `tower::oneshot`.

mod common;

use std::num::NonZeroUsize;
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use common::{StubPostsRepo, sample_post};
use kindred_api_types::{LikeTally, PopularPost, PostStatsView, RelatedPost, TotalLikes};
use serde::de::DeserializeOwned;
use serde_json::json;
use tower::ServiceExt;

use kindred::application::admin::AdminPostService;
use kindred::application::popular::PopularPostsService;
use kindred::application::related::{RelatedPostsConfig, RelatedPostsService};
use kindred::application::repos::{PostsRepo, PostsWriteRepo};
use kindred::application::stats::{DEFAULT_MAX_LIKES_PER_USER, PostStatsService};
use kindred::cache::{
    CacheConfig, CacheService, EventQueue, InvalidationConsumer, InvalidationTrigger, MemoryStore,
};
use kindred::domain::entities::PostRecord;
use kindred::infra::http::{AdminState, PublicState, build_admin_router, build_public_router};

const ADMIN_TOKEN: &str = "test-admin-token";

fn catalog() -> Arc<StubPostsRepo> {
    Arc::new(StubPostsRepo::new(vec![
        sample_post("a", &["react", "nextjs"]),
        sample_post("b", &["react", "nextjs", "css"]),
        sample_post("c", &["react"]),
    ]))
}

fn build_routers(repo: Arc<StubPostsRepo>) -> (Router, Router) {
    let store = Arc::new(MemoryStore::new(NonZeroUsize::new(256).expect("non-zero")));
    let cache = Arc::new(CacheService::new(store));
    let posts_repo: Arc<dyn PostsRepo> = repo.clone();
    let posts_write_repo: Arc<dyn PostsWriteRepo> = repo;

    let config = CacheConfig::default();
    let queue = Arc::new(EventQueue::new());
    let consumer = Arc::new(InvalidationConsumer::new(
        config.clone(),
        cache.clone(),
        posts_repo.clone(),
        queue.clone(),
    ));
    let trigger = Arc::new(InvalidationTrigger::new(config, queue, consumer));

    let public_state = PublicState {
        posts: posts_repo.clone(),
        related: Arc::new(RelatedPostsService::new(
            posts_repo.clone(),
            cache.clone(),
            RelatedPostsConfig::default(),
        )),
        stats: Arc::new(PostStatsService::new(
            cache.clone(),
            DEFAULT_MAX_LIKES_PER_USER,
        )),
        popular: Arc::new(PopularPostsService::new(cache)),
        user_hash_salt: Arc::new("test-salt".to_string()),
    };

    let admin_state = AdminState {
        posts: Arc::new(AdminPostService::new(
            posts_repo,
            posts_write_repo,
            trigger,
        )),
        token: Some(Arc::from(ADMIN_TOKEN)),
    };

    (
        build_public_router(public_state),
        build_admin_router(admin_state),
    )
}

async fn read_json<T: DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

fn get(path: &str) -> Request<Body> {
    Request::builder()
        .uri(path)
        .header("x-forwarded-for", "203.0.113.7")
        .body(Body::empty())
        .expect("request")
}

fn post(path: &str, ip: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header("x-forwarded-for", ip)
        .body(Body::empty())
        .expect("request")
}

#[tokio::test]
async fn related_endpoint_returns_the_ranking() {
    let (public, _) = build_routers(catalog());

    let response = public
        .oneshot(get("/posts/a/related?limit=2"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let related: Vec<RelatedPost> = read_json(response).await;
    assert_eq!(related.len(), 2);
    assert_eq!(related[0].slug, "b");
    assert_eq!(related[1].slug, "c");
}

#[tokio::test]
async fn views_and_likes_flow_through_the_public_api() {
    let (public, _) = build_routers(catalog());

    let response = public
        .clone()
        .oneshot(post("/posts/a/views", "203.0.113.7"))
        .await
        .expect("response");
    let first: PostStatsView = read_json(response).await;
    assert_eq!(first.views, 1);

    let response = public
        .clone()
        .oneshot(post("/posts/a/views", "203.0.113.7"))
        .await
        .expect("response");
    let second: PostStatsView = read_json(response).await;
    assert_eq!(second.views, 2);

    // Two likes from one caller, one from another.
    for _ in 0..2 {
        let response = public
            .clone()
            .oneshot(post("/posts/a/likes", "203.0.113.7"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }
    let response = public
        .clone()
        .oneshot(post("/posts/a/likes", "198.51.100.23"))
        .await
        .expect("response");
    let tally: LikeTally = read_json(response).await;
    assert_eq!(tally.total_likes, 3);
    assert_eq!(tally.user_likes, 1);

    let response = public
        .clone()
        .oneshot(get("/posts/a/likes"))
        .await
        .expect("response");
    let totals: TotalLikes = read_json(response).await;
    assert_eq!(totals.total_likes, 3);

    let response = public
        .oneshot(get("/posts/popular?limit=5"))
        .await
        .expect("response");
    let popular: Vec<PopularPost> = read_json(response).await;
    assert_eq!(popular.first().map(|entry| entry.slug.as_str()), Some("a"));
}

#[tokio::test]
async fn healthz_reports_no_content() {
    let (public, _) = build_routers(catalog());

    let response = public.oneshot(get("/healthz")).await.expect("response");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn admin_routes_reject_missing_or_wrong_tokens() {
    let (_, admin) = build_routers(catalog());

    let response = admin
        .clone()
        .oneshot(Request::builder().uri("/admin/posts").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = admin
        .oneshot(
            Request::builder()
                .uri("/admin/posts")
                .header(header::AUTHORIZATION, "Bearer wrong-token")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_can_create_and_delete_posts() {
    let repo = catalog();
    let (_, admin) = build_routers(repo.clone());

    let payload = json!({
        "title": "Borrow Checker Field Notes",
        "summary": "Lifetimes in anger",
        "tags": ["Rust", "Ownership"],
        "status": "published",
    });

    let response = admin
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/admin/posts")
                .header(header::AUTHORIZATION, format!("Bearer {ADMIN_TOKEN}"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(payload.to_string()))
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);

    let created: PostRecord = read_json(response).await;
    assert_eq!(created.slug, "borrow-checker-field-notes");
    assert_eq!(created.tags, vec!["rust", "ownership"]);
    assert!(created.published_at.is_some());

    let response = admin
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/admin/posts/{}", created.id))
                .header(header::AUTHORIZATION, format!("Bearer {ADMIN_TOKEN}"))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let deleted: PostRecord = read_json(response).await;
    assert!(deleted.deleted_at.is_some());
}
