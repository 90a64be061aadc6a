//! Public engagement API.
//!
//! Read-mostly JSON surface consumed during page rendering: related posts,
//! stats, view/like increments, and the popularity ranking. Callers are
//! identified only by their IP hash; there is no authentication here.

use std::sync::Arc;

use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router, middleware as axum_middleware};
use kindred_api_types::{PostStatsView, TotalLikes, UserLikes};
use serde::Deserialize;

use crate::application::memo::RequestMemo;
use crate::application::popular::PopularPostsService;
use crate::application::related::RelatedPostsService;
use crate::application::repos::PostsRepo;
use crate::application::stats::{PostStats, PostStatsService};
use crate::domain::identity::user_hash;

use super::error::ApiError;
use super::middleware::{self, ClientIp};

const DEFAULT_RELATED_LIMIT: usize = 4;
const DEFAULT_POPULAR_LIMIT: usize = 10;
const MAX_POPULAR_LIMIT: usize = 50;

#[derive(Clone)]
pub struct PublicState {
    pub posts: Arc<dyn PostsRepo>,
    pub related: Arc<RelatedPostsService>,
    pub stats: Arc<PostStatsService>,
    pub popular: Arc<PopularPostsService>,
    pub user_hash_salt: Arc<String>,
}

impl PublicState {
    fn caller_hash(&self, client_ip: &ClientIp) -> String {
        user_hash(&client_ip.0, &self.user_hash_salt)
    }
}

pub fn build_public_router(state: PublicState) -> Router {
    Router::new()
        .route("/posts/popular", get(get_popular_posts))
        .route("/posts/{slug}/related", get(get_related_posts))
        .route("/posts/{slug}/stats", get(get_post_stats))
        .route("/posts/{slug}/views", post(increment_views))
        .route(
            "/posts/{slug}/likes",
            post(increment_likes).get(get_total_likes),
        )
        .route("/posts/{slug}/likes/me", get(get_likes_by_user))
        .route("/healthz", get(healthz))
        .with_state(state)
        .layer(axum_middleware::from_fn(middleware::request_scope))
        .layer(axum_middleware::from_fn(middleware::log_responses))
}

#[derive(Debug, Deserialize)]
struct LimitQuery {
    limit: Option<usize>,
}

async fn get_related_posts(
    State(state): State<PublicState>,
    Path(slug): Path<String>,
    Query(query): Query<LimitQuery>,
    Extension(memo): Extension<Arc<RequestMemo>>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_RELATED_LIMIT);
    let related = state
        .related
        .get_related_posts(&slug, limit, Some(&memo))
        .await?;
    Ok(Json(related))
}

async fn get_post_stats(
    State(state): State<PublicState>,
    Path(slug): Path<String>,
    Extension(client_ip): Extension<ClientIp>,
) -> Json<PostStatsView> {
    let caller = state.caller_hash(&client_ip);
    let stats = state.stats.get_stats(&slug).await;
    Json(stats_view(&stats, &caller))
}

async fn increment_views(
    State(state): State<PublicState>,
    Path(slug): Path<String>,
    Extension(client_ip): Extension<ClientIp>,
) -> Json<PostStatsView> {
    let caller = state.caller_hash(&client_ip);
    let stats = state.stats.increment_views(&slug).await;
    Json(stats_view(&stats, &caller))
}

async fn increment_likes(
    State(state): State<PublicState>,
    Path(slug): Path<String>,
    Extension(client_ip): Extension<ClientIp>,
) -> impl IntoResponse {
    let caller = state.caller_hash(&client_ip);
    let tally = state.stats.increment_likes(&slug, &caller).await;
    Json(tally)
}

async fn get_total_likes(
    State(state): State<PublicState>,
    Path(slug): Path<String>,
) -> Json<TotalLikes> {
    let total_likes = state.stats.get_total_likes(&slug).await;
    Json(TotalLikes { total_likes })
}

async fn get_likes_by_user(
    State(state): State<PublicState>,
    Path(slug): Path<String>,
    Extension(client_ip): Extension<ClientIp>,
) -> Json<UserLikes> {
    let caller = state.caller_hash(&client_ip);
    let likes = state.stats.get_likes_by_user(&slug, &caller).await;
    Json(UserLikes { likes })
}

async fn get_popular_posts(
    State(state): State<PublicState>,
    Query(query): Query<LimitQuery>,
) -> impl IntoResponse {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_POPULAR_LIMIT)
        .clamp(1, MAX_POPULAR_LIMIT);
    Json(state.popular.get_popular_posts(limit).await)
}

async fn healthz(State(state): State<PublicState>) -> Result<StatusCode, ApiError> {
    state.posts.ping().await?;
    Ok(StatusCode::NO_CONTENT)
}

fn stats_view(stats: &PostStats, caller: &str) -> PostStatsView {
    PostStatsView {
        slug: stats.slug.clone(),
        views: stats.views,
        total_likes: stats.total_likes(),
        user_likes: stats.likes_for(caller),
    }
}
