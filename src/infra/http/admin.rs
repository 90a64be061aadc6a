//! Admin API: the CMS write path.
//!
//! Token-protected post CRUD on its own listener. Every mutation routes
//! through `AdminPostService`, which fires the invalidation triggers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{Request, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router, body::Body, middleware as axum_middleware};
use kindred_api_types::{PostCreateRequest, PostUpdateRequest};
use serde::Deserialize;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::application::admin::AdminPostService;

use super::error::ApiError;
use super::middleware;

const DEFAULT_LIST_LIMIT: u32 = 50;

#[derive(Clone)]
pub struct AdminState {
    pub posts: Arc<AdminPostService>,
    /// Shared bearer token; requests are rejected when unset.
    pub token: Option<Arc<str>>,
}

pub fn build_admin_router(state: AdminState) -> Router {
    let auth_state = state.clone();

    Router::new()
        .route("/admin/posts", get(list_posts).post(create_post))
        .route(
            "/admin/posts/{id}",
            get(get_post).put(update_post).delete(delete_post),
        )
        .route("/admin/posts/{id}/restore", post(restore_post))
        .with_state(state)
        .layer(axum_middleware::from_fn_with_state(auth_state, require_token))
        .layer(axum_middleware::from_fn(middleware::log_responses))
}

/// Constant-time bearer token check; fails closed when no token is set.
async fn require_token(
    State(state): State<AdminState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(expected) = state.token.as_deref() else {
        return ApiError::unauthorized(Some("admin token is not configured".to_string()))
            .into_response();
    };

    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    let Some(presented) = presented else {
        return ApiError::unauthorized(None).into_response();
    };

    if bool::from(presented.as_bytes().ct_eq(expected.as_bytes())) {
        next.run(request).await
    } else {
        ApiError::unauthorized(None).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct AdminListQuery {
    include_deleted: Option<bool>,
    limit: Option<u32>,
}

async fn list_posts(
    State(state): State<AdminState>,
    Query(query): Query<AdminListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let posts = state
        .posts
        .list_posts(
            query.include_deleted.unwrap_or(false),
            query.limit.unwrap_or(DEFAULT_LIST_LIMIT),
        )
        .await?;
    Ok(Json(posts))
}

async fn get_post(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    match state.posts.load_post(id).await? {
        Some(post) => Ok(Json(post)),
        None => Err(ApiError::not_found("post not found")),
    }
}

async fn create_post(
    State(state): State<AdminState>,
    Json(payload): Json<PostCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state.posts.create_post(payload).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

async fn update_post(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PostUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state.posts.update_post(id, payload).await?;
    Ok(Json(post))
}

async fn delete_post(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state.posts.delete_post(id).await?;
    Ok(Json(post))
}

async fn restore_post(
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state.posts.restore_post(id).await?;
    Ok(Json(post))
}
