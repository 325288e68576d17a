//! Read-only blog endpoints over the MDX content directory.

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::blog::{query, BlogPage, BlogPost, BlogTag};
use crate::error::{AppError, AppResult};
use crate::AppState;

/// Posts returned by `/api/recent-blogs`.
pub const RECENT_POSTS: usize = 3;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for GET /api/blog/posts
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostsQuery {
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    pub tag: Option<String>,
    pub category: Option<String>,
    pub q: Option<String>,
}

fn default_page() -> usize {
    1
}

fn default_page_size() -> usize {
    10
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogIndexResponse {
    pub all_posts: Vec<BlogPost>,
    pub featured_posts: Vec<BlogPost>,
    pub tags: Vec<BlogTag>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentPostsResponse {
    pub recent_posts: Vec<BlogPost>,
    pub success: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/blog
pub async fn blog_index(State(state): State<AppState>) -> Json<BlogIndexResponse> {
    let posts = state.blog.all_posts().await;
    Json(BlogIndexResponse {
        featured_posts: query::featured_posts(&posts),
        tags: query::all_tags(&posts),
        all_posts: posts,
    })
}

/// GET /api/blog/posts
/// Filters apply in order tag, category, search; the result is paginated.
pub async fn list_posts(
    State(state): State<AppState>,
    params: Result<Query<PostsQuery>, QueryRejection>,
) -> AppResult<Json<BlogPage>> {
    let Query(params) = params.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let mut posts = state.blog.all_posts().await;
    if let Some(tag) = params.tag.as_deref().filter(|t| !t.trim().is_empty()) {
        posts = query::posts_by_tag(&posts, tag);
    }
    if let Some(category) = params.category.as_deref().filter(|c| !c.trim().is_empty()) {
        posts = query::posts_by_category(&posts, category);
    }
    if let Some(q) = params.q.as_deref() {
        posts = query::search_posts(&posts, q);
    }

    Ok(Json(query::paginate(&posts, params.page, params.page_size)))
}

/// GET /api/blog/tags
pub async fn list_tags(State(state): State<AppState>) -> Json<Vec<BlogTag>> {
    Json(state.blog.all_tags().await)
}

/// GET /api/blog/{slug}
/// Direct links reach unpublished posts as well.
pub async fn get_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Json<BlogPost>> {
    state
        .blog
        .post_by_slug(&slug)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))
}

/// GET /api/recent-blogs
pub async fn recent_blogs(State(state): State<AppState>) -> impl IntoResponse {
    let unreadable =
        tokio::fs::metadata(state.blog.dir()).await.is_ok() && !state.blog.is_readable().await;
    if unreadable {
        tracing::error!(dir = %state.blog.dir().display(), "blog content directory is not readable");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(RecentPostsResponse {
                recent_posts: Vec::new(),
                success: false,
            }),
        );
    }

    (
        StatusCode::OK,
        Json(RecentPostsResponse {
            recent_posts: state.blog.recent_posts(RECENT_POSTS).await,
            success: true,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blog::loader::tests::fixture;
    use crate::tests::{test_app, test_state};
    use axum::body::Body;
    use axum::http::Request;
    use axum::Router;
    use tower::ServiceExt;

    fn blog_router() -> (Router, tempfile::TempDir) {
        let tmp = fixture();
        let (state, _) = test_state(tmp.path(), "http://127.0.0.1:9");
        (test_app(state), tmp)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(app: Router, uri: &str) -> (StatusCode, T) {
        let req = Request::get(uri).body(Body::empty()).unwrap();
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value: T = serde_json::from_slice(&body).unwrap();
        (status, value)
    }

    #[tokio::test]
    async fn test_blog_index_lists_published_posts() {
        let (app, _tmp) = blog_router();
        let (status, body) = get_json::<BlogIndexResponse>(app, "/api/blog").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.all_posts.len(), 3);
        assert_eq!(body.all_posts[0].slug, "second-post");
        assert_eq!(body.featured_posts.len(), 1);
        assert_eq!(body.tags[0].slug, "rust");
    }

    #[tokio::test]
    async fn test_list_posts_paginates_and_filters() {
        let (app, _tmp) = blog_router();
        let (status, page) =
            get_json::<serde_json::Value>(app.clone(), "/api/blog/posts?page=2&pageSize=2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["total"], 3);
        assert_eq!(page["totalPages"], 2);
        assert_eq!(page["items"][0]["slug"], "first-post");

        let (_, page) = get_json::<BlogPage>(app.clone(), "/api/blog/posts?tag=Rust").await;
        assert_eq!(page.total, 2);

        let (_, page) = get_json::<BlogPage>(app, "/api/blog/posts?q=styling").await;
        assert_eq!(page.items[0].slug, "third-post");
    }

    #[tokio::test]
    async fn test_list_posts_rejects_bad_query() {
        let (app, _tmp) = blog_router();
        let (status, body) =
            get_json::<serde_json::Value>(app, "/api/blog/posts?page=abc").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_get_post_found_draft_and_missing() {
        let (app, _tmp) = blog_router();
        let (status, post) = get_json::<BlogPost>(app.clone(), "/api/blog/first-post").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(post.title, "First");

        let (status, post) = get_json::<BlogPost>(app.clone(), "/api/blog/draft").await;
        assert_eq!(status, StatusCode::OK);
        assert!(!post.published);

        let (status, body) = get_json::<serde_json::Value>(app, "/api/blog/missing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Post not found");
    }

    #[tokio::test]
    async fn test_recent_blogs_returns_three() {
        let (app, _tmp) = blog_router();
        let (status, body) = get_json::<RecentPostsResponse>(app, "/api/recent-blogs").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.success);
        assert_eq!(body.recent_posts.len(), 3);
    }

    #[tokio::test]
    async fn test_tags_endpoint() {
        let (app, _tmp) = blog_router();
        let (status, tags) = get_json::<Vec<BlogTag>>(app, "/api/blog/tags").await;
        assert_eq!(status, StatusCode::OK);
        assert!(tags.iter().any(|t| t.slug == "css" && t.count == 1));
    }
}
