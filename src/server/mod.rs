//! HTTP server for post pages and comment submissions

use anyhow::Result;
use axum::{
    extract::{Form, Path, State},
    http::{StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::cache::{CacheStatus, Lookup, RevalidationCache};
use crate::comments::{
    CommentForm, CommentSink, HttpCommentSink, SubmissionFlow, SubmissionGuard, SubmissionState,
};
use crate::content::Post;
use crate::render::{PageRenderer, SubmissionView};
use crate::store::ContentStore;
use crate::Blog;

/// Shared server state
pub struct AppState {
    pub cache: Arc<RevalidationCache>,
    pub renderer: PageRenderer,
    pub sink: Arc<dyn CommentSink>,
    pub guard: SubmissionGuard,
    /// Directory served under `/<assets_dir>`
    pub assets_dir: std::path::PathBuf,
    pub assets_route: String,
    /// Site root the routes are mounted under
    pub root: String,
}

impl AppState {
    pub fn new(
        blog: &Blog,
        cache: Arc<RevalidationCache>,
        sink: Arc<dyn CommentSink>,
    ) -> Result<Self> {
        Ok(Self {
            cache,
            renderer: PageRenderer::new(&blog.config)?,
            sink,
            guard: SubmissionGuard::new(),
            assets_dir: blog.assets_dir.clone(),
            assets_route: format!("/{}", blog.config.assets_dir.trim_matches('/')),
            root: match blog.config.root.trim_matches('/') {
                "" => String::new(),
                root => format!("/{}", root),
            },
        })
    }
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    let routes = Router::new()
        .route("/post/:slug", get(post_page))
        .route("/post/:slug/comment", post(submit_comment))
        .route("/healthz", get(healthz))
        .nest_service(&state.assets_route, ServeDir::new(&state.assets_dir));

    let app = if state.root.is_empty() {
        routes
    } else {
        Router::new().nest(&state.root, routes)
    };

    app.fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Pre-build every known post, then serve until shut down
pub async fn start(blog: &Blog, store: Arc<dyn ContentStore>, ip: &str, port: u16) -> Result<()> {
    let cache = Arc::new(RevalidationCache::new(blog.page_builder(store)));
    let paths = cache.builder().static_paths().await?;
    cache.warm(&paths).await?;

    let sink = Arc::new(HttpCommentSink::new(&blog.config.comments)?);
    let state = Arc::new(AppState::new(blog, cache, sink)?);
    let app = router(state);

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    println!("Server running at http://{}:{}", ip, port);
    println!("Press Ctrl+C to stop.");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// GET /post/:slug
async fn post_page(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    uri: Uri,
) -> Response {
    let (post, status) = match lookup(&state, &slug, &uri).await {
        Ok(found) => found,
        Err(response) => return response,
    };

    let view = SubmissionView::fresh(Some(state.guard.issue()));
    html(
        StatusCode::OK,
        Some(status),
        state.renderer.render_post(&post, &view),
    )
}

/// POST /post/:slug/comment
async fn submit_comment(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    uri: Uri,
    Form(form): Form<CommentForm>,
) -> Response {
    let (post, status) = match lookup(&state, &slug, &uri).await {
        Ok(found) => found,
        Err(response) => return response,
    };

    let mut flow = SubmissionFlow::new(state.sink.as_ref(), &state.guard);
    let (code, view) = match flow.submit(&post.id, &form).await {
        Err(errors) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            SubmissionView {
                state: flow.state().clone(),
                form: form.clone(),
                errors,
                token: form.submission_token.or_else(|| Some(state.guard.issue())),
            },
        ),
        Ok(()) => {
            let code = match flow.state() {
                SubmissionState::Failed { .. } => StatusCode::BAD_GATEWAY,
                _ => StatusCode::OK,
            };
            (
                code,
                SubmissionView {
                    state: flow.state().clone(),
                    form: form.clone(),
                    errors: Default::default(),
                    // A retry reuses the token so a late first delivery is not doubled
                    token: flow.token(),
                },
            )
        }
    };

    html(code, Some(status), state.renderer.render_post(&post, &view))
}

/// GET /healthz
async fn healthz(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "cached_pages": state.cache.len().await,
    }))
}

async fn not_found(State(state): State<Arc<AppState>>, uri: Uri) -> Response {
    html(
        StatusCode::NOT_FOUND,
        None,
        state.renderer.render_not_found(uri.path()),
    )
}

/// Fetch a page from the cache or answer with the matching error page
async fn lookup(
    state: &AppState,
    slug: &str,
    uri: &Uri,
) -> Result<(Arc<Post>, CacheStatus), Response> {
    match state.cache.get(slug).await {
        Ok(Lookup {
            page: Some(post),
            status,
        }) => Ok((post, status)),
        Ok(Lookup { page: None, status }) => Err(html(
            StatusCode::NOT_FOUND,
            Some(status),
            state.renderer.render_not_found(uri.path()),
        )),
        Err(e) => {
            tracing::error!("Failed to build page {:?}: {:#}", slug, e);
            Err(html(
                StatusCode::INTERNAL_SERVER_ERROR,
                None,
                state.renderer.render_error(),
            ))
        }
    }
}

fn html(
    code: StatusCode,
    cache: Option<CacheStatus>,
    body: Result<String>,
) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(e) => {
            tracing::error!("Template error: {:#}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response();
        }
    };

    match cache {
        Some(status) => (code, [("x-cache", status.as_str())], Html(body)).into_response(),
        None => (code, Html(body)).into_response(),
    }
}
