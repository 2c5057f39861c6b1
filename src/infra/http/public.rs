use std::num::NonZeroUsize;
use std::sync::Arc;

use axum::{
    Router,
    extract::{Form, Path, Query, State},
    http::{HeaderMap, StatusCode, header::REFERER},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::{
    CookieJar,
    cookie::{Cookie, SameSite},
};
use serde::Deserialize;
use tracing::warn;
use url::Url;

use crate::{
    application::{
        content::{ContentError, ContentServices},
        listing::{Listable, ListingQuery, all_tags, filter_and_sort, paginate},
        session::SessionStore,
    },
    presentation::views::{
        AboutView, BlogCardView, BlogDetailTemplate, BlogListTemplate, LayoutView,
        LicenseCardView, LicensesTemplate, ListView, PortfolioCardView, PortfolioDetailTemplate,
        PortfolioListTemplate, IndexTemplate, Theme, render_not_found_response,
        render_template_response,
    },
};

use super::{
    RouterState, THEME_COOKIE, auth, build_admin_router, content_error_to_http,
    db_health_response,
    middleware::{assign_client_id, log_responses, set_request_context},
    see_other,
};

const RECENT_ITEMS: usize = 3;
const THEME_COOKIE_MAX_AGE: time::Duration = time::Duration::days(365);

#[derive(Clone)]
pub struct HttpState {
    pub content: ContentServices,
    pub sessions: Arc<SessionStore>,
    pub page_size: NonZeroUsize,
}

pub fn build_router(state: RouterState) -> Router {
    let sessions = state.http.sessions.clone();
    let upload_body_limit = usize::try_from(state.admin.upload_limit_bytes).unwrap_or(usize::MAX);

    Router::new()
        .route("/", get(index))
        .route("/portfolio", get(portfolio_list))
        .route("/portfolio/{slug}", get(portfolio_detail))
        .route("/blog", get(blog_list))
        .route("/blog/{slug}", get(blog_detail))
        .route("/licenses", get(licenses_list))
        .route("/theme", post(toggle_theme))
        .route("/_health/db", get(public_health))
        .route(
            "/admin/login",
            get(auth::login_page).post(auth::login_submit),
        )
        .route("/logout", get(auth::logout))
        .nest("/admin", build_admin_router(sessions, upload_body_limit))
        .fallback(fallback)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(assign_client_id))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ListParams {
    q: Option<String>,
    tag: Option<String>,
    page: Option<String>,
}

impl ListParams {
    fn query(&self) -> ListingQuery {
        ListingQuery::new(self.q.clone(), self.tag.clone())
    }

    /// Unparseable page numbers fall back to the first page.
    fn page(&self) -> usize {
        self.page
            .as_deref()
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(1)
    }
}

async fn index(State(state): State<HttpState>, theme: Theme) -> Response {
    let outcome = state.content.about.load().await;
    let projects = recent(state.content.portfolio.list().await, "portfolio");
    let posts = recent(state.content.blog.list().await, "blog");

    let layout = LayoutView::public(theme, "home").with_title(outcome.about.full_name.clone());
    render_template_response(
        IndexTemplate {
            layout,
            about: AboutView::from(outcome.about),
            projects: projects.into_iter().map(PortfolioCardView::from).collect(),
            posts: posts.into_iter().map(BlogCardView::from).collect(),
            error: outcome.error,
        },
        StatusCode::OK,
    )
}

fn recent<T: Listable>(result: Result<Vec<T>, ContentError>, collection: &'static str) -> Vec<T> {
    match result {
        Ok(items) => {
            let mut items = filter_and_sort(items, &ListingQuery::default());
            items.truncate(RECENT_ITEMS);
            items
        }
        Err(err) => {
            warn!(
                target = "folio::http::public",
                collection,
                error = %err,
                "failed to load recent items"
            );
            Vec::new()
        }
    }
}

/// Filter, sort and paginate a fetched collection, degrading to an empty list on failure.
fn build_list<T: Listable, V>(
    base_path: &'static str,
    params: &ListParams,
    page_size: NonZeroUsize,
    result: Result<Vec<T>, ContentError>,
    failure_message: &str,
    map: impl Fn(T) -> V,
) -> ListView<V> {
    let query = params.query();
    let (items, error) = match result {
        Ok(items) => (items, None),
        Err(err) => {
            warn!(
                target = "folio::http::public",
                path = base_path,
                error = %err,
                "failed to load list"
            );
            (Vec::new(), Some(failure_message.to_string()))
        }
    };

    let tags = all_tags(&items);
    let filtered = filter_and_sort(items, &query);
    let page = paginate(filtered, params.page(), page_size);
    ListView::build(base_path, &query, tags, page, map).with_error(error)
}

async fn portfolio_list(
    State(state): State<HttpState>,
    theme: Theme,
    Query(params): Query<ListParams>,
) -> Response {
    let list = build_list(
        "/portfolio",
        &params,
        state.page_size,
        state.content.portfolio.list().await,
        "Failed to load projects.",
        PortfolioCardView::from,
    );
    let layout = LayoutView::public(theme, "portfolio").with_title("Portfolio");
    render_template_response(PortfolioListTemplate { layout, list }, StatusCode::OK)
}

async fn portfolio_detail(
    State(state): State<HttpState>,
    theme: Theme,
    Path(slug): Path<String>,
) -> Response {
    let layout = LayoutView::public(theme, "portfolio");
    match state.content.portfolio.find_by_slug(&slug).await {
        Ok(Some(project)) => {
            let layout = layout.with_title(project.title.clone());
            render_template_response(
                PortfolioDetailTemplate {
                    layout,
                    project: project.into(),
                },
                StatusCode::OK,
            )
        }
        Ok(None) => render_not_found_response(layout, "Project not found."),
        Err(err) => content_error_to_http("infra::http::public::portfolio_detail", err)
            .into_response(),
    }
}

async fn blog_list(
    State(state): State<HttpState>,
    theme: Theme,
    Query(params): Query<ListParams>,
) -> Response {
    let list = build_list(
        "/blog",
        &params,
        state.page_size,
        state.content.blog.list().await,
        "Failed to load blog posts.",
        BlogCardView::from,
    );
    let layout = LayoutView::public(theme, "blog").with_title("Blog");
    render_template_response(BlogListTemplate { layout, list }, StatusCode::OK)
}

async fn blog_detail(
    State(state): State<HttpState>,
    theme: Theme,
    Path(slug): Path<String>,
) -> Response {
    let layout = LayoutView::public(theme, "blog");
    match state.content.blog.find_by_slug(&slug).await {
        Ok(Some(post)) => {
            let layout = layout.with_title(post.title.clone());
            render_template_response(
                BlogDetailTemplate {
                    layout,
                    post: post.into(),
                },
                StatusCode::OK,
            )
        }
        Ok(None) => render_not_found_response(layout, "Post not found."),
        Err(err) => {
            content_error_to_http("infra::http::public::blog_detail", err).into_response()
        }
    }
}

async fn licenses_list(
    State(state): State<HttpState>,
    theme: Theme,
    Query(params): Query<ListParams>,
) -> Response {
    let list = build_list(
        "/licenses",
        &params,
        state.page_size,
        state.content.licenses.list().await,
        "Failed to load licenses.",
        LicenseCardView::from,
    );
    let layout = LayoutView::public(theme, "licenses").with_title("Licenses");
    render_template_response(LicensesTemplate { layout, list }, StatusCode::OK)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ThemeForm {
    redirect: Option<String>,
}

async fn toggle_theme(
    theme: Theme,
    jar: CookieJar,
    headers: HeaderMap,
    Form(form): Form<ThemeForm>,
) -> Response {
    let cookie = Cookie::build((THEME_COOKIE, theme.toggled().as_str()))
        .path("/")
        .same_site(SameSite::Lax)
        .max_age(THEME_COOKIE_MAX_AGE);

    let target = headers
        .get(REFERER)
        .and_then(|value| value.to_str().ok())
        .and_then(local_path)
        .or_else(|| form.redirect.as_deref().and_then(local_path))
        .unwrap_or_else(|| "/".to_string());

    (jar.add(cookie), see_other(&target)).into_response()
}

/// Path and query of `raw` when it stays on this site.
fn local_path(raw: &str) -> Option<String> {
    if raw.starts_with('/') {
        return is_same_origin_path(raw).then(|| raw.to_string());
    }
    let url = Url::parse(raw).ok()?;
    let mut path = url.path().to_string();
    if let Some(query) = url.query() {
        path.push('?');
        path.push_str(query);
    }
    is_same_origin_path(&path).then_some(path)
}

/// Browsers read `\` as `/` and drop tabs and newlines, so `/\host` and
/// `/<tab>/host` resolve like `//host`.
fn is_same_origin_path(path: &str) -> bool {
    path.starts_with('/')
        && !path.starts_with("//")
        && !path.contains('\\')
        && !path.chars().any(char::is_control)
}

async fn public_health(State(state): State<HttpState>) -> Response {
    db_health_response(state.content.health_check().await)
}

async fn fallback() -> Response {
    see_other("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_paths_drop_foreign_hosts() {
        assert_eq!(local_path("/blog?page=2").as_deref(), Some("/blog?page=2"));
        assert_eq!(
            local_path("https://elsewhere.example/portfolio").as_deref(),
            Some("/portfolio")
        );
        assert_eq!(local_path("//evil.example/x"), None);
        assert_eq!(local_path("/\\evil.example"), None);
        assert_eq!(local_path("/\t/evil.example"), None);
        assert_eq!(local_path("https://site.example//evil.example/"), None);
        assert_eq!(local_path("/licenses?page=2").as_deref(), Some("/licenses?page=2"));
    }

    #[test]
    fn bad_page_numbers_fall_back_to_first_page() {
        let params = ListParams {
            page: Some("two".into()),
            ..ListParams::default()
        };
        assert_eq!(params.page(), 1);
    }
}
