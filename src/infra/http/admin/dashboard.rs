use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Response,
};
use tracing::warn;

use crate::{
    application::content::ContentError,
    presentation::{
        admin::views::{AdminDashboardTemplate, AdminMetricView},
        views::{LayoutView, Theme, render_template_response},
    },
};

use super::{AdminState, editor::NoticeQuery};

fn metric(
    label: &'static str,
    href: &'static str,
    count: Result<usize, ContentError>,
) -> AdminMetricView {
    let value = match count {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(
                target = "folio::http::admin",
                metric = label,
                error = %err,
                "failed to count records"
            );
            None
        }
    };
    AdminMetricView { label, value, href }
}

pub(super) async fn admin_dashboard(
    State(state): State<AdminState>,
    theme: Theme,
    Query(query): Query<NoticeQuery>,
) -> Response {
    let content = &state.content;
    let metrics = vec![
        metric("Projects", "/admin/portfolio", content.portfolio.count().await),
        metric("Blog posts", "/admin/blog", content.blog.count().await),
        metric("Licenses", "/admin/licenses", content.licenses.count().await),
    ];

    let layout = LayoutView::admin(theme, "dashboard")
        .with_title("Dashboard")
        .with_notice(query.notice());
    render_template_response(
        AdminDashboardTemplate {
            layout,
            metrics,
            uploads_enabled: state.uploader.is_enabled(),
        },
        StatusCode::OK,
    )
}
