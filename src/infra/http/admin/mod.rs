mod about;
mod dashboard;
mod editor;
mod forms;
mod multipart;
mod state;
mod uploads;

mod blog;
mod licenses;
mod portfolio;

pub use state::AdminState;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
};

use crate::application::session::SessionStore;

use self::{blog::BlogEditor, editor::Editor, licenses::LicenseEditor, portfolio::PortfolioEditor};
use super::{RouterState, middleware::require_authenticated};

/// Admin pages, gated behind an authenticated session; nest under `/admin`.
pub fn build_admin_router(
    sessions: Arc<SessionStore>,
    upload_body_limit: usize,
) -> Router<RouterState> {
    let router = Router::new()
        .route("/", get(dashboard::admin_dashboard))
        .route("/about", get(about::edit).post(about::update))
        .route("/about/experiences", post(about::add_experience))
        .route(
            "/about/experiences/{id}/delete",
            get(about::confirm_remove_experience).post(about::remove_experience),
        )
        .route("/about/educations", post(about::add_education))
        .route(
            "/about/educations/{id}/delete",
            get(about::confirm_remove_education).post(about::remove_education),
        );

    let router = editor_routes::<PortfolioEditor>(router, "/portfolio");
    let router = editor_routes::<BlogEditor>(router, "/blog");
    let router = editor_routes::<LicenseEditor>(router, "/licenses");

    router
        .layer(DefaultBodyLimit::max(upload_body_limit))
        .route_layer(middleware::from_fn_with_state(
            sessions,
            require_authenticated,
        ))
}

fn editor_routes<E: Editor>(router: Router<RouterState>, prefix: &str) -> Router<RouterState> {
    router
        .route(prefix, get(editor::list::<E>))
        .route(
            &format!("{prefix}/new"),
            get(editor::new_form::<E>).post(editor::create::<E>),
        )
        .route(
            &format!("{prefix}/{{id}}/edit"),
            get(editor::edit::<E>).post(editor::update::<E>),
        )
        .route(
            &format!("{prefix}/{{id}}/delete"),
            get(editor::confirm_delete::<E>).post(editor::delete::<E>),
        )
}
