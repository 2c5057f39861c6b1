//! Access-code login, logout and the lockout countdown page.

use axum::{
    Extension,
    extract::{Form, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::{
    application::{
        error::HttpError,
        session::{ClientId, SessionStore},
    },
    domain::session::SessionStatus,
    presentation::views::{
        LayoutView, LoginTemplate, LoginView, Notice, NoticeView, Theme, render_template_response,
    },
};

use super::{HttpState, see_other};

const LOCKED_REFRESH_SECONDS: u32 = 60;
const INVALID_CODE_MESSAGE: &str = "Invalid access code.";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct LoginQuery {
    error: Option<String>,
    notice: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct LoginForm {
    #[serde(default)]
    access_code: String,
}

pub(super) async fn login_page(
    State(state): State<HttpState>,
    theme: Theme,
    Extension(client): Extension<ClientId>,
    Query(query): Query<LoginQuery>,
) -> Response {
    let sessions = state.sessions.as_ref();
    let status = match sessions.status(&client).await {
        Ok(status) => status,
        Err(err) => return HttpError::from(err).into_response(),
    };

    let view = match status {
        SessionStatus::Authenticated => return see_other("/admin"),
        SessionStatus::LockedOut { .. } => LoginView {
            locked: true,
            minutes_remaining: match sessions.lockout_time_remaining(&client).await {
                Ok(minutes) => minutes,
                Err(err) => return HttpError::from(err).into_response(),
            },
            attempts_left: 0,
            error: None,
            configured: sessions.is_configured(),
            refresh_seconds: LOCKED_REFRESH_SECONDS,
        },
        SessionStatus::Anonymous { attempts } => LoginView {
            locked: false,
            minutes_remaining: 0,
            attempts_left: attempts_left(sessions, attempts),
            error: query
                .error
                .as_deref()
                .filter(|code| *code == "invalid")
                .map(|_| INVALID_CODE_MESSAGE),
            configured: sessions.is_configured(),
            refresh_seconds: LOCKED_REFRESH_SECONDS,
        },
    };

    let notice = query
        .notice
        .as_deref()
        .and_then(Notice::from_code)
        .map(NoticeView::from);
    let layout = LayoutView::public(theme, "login")
        .with_title("Admin login")
        .with_notice(notice);
    render_template_response(LoginTemplate { layout, view }, StatusCode::OK)
}

fn attempts_left(sessions: &SessionStore, attempts: u32) -> u32 {
    sessions.policy().max_attempts.saturating_sub(attempts)
}

pub(super) async fn login_submit(
    State(state): State<HttpState>,
    Extension(client): Extension<ClientId>,
    Form(form): Form<LoginForm>,
) -> Response {
    match state.sessions.login(&client, &form.access_code).await {
        Ok(true) => see_other("/admin"),
        Ok(false) => see_other("/admin/login?error=invalid"),
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(super) async fn logout(
    State(state): State<HttpState>,
    Extension(client): Extension<ClientId>,
) -> Response {
    match state.sessions.logout(&client).await {
        Ok(()) => see_other("/"),
        Err(err) => HttpError::from(err).into_response(),
    }
}
