mod admin;
mod auth;
mod middleware;
mod public;

pub use admin::{AdminState, build_admin_router};
pub use public::{HttpState, build_router};

use std::convert::Infallible;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::{StatusCode, request::Parts};
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::CookieJar;

use crate::application::about::AboutError;
use crate::application::content::ContentError;
use crate::application::error::{ErrorReport, HttpError};
use crate::application::repos::RepoError;
use crate::presentation::views::Theme;

pub(crate) const THEME_COOKIE: &str = "theme";
pub(crate) const CLIENT_COOKIE: &str = "folio_client";

fn db_health_response(result: Result<(), RepoError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

/// Map a repository error to a consistent HTTP error response for admin/public surfaces.
pub fn repo_error_to_http(source: &'static str, err: RepoError) -> HttpError {
    match err {
        RepoError::Duplicate { constraint } => {
            HttpError::new(source, StatusCode::CONFLICT, "Duplicate record", constraint)
        }
        RepoError::NotFound => HttpError::new(
            source,
            StatusCode::NOT_FOUND,
            "Resource not found",
            "resource not found",
        ),
        RepoError::InvalidInput { message } => {
            HttpError::new(source, StatusCode::BAD_REQUEST, "Invalid input", message)
        }
        RepoError::Integrity { message } => HttpError::new(
            source,
            StatusCode::CONFLICT,
            "Integrity constraint violated",
            message,
        ),
        RepoError::Timeout => HttpError::new(
            source,
            StatusCode::SERVICE_UNAVAILABLE,
            "Database timeout",
            "Database timeout",
        ),
        RepoError::Persistence(message) => HttpError::new(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Persistence error",
            message,
        ),
    }
}

pub fn content_error_to_http(source: &'static str, err: ContentError) -> HttpError {
    match err {
        ContentError::Repo(err) => repo_error_to_http(source, err),
        ContentError::NotFound { .. } => HttpError::from_error(
            source,
            StatusCode::NOT_FOUND,
            "Resource not found",
            &err,
        ),
        ContentError::Slug(_) => HttpError::from_error(
            source,
            StatusCode::UNPROCESSABLE_ENTITY,
            "Title cannot be turned into a link",
            &err,
        ),
        ContentError::Malformed(_) => HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Stored record is malformed",
            &err,
        ),
    }
}

pub fn about_error_to_http(source: &'static str, err: AboutError) -> HttpError {
    match err {
        AboutError::Repo(err) => repo_error_to_http(source, err),
        AboutError::EntryNotFound { .. } => HttpError::from_error(
            source,
            StatusCode::NOT_FOUND,
            "Profile entry not found",
            &err,
        ),
        AboutError::Malformed(_) => HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Stored profile is malformed",
            &err,
        ),
    }
}

/// `303 See Other`, so a form POST is followed by a GET.
pub(crate) fn see_other(target: &str) -> Response {
    Redirect::to(target).into_response()
}

impl<S> FromRequestParts<S> for Theme
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        Ok(jar
            .get(THEME_COOKIE)
            .map(|cookie| Theme::parse(cookie.value()))
            .unwrap_or_default())
    }
}

#[derive(Clone)]
pub struct RouterState {
    pub http: HttpState,
    pub admin: AdminState,
}

impl FromRef<RouterState> for HttpState {
    fn from_ref(state: &RouterState) -> Self {
        state.http.clone()
    }
}

impl FromRef<RouterState> for AdminState {
    fn from_ref(state: &RouterState) -> Self {
        state.admin.clone()
    }
}
