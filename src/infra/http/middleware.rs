use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{
    CookieJar,
    cookie::{Cookie, SameSite},
};
use metrics::histogram;
use tracing::{error, warn};
use uuid::Uuid;

use crate::application::{error::ErrorReport, session::ClientId, session::SessionStore};

use super::{CLIENT_COOKIE, see_other};

const CLIENT_COOKIE_MAX_AGE: time::Duration = time::Duration::days(365);

#[derive(Clone)]
pub struct RequestContext {
    pub request_id: String,
}

pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let ctx = RequestContext {
        request_id: request_id.clone(),
    };
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    response.extensions_mut().insert(ctx);
    response
}

/// Make sure every request carries a [`ClientId`], issuing the cookie on first visit.
pub async fn assign_client_id(jar: CookieJar, mut request: Request<Body>, next: Next) -> Response {
    let existing = jar
        .get(CLIENT_COOKIE)
        .map(|cookie| cookie.value().trim().to_string())
        .filter(|value| !value.is_empty());

    match existing {
        Some(value) => {
            request.extensions_mut().insert(ClientId::new(value));
            next.run(request).await
        }
        None => {
            let value = Uuid::new_v4().to_string();
            request.extensions_mut().insert(ClientId::new(value.clone()));
            let response = next.run(request).await;
            let cookie = Cookie::build((CLIENT_COOKIE, value))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax)
                .max_age(CLIENT_COOKIE_MAX_AGE);
            (jar.add(cookie), response).into_response()
        }
    }
}

/// Send anonymous and locked-out clients to the login page.
pub async fn require_authenticated(
    State(sessions): State<Arc<SessionStore>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(client) = request.extensions().get::<ClientId>().cloned() else {
        return see_other("/admin/login");
    };

    match sessions.is_authenticated(&client).await {
        Ok(true) => next.run(request).await,
        Ok(false) => see_other("/admin/login"),
        Err(err) => {
            error!(
                target = "folio::http::auth",
                client = client.as_str(),
                error = %err,
                "session lookup failed"
            );
            see_other("/admin/login")
        }
    }
}

/// First path segment, so metric labels stay bounded.
fn section_label(path: &str) -> &'static str {
    match path.trim_start_matches('/').split('/').next().unwrap_or("") {
        "" => "home",
        "portfolio" => "portfolio",
        "blog" => "blog",
        "licenses" => "licenses",
        "admin" => "admin",
        "theme" | "logout" => "session",
        "_health" => "health",
        _ => "other",
    }
}

fn status_class(status: StatusCode) -> &'static str {
    match status.as_u16() {
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        _ => "5xx",
    }
}

/// Record request latency and log failed responses with their attached [`ErrorReport`].
pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone())
        .unwrap_or_default();
    let client = request
        .extensions()
        .get::<ClientId>()
        .map(|client| client.as_str().to_string())
        .unwrap_or_default();

    let mut response = next.run(request).await;
    let status = response.status();
    let elapsed = start.elapsed();

    histogram!(
        "folio_http_request_duration_ms",
        "section" => section_label(uri.path()),
        "status" => status_class(status)
    )
    .record(elapsed.as_secs_f64() * 1000.0);

    if !status.is_client_error() && !status.is_server_error() {
        return response;
    }

    let (source, messages) = match response.extensions_mut().remove::<ErrorReport>() {
        Some(report) => (report.source, report.messages),
        None => ("unknown", Vec::new()),
    };
    let detail = messages
        .first()
        .cloned()
        .unwrap_or_else(|| "no diagnostic available".to_string());
    let elapsed_ms = elapsed.as_millis();

    if status.is_server_error() {
        error!(
            target = "folio::http::response",
            status = status.as_u16(),
            method = %method,
            path = %uri.path(),
            elapsed_ms,
            source,
            detail = %detail,
            chain = ?messages,
            request_id,
            client,
            "request failed",
        );
    } else {
        warn!(
            target = "folio::http::response",
            status = status.as_u16(),
            method = %method,
            path = %uri.path(),
            elapsed_ms,
            source,
            detail = %detail,
            "client request error",
        );
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_labels_are_bounded() {
        assert_eq!(section_label("/"), "home");
        assert_eq!(section_label("/blog/hello-1234"), "blog");
        assert_eq!(section_label("/admin/about/experiences"), "admin");
        assert_eq!(section_label("/wp-login.php"), "other");
        assert_eq!(status_class(StatusCode::SEE_OTHER), "3xx");
        assert_eq!(status_class(StatusCode::BAD_GATEWAY), "5xx");
    }
}
