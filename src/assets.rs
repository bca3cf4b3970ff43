use crate::state::AppState;
use crate::templates;

use askama::Template;
use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};

const STYLE_CSS: &str = include_str!("../static/style.css");
const SERVICE_WORKER_JS: &str = include_str!("../static/sw.js");
const PUSH_SUBSCRIBE_JS: &str = include_str!("../static/push_subscribe.js");
const NOTIFY_JS: &str = include_str!("../static/notify.js");

const JAVASCRIPT: &str = "application/javascript";
const CACHE_HOUR: &str = "public, max-age=3600";

fn asset(content_type: &'static str, cache_control: &'static str, body: &'static str) -> Response {
    (
        [(CONTENT_TYPE, content_type), (CACHE_CONTROL, cache_control)],
        body,
    )
        .into_response()
}

pub(crate) async fn manifest(State(state): State<AppState>) -> Response {
    let rendered = templates::ManifestTemplate {
        app_name: &state.config.app_name,
    }
    .render();
    match rendered {
        Ok(body) => (
            [
                (CONTENT_TYPE, "application/manifest+json"),
                (CACHE_CONTROL, CACHE_HOUR),
            ],
            body,
        )
            .into_response(),
        Err(err) => {
            tracing::error!(error = %err, "failed to render manifest");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub(crate) async fn stylesheet() -> Response {
    asset("text/css", CACHE_HOUR, STYLE_CSS)
}

/// Served from the root so its scope covers the whole site.
pub(crate) async fn service_worker() -> Response {
    asset(JAVASCRIPT, "no-cache", SERVICE_WORKER_JS)
}

pub(crate) async fn push_subscribe_script() -> Response {
    asset(JAVASCRIPT, CACHE_HOUR, PUSH_SUBSCRIBE_JS)
}

pub(crate) async fn notify_script() -> Response {
    asset(JAVASCRIPT, CACHE_HOUR, NOTIFY_JS)
}
