use crate::auth::{AuthState, Identity, verify_password};
use crate::state;
use crate::templates;

use axum::Json;
use axum::body::Body;
use axum::extract::Form;
use axum::extract::Query;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::HeaderValue;
use axum::http::Request;
use axum::http::StatusCode;
use axum::http::header::{AUTHORIZATION, COOKIE, SET_COOKIE};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use serde::Deserialize;
use serde::Serialize;

const DEFAULT_NEXT: &str = "/admin";

#[derive(Serialize)]
struct AuthErrorResponse {
    error: &'static str,
}

/// Lets a request through to the admin surface only with a verified token,
/// taken from the auth cookie or an `Authorization: Bearer` header. The
/// verified [`Identity`] is attached to the request for handlers to read.
pub(crate) async fn auth_middleware(
    State(state): State<state::AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let path = req.uri().path();
    if !is_admin_path(path) {
        return next.run(req).await;
    }
    let is_api = path.starts_with("/api/");

    let Some(auth) = state.auth.as_ref() else {
        tracing::debug!(path, "admin request rejected: auth is not configured");
        return unauthorized(is_api, false);
    };

    match request_identity(auth, req.headers()) {
        Some(identity) => {
            req.extensions_mut().insert(identity);
            next.run(req).await
        }
        None => unauthorized(is_api, true),
    }
}

fn is_admin_path(path: &str) -> bool {
    path == "/admin" || path.starts_with("/admin/") || path.starts_with("/api/admin/")
}

fn unauthorized(is_api: bool, can_sign_in: bool) -> Response {
    if is_api {
        return (
            StatusCode::UNAUTHORIZED,
            Json(AuthErrorResponse {
                error: "unauthorized",
            }),
        )
            .into_response();
    }
    if can_sign_in {
        return Redirect::to("/login").into_response();
    }
    (StatusCode::UNAUTHORIZED, "admin sign-in is not configured").into_response()
}

fn request_identity(auth: &AuthState, headers: &HeaderMap) -> Option<Identity> {
    let token = bearer_token(headers).or_else(|| auth_cookie(headers, auth.cookie_name()))?;
    match auth.verify_token(token) {
        Ok(identity) => Some(identity),
        Err(err) => {
            tracing::debug!(error = %err, "rejected auth token");
            None
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

fn auth_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    for header in headers.get_all(COOKIE).iter() {
        if let Ok(raw) = header.to_str()
            && let Some(value) = cookie_from_header(raw, name)
        {
            return Some(value);
        }
    }
    None
}

fn cookie_from_header<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    for part in header.split(';') {
        let trimmed = part.trim();
        if let Some((cookie_name, cookie_value)) = trimmed.split_once('=')
            && cookie_name == name
        {
            return Some(cookie_value);
        }
    }
    None
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginQuery {
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginForm {
    name: String,
    password: String,
    next: Option<String>,
}

pub(crate) async fn login_form(
    State(state): State<state::AppState>,
    Query(query): Query<LoginQuery>,
) -> Result<templates::LoginTemplate, (StatusCode, &'static str)> {
    if state.auth.is_none() {
        return Err((StatusCode::NOT_FOUND, "not found"));
    }
    let next = sanitize_next(query.next.as_deref()).unwrap_or_else(|| DEFAULT_NEXT.to_string());

    Ok(templates::LoginTemplate {
        app_name: state.config.app_name,
        error: String::new(),
        next,
    })
}

pub(crate) async fn login_submit(
    State(state): State<state::AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Response, (StatusCode, templates::LoginTemplate)> {
    let auth = state.auth.as_ref().ok_or((
        StatusCode::NOT_FOUND,
        templates::LoginTemplate {
            app_name: state.config.app_name.clone(),
            error: "Auth is not enabled.".to_string(),
            next: String::new(),
        },
    ))?;
    let name = form.name.trim();
    let password = form.password;
    let next = sanitize_next(form.next.as_deref()).unwrap_or_else(|| DEFAULT_NEXT.to_string());

    if name.is_empty() || password.trim().is_empty() {
        return Err(login_error(&state.config.app_name, &next));
    }

    let Some(admin) = state.site.admin(name) else {
        tracing::info!(name, "sign-in rejected: unknown admin");
        return Err(login_error(&state.config.app_name, &next));
    };

    if !verify_password(&password, &admin.password_hash) {
        tracing::info!(name, "sign-in rejected: wrong password");
        return Err(login_error(&state.config.app_name, &next));
    }

    let token = match auth.issue_token(name) {
        Ok(token) => token,
        Err(err) => {
            tracing::error!(error = %err, "failed to issue auth token");
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                templates::LoginTemplate {
                    app_name: state.config.app_name,
                    error: "Failed to sign in.".to_string(),
                    next,
                },
            ));
        }
    };

    tracing::info!(name, "admin signed in");
    let mut response = Redirect::to(&next).into_response();
    let cookie = auth.auth_cookie(&token);
    response.headers_mut().append(
        SET_COOKIE,
        HeaderValue::from_str(&cookie).expect("auth cookie header"),
    );
    Ok(response)
}

pub(crate) async fn logout(
    State(state): State<state::AppState>,
) -> Result<Response, (StatusCode, &'static str)> {
    let auth = state
        .auth
        .as_ref()
        .ok_or((StatusCode::NOT_FOUND, "not found"))?;
    let mut response = Redirect::to("/login").into_response();
    let cookie = auth.clear_cookie();
    response.headers_mut().append(
        SET_COOKIE,
        HeaderValue::from_str(&cookie).expect("logout cookie header"),
    );
    Ok(response)
}

fn sanitize_next(next: Option<&str>) -> Option<String> {
    let next = next?.trim();
    if next.is_empty() {
        return None;
    }
    if !next.starts_with('/') || next.starts_with("//") || next.contains("://") {
        return None;
    }
    Some(next.to_string())
}

fn login_error(app_name: &str, next: &str) -> (StatusCode, templates::LoginTemplate) {
    (
        StatusCode::UNAUTHORIZED,
        templates::LoginTemplate {
            app_name: app_name.to_string(),
            error: "Invalid username or password.".to_string(),
            next: next.to_string(),
        },
    )
}
