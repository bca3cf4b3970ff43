use crate::assets;
use crate::state;

use axum::Router;
use axum::middleware;
use axum::routing::get;
use axum::routing::post;

mod auth;
mod push;
mod subscriptions;

pub fn app(state: state::AppState) -> Router {
    Router::new()
        .route("/", get(subscriptions::subscribe_page))
        .route("/login", get(auth::login_form).post(auth::login_submit))
        .route("/logout", post(auth::logout))
        .route("/admin", get(subscriptions::admin_page))
        .route("/api/push/public-key", get(push::push_public_key))
        .route("/api/subscriptions", post(subscriptions::subscription_upsert))
        .route(
            "/api/subscriptions/lookup",
            get(subscriptions::subscription_lookup),
        )
        .route(
            "/api/subscriptions/remove",
            post(subscriptions::subscription_remove),
        )
        .route(
            "/api/admin/subscriptions/count",
            get(subscriptions::subscription_count),
        )
        .route("/api/admin/standings", get(subscriptions::standings))
        .route("/api/admin/push/compose", post(push::push_compose))
        .route("/api/admin/push/send", post(push::push_send))
        .route("/static/style.css", get(assets::stylesheet))
        .route(
            "/static/push_subscribe.js",
            get(assets::push_subscribe_script),
        )
        .route("/static/notify.js", get(assets::notify_script))
        .route("/static/manifest.json", get(assets::manifest))
        .route("/sw.js", get(assets::service_worker))
        .route("/health", get(health))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(state, auth::auth_middleware))
}

pub(crate) async fn health() -> &'static str {
    "ok"
}

#[cfg(test)]
#[allow(non_snake_case)]
pub(crate) mod tests {
    use super::*;
    use crate::auth::hash_password;
    use crate::config;
    use crate::site::Site;
    use crate::types::push::{PushSubscription, SubscriptionKeys};
    use axum::body::Body;
    use axum::body::to_bytes;
    use axum::http::Request;
    use axum::http::StatusCode;
    use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
    use base64::{URL_SAFE_NO_PAD, encode_config};
    use jwt_simple::algorithms::MACLike;
    use jwt_simple::prelude::{Claims, Duration as JwtDuration, HS256Key};
    use serde_json::Value as JsonValue;
    use serde_json::from_slice as json_from_slice;
    use serde_json::json;
    use time::Duration;
    use tower::ServiceExt;

    use std::sync::Arc;

    const KEY_BYTES: &[u8] = b"komsai-app-tests";
    const SITE: &str = r#"
[[house]]
id = "red"
name = "red"
total_points = 30

[[house]]
id = "blue"
name = "blue"
total_points = 20
"#;

    #[tokio::test]
    async fn app__should_return_ok_on_health_endpoint() {
        // Given
        let app = app(public_state());

        // When
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("request failed");

        // Then
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        assert_eq!(body.as_ref(), b"ok");
    }

    #[tokio::test]
    async fn subscription_upsert__should_return_same_id_for_same_endpoint() {
        // Given
        let state = public_state();
        let body = json!({
            "endpoint": "https://push.example/a",
            "keys": { "p256dh": "p256dh-a", "auth": "auth-a" }
        });

        // When
        let first = json_request(app(state.clone()), "POST", "/api/subscriptions", &body).await;
        let second = json_request(app(state.clone()), "POST", "/api/subscriptions", &body).await;

        // Then
        assert_eq!(first.0, StatusCode::OK);
        assert_eq!(second.0, StatusCode::OK);
        assert_eq!(first.1["id"], second.1["id"]);
        assert_eq!(state.store.count().expect("count"), 1);
    }

    #[tokio::test]
    async fn subscription_upsert__should_reject_missing_keys() {
        // Given
        let body = json!({
            "endpoint": "https://push.example/a",
            "keys": { "p256dh": "", "auth": "auth-a" }
        });

        // When
        let (status, payload) =
            json_request(app(public_state()), "POST", "/api/subscriptions", &body).await;

        // Then
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(payload["error"].is_string());
    }

    #[tokio::test]
    async fn subscription_lookup__should_return_only_id_of_stored_record() {
        // Given
        let state = public_state();
        let id = state
            .store
            .upsert(&subscription("https://push.example/a"))
            .expect("upsert");

        // When
        let found = get_json(
            app(state.clone()),
            "/api/subscriptions/lookup?endpoint=https%3A%2F%2Fpush.example%2Fa",
            None,
        )
        .await;
        let missing = get_json(
            app(state),
            "/api/subscriptions/lookup?endpoint=https%3A%2F%2Fpush.example%2Fb",
            None,
        )
        .await;

        // Then
        assert_eq!(found.0, StatusCode::OK);
        assert_eq!(found.1, json!({ "id": id.0 }));
        assert!(found.1.get("keys").is_none());
        assert!(found.1.get("endpoint").is_none());
        assert_eq!(missing.0, StatusCode::OK);
        assert_eq!(missing.1, json!({ "id": null }));
    }

    #[tokio::test]
    async fn subscription_remove__should_delete_and_tolerate_missing_record() {
        // Given
        let state = public_state();
        state
            .store
            .upsert(&subscription("https://push.example/a"))
            .expect("upsert");
        let body = json!({ "endpoint": "https://push.example/a" });

        // When
        let first = raw_json_request(app(state.clone()), "POST", "/api/subscriptions/remove", &body)
            .await;
        let second =
            raw_json_request(app(state.clone()), "POST", "/api/subscriptions/remove", &body).await;

        // Then
        assert_eq!(first, StatusCode::NO_CONTENT);
        assert_eq!(second, StatusCode::NO_CONTENT);
        assert_eq!(state.store.count().expect("count"), 0);
    }

    #[tokio::test]
    async fn auth_middleware__should_reject_admin_api_when_auth_unconfigured() {
        // When
        let (status, payload) =
            get_json(app(public_state()), "/api/admin/subscriptions/count", None).await;

        // Then
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(payload["error"], "unauthorized");
    }

    #[tokio::test]
    async fn auth_middleware__should_return_json_unauthorized_without_token() {
        // When
        let (status, payload) =
            get_json(app(admin_state()), "/api/admin/subscriptions/count", None).await;

        // Then
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(payload["error"], "unauthorized");
    }

    #[tokio::test]
    async fn auth_middleware__should_redirect_admin_page_when_missing_cookie() {
        // When
        let response = app(admin_state())
            .oneshot(Request::builder().uri("/admin").body(Body::empty()).unwrap())
            .await
            .expect("request failed");

        // Then
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response.headers().get(LOCATION).expect("location header");
        assert_eq!(location, "/login");
    }

    #[tokio::test]
    async fn auth_middleware__should_reject_token_from_other_key() {
        // Given
        let token = auth_token(b"some-other-key", "Komsai Cup", "organizer");

        // When
        let (status, _) = get_json(
            app(admin_state()),
            "/api/admin/subscriptions/count",
            Some(&cookie(&token)),
        )
        .await;

        // Then
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn subscription_count__should_return_count_for_valid_cookie() {
        // Given
        let state = admin_state();
        for endpoint in ["https://push.example/a", "https://push.example/b"] {
            state.store.upsert(&subscription(endpoint)).expect("upsert");
        }
        let token = auth_token(KEY_BYTES, "Komsai Cup", "organizer");

        // When
        let (status, payload) = get_json(
            app(state),
            "/api/admin/subscriptions/count",
            Some(&cookie(&token)),
        )
        .await;

        // Then
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["count"], 2);
    }

    #[tokio::test]
    async fn auth_middleware__should_accept_bearer_token() {
        // Given
        let token = auth_token(KEY_BYTES, "Komsai Cup", "organizer");

        // When
        let response = app(admin_state())
            .oneshot(
                Request::builder()
                    .uri("/api/admin/standings")
                    .header(AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("request failed");

        // Then
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let payload: JsonValue = json_from_slice(&body).expect("parse json");
        assert_eq!(payload[0]["id"], "red");
        assert_eq!(payload[1]["total_points"], 20);
    }

    #[tokio::test]
    async fn admin_page__should_render_subscriber_count_and_operator() {
        // Given
        let state = admin_state();
        state
            .store
            .upsert(&subscription("https://push.example/a"))
            .expect("upsert");
        let token = auth_token(KEY_BYTES, "Komsai Cup", "organizer");

        // When
        let response = app(state)
            .oneshot(
                Request::builder()
                    .uri("/admin")
                    .header(COOKIE, cookie(&token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("request failed");

        // Then
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let body = std::str::from_utf8(&body).expect("utf8 body");
        assert!(body.contains("1 subscriber ·"));
        assert!(body.contains("signed in as organizer"));
        assert!(body.contains("Push notifications are not configured"));
        assert!(!body.contains("No subscribers yet."));
    }

    #[tokio::test]
    async fn admin_page__should_flag_empty_audience() {
        // Given
        let token = auth_token(KEY_BYTES, "Komsai Cup", "organizer");

        // When
        let response = app(admin_state())
            .oneshot(
                Request::builder()
                    .uri("/admin")
                    .header(COOKIE, cookie(&token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("request failed");

        // Then
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let body = std::str::from_utf8(&body).expect("utf8 body");
        assert!(body.contains("No subscribers yet."));
        assert!(body.contains(r#"data-subscriber-count="0""#));
    }

    #[tokio::test]
    async fn subscribe_page__should_offer_dismissible_prompt() {
        // When
        let page = app(public_state())
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .expect("request failed");
        let script = app(public_state())
            .oneshot(
                Request::builder()
                    .uri("/static/push_subscribe.js")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("request failed");

        // Then
        assert_eq!(page.status(), StatusCode::OK);
        let page = to_bytes(page.into_body(), usize::MAX)
            .await
            .expect("read body");
        let page = std::str::from_utf8(&page).expect("utf8 body");
        assert!(page.contains(r#"id="push-prompt""#));
        assert!(page.contains(r#"id="push-prompt-dismiss""#));
        let script = to_bytes(script.into_body(), usize::MAX)
            .await
            .expect("read body");
        let script = std::str::from_utf8(&script).expect("utf8 body");
        assert!(script.contains("notification-prompt-dismissed"));
    }

    #[tokio::test]
    async fn push_compose__should_preview_event_result() {
        // Given
        let token = auth_token(KEY_BYTES, "Komsai Cup", "organizer");
        let template = json!({
            "kind": "event-result",
            "house_id": "red",
            "event": "Basketball",
            "place": "1st",
            "day": "2"
        });

        // When
        let (status, payload) = authed_json_request(
            app(admin_state()),
            "/api/admin/push/compose",
            &template,
            &token,
        )
        .await;

        // Then
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["title"], "🥇 Basketball Results");
        assert_eq!(
            payload["body"],
            "Red takes 1st place in Basketball! (Day 2) Check the leaderboard for updated standings."
        );
        assert_eq!(payload["tag"], "results");
        assert_eq!(payload["sendable"], true);
    }

    #[tokio::test]
    async fn push_compose__should_flag_incomplete_event_result_as_unsendable() {
        // Given
        let token = auth_token(KEY_BYTES, "Komsai Cup", "organizer");
        let template = json!({ "kind": "event-result", "house_id": "", "event": "", "place": "" });

        // When
        let (status, payload) = authed_json_request(
            app(admin_state()),
            "/api/admin/push/compose",
            &template,
            &token,
        )
        .await;

        // Then
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["title"], "Event Results");
        assert_eq!(payload["sendable"], false);
    }

    #[tokio::test]
    async fn push_send__should_reject_blank_title() {
        // Given
        let token = auth_token(KEY_BYTES, "Komsai Cup", "organizer");
        let body = json!({ "title": "   ", "body": "Results are in", "tag": "results" });

        // When
        let (status, payload) =
            authed_json_request(app(admin_state()), "/api/admin/push/send", &body, &token).await;

        // Then
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(payload["error"].is_string());
    }

    #[tokio::test]
    async fn push_send__should_return_unavailable_without_vapid() {
        // Given
        let state = admin_state();
        state
            .store
            .upsert(&subscription("https://push.example/a"))
            .expect("upsert");
        let token = auth_token(KEY_BYTES, "Komsai Cup", "organizer");
        let body = json!({ "title": "Reminder", "body": "Opening ceremony at 8" });

        // When
        let (status, payload) =
            authed_json_request(app(state), "/api/admin/push/send", &body, &token).await;

        // Then
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload["error"], "Push notifications are not configured.");
    }

    #[tokio::test]
    async fn push_public_key__should_return_unavailable_without_vapid() {
        // When
        let (status, _) = get_json(app(public_state()), "/api/push/public-key", None).await;

        // Then
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn push_public_key__should_return_configured_key() {
        // Given
        let config = config::AppConfig {
            vapid_private_key: Some("private".to_string()),
            vapid_public_key: Some("public".to_string()),
            vapid_subject: Some("mailto:organizer@example.com".to_string()),
            ..Default::default()
        };
        let state = state::AppState::from_config(config).expect("state");

        // When
        let (status, payload) = get_json(app(state), "/api/push/public-key", None).await;

        // Then
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["publicKey"], "public");
    }

    #[tokio::test]
    async fn login__should_set_cookie_and_redirect() {
        // Given
        let form = "name=organizer&password=secret&next=%2Fadmin";

        // When
        let response = app(admin_state())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/login")
                    .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from(form))
                    .unwrap(),
            )
            .await
            .expect("request failed");

        // Then
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(LOCATION).expect("location header"),
            "/admin"
        );
        let cookie = response.headers().get(SET_COOKIE).expect("set-cookie");
        let cookie = cookie.to_str().expect("cookie header");
        assert!(cookie.contains("komsai_auth="));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
    }

    #[tokio::test]
    async fn login__should_reject_invalid_credentials() {
        // Given
        let form = "name=organizer&password=wrong";

        // When
        let response = app(admin_state())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/login")
                    .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from(form))
                    .unwrap(),
            )
            .await
            .expect("request failed");

        // Then
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let body = std::str::from_utf8(&body).expect("utf8 body");
        assert!(body.contains("Invalid username or password."));
    }

    #[tokio::test]
    async fn logout__should_clear_cookie() {
        // When
        let response = app(admin_state())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/logout")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("request failed");

        // Then
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let cookie = response.headers().get(SET_COOKIE).expect("set-cookie");
        let cookie = cookie.to_str().expect("cookie header");
        assert!(cookie.contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn manifest__should_render_app_name() {
        // When
        let (status, payload) = get_json(app(public_state()), "/static/manifest.json", None).await;

        // Then
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["name"], "Komsai Cup");
        assert_eq!(payload["start_url"], "/");
    }

    fn public_state() -> state::AppState {
        state::AppState::from_config(config::AppConfig::default()).expect("state")
    }

    fn admin_state() -> state::AppState {
        let config = config::AppConfig {
            auth: Some(config::AuthConfig {
                key: encode_config(KEY_BYTES, URL_SAFE_NO_PAD),
                token_ttl: Duration::days(1),
                cookie_name: "komsai_auth".to_string(),
                cookie_secure: false,
            }),
            ..Default::default()
        };
        let mut state = state::AppState::from_config(config).expect("state");
        let password_hash = hash_password("secret").expect("hash password");
        let site = format!("{SITE}\n[[admin]]\nname = \"organizer\"\npassword_hash = \"{password_hash}\"\n");
        state.site = Arc::new(Site::parse(&site).expect("parse site"));
        state
    }

    fn subscription(endpoint: &str) -> PushSubscription {
        PushSubscription {
            endpoint: endpoint.to_string(),
            keys: SubscriptionKeys {
                p256dh: "p256dh".to_string(),
                auth: "auth".to_string(),
            },
        }
    }

    fn auth_token(key_bytes: &[u8], issuer: &str, subject: &str) -> String {
        let key = HS256Key::from_bytes(key_bytes);
        let claims = Claims::create(JwtDuration::from_hours(1))
            .with_issuer(issuer)
            .with_subject(subject);
        key.authenticate(claims).expect("authenticate token")
    }

    fn cookie(token: &str) -> String {
        format!("komsai_auth={token}")
    }

    async fn get_json(app: Router, uri: &str, cookie: Option<&str>) -> (StatusCode, JsonValue) {
        let mut request = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }
        let response = app
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .expect("request failed");
        read_json(response).await
    }

    async fn json_request(
        app: Router,
        method: &str,
        uri: &str,
        body: &JsonValue,
    ) -> (StatusCode, JsonValue) {
        let response = app
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .expect("request failed");
        read_json(response).await
    }

    async fn raw_json_request(app: Router, method: &str, uri: &str, body: &JsonValue) -> StatusCode {
        app.oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .expect("request failed")
        .status()
    }

    async fn authed_json_request(
        app: Router,
        uri: &str,
        body: &JsonValue,
        token: &str,
    ) -> (StatusCode, JsonValue) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header(CONTENT_TYPE, "application/json")
                    .header(COOKIE, cookie(token))
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .expect("request failed");
        read_json(response).await
    }

    async fn read_json(response: axum::response::Response) -> (StatusCode, JsonValue) {
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let payload = if body.is_empty() {
            JsonValue::Null
        } else {
            json_from_slice(&body).expect("parse json")
        };
        (status, payload)
    }
}
