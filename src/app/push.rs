use crate::auth::Identity;
use crate::push as push_service;
use crate::push::DispatchError;
use crate::push::composer::{self, Template};
use crate::state;
use crate::types::push::{NotificationPayload, Tag};

use axum::Extension;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use serde::Serialize;

use std::sync::Arc;

#[derive(Serialize)]
pub(crate) struct PublicKeyResponse {
    #[serde(rename = "publicKey")]
    pub(crate) public_key: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: &'static str,
}

pub(crate) type ApiError = (StatusCode, Json<ErrorResponse>);

pub(crate) fn api_error(status: StatusCode, error: &'static str) -> ApiError {
    (status, Json(ErrorResponse { error }))
}

pub(crate) async fn push_public_key(
    State(state): State<state::AppState>,
) -> Result<Json<PublicKeyResponse>, ApiError> {
    let vapid = match push_service::load_vapid_config(&state.config) {
        push_service::VapidConfigStatus::Ready(vapid) => vapid,
        push_service::VapidConfigStatus::Incomplete | push_service::VapidConfigStatus::Missing => {
            return Err(api_error(
                StatusCode::SERVICE_UNAVAILABLE,
                "Push notifications are not configured.",
            ));
        }
    };

    Ok(Json(PublicKeyResponse {
        public_key: vapid.public_key,
    }))
}

#[derive(Serialize)]
pub(crate) struct ComposeResponse {
    #[serde(flatten)]
    pub(crate) payload: NotificationPayload,
    pub(crate) sendable: bool,
}

/// Renders a template against the current standings without sending it.
pub(crate) async fn push_compose(
    State(state): State<state::AppState>,
    Json(template): Json<Template>,
) -> Json<ComposeResponse> {
    let payload = composer::compose(&template, &state.site.standings());
    let sendable = composer::is_sendable(&template, &payload);
    Json(ComposeResponse { payload, sendable })
}

#[derive(Debug, Deserialize)]
pub(crate) struct SendRequest {
    pub(crate) title: String,
    pub(crate) body: String,
    #[serde(default)]
    pub(crate) tag: Tag,
}

#[derive(Serialize)]
pub(crate) struct SendResponse {
    pub(crate) status: &'static str,
}

impl SendRequest {
    /// Checks for a non-blank title and body; the fields are sent as typed.
    fn into_payload(self) -> Result<NotificationPayload, ApiError> {
        let payload = NotificationPayload {
            title: self.title,
            body: self.body,
            tag: self.tag,
        };
        if !payload.has_content() {
            return Err(api_error(
                StatusCode::BAD_REQUEST,
                "title and body must not be empty.",
            ));
        }
        Ok(payload)
    }
}

pub(crate) async fn push_send(
    State(state): State<state::AppState>,
    Extension(identity): Extension<Identity>,
    Json(request): Json<SendRequest>,
) -> Result<Json<SendResponse>, ApiError> {
    let payload = request.into_payload()?;

    tracing::info!(
        operator = %identity.subject,
        title = %payload.title,
        tag = payload.tag.as_str(),
        "sending push notification"
    );

    match push_service::send_all(&state.config, Arc::clone(&state.store), payload).await {
        Ok(()) => Ok(Json(SendResponse { status: "sent" })),
        Err(DispatchError::NotConfigured) => Err(api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "Push notifications are not configured.",
        )),
        Err(err) => {
            tracing::error!(error = %err, operator = %identity.subject, "push send failed");
            Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to send notification.",
            ))
        }
    }
}
