use crate::app::push::{ApiError, api_error};
use crate::auth::Identity;
use crate::ports::StoreError;
use crate::push as push_service;
use crate::state;
use crate::templates;
use crate::types::push::{PushSubscription, Standing, SubscriptionId};

use axum::Extension;
use axum::Json;
use axum::extract::Query;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde::Serialize;

fn store_error(err: StoreError) -> ApiError {
    tracing::error!(error = %err, "subscription store request failed");
    match err {
        StoreError::InvalidCursor(_) | StoreError::InvalidPageSize => {
            api_error(StatusCode::BAD_REQUEST, "Invalid request.")
        }
        StoreError::Unavailable(_) | StoreError::Io(_) | StoreError::Corrupt(_) => api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Subscription store is unavailable.",
        ),
    }
}

#[derive(Serialize)]
pub(crate) struct UpsertResponse {
    pub(crate) id: SubscriptionId,
}

pub(crate) async fn subscription_upsert(
    State(state): State<state::AppState>,
    Json(subscription): Json<PushSubscription>,
) -> Result<Json<UpsertResponse>, ApiError> {
    if !subscription.is_complete() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "endpoint, p256dh, and auth are required.",
        ));
    }
    let id = state.store.upsert(&subscription).map_err(store_error)?;
    tracing::debug!(%id, "subscription stored");
    Ok(Json(UpsertResponse { id }))
}

#[derive(Debug, Deserialize)]
pub(crate) struct EndpointQuery {
    pub(crate) endpoint: String,
}

/// Existence check for the opt-in page. Subscription keys stay on the server.
#[derive(Serialize)]
pub(crate) struct LookupResponse {
    pub(crate) id: Option<SubscriptionId>,
}

pub(crate) async fn subscription_lookup(
    State(state): State<state::AppState>,
    Query(query): Query<EndpointQuery>,
) -> Result<Json<LookupResponse>, ApiError> {
    let record = state
        .store
        .find_by_endpoint(&query.endpoint)
        .map_err(store_error)?;
    Ok(Json(LookupResponse {
        id: record.map(|stored| stored.id),
    }))
}

#[derive(Debug, Deserialize)]
pub(crate) struct RemoveRequest {
    pub(crate) endpoint: String,
}

pub(crate) async fn subscription_remove(
    State(state): State<state::AppState>,
    Json(request): Json<RemoveRequest>,
) -> Result<StatusCode, ApiError> {
    let removed = state
        .store
        .delete_by_endpoint(&request.endpoint)
        .map_err(store_error)?;
    tracing::debug!(removed, "subscription remove requested");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
pub(crate) struct CountResponse {
    pub(crate) count: usize,
}

pub(crate) async fn subscription_count(
    State(state): State<state::AppState>,
) -> Result<Json<CountResponse>, ApiError> {
    let count = state.store.count().map_err(store_error)?;
    Ok(Json(CountResponse { count }))
}

pub(crate) async fn standings(State(state): State<state::AppState>) -> Json<Vec<Standing>> {
    Json(state.site.standings())
}

pub(crate) async fn subscribe_page(
    State(state): State<state::AppState>,
) -> templates::PushSubscribeTemplate {
    templates::PushSubscribeTemplate {
        push_enabled: push_enabled(&state),
        app_name: state.config.app_name,
    }
}

pub(crate) async fn admin_page(
    State(state): State<state::AppState>,
    Extension(identity): Extension<Identity>,
) -> Response {
    let subscriber_count = match state.store.count() {
        Ok(count) => count,
        Err(err) => return store_error(err).into_response(),
    };
    let houses = state
        .site
        .standings()
        .into_iter()
        .map(|standing| templates::HouseOption {
            id: standing.id,
            name: standing.name,
            total_points: standing.total_points,
        })
        .collect();
    templates::NotifyTemplate {
        push_enabled: push_enabled(&state),
        app_name: state.config.app_name,
        operator: identity.subject,
        subscriber_count,
        houses,
    }
    .into_response()
}

fn push_enabled(state: &state::AppState) -> bool {
    matches!(
        push_service::load_vapid_config(&state.config),
        push_service::VapidConfigStatus::Ready(_)
    )
}
