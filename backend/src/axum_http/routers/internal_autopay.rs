use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use crates::domain::value_objects::autopay_subscriptions::AdminListQuery;
use tracing::{info, warn};

use crate::{autopay_services::AutopayServices, axum_http::error_responses::ErrorResponse};

#[derive(Clone)]
pub struct InternalState {
    services: Arc<AutopayServices>,
    cron_token: Option<Arc<str>>,
}

pub fn routes(services: Arc<AutopayServices>, cron_token: Option<String>) -> Router {
    Router::new()
        .route("/subscriptions", get(list_subscriptions))
        .route("/daily-charges", post(run_daily_charges))
        .with_state(InternalState {
            services,
            cron_token: cron_token.map(Arc::from),
        })
}

fn authorize_bearer(headers: &HeaderMap, expected: Option<&str>) -> Result<(), Response> {
    let Some(expected) = expected else {
        warn!("autopay: internal route called but INTERNAL_CRON_TOKEN is not set");
        return Err(ErrorResponse::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "internal routes are disabled",
        )
        .into_response());
    };

    let presented = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));
    if presented != Some(expected) {
        return Err(ErrorResponse::new(StatusCode::UNAUTHORIZED, "unauthorized").into_response());
    }
    Ok(())
}

pub async fn list_subscriptions(
    State(state): State<InternalState>,
    headers: HeaderMap,
    Query(query): Query<AdminListQuery>,
) -> impl IntoResponse {
    if let Err(rejection) = authorize_bearer(&headers, state.cron_token.as_deref()) {
        return rejection;
    }
    match state
        .services
        .subscriptions
        .get_all_subscriptions_admin(query)
        .await
    {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn run_daily_charges(
    State(state): State<InternalState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if let Err(rejection) = authorize_bearer(&headers, state.cron_token.as_deref()) {
        return rejection;
    }
    info!("autopay: daily charges triggered over HTTP");
    match state.services.daily.run_daily_autopay_charges().await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(err) => err.into_response(),
    }
}
