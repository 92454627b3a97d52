use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use logbroker_protocol::{error_codes, PublishRequest, PublishResponse};
use uuid::Uuid;

use crate::channel;
use crate::http::response::publish_error;
use crate::registry::{EnqueueOutcome, MessageEnvelope};
use crate::state::AppState;

/// `POST /api/logs/publish` and `POST /test/logs` (§4.5, §6.2, §6.3).
///
/// Failure bodies here are the bare `{"error": "<token>"}` shape spec.md
/// §6.2 fixes, not the general `HttpErrorEnvelope` used elsewhere.
pub async fn publish_logs(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<PublishRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(json) => json,
        Err(_rejection) => {
            return publish_error(StatusCode::BAD_REQUEST, error_codes::BAD_REQUEST).into_response()
        }
    };

    let Some(service_token) = headers
        .get("x-service-token")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
    else {
        return publish_error(StatusCode::FORBIDDEN, error_codes::UNAUTHORIZED_SERVICE)
            .into_response();
    };

    let target_channel = channel::derive_publish_channel(&request);

    if !channel::declared_service_matches_channel(&request.service, &target_channel) {
        return publish_error(StatusCode::FORBIDDEN, error_codes::UNAUTHORIZED_SERVICE)
            .into_response();
    }

    if !state
        .service_authenticator
        .authorize(service_token, &request.service, &target_channel)
        .await
    {
        return publish_error(StatusCode::FORBIDDEN, error_codes::UNAUTHORIZED_SERVICE)
            .into_response();
    }

    let published_at = Utc::now();
    let envelope = Arc::new(MessageEnvelope {
        id: Uuid::new_v4().to_string(),
        channel: target_channel.clone(),
        payload: request.log_data,
        published_at,
    });

    let subscribers = state.registry.subscribers(&target_channel);
    let mut delivered: u64 = 0;
    let mut dropped: u64 = 0;
    for handle in &subscribers {
        match handle.try_enqueue(envelope.clone()) {
            EnqueueOutcome::Delivered => delivered += 1,
            EnqueueOutcome::DroppedFull | EnqueueOutcome::DroppedClosed => dropped += 1,
        }
    }

    state.stats.record_publish();
    state.stats.record_delivered(delivered);
    state.stats.record_dropped(dropped);

    tracing::debug!(
        channel = %target_channel,
        delivered,
        dropped,
        "published log record"
    );

    Json(PublishResponse {
        success: true,
        channel: target_channel,
        delivered: delivered as usize,
        timestamp: published_at.timestamp_millis(),
    })
    .into_response()
}
