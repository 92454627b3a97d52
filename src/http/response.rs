use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use logbroker_protocol::{error_codes, HttpErrorEnvelope, PublishErrorBody};
use std::fmt::Display;

pub type HttpResponse = Response;
pub type HttpResult<T = ()> = Result<T, HttpResponse>;

pub(crate) fn json_error(
    status: StatusCode,
    code: impl Into<String>,
    message: impl Into<String>,
) -> HttpResponse {
    (
        status,
        Json(HttpErrorEnvelope {
            code: code.into(),
            message: message.into(),
            details: None,
        }),
    )
        .into_response()
}

pub fn internal_error(err: impl Display) -> HttpResponse {
    json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        error_codes::INTERNAL,
        err.to_string(),
    )
}

pub fn bad_request(message: impl Into<String>) -> HttpResponse {
    json_error(StatusCode::BAD_REQUEST, error_codes::BAD_REQUEST, message)
}

pub fn unauthenticated(message: impl Into<String>) -> HttpResponse {
    json_error(StatusCode::UNAUTHORIZED, error_codes::UNAUTHENTICATED, message)
}

pub fn unauthorized_service(message: impl Into<String>) -> HttpResponse {
    json_error(
        StatusCode::FORBIDDEN,
        error_codes::UNAUTHORIZED_SERVICE,
        message,
    )
}

pub fn not_found(message: impl Into<String>) -> HttpResponse {
    json_error(StatusCode::NOT_FOUND, error_codes::NOT_FOUND, message)
}

/// Publish-failure body, frozen by spec.md §6.2 to exactly
/// `{"error": "<token>"}` — unlike every other endpoint, publish failures
/// do not use `HttpErrorEnvelope`.
pub fn publish_error(status: StatusCode, token: impl Into<String>) -> HttpResponse {
    (status, Json(PublishErrorBody { error: token.into() })).into_response()
}
