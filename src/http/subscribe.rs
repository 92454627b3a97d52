use axum::extract::{RawQuery, State};
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use logbroker_protocol::{ConnectedHandshake, HandshakeKind, HandshakeStatus};

use crate::http::response::unauthenticated;
use crate::state::AppState;
use crate::writer::connection_stream;
use crate::{channel, registry};

/// `GET /api/logs/stream` (§4.4, §6.1).
pub async fn stream_logs(State(state): State<AppState>, headers: HeaderMap, RawQuery(query): RawQuery) -> Response {
    let Some(principal) = state.principal_resolver.resolve(&headers).await else {
        return unauthenticated("principal resolution failed").into_response();
    };

    let requested = parse_channels_query(query.as_deref());
    let authorized = channel::authorize_subscribe_channels(&requested, &principal);

    let registry::Registration {
        connection_id,
        receiver,
        handle,
    } = state
        .registry
        .register(principal.clone(), authorized.clone(), state.config.queue_capacity);

    let handshake = ConnectedHandshake {
        kind: HandshakeKind::Connection,
        status: HandshakeStatus::Connected,
        channels: authorized,
        user_id: principal.user_id,
        connection_id: connection_id.to_string(),
        timestamp: Utc::now().timestamp_millis(),
    };
    let handshake_json = serde_json::to_string(&handshake).unwrap_or_else(|_| "{}".to_owned());
    let handshake_event = Event::default().data(handshake_json);

    let stream = connection_stream(
        state.registry.clone(),
        connection_id,
        handle,
        receiver,
        state.config.heartbeat_interval,
        handshake_event,
        state.shutdown.subscribe(),
    );

    let mut response = Sse::new(stream).into_response();
    let response_headers = response.headers_mut();
    response_headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/event-stream"),
    );
    response_headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-transform"),
    );
    response_headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    response_headers.insert(
        "x-accel-buffering",
        HeaderValue::from_static("no"),
    );
    response
}

/// Accepts both the repeated (`channels=a&channels=b`) and comma-separated
/// (`channels=a,b`) forms, per §9's open-question resolution. `url`'s
/// `form_urlencoded` parser already yields one (key, value) pair per
/// occurrence of a repeated key; each value is further split on `,`.
fn parse_channels_query(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    url::form_urlencoded::parse(raw.as_bytes())
        .filter(|(key, _)| key == "channels")
        .flat_map(|(_, value)| {
            value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect::<Vec<_>>()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_channels_query_accepts_repeated_form() {
        let channels = parse_channels_query(Some("channels=a&channels=b"));
        assert_eq!(channels, vec!["a".to_owned(), "b".to_owned()]);
    }

    #[test]
    fn parse_channels_query_accepts_comma_separated_form() {
        let channels = parse_channels_query(Some("channels=a,b"));
        assert_eq!(channels, vec!["a".to_owned(), "b".to_owned()]);
    }

    #[test]
    fn parse_channels_query_handles_mixed_form_and_empty_entries() {
        let channels = parse_channels_query(Some("channels=a,,b&channels=&channels=c"));
        assert_eq!(channels, vec!["a".to_owned(), "b".to_owned(), "c".to_owned()]);
    }

    #[test]
    fn parse_channels_query_is_empty_with_no_query_string() {
        assert!(parse_channels_query(None).is_empty());
    }
}
