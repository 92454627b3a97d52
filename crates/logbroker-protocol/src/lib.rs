// logbroker-protocol: wire types for the SSE log broker.
//
// These are the JSON shapes that cross the HTTP boundary: the subscribe
// handshake and data records written onto the event stream, the publish
// request/response bodies, and the frozen HTTP error envelope used by
// every non-2xx response.

use serde::{Deserialize, Serialize};

/// First record written to every accepted subscribe stream, announcing the
/// connection's effective (post-authorization) channel set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectedHandshake {
    #[serde(rename = "type")]
    pub kind: HandshakeKind,
    pub status: HandshakeStatus,
    pub channels: Vec<String>,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "connectionId")]
    pub connection_id: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandshakeKind {
    Connection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandshakeStatus {
    Connected,
}

/// A single fanned-out log record as written on the wire (the `data:` payload).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataRecord {
    pub channel: String,
    pub data: serde_json::Value,
    pub timestamp: i64,
    pub id: String,
}

/// Request body for `POST /api/logs/publish` (and `/test/logs`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PublishRequest {
    pub service: String,
    pub workspace_id: String,
    #[serde(default)]
    pub workflow_id: Option<String>,
    #[serde(default)]
    pub function_id: Option<String>,
    #[serde(rename = "logData")]
    pub log_data: serde_json::Value,
}

/// Successful response body for a publish.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishResponse {
    pub success: bool,
    pub channel: String,
    pub delivered: usize,
    pub timestamp: i64,
}

/// Frozen HTTP error envelope used by every non-2xx response except a
/// publish failure (see `PublishErrorBody`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpErrorEnvelope {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Error body for `POST /api/logs/publish` (and `/test/logs`) failures,
/// frozen by spec to exactly `{"error": "<token>"}` — no `message` or
/// `details` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishErrorBody {
    pub error: String,
}

/// Frozen machine-readable error reason tokens (see spec §7).
pub mod error_codes {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const UNAUTHENTICATED: &str = "unauthenticated";
    pub const UNAUTHORIZED_SERVICE: &str = "unauthorized_service";
    pub const NOT_FOUND: &str = "not_found";
    pub const INTERNAL: &str = "internal";
}

/// `GET /health` response body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub connections: usize,
    pub channels: usize,
    #[serde(rename = "uptime")]
    pub uptime_ms: u64,
    pub stats: GlobalStats,
}

/// Process-wide counters, as returned in `/health` and `/admin/logs/stats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GlobalStats {
    pub total_connections: u64,
    pub total_publishes: u64,
    pub total_delivered: u64,
    pub total_dropped: u64,
}

/// One entry in the `GET /admin/logs/stats` response array.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelStats {
    pub channel: String,
    #[serde(rename = "subscriberCount")]
    pub subscriber_count: usize,
    pub subscribers: Vec<SubscriberStats>,
}

/// Per-connection detail within a `ChannelStats` entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubscriberStats {
    #[serde(rename = "connectionId")]
    pub connection_id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "connectedAt")]
    pub connected_at: i64,
    #[serde(rename = "logsSent")]
    pub logs_sent: u64,
}

/// `GET /admin/logs/stats` response body: per-channel detail plus global counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminStatsResponse {
    pub channels: Vec<ChannelStats>,
    pub stats: GlobalStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connected_handshake_serializes_with_expected_field_names() {
        let handshake = ConnectedHandshake {
            kind: HandshakeKind::Connection,
            status: HandshakeStatus::Connected,
            channels: vec!["logs:etl:workspace123:workflow456".to_owned()],
            user_id: "user123".to_owned(),
            connection_id: "11111111-1111-1111-1111-111111111111".to_owned(),
            timestamp: 1_700_000_000_000,
        };

        let json = serde_json::to_value(&handshake).unwrap();
        assert_eq!(json["type"], "connection");
        assert_eq!(json["status"], "connected");
        assert_eq!(json["userId"], "user123");
        assert_eq!(json["connectionId"], "11111111-1111-1111-1111-111111111111");
        assert_eq!(json["channels"][0], "logs:etl:workspace123:workflow456");
    }

    #[test]
    fn publish_request_defaults_workflow_and_function_id_to_none() {
        let body = r#"{"service":"etl","workspace_id":"ws1","logData":{"a":1}}"#;
        let req: PublishRequest = serde_json::from_str(body).unwrap();
        assert_eq!(req.workflow_id, None);
        assert_eq!(req.function_id, None);
        assert_eq!(req.log_data, serde_json::json!({"a": 1}));
    }

    #[test]
    fn publish_error_body_serializes_to_bare_error_field() {
        let body = PublishErrorBody {
            error: error_codes::UNAUTHORIZED_SERVICE.to_owned(),
        };
        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(json, r#"{"error":"unauthorized_service"}"#);
    }

    #[test]
    fn http_error_envelope_omits_details_when_none() {
        let envelope = HttpErrorEnvelope {
            code: error_codes::UNAUTHORIZED_SERVICE.to_owned(),
            message: "nope".to_owned(),
            details: None,
        };
        let json = serde_json::to_string(&envelope).unwrap();
        assert!(!json.contains("details"));
    }

    #[test]
    fn data_record_round_trips() {
        let record = DataRecord {
            channel: "logs:etl:workspace123:workflow456".to_owned(),
            data: serde_json::json!({"level": "INFO", "message": "hello"}),
            timestamp: 42,
            id: "abc".to_owned(),
        };
        let json = serde_json::to_string(&record).unwrap();
        let back: DataRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, back);
    }
}
