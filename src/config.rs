use std::collections::HashMap;
use std::env;
use std::time::Duration;

/// Runtime configuration, built once from the environment at startup.
///
/// There is no config file and no global mutable state; `Config` is a plain
/// value object threaded through `AppState`.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub cors_origins: CorsOrigins,
    pub heartbeat_interval: Duration,
    pub queue_capacity: usize,
    pub service_tokens: HashMap<String, String>,
}

#[derive(Debug, Clone)]
pub enum CorsOrigins {
    Any,
    List(Vec<String>),
}

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_HEARTBEAT_SECS: u64 = 25;
const DEFAULT_QUEUE_CAPACITY: usize = 256;

impl Config {
    pub fn from_env() -> Self {
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_owned());

        let heartbeat_secs = env::var("HEARTBEAT_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_HEARTBEAT_SECS);

        let queue_capacity = env::var("QUEUE_CAPACITY")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(DEFAULT_QUEUE_CAPACITY);

        let cors_origins = match env::var("CORS_ORIGINS") {
            Ok(raw) if raw.trim() == "*" => CorsOrigins::Any,
            Ok(raw) => CorsOrigins::List(
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_owned)
                    .collect(),
            ),
            Err(_) => CorsOrigins::Any,
        };

        let service_tokens = env::var("SERVICE_TOKENS")
            .ok()
            .map(|raw| parse_service_tokens(&raw))
            .unwrap_or_default();

        Self {
            bind_addr,
            cors_origins,
            heartbeat_interval: Duration::from_secs(heartbeat_secs),
            queue_capacity,
            service_tokens,
        }
    }
}

/// Parses `SERVICE_TOKENS` formatted as `token1:service-a,token2:service-b`.
fn parse_service_tokens(raw: &str) -> HashMap<String, String> {
    raw.split(',')
        .filter_map(|entry| {
            let entry = entry.trim();
            if entry.is_empty() {
                return None;
            }
            let (token, service) = entry.split_once(':')?;
            let token = token.trim();
            let service = service.trim();
            if token.is_empty() || service.is_empty() {
                return None;
            }
            Some((token.to_owned(), service.to_owned()))
        })
        .collect()
}
