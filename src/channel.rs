use std::collections::HashSet;

use logbroker_protocol::PublishRequest;

use crate::auth::Principal;

/// A parsed channel name: `logs:<service>:<workspace>:<resource?>`.
///
/// Components are opaque, case-sensitive strings compared byte-exact. The
/// parsed form exists only to extract the service/workspace components for
/// authorization; the wire-level channel name is always the original string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedChannel {
    pub service: String,
    pub workspace: String,
    pub resource: Option<String>,
}

/// Splits on `:` with a maximum of four components. Returns `None` if the
/// literal prefix isn't `logs`, or the service/workspace components are
/// empty.
pub fn parse_channel(raw: &str) -> Option<ParsedChannel> {
    let mut parts = raw.splitn(4, ':');
    let prefix = parts.next()?;
    if prefix != "logs" {
        return None;
    }
    let service = parts.next()?;
    let workspace = parts.next()?;
    if service.is_empty() || workspace.is_empty() {
        return None;
    }
    let resource = parts.next().filter(|r| !r.is_empty()).map(str::to_owned);

    Some(ParsedChannel {
        service: service.to_owned(),
        workspace: workspace.to_owned(),
        resource,
    })
}

/// Subscribe-side authorization: workspace membership is the only gate.
/// Resource-level access is not checked by the core.
pub fn is_authorized_for_subscribe(channel: &ParsedChannel, principal: &Principal) -> bool {
    principal.workspaces.contains(&channel.workspace)
}

/// Parses, deduplicates, and filters a set of requested channel names down
/// to the subset the principal is authorized to subscribe to. Malformed or
/// unauthorized names are silently dropped (§4.1); this is never an error.
pub fn authorize_subscribe_channels(requested: &[String], principal: &Principal) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut authorized = Vec::new();
    for raw in requested {
        if raw.is_empty() || !seen.insert(raw.clone()) {
            continue;
        }
        let Some(parsed) = parse_channel(raw) else {
            continue;
        };
        if is_authorized_for_subscribe(&parsed, principal) {
            authorized.push(raw.clone());
        }
    }
    authorized
}

/// Derives the target channel name for a publish request (§4.5 step 1).
/// `function_id` takes precedence over `workflow_id` when both are present.
pub fn derive_publish_channel(req: &PublishRequest) -> String {
    if let Some(function_id) = &req.function_id {
        format!("logs:function:{}:{}", req.workspace_id, function_id)
    } else if let Some(workflow_id) = &req.workflow_id {
        format!(
            "logs:{}:{}:{}",
            req.service, req.workspace_id, workflow_id
        )
    } else {
        format!("logs:{}:{}", req.service, req.workspace_id)
    }
}

/// Publish-side authorization: the declared service on the body must equal
/// the service component of the derived channel. The service authenticator
/// (external collaborator) is consulted separately by the caller.
pub fn declared_service_matches_channel(declared_service: &str, channel: &str) -> bool {
    match parse_channel(channel) {
        Some(parsed) => parsed.service == declared_service,
        None => false,
    }
}
