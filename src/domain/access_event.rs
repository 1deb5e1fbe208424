//! "URL accessed" event exchanged between the publisher, the fallback queue,
//! the reconciler, the broker, and the analytics consumer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Routing key every access event is published with.
pub const URL_ACCESSED_ROUTING_KEY: &str = "url.accessed";

/// An access to a short link, created on every successful resolution.
///
/// Never persisted on its own. The JSON form is the wire contract:
///
/// ```json
/// { "shortCode": "abc123", "timestamp": "2025-08-01T12:00:00.000Z", "ip": "10.0.0.1", "userAgent": "curl/8.0" }
/// ```
///
/// `ip` and `userAgent` are omitted when unknown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessEvent {
    pub short_code: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl AccessEvent {
    /// Creates an event stamped with the current time.
    pub fn new(short_code: impl Into<String>, client: ClientInfo) -> Self {
        Self::at(short_code, Utc::now(), client)
    }

    /// Creates an event with an explicit timestamp.
    pub fn at(short_code: impl Into<String>, timestamp: DateTime<Utc>, client: ClientInfo) -> Self {
        Self {
            short_code: short_code.into(),
            timestamp,
            ip: client.ip,
            user_agent: client.user_agent,
        }
    }

    /// Serializes to the JSON wire format.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Parses the JSON wire format.
    pub fn from_json(raw: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(raw)
    }
}

/// Request metadata attached to an access event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    pub fn new(ip: Option<String>, user_agent: Option<&str>) -> Self {
        Self {
            ip,
            user_agent: user_agent.map(|s| s.to_string()),
        }
    }
}
