//! Breach event notification.

mod webhook;

pub use webhook::WebhookNotifier;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One over-limit observation, delivered to the alert endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreachEvent {
    /// The offending client identifier
    pub client: String,
    /// The endpoint the client was throttled on
    pub endpoint: String,
    /// Requests counted in the window when the denial happened
    pub count: u64,
    /// The limit the client ran into
    pub limit: u64,
    /// When the denial happened
    pub timestamp: DateTime<Utc>,
}

/// Fire-and-forget sink for breach events.
///
/// `notify` must return without waiting on delivery. Failures stay inside
/// the implementation and never reach the request path or change a
/// rate limit decision.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: BreachEvent);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_all_fields() {
        let event = BreachEvent {
            client: "1.2.3.4".to_string(),
            endpoint: "/home".to_string(),
            count: 5,
            limit: 5,
            timestamp: Utc::now(),
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["client"], "1.2.3.4");
        assert_eq!(value["endpoint"], "/home");
        assert_eq!(value["count"], 5);
        assert_eq!(value["limit"], 5);
        assert!(value["timestamp"].is_string());
    }
}
