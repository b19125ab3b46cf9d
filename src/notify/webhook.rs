//! Webhook delivery of breach events.

use std::time::Duration;

use tracing::{debug, warn};

use super::{BreachEvent, Notifier};
use crate::error::{Result, WardenError};

/// Default delivery timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// POSTs breach events as JSON to a configured endpoint.
///
/// Each event gets a single attempt on a detached tokio task, abandoned on
/// timeout. A slow or failing endpoint can never delay a rate limit
/// decision. Requires a running tokio runtime at `notify` time.
pub struct WebhookNotifier {
    client: reqwest::Client,
    endpoint: String,
}

impl WebhookNotifier {
    /// Create a notifier with the default timeout.
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        Self::with_timeout(endpoint, DEFAULT_TIMEOUT)
    }

    /// Create a notifier with an explicit delivery timeout.
    pub fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WardenError::Config(format!("Failed to build webhook client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// The endpoint events are delivered to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Notifier for WebhookNotifier {
    fn notify(&self, event: BreachEvent) {
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();

        tokio::spawn(async move {
            match client.post(&endpoint).json(&event).send().await {
                Ok(response) if response.status().is_success() => {
                    debug!(
                        client = %event.client,
                        endpoint = %event.endpoint,
                        "Breach event delivered"
                    );
                }
                Ok(response) => {
                    warn!(
                        status = %response.status(),
                        client = %event.client,
                        "Breach event rejected by webhook"
                    );
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        client = %event.client,
                        "Failed to deliver breach event"
                    );
                }
            }
        });
    }
}
