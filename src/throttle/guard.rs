//! Request guard orchestrating key derivation, counting, and alerting.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::Utc;
use tracing::error;

use super::counter::{Decision, WindowCounter};
use super::key::ClientKey;
use crate::config::{FailurePolicy, RouteRule, WardenConfig};
use crate::error::Result;
use crate::notify::{BreachEvent, Notifier, WebhookNotifier};
use crate::store::{FileStore, MemoryStore, Store};

/// Pre-handler rate limit check.
///
/// The host framework calls [`Guard::evaluate`] before running a protected
/// handler and maps a denied decision to an HTTP 429 response. Over-limit is
/// an ordinary decision value, never an error: `evaluate` is infallible from
/// the caller's point of view, and store failures are resolved internally
/// through the configured [`FailurePolicy`].
pub struct Guard {
    counter: WindowCounter,
    notifier: Option<Arc<dyn Notifier>>,
    failure_policy: FailurePolicy,
}

impl Guard {
    /// Create a guard over the given store, without alerting and with the
    /// default fail-open policy.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            counter: WindowCounter::new(store),
            notifier: None,
            failure_policy: FailurePolicy::default(),
        }
    }

    /// Build a guard from configuration.
    ///
    /// A configured store path selects a file-backed store; without one,
    /// counters live in memory and limits are per-process. A configured
    /// endpoint attaches a webhook notifier with the configured timeout;
    /// without one, alerting is disabled.
    pub fn from_config(config: &WardenConfig) -> Result<Self> {
        config.validate()?;

        let store: Arc<dyn Store> = match &config.store.path {
            Some(path) => Arc::new(FileStore::open(path)?),
            None => Arc::new(MemoryStore::new()),
        };

        let mut guard = Guard::new(store).with_failure_policy(config.failure_policy);
        if let Some(endpoint) = &config.notifier.endpoint {
            let notifier = WebhookNotifier::with_timeout(
                endpoint,
                Duration::from_millis(config.notifier.timeout_ms),
            )?;
            guard = guard.with_notifier(Arc::new(notifier));
        }
        Ok(guard)
    }

    /// Attach a breach notifier. Without one, denials are only logged.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Override the storage failure policy.
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Evaluate one request from `client_id` against `endpoint_id`'s rule.
    ///
    /// On deny, one breach event is dispatched to the notifier on a detached
    /// task; the decision returns without waiting on it.
    pub async fn evaluate(&self, client_id: &str, endpoint_id: &str, rule: &RouteRule) -> Decision {
        let key = ClientKey::new(client_id, endpoint_id);
        let now = epoch_secs();

        match self.counter.check(&key, rule, now).await {
            Ok(decision) => {
                if decision.is_denied() {
                    self.report_breach(&key, rule, decision.count);
                }
                decision
            }
            Err(e) => {
                error!(
                    key = %key,
                    error = %e,
                    policy = ?self.failure_policy,
                    "Store failure during rate limit check"
                );
                match self.failure_policy {
                    FailurePolicy::FailOpen => Decision {
                        allowed: true,
                        count: 0,
                        retry_after_secs: 0,
                    },
                    FailurePolicy::FailClosed => Decision {
                        allowed: false,
                        count: 0,
                        retry_after_secs: rule.period_secs,
                    },
                }
            }
        }
    }

    fn report_breach(&self, key: &ClientKey, rule: &RouteRule, count: u64) {
        if let Some(notifier) = &self.notifier {
            notifier.notify(BreachEvent {
                client: key.client.clone(),
                endpoint: key.endpoint.clone(),
                count,
                limit: rule.limit,
                timestamp: Utc::now(),
            });
        }
    }
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WardenError;
    use crate::store::WindowRecord;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    struct RecordingNotifier {
        events: Mutex<Vec<BreachEvent>>,
    }

    impl RecordingNotifier {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                events: Mutex::new(Vec::new()),
            })
        }

        fn events(&self) -> Vec<BreachEvent> {
            self.events.lock().clone()
        }
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, event: BreachEvent) {
            self.events.lock().push(event);
        }
    }

    struct FailingStore;

    #[async_trait]
    impl Store for FailingStore {
        async fn get(&self, _key: &str) -> Result<Option<WindowRecord>> {
            Err(WardenError::Storage("backing file unreachable".to_string()))
        }

        async fn put(&self, _key: &str, _record: WindowRecord) -> Result<()> {
            Err(WardenError::Storage("backing file unreachable".to_string()))
        }

        async fn delete(&self, _key: &str) -> Result<()> {
            Err(WardenError::Storage("backing file unreachable".to_string()))
        }
    }

    fn rule(limit: u64, period_secs: u64) -> RouteRule {
        RouteRule::new(limit, period_secs).unwrap()
    }

    #[tokio::test]
    async fn test_allow_does_not_notify() {
        let notifier = RecordingNotifier::new();
        let guard = Guard::new(Arc::new(MemoryStore::new()))
            .with_notifier(Arc::clone(&notifier) as Arc<dyn Notifier>);

        let decision = guard.evaluate("1.2.3.4", "/home", &rule(5, 60)).await;
        assert!(decision.allowed);
        assert!(notifier.events().is_empty());
    }

    #[tokio::test]
    async fn test_deny_triggers_single_notification() {
        let notifier = RecordingNotifier::new();
        let guard = Guard::new(Arc::new(MemoryStore::new()))
            .with_notifier(Arc::clone(&notifier) as Arc<dyn Notifier>);
        let rule = rule(2, 60);

        guard.evaluate("1.2.3.4", "/home", &rule).await;
        guard.evaluate("1.2.3.4", "/home", &rule).await;
        let decision = guard.evaluate("1.2.3.4", "/home", &rule).await;

        assert!(decision.is_denied());
        let events = notifier.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].client, "1.2.3.4");
        assert_eq!(events[0].endpoint, "/home");
        assert_eq!(events[0].count, 2);
        assert_eq!(events[0].limit, 2);
    }

    #[tokio::test]
    async fn test_deny_without_notifier() {
        let guard = Guard::new(Arc::new(MemoryStore::new()));
        let rule = rule(1, 60);

        assert!(guard.evaluate("1.2.3.4", "/home", &rule).await.allowed);
        assert!(guard.evaluate("1.2.3.4", "/home", &rule).await.is_denied());
    }

    #[tokio::test]
    async fn test_notifier_failure_does_not_change_decision() {
        // A webhook with nothing listening: delivery fails on a detached
        // task while the decision comes back untouched.
        let notifier = crate::notify::WebhookNotifier::new("http://127.0.0.1:1/breach").unwrap();
        let guard =
            Guard::new(Arc::new(MemoryStore::new())).with_notifier(Arc::new(notifier));
        let rule = rule(1, 60);

        assert!(guard.evaluate("1.2.3.4", "/home", &rule).await.allowed);
        let decision = guard.evaluate("1.2.3.4", "/home", &rule).await;
        assert!(decision.is_denied());
        assert_eq!(decision.count, 1);
    }

    #[tokio::test]
    async fn test_from_config_defaults_to_memory_store() {
        let yaml = r#"
routes:
  home:
    limit: 2
    period_secs: 60
"#;
        let config = WardenConfig::from_yaml(yaml).unwrap();
        let guard = Guard::from_config(&config).unwrap();
        let rule = *config.route("home").unwrap();

        assert!(guard.evaluate("1.2.3.4", "/home", &rule).await.allowed);
        assert!(guard.evaluate("1.2.3.4", "/home", &rule).await.allowed);
        assert!(guard.evaluate("1.2.3.4", "/home", &rule).await.is_denied());
    }

    #[tokio::test]
    async fn test_from_config_wires_store_notifier_and_policy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counters.json");
        let yaml = format!(
            r#"
store:
  path: {}
notifier:
  endpoint: http://127.0.0.1:1/breach
  timeout_ms: 250
failure_policy: fail_closed
routes:
  home:
    limit: 1
    period_secs: 60
"#,
            path.display()
        );
        let config = WardenConfig::from_yaml(&yaml).unwrap();
        let guard = Guard::from_config(&config).unwrap();
        let rule = *config.route("home").unwrap();

        assert!(guard.evaluate("1.2.3.4", "/home", &rule).await.allowed);
        assert!(guard.evaluate("1.2.3.4", "/home", &rule).await.is_denied());

        // The counter landed in the configured backing file.
        let reopened = FileStore::open(&path).unwrap();
        let record = reopened.get("1.2.3.4:/home").await.unwrap().unwrap();
        assert_eq!(record.count, 1);
    }

    #[tokio::test]
    async fn test_from_config_rejects_invalid_route() {
        let mut config = WardenConfig::default();
        config.routes.insert(
            "home".to_string(),
            RouteRule {
                limit: 0,
                period_secs: 60,
            },
        );
        assert!(Guard::from_config(&config).is_err());
    }

    #[tokio::test]
    async fn test_fail_open_admits_on_store_failure() {
        let notifier = RecordingNotifier::new();
        let guard = Guard::new(Arc::new(FailingStore))
            .with_notifier(Arc::clone(&notifier) as Arc<dyn Notifier>)
            .with_failure_policy(FailurePolicy::FailOpen);

        let decision = guard.evaluate("1.2.3.4", "/home", &rule(5, 60)).await;
        assert!(decision.allowed);
        // A store failure is not a breach.
        assert!(notifier.events().is_empty());
    }

    #[tokio::test]
    async fn test_fail_closed_rejects_on_store_failure() {
        let guard =
            Guard::new(Arc::new(FailingStore)).with_failure_policy(FailurePolicy::FailClosed);

        let decision = guard.evaluate("1.2.3.4", "/home", &rule(5, 60)).await;
        assert!(decision.is_denied());
        assert_eq!(decision.retry_after_secs, 60);
    }
}
