//! # Error Policy
//!
//! Requeue decisions for failed reconciliations and classification of watch
//! stream errors.

use crate::controller::managed::ManagedContext;
use crate::controller::provider_config::ProviderConfigContext;
use crate::crd::ProviderConfig;
use crate::error::{Error, ErrorKind};
use crate::managed::{record_name, Managed};
use crate::observability::metrics;
use kube_runtime::controller::Action;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Requeue a failed record.
///
/// Throttling and transient service errors retry after the short wait without
/// advancing the record's backoff. Everything else waits for the next
/// Fibonacci backoff, tracked per record.
pub fn handle_reconciliation_error<R: Managed>(
    obj: Arc<R>,
    error: &Error,
    ctx: Arc<ManagedContext<R>>,
) -> Action {
    let kind = R::kind(&());
    let name = record_name(obj.as_ref());
    metrics::increment_reconcile_errors(&kind);

    if error.kind().is_retryable() {
        let delay = ctx.config.short_wait();
        warn!(
            resource.kind = %kind,
            resource.name = name,
            error = %error,
            retry_secs = delay.as_secs(),
            "Transient AWS error, retrying shortly"
        );
        metrics::increment_requeues_total("short-wait");
        return Action::requeue(delay);
    }

    let (backoff, error_count) = ctx.next_backoff(obj.as_ref());

    match error.kind() {
        ErrorKind::ConfigError | ErrorKind::PreconditionFailed | ErrorKind::InvalidInput => warn!(
            resource.kind = %kind,
            resource.name = name,
            error = %error,
            "Reconciliation blocked on user action"
        ),
        _ => error!(
            resource.kind = %kind,
            resource.name = name,
            error = %error,
            "Reconciliation error"
        ),
    }
    metrics::increment_requeues_total("error-backoff");
    info!(
        resource.kind = %kind,
        resource.name = name,
        backoff_secs = backoff.as_secs(),
        error_count,
        "Retrying with Fibonacci backoff"
    );
    Action::requeue(backoff)
}

/// Requeue a failed ProviderConfig pass after the poll interval
pub fn handle_provider_config_error(
    obj: Arc<ProviderConfig>,
    error: &Error,
    ctx: Arc<ProviderConfigContext>,
) -> Action {
    error!(
        resource.kind = "ProviderConfig",
        resource.name = record_name(obj.as_ref()),
        error = %error,
        "Reconciliation error"
    );
    metrics::increment_reconcile_errors("ProviderConfig");
    metrics::increment_requeues_total("error-backoff");
    Action::requeue(ctx.config.poll_interval())
}

/// How a watch stream error is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchErrorClass {
    /// 401: RBAC revoked or token expired
    Unauthorized,
    /// 410: resource version expired
    Expired,
    /// 429: API server storage reinitializing
    Throttled,
    /// 404: CRD missing or object deleted
    NotFound,
    Other,
}

/// Classify a watch error by its rendered message
pub fn classify_watch_error(error_string: &str) -> WatchErrorClass {
    // 404 first: a plain-text 404 body surfaces as a serde error mentioning WatchFailed
    let is_not_found = error_string.contains("ObjectNotFound")
        || error_string.contains("404")
        || error_string.contains("not found");
    if (error_string.contains("401") || error_string.contains("Unauthorized")) && !is_not_found {
        WatchErrorClass::Unauthorized
    } else if error_string.contains("410")
        || error_string.contains("too old resource version")
        || error_string.contains("Expired")
        || error_string.contains("Gone")
    {
        WatchErrorClass::Expired
    } else if error_string.contains("429")
        || error_string.contains("storage is (re)initializing")
        || error_string.contains("TooManyRequests")
    {
        WatchErrorClass::Throttled
    } else if is_not_found {
        WatchErrorClass::NotFound
    } else {
        WatchErrorClass::Other
    }
}

/// Handle a watch stream error.
///
/// Returns `false` to drop the event and let the watch restart, `true` to
/// keep it.
pub async fn handle_watch_stream_error(
    kind: &str,
    error_string: &str,
    backoff: &Arc<AtomicU64>,
    max_backoff_ms: u64,
    watch_restart_delay: Duration,
) -> bool {
    match classify_watch_error(error_string) {
        WatchErrorClass::Unauthorized => {
            error!(
                resource.kind = kind,
                "Watch authentication failed (401): check the controller's ClusterRole and ServiceAccount token"
            );
            tokio::time::sleep(watch_restart_delay).await;
            false
        }
        WatchErrorClass::Expired => {
            warn!(resource.kind = kind, "Watch resource version expired (410), restarting watch");
            false
        }
        WatchErrorClass::Throttled => {
            let current = backoff.load(Ordering::Relaxed);
            warn!(
                resource.kind = kind,
                backoff_ms = current,
                "API server storage reinitializing (429), backing off"
            );
            tokio::time::sleep(Duration::from_millis(current)).await;
            backoff.store(std::cmp::min(current * 2, max_backoff_ms), Ordering::Relaxed);
            false
        }
        WatchErrorClass::NotFound => {
            warn!(
                resource.kind = kind,
                error = error_string,
                "Watched resource not found (404); the CRD may be missing"
            );
            true
        }
        WatchErrorClass::Other => {
            error!(resource.kind = kind, error = error_string, "Controller stream error");
            tokio::time::sleep(watch_restart_delay).await;
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::CloudError;
    use crate::config::ControllerConfig;
    use crate::crd::{Role, RoleParameters, RoleSpec};
    use crate::managed::references::MockReferenceReader;
    use crate::managed::store::MockRecordStore;
    use crate::managed::usage::MockUsageTracker;
    use crate::managed::{Connector, ExternalClient};
    use async_trait::async_trait;

    struct Unused;

    #[async_trait]
    impl Connector<Role> for Unused {
        async fn connect(&self, _record: &Role) -> crate::error::Result<Box<dyn ExternalClient<Role>>> {
            Err(Error::ConfigMissing("default".into()))
        }
    }

    fn context() -> Arc<ManagedContext<Role>> {
        Arc::new(ManagedContext::new(
            Arc::new(Unused),
            Arc::new(MockRecordStore::new()),
            Arc::new(MockUsageTracker::new()),
            Arc::new(MockReferenceReader::new()),
            ControllerConfig::default(),
        ))
    }

    fn role() -> Arc<Role> {
        Arc::new(Role::new(
            "my-role",
            RoleSpec {
                resource_spec: Default::default(),
                for_provider: RoleParameters::default(),
            },
        ))
    }

    #[test]
    fn transient_errors_retry_shortly_without_backing_off() {
        let ctx = context();
        let config = ControllerConfig::default();
        let throttled = Error::from(CloudError::service("Throttling", "Rate exceeded"));
        assert_eq!(throttled.kind(), ErrorKind::Throttled);

        let action = handle_reconciliation_error(role(), &throttled, Arc::clone(&ctx));
        assert_eq!(action, Action::requeue(config.short_wait()));
        let action = handle_reconciliation_error(role(), &throttled, Arc::clone(&ctx));
        assert_eq!(action, Action::requeue(config.short_wait()));

        // The backoff sequence starts fresh for the first permanent error
        let missing = Error::ConfigMissing("default".into());
        let action = handle_reconciliation_error(role(), &missing, Arc::clone(&ctx));
        assert_eq!(action, Action::requeue(Duration::from_secs(60)));
        handle_reconciliation_error(role(), &missing, Arc::clone(&ctx));
        let action = handle_reconciliation_error(role(), &missing, ctx);
        assert_eq!(action, Action::requeue(Duration::from_secs(120)));
    }

    #[test]
    fn not_found_wins_over_unauthorized() {
        assert_eq!(
            classify_watch_error("WatchFailed: invalid type: integer `404`, Unauthorized"),
            WatchErrorClass::NotFound
        );
        assert_eq!(
            classify_watch_error("ApiError: Unauthorized (401)"),
            WatchErrorClass::Unauthorized
        );
    }

    #[test]
    fn watch_errors_are_classified() {
        assert_eq!(
            classify_watch_error("too old resource version: 123 (456)"),
            WatchErrorClass::Expired
        );
        assert_eq!(
            classify_watch_error("storage is (re)initializing"),
            WatchErrorClass::Throttled
        );
        assert_eq!(classify_watch_error("connection reset"), WatchErrorClass::Other);
    }

    #[tokio::test]
    async fn throttled_watch_doubles_backoff_up_to_ceiling() {
        let backoff = Arc::new(AtomicU64::new(1));
        let keep = handle_watch_stream_error("Role", "429 TooManyRequests", &backoff, 3, Duration::ZERO).await;
        assert!(!keep);
        assert_eq!(backoff.load(Ordering::Relaxed), 2);
        handle_watch_stream_error("Role", "429", &backoff, 3, Duration::ZERO).await;
        assert_eq!(backoff.load(Ordering::Relaxed), 3);
    }
}
