//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.

use super::{env_var_opt, env_var_or_default, env_var_or_default_str};
use crate::constants::*;
use std::time::Duration;

/// Controller-level configuration
///
/// All settings have defaults and can be overridden via environment variables.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Requeue interval while a remote object is still settling (seconds)
    pub poll_interval_secs: u64,
    /// Requeue interval for records that are in sync (seconds)
    pub sync_interval_secs: u64,
    /// Requeue interval right after a remote mutation (seconds)
    pub short_wait_secs: u64,
    /// Upper bound for a single reconciliation pass (seconds)
    pub reconcile_timeout_secs: u64,
    /// Per-operation timeout handed to the SDK (seconds)
    pub sdk_operation_timeout_secs: u64,
    /// Reconciliation error backoff floor (minutes)
    pub backoff_min_minutes: u64,
    /// Reconciliation error backoff ceiling (minutes)
    pub backoff_max_minutes: u64,
    /// Watch stream backoff start (milliseconds)
    pub backoff_start_ms: u64,
    /// Watch stream backoff ceiling (milliseconds)
    pub backoff_max_ms: u64,
    /// Delay before restarting a failed watch stream (seconds)
    pub watch_restart_delay_secs: u64,
    /// Maximum concurrent reconciliations per record kind
    pub max_concurrent_reconciliations: u16,
    /// Region used when the ambient environment does not supply one
    pub ambient_region: String,
    /// Process-wide static endpoint, applied when a ProviderConfig has none
    pub endpoint_url_override: Option<String>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            sync_interval_secs: DEFAULT_SYNC_INTERVAL_SECS,
            short_wait_secs: DEFAULT_SHORT_WAIT_SECS,
            reconcile_timeout_secs: DEFAULT_RECONCILE_TIMEOUT_SECS,
            sdk_operation_timeout_secs: DEFAULT_SDK_OPERATION_TIMEOUT_SECS,
            backoff_min_minutes: DEFAULT_BACKOFF_MIN_MINUTES,
            backoff_max_minutes: DEFAULT_BACKOFF_MAX_MINUTES,
            backoff_start_ms: DEFAULT_BACKOFF_START_MS,
            backoff_max_ms: DEFAULT_BACKOFF_MAX_MS,
            watch_restart_delay_secs: DEFAULT_WATCH_RESTART_DELAY_SECS,
            max_concurrent_reconciliations: DEFAULT_MAX_CONCURRENT_RECONCILIATIONS,
            ambient_region: DEFAULT_AMBIENT_REGION.to_string(),
            endpoint_url_override: None,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            poll_interval_secs: env_var_or_default("POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS),
            sync_interval_secs: env_var_or_default("SYNC_INTERVAL_SECS", DEFAULT_SYNC_INTERVAL_SECS),
            short_wait_secs: env_var_or_default("SHORT_WAIT_SECS", DEFAULT_SHORT_WAIT_SECS),
            reconcile_timeout_secs: env_var_or_default(
                "RECONCILE_TIMEOUT_SECS",
                DEFAULT_RECONCILE_TIMEOUT_SECS,
            ),
            sdk_operation_timeout_secs: env_var_or_default(
                "SDK_OPERATION_TIMEOUT_SECS",
                DEFAULT_SDK_OPERATION_TIMEOUT_SECS,
            ),
            backoff_min_minutes: env_var_or_default(
                "BACKOFF_MIN_MINUTES",
                DEFAULT_BACKOFF_MIN_MINUTES,
            ),
            backoff_max_minutes: env_var_or_default(
                "BACKOFF_MAX_MINUTES",
                DEFAULT_BACKOFF_MAX_MINUTES,
            ),
            backoff_start_ms: env_var_or_default("BACKOFF_START_MS", DEFAULT_BACKOFF_START_MS),
            backoff_max_ms: env_var_or_default("BACKOFF_MAX_MS", DEFAULT_BACKOFF_MAX_MS),
            watch_restart_delay_secs: env_var_or_default(
                "WATCH_RESTART_DELAY_SECS",
                DEFAULT_WATCH_RESTART_DELAY_SECS,
            ),
            max_concurrent_reconciliations: env_var_or_default(
                "MAX_CONCURRENT_RECONCILIATIONS",
                DEFAULT_MAX_CONCURRENT_RECONCILIATIONS,
            ),
            ambient_region: env_var_or_default_str("AMBIENT_REGION", DEFAULT_AMBIENT_REGION),
            endpoint_url_override: env_var_opt(ENDPOINT_URL_OVERRIDE_ENV),
        }
    }

    /// Requeue duration while a remote object settles
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Requeue duration for records that are in sync
    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    /// Requeue duration right after a remote mutation
    pub fn short_wait(&self) -> Duration {
        Duration::from_secs(self.short_wait_secs)
    }

    /// Deadline for one reconciliation pass
    pub fn reconcile_timeout(&self) -> Duration {
        Duration::from_secs(self.reconcile_timeout_secs)
    }

    /// Per-operation SDK timeout
    pub fn sdk_operation_timeout(&self) -> Duration {
        Duration::from_secs(self.sdk_operation_timeout_secs)
    }

    /// Delay before restarting a failed watch stream
    pub fn watch_restart_delay(&self) -> Duration {
        Duration::from_secs(self.watch_restart_delay_secs)
    }
}
