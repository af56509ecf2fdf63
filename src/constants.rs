//! # Constants
//!
//! Default values and well-known names shared across the controller.

/// Product name reported in the SDK user agent
pub const PRODUCT_NAME: &str = "aws-provider-controller";

/// Crate version reported in the SDK user agent
pub const PRODUCT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Label value for the SDK generation used by every client
pub const SDK_VERSION_LABEL: &str = "v1";

/// Annotation carrying the identifier of the remote object
pub const EXTERNAL_NAME_ANNOTATION: &str = "crossplane.io/external-name";

/// Finalizer placed on managed records before the first remote create
pub const MANAGED_FINALIZER: &str = "finalizer.managedresource.crossplane.io";

/// Finalizer held on a ProviderConfig while usages exist
pub const IN_USE_FINALIZER: &str = "in-use.crossplane.io";

/// Label placed on ProviderConfigUsage objects naming their ProviderConfig
pub const PROVIDER_CONFIG_LABEL: &str = "aws.crossplane.io/providerconfig";

/// Field manager used for status patches
pub const FIELD_MANAGER: &str = "aws-provider-controller";

/// ProviderConfig used when a record does not name one
pub const DEFAULT_PROVIDER_CONFIG: &str = "default";

/// Reserved region for services without a region (IAM, CloudFront)
pub const GLOBAL_REGION: &str = "global";

/// Region used when neither the record nor the environment supplies one
pub const DEFAULT_AMBIENT_REGION: &str = "us-east-1";

/// Section of a shared-credentials file read by the resolver
pub const DEFAULT_PROFILE_SECTION: &str = "default";

/// Environment variable naming the projected service-account token
pub const WEB_IDENTITY_TOKEN_FILE_ENV: &str = "AWS_WEB_IDENTITY_TOKEN_FILE";

/// Process-wide static endpoint override, used for local testing
pub const ENDPOINT_URL_OVERRIDE_ENV: &str = "AWS_ENDPOINT_URL_OVERRIDE";

/// Prefix for generated STS session names
pub const SESSION_NAME_PREFIX: &str = "aws-provider";

/// Default requeue interval while a remote object settles (seconds)
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

/// Default requeue interval for records that are in sync (seconds)
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 3600;

/// Short requeue after a create, update or delete was issued (seconds)
pub const DEFAULT_SHORT_WAIT_SECS: u64 = 30;

/// Default upper bound for one reconciliation pass (seconds)
pub const DEFAULT_RECONCILE_TIMEOUT_SECS: u64 = 120;

/// Default per-operation timeout applied to every SDK call (seconds)
pub const DEFAULT_SDK_OPERATION_TIMEOUT_SECS: u64 = 60;

/// Default reconciliation error backoff floor (minutes)
pub const DEFAULT_BACKOFF_MIN_MINUTES: u64 = 1;

/// Default reconciliation error backoff ceiling (minutes)
pub const DEFAULT_BACKOFF_MAX_MINUTES: u64 = 10;

/// Default watch stream backoff start (milliseconds)
pub const DEFAULT_BACKOFF_START_MS: u64 = 1000;

/// Default watch stream backoff ceiling (milliseconds)
pub const DEFAULT_BACKOFF_MAX_MS: u64 = 30_000;

/// Default delay before restarting a failed watch stream (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_SECS: u64 = 5;

/// Default concurrency per record kind
pub const DEFAULT_MAX_CONCURRENT_RECONCILIATIONS: u16 = 10;

/// Default metrics and probe port
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// Default time allowed for the HTTP server to bind (seconds)
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Default readiness polling interval while the HTTP server starts (milliseconds)
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;
