//! # Errors
//!
//! Crate-wide error type and the classification taxonomy used by the
//! reconciler to decide what a failure means.
//!
//! Every failure maps onto one [`ErrorKind`]. The reconciler only ever asks
//! questions of the kind ("is this not-found?"), never of the concrete
//! variant, so errors coming from the cloud SDK, the Kubernetes API and the
//! resolver are all handled the same way.
//!
//! Wrapping with a stable prefix goes through [`Error::wrap`] or the
//! [`ResultExt`] extension. Wrapping a legacy request failure scrubs its
//! request identifier so that the same failure renders the same string on
//! every pass.

use crate::clients::errors::CloudError;
use crate::drift::DriftError;
use std::collections::BTreeSet;
use std::time::Duration;
use thiserror::Error;

/// Failure classification shared by every error source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    Unauthorized,
    InvalidInput,
    Throttled,
    TransientServiceError,
    ConfigError,
    PreconditionFailed,
    Other,
}

impl ErrorKind {
    /// Short label used in metrics and condition reasons
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NotFound",
            ErrorKind::AlreadyExists => "AlreadyExists",
            ErrorKind::Unauthorized => "Unauthorized",
            ErrorKind::InvalidInput => "InvalidInput",
            ErrorKind::Throttled => "Throttled",
            ErrorKind::TransientServiceError => "TransientServiceError",
            ErrorKind::ConfigError => "ConfigError",
            ErrorKind::PreconditionFailed => "PreconditionFailed",
            ErrorKind::Other => "Other",
        }
    }

    /// Whether the runtime should simply retry with backoff
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::Throttled | ErrorKind::TransientServiceError
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for the provider
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Error returned by an AWS service or its transport
    #[error(transparent)]
    Cloud(#[from] CloudError),

    /// Kubernetes API error
    #[error("kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// An error with a stable context prefix
    #[error("{context}: {source}")]
    Wrapped {
        context: String,
        #[source]
        source: Box<Error>,
    },

    /// Several errors reported together
    #[error("{}", join_unique(.0))]
    Combined(Vec<Error>),

    /// The referenced ProviderConfig could not be loaded
    #[error("cannot get provider config {0}")]
    ConfigMissing(String),

    /// Credentials could not be read or parsed
    #[error("cannot extract credentials: {0}")]
    CredentialExtractionFailed(String),

    /// The token service refused to mint credentials
    #[error("cannot assume role: {0}")]
    RoleAssumeFailed(String),

    /// The endpoint override is incomplete or unknown
    #[error("invalid endpoint configuration: {0}")]
    EndpointConfigInvalid(String),

    /// Input the user can fix, such as a malformed external name
    #[error("{0}")]
    InvalidInput(String),

    /// A user-actionable precondition is not met
    #[error("{0}")]
    PreconditionFailed(String),

    /// Structural comparison failed
    #[error(transparent)]
    Drift(#[from] DriftError),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The reconciliation deadline elapsed
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),
}

impl Error {
    /// Create an invalid-input error with the given message
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a precondition error with the given message
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::PreconditionFailed(msg.into())
    }

    /// Create an endpoint configuration error with the given message
    pub fn endpoint_config(msg: impl Into<String>) -> Self {
        Self::EndpointConfigInvalid(msg.into())
    }

    /// Create a credential extraction error with the given message
    pub fn credentials(msg: impl Into<String>) -> Self {
        Self::CredentialExtractionFailed(msg.into())
    }

    /// Prefix the error with a stable message.
    ///
    /// Legacy request failures are scrubbed of their request identifier
    /// before wrapping. Structured service errors are kept as they are.
    pub fn wrap(self, context: impl Into<String>) -> Self {
        let source = match self {
            Error::Cloud(cloud) => Error::Cloud(cloud.scrubbed()),
            other => other,
        };
        Error::Wrapped {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Cloud(e) => e.kind(),
            Error::Kube(e) => kube_error_kind(e),
            Error::Wrapped { source, .. } => source.kind(),
            Error::Combined(errors) => {
                let kinds: BTreeSet<&'static str> =
                    errors.iter().map(|e| e.kind().as_str()).collect();
                match (kinds.len(), errors.first()) {
                    (1, Some(first)) => first.kind(),
                    _ => ErrorKind::Other,
                }
            }
            Error::ConfigMissing(_)
            | Error::CredentialExtractionFailed(_)
            | Error::RoleAssumeFailed(_)
            | Error::EndpointConfigInvalid(_) => ErrorKind::ConfigError,
            Error::InvalidInput(_) => ErrorKind::InvalidInput,
            Error::PreconditionFailed(_) => ErrorKind::PreconditionFailed,
            Error::Timeout(_) => ErrorKind::TransientServiceError,
            Error::Drift(_) | Error::Serialization(_) => ErrorKind::Other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub fn is_already_exists(&self) -> bool {
        self.kind() == ErrorKind::AlreadyExists
    }

    /// The innermost error, skipping context wrappers
    pub fn root(&self) -> &Error {
        match self {
            Error::Wrapped { source, .. } => source.root(),
            other => other,
        }
    }
}

fn kube_error_kind(error: &kube::Error) -> ErrorKind {
    match error {
        kube::Error::Api(response) => match response.code {
            404 => ErrorKind::NotFound,
            409 => ErrorKind::AlreadyExists,
            401 | 403 => ErrorKind::Unauthorized,
            400 | 422 => ErrorKind::InvalidInput,
            429 => ErrorKind::Throttled,
            code if code >= 500 => ErrorKind::TransientServiceError,
            _ => ErrorKind::Other,
        },
        kube::Error::HyperError(_) | kube::Error::Service(_) => ErrorKind::TransientServiceError,
        _ => ErrorKind::Other,
    }
}

fn join_unique(errors: &[Error]) -> String {
    let mut seen = BTreeSet::new();
    let mut messages = Vec::new();
    for message in errors.iter().map(ToString::to_string) {
        if seen.insert(message.clone()) {
            messages.push(message);
        }
    }
    messages.join(", ")
}

/// Merge several errors into one.
///
/// Returns `None` for no errors and the error itself when there is only one.
pub fn combine(mut errors: Vec<Error>) -> Option<Error> {
    match errors.len() {
        0 => None,
        1 => errors.pop(),
        _ => Some(Error::Combined(errors)),
    }
}

/// Drop the error when its classification matches
pub fn ignore_classified(predicate: impl Fn(ErrorKind) -> bool, error: Error) -> Result<()> {
    if predicate(error.kind()) {
        Ok(())
    } else {
        Err(error)
    }
}

/// Drop not-found errors
pub fn ignore_not_found(error: Error) -> Result<()> {
    ignore_classified(|kind| kind == ErrorKind::NotFound, error)
}

/// Wrapping helpers for results
pub trait ResultExt<T> {
    /// Prefix the error with a stable message
    fn wrap_err(self, context: impl Into<String>) -> Result<T>;

    /// Prefix the error with a lazily built message
    fn wrap_err_with<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn wrap_err(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().wrap(context))
    }

    fn wrap_err_with<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| e.into().wrap(f()))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_keeps_structured_errors_and_their_kind() {
        let err = Error::from(CloudError::service("NoSuchEntity", "role foo not found"))
            .wrap("cannot observe Role");
        assert_eq!(
            err.to_string(),
            "cannot observe Role: NoSuchEntity: role foo not found"
        );
        assert!(err.is_not_found());
        assert!(matches!(err.root(), Error::Cloud(_)));
    }

    #[test]
    fn wrap_scrubs_request_ids_from_legacy_failures() {
        let first = CloudError::request_failure(
            "service unavailable, status code: 503, request id: 0f1e2d3c-aaaa-bbbb-cccc-000000000001",
            Some("0f1e2d3c-aaaa-bbbb-cccc-000000000001".to_string()),
            Some(503),
        );
        let second = CloudError::request_failure(
            "service unavailable, status code: 503, request id: 99999999-dddd-eeee-ffff-000000000002",
            Some("99999999-dddd-eeee-ffff-000000000002".to_string()),
            Some(503),
        );
        let a = Error::from(first).wrap("cannot update");
        let b = Error::from(second).wrap("cannot update");
        assert_eq!(a.to_string(), b.to_string());
        assert!(!a.to_string().contains("0f1e2d3c"));
        assert_eq!(a.kind(), ErrorKind::TransientServiceError);
    }

    #[test]
    fn result_ext_passes_ok_through() {
        let ok: std::result::Result<u8, Error> = Ok(3);
        assert_eq!(ok.wrap_err("cannot create").ok(), Some(3));
    }

    #[test]
    fn combine_handles_empty_single_and_duplicates() {
        assert!(combine(vec![]).is_none());

        let single = combine(vec![Error::invalid_input("bad name")]);
        assert!(matches!(single, Some(Error::InvalidInput(_))));

        let combined = combine(vec![
            Error::invalid_input("a"),
            Error::invalid_input("b"),
            Error::invalid_input("a"),
        ]);
        let combined = combined.map(|e| e.to_string());
        assert_eq!(combined.as_deref(), Some("a, b"));
    }

    #[test]
    fn combined_kind_is_shared_kind_or_other() {
        let same = Error::Combined(vec![Error::invalid_input("a"), Error::invalid_input("b")]);
        assert_eq!(same.kind(), ErrorKind::InvalidInput);

        let mixed = Error::Combined(vec![
            Error::invalid_input("a"),
            Error::precondition("b"),
        ]);
        assert_eq!(mixed.kind(), ErrorKind::Other);
    }

    #[test]
    fn ignore_classified_drops_matching_errors_only() {
        let not_found = Error::from(CloudError::service("NoSuchDistribution", "gone"));
        assert!(ignore_not_found(not_found).is_ok());

        let throttled = Error::from(CloudError::service("Throttling", "slow down"));
        let kept = ignore_not_found(throttled);
        assert!(matches!(kept, Err(ref e) if e.kind() == ErrorKind::Throttled));
    }

    #[test]
    fn config_errors_classify_as_config() {
        assert_eq!(
            Error::ConfigMissing("default".into()).kind(),
            ErrorKind::ConfigError
        );
        assert_eq!(
            Error::endpoint_config("missing static url").kind(),
            ErrorKind::ConfigError
        );
        assert_eq!(Error::credentials("no key").kind(), ErrorKind::ConfigError);
    }
}
