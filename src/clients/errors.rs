//! # Cloud Error Normalizer
//!
//! Turns the SDK's error surface into [`CloudError`], a small value type that
//! carries the service code (when the service returned one), the request
//! identifier and the HTTP status.
//!
//! Two shapes exist:
//! - **Service**: the service answered with a structured error code. These are
//!   kept verbatim and their display never includes the request identifier.
//! - **Request**: anything without a code (transport failures, timeouts,
//!   unparseable responses). Their message embeds the request identifier the
//!   way legacy request failures do, and [`CloudError::scrubbed`] removes it.

use crate::error::ErrorKind;
use aws_smithy_runtime_api::client::orchestrator::HttpResponse;
use aws_smithy_runtime_api::client::result::SdkError;
use aws_smithy_types::error::display::DisplayErrorContext;
use aws_smithy_types::error::metadata::ProvideErrorMetadata;
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

const NOT_FOUND_CODES: &[&str] = &[
    "NoSuchEntity",
    "NoSuchDistribution",
    "LoadBalancerNotFound",
    "AccessPointNotFound",
    "ResourceNotFoundException",
    "NotFound",
    "NotFoundException",
];

const ALREADY_EXISTS_CODES: &[&str] = &[
    "EntityAlreadyExists",
    "DuplicateLoadBalancerName",
    "DuplicateAccessPointName",
    "DistributionAlreadyExists",
    "CNAMEAlreadyExists",
    "ResourceAlreadyExistsException",
];

const UNAUTHORIZED_CODES: &[&str] = &[
    "AccessDenied",
    "AccessDeniedException",
    "InvalidClientTokenId",
    "ExpiredToken",
    "ExpiredTokenException",
    "SignatureDoesNotMatch",
    "UnrecognizedClientException",
    "UnauthorizedOperation",
];

const INVALID_INPUT_CODES: &[&str] = &[
    "ValidationError",
    "ValidationException",
    "InvalidInput",
    "InvalidParameterValue",
    "InvalidParameterCombination",
    "InvalidArgument",
    "MalformedPolicyDocument",
    "InvalidConfigurationRequest",
    "InvalidOrigin",
    "TooManyDistributionCNAMEs",
];

const THROTTLED_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "ThrottledException",
    "TooManyRequestsException",
    "RequestLimitExceeded",
    "RequestThrottled",
    "SlowDown",
];

const TRANSIENT_CODES: &[&str] = &[
    "ServiceUnavailable",
    "ServiceUnavailableException",
    "ServiceFailure",
    "InternalFailure",
    "InternalError",
    "InternalServiceError",
    "RequestTimeout",
    "RequestTimeoutException",
];

const PRECONDITION_CODES: &[&str] = &[
    "PreconditionFailed",
    "InvalidIfMatchVersion",
    "DistributionNotDisabled",
    "DeleteConflict",
];

static REQUEST_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(request[ _-]?id:?\s*)[A-Za-z0-9][A-Za-z0-9-]{7,}")
        .expect("request id pattern is a valid regex")
});

/// Normalized error from an AWS call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CloudError {
    /// Error with a structured service code
    #[error("{code}: {}", .message.as_deref().unwrap_or("no message"))]
    Service {
        code: String,
        message: Option<String>,
        request_id: Option<String>,
        status: Option<u16>,
    },
    /// Request failure without a structured code
    #[error("{message}")]
    Request {
        message: String,
        request_id: Option<String>,
        status: Option<u16>,
        kind: ErrorKind,
    },
}

impl CloudError {
    /// Structured service error
    pub fn service(code: impl Into<String>, message: impl Into<String>) -> Self {
        CloudError::Service {
            code: code.into(),
            message: Some(message.into()),
            request_id: None,
            status: None,
        }
    }

    /// Legacy request failure, classified from its HTTP status
    pub fn request_failure(
        message: impl Into<String>,
        request_id: Option<String>,
        status: Option<u16>,
    ) -> Self {
        CloudError::Request {
            message: message.into(),
            request_id,
            status,
            kind: status.map_or(ErrorKind::Other, kind_for_status),
        }
    }

    /// Convert an SDK error returned by any operation
    pub fn from_sdk<E>(error: SdkError<E, HttpResponse>) -> Self
    where
        E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    {
        let status = error.raw_response().map(|r| r.status().as_u16());
        let request_id = error.raw_response().and_then(|r| {
            let headers = r.headers();
            headers
                .get("x-amzn-requestid")
                .or_else(|| headers.get("x-amz-request-id"))
                .map(str::to_string)
        });

        if let Some(code) = error.code() {
            return CloudError::Service {
                code: code.to_string(),
                message: error.message().map(str::to_string),
                request_id,
                status,
            };
        }

        let kind = match &error {
            SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => {
                ErrorKind::TransientServiceError
            }
            SdkError::ConstructionFailure(_) => ErrorKind::InvalidInput,
            _ => status.map_or(ErrorKind::Other, kind_for_status),
        };
        let mut message = DisplayErrorContext(&error).to_string();
        if let Some(code) = status {
            message.push_str(&format!(", status code: {code}"));
        }
        if let Some(id) = &request_id {
            message.push_str(&format!(", request id: {id}"));
        }
        CloudError::Request {
            message,
            request_id,
            status,
            kind,
        }
    }

    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            CloudError::Service { code, status, .. } => {
                kind_for_code(code).unwrap_or_else(|| status.map_or(ErrorKind::Other, kind_for_status))
            }
            CloudError::Request { kind, .. } => *kind,
        }
    }

    /// Service code, when the service returned one
    pub fn code(&self) -> Option<&str> {
        match self {
            CloudError::Service { code, .. } => Some(code),
            CloudError::Request { .. } => None,
        }
    }

    pub fn request_id(&self) -> Option<&str> {
        match self {
            CloudError::Service { request_id, .. } | CloudError::Request { request_id, .. } => {
                request_id.as_deref()
            }
        }
    }

    /// Remove request identifiers from a legacy request failure.
    ///
    /// Structured service errors are returned unchanged.
    #[must_use]
    pub fn scrubbed(self) -> Self {
        match self {
            CloudError::Request {
                message,
                request_id,
                status,
                kind,
            } => {
                let mut message = match &request_id {
                    Some(id) if !id.is_empty() => message.replace(id.as_str(), ""),
                    _ => message,
                };
                message = REQUEST_ID_PATTERN.replace_all(&message, "$1").into_owned();
                CloudError::Request {
                    message,
                    request_id: None,
                    status,
                    kind,
                }
            }
            service => service,
        }
    }
}

fn kind_for_code(code: &str) -> Option<ErrorKind> {
    let table: [(&[&str], ErrorKind); 7] = [
        (NOT_FOUND_CODES, ErrorKind::NotFound),
        (ALREADY_EXISTS_CODES, ErrorKind::AlreadyExists),
        (UNAUTHORIZED_CODES, ErrorKind::Unauthorized),
        (INVALID_INPUT_CODES, ErrorKind::InvalidInput),
        (THROTTLED_CODES, ErrorKind::Throttled),
        (TRANSIENT_CODES, ErrorKind::TransientServiceError),
        (PRECONDITION_CODES, ErrorKind::PreconditionFailed),
    ];
    table
        .iter()
        .find(|(codes, _)| codes.contains(&code))
        .map(|(_, kind)| *kind)
}

fn kind_for_status(status: u16) -> ErrorKind {
    match status {
        404 => ErrorKind::NotFound,
        409 => ErrorKind::AlreadyExists,
        401 | 403 => ErrorKind::Unauthorized,
        400 | 422 => ErrorKind::InvalidInput,
        412 => ErrorKind::PreconditionFailed,
        429 => ErrorKind::Throttled,
        s if s >= 500 => ErrorKind::TransientServiceError,
        _ => ErrorKind::Other,
    }
}

impl<E> From<SdkError<E, HttpResponse>> for CloudError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    fn from(error: SdkError<E, HttpResponse>) -> Self {
        CloudError::from_sdk(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_codes_map_onto_the_taxonomy() {
        let cases = [
            ("NoSuchEntity", ErrorKind::NotFound),
            ("LoadBalancerNotFound", ErrorKind::NotFound),
            ("NoSuchDistribution", ErrorKind::NotFound),
            ("EntityAlreadyExists", ErrorKind::AlreadyExists),
            ("AccessDenied", ErrorKind::Unauthorized),
            ("MalformedPolicyDocument", ErrorKind::InvalidInput),
            ("Throttling", ErrorKind::Throttled),
            ("ServiceUnavailable", ErrorKind::TransientServiceError),
            ("PreconditionFailed", ErrorKind::PreconditionFailed),
            ("SomethingNew", ErrorKind::Other),
        ];
        for (code, kind) in cases {
            assert_eq!(CloudError::service(code, "x").kind(), kind, "{code}");
        }
    }

    #[test]
    fn unknown_code_falls_back_to_status() {
        let err = CloudError::Service {
            code: "Weird".into(),
            message: None,
            request_id: None,
            status: Some(503),
        };
        assert_eq!(err.kind(), ErrorKind::TransientServiceError);
        assert_eq!(err.to_string(), "Weird: no message");
    }

    #[test]
    fn service_display_excludes_request_id() {
        let err = CloudError::Service {
            code: "AccessDenied".into(),
            message: Some("not allowed".into()),
            request_id: Some("abc-123-def-456".into()),
            status: Some(403),
        };
        assert_eq!(err.to_string(), "AccessDenied: not allowed");
        assert_eq!(err.clone().scrubbed(), err);
    }

    #[test]
    fn scrubbing_removes_known_and_textual_request_ids() {
        let err = CloudError::request_failure(
            "dispatch failure, RequestId: 7f3c9a10-1111-2222-3333-444455556666, retry later",
            None,
            None,
        );
        let scrubbed = err.scrubbed().to_string();
        assert!(!scrubbed.contains("7f3c9a10"), "{scrubbed}");
        assert!(scrubbed.contains("RequestId: "));

        let err = CloudError::request_failure(
            "bad gateway xyz-req-42",
            Some("xyz-req-42".into()),
            Some(502),
        );
        assert_eq!(err.scrubbed().to_string(), "bad gateway ");
    }

    #[test]
    fn request_failures_classify_by_status() {
        assert_eq!(
            CloudError::request_failure("x", None, Some(404)).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            CloudError::request_failure("x", None, Some(429)).kind(),
            ErrorKind::Throttled
        );
        assert_eq!(
            CloudError::request_failure("x", None, None).kind(),
            ErrorKind::Other
        );
    }
}
