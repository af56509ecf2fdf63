//! # Call Metrics
//!
//! SDK interceptor counting every outgoing operation by service and
//! operation name.

use crate::constants::SDK_VERSION_LABEL;
use crate::observability::metrics;
use aws_smithy_runtime_api::box_error::BoxError;
use aws_smithy_runtime_api::client::interceptors::context::BeforeSerializationInterceptorContextRef;
use aws_smithy_runtime_api::client::interceptors::Intercept;
use aws_smithy_runtime_api::client::orchestrator::Metadata;
use aws_smithy_types::config_bag::ConfigBag;

/// Increments `aws_api_calls_total` once per operation invocation
#[derive(Debug, Clone, Default)]
pub struct MetricsInterceptor;

impl Intercept for MetricsInterceptor {
    fn name(&self) -> &'static str {
        "MetricsInterceptor"
    }

    fn read_before_execution(
        &self,
        _context: &BeforeSerializationInterceptorContextRef<'_>,
        cfg: &mut ConfigBag,
    ) -> Result<(), BoxError> {
        if let Some(metadata) = cfg.load::<Metadata>() {
            metrics::increment_aws_api_calls(
                &metadata.service().to_ascii_lowercase(),
                metadata.name(),
                SDK_VERSION_LABEL,
            );
        }
        Ok(())
    }
}
