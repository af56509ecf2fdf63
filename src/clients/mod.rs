//! # Endpoint & Credential Resolver
//!
//! Produces an authenticated, endpoint-aware AWS session for a managed
//! record from the ProviderConfig it references.
//!
//! ## Resolution order
//!
//! 1. Load the ProviderConfig and record a usage link before any SDK call
//! 2. Pick the base identity from the credential source
//! 3. Chain AssumeRole or AssumeRoleWithWebIdentity on top
//! 4. Map the requested region (`global` included) onto a signing region
//! 5. Apply the endpoint override, if any, per service client
//!
//! Every service client carries the product user agent and the call-counting
//! interceptor.
//!
//! ## Module Structure
//!
//! - `credentials.rs` - Credential extraction and STS providers
//! - `endpoint.rs` - Static and dynamic endpoint overrides
//! - `errors.rs` - SDK error normalization
//! - `interceptor.rs` - Per-call metrics
//! - `region.rs` - Partitions and the `global` region
//! - `session.rs` - Process-wide ambient configuration

pub mod credentials;
pub mod endpoint;
pub mod errors;
pub mod interceptor;
pub mod region;
pub mod session;

pub use endpoint::Endpoint;
pub use errors::CloudError;
pub use interceptor::MetricsInterceptor;

use crate::config::ControllerConfig;
use crate::constants::DEFAULT_AMBIENT_REGION;
use crate::crd::{CredentialsSource, EndpointConfig, ProviderConfig, ProviderConfigSpec};
use crate::error::{Error, Result, ResultExt};
use crate::managed::{Managed, Usage, UsageTracker};
use aws_config::{Region, SdkConfig};
use aws_credential_types::provider::SharedCredentialsProvider;
use aws_credential_types::Credentials;
use kube::api::Api;
use std::sync::Arc;
use tracing::debug;

/// Identity the session starts from, before any role chaining
#[derive(Debug, Clone)]
pub enum BaseIdentity {
    /// Pod-provided credentials from the ambient chain
    Ambient,
    /// Credentials extracted from a Secret, the environment or a file
    Static(Credentials),
    /// No credentials at all
    Anonymous,
}

/// SDK configuration bound to one record's ProviderConfig and region
#[derive(Debug, Clone)]
pub struct AwsSession {
    config: SdkConfig,
    endpoint: Option<EndpointConfig>,
    region: String,
}

macro_rules! service_client {
    ($(#[$doc:meta])* $name:ident, $krate:ident, $service:literal) => {
        $(#[$doc])*
        pub fn $name(&self) -> Result<$krate::Client> {
            let mut builder =
                $krate::config::Builder::from(&self.config).interceptor(MetricsInterceptor);
            if let Some(endpoint) = self.endpoint_for($service)? {
                debug!(service = $service, url = %endpoint.url, "Using endpoint override");
                builder = builder.endpoint_url(endpoint.url);
                if let Some(signing_region) = endpoint.signing_region.filter(|r| !r.is_empty()) {
                    builder = builder.region(Region::new(signing_region));
                }
            }
            Ok($krate::Client::from_conf(builder.build()))
        }
    };
}

impl AwsSession {
    pub fn sdk_config(&self) -> &SdkConfig {
        &self.config
    }

    /// Region the session signs for
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Endpoint override for `service`, if the ProviderConfig carries one
    pub fn endpoint_for(&self, service: &str) -> Result<Option<Endpoint>> {
        self.endpoint
            .as_ref()
            .map(|config| endpoint::resolve(config, service, &self.region))
            .transpose()
    }

    service_client!(
        /// Classic Elastic Load Balancing client
        elb,
        aws_sdk_elasticloadbalancing,
        "elasticloadbalancing"
    );
    service_client!(
        /// IAM client
        iam,
        aws_sdk_iam,
        "iam"
    );
    service_client!(
        /// CloudFront client
        cloudfront,
        aws_sdk_cloudfront,
        "cloudfront"
    );
    service_client!(sts, aws_sdk_sts, "sts");
}

/// Build a session from a ProviderConfig spec and a base identity.
///
/// `endpoint_override` is the process-wide static URL, used only when the
/// spec has no endpoint of its own.
pub fn compose(
    spec: &ProviderConfigSpec,
    requested_region: &str,
    ambient: &SdkConfig,
    base: BaseIdentity,
    endpoint_override: Option<&str>,
) -> Result<AwsSession> {
    let endpoint = spec
        .endpoint
        .clone()
        .or_else(|| endpoint_override.map(endpoint::static_override));
    let ambient_region = ambient
        .region()
        .map_or_else(|| DEFAULT_AMBIENT_REGION.to_string(), ToString::to_string);
    let region = region::effective_region(
        requested_region,
        &ambient_region,
        endpoint.as_ref().and_then(|e| e.signing_region.as_deref()),
    );

    let mut builder = ambient.to_builder().region(Region::new(region.clone()));
    let anonymous = matches!(base, BaseIdentity::Anonymous);
    match base {
        BaseIdentity::Ambient => {}
        BaseIdentity::Static(credentials) => {
            builder = builder.credentials_provider(SharedCredentialsProvider::new(credentials));
        }
        BaseIdentity::Anonymous => {
            builder.set_credentials_provider(None);
        }
    }

    let mut session = AwsSession {
        config: builder.build(),
        endpoint,
        region,
    };
    if anonymous {
        return Ok(session);
    }

    let chained: Option<SharedCredentialsProvider> = if let Some(options) = &spec.assume_role {
        Some(SharedCredentialsProvider::new(credentials::AssumeRoleProvider::new(
            session.sts()?,
            options.clone(),
        )))
    } else if spec.credentials.source == CredentialsSource::InjectedIdentity {
        spec.assume_role_with_web_identity
            .as_ref()
            .map(|options| {
                credentials::WebIdentityProvider::new(session.sts()?, options)
                    .map(SharedCredentialsProvider::new)
            })
            .transpose()?
    } else {
        None
    };

    if let Some(provider) = chained {
        session.config = session.config.to_builder().credentials_provider(provider).build();
    }
    Ok(session)
}

/// Resolves sessions for managed records
pub struct ClientResolver {
    client: kube::Client,
    usage: Arc<dyn UsageTracker>,
    config: ControllerConfig,
}

impl std::fmt::Debug for ClientResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientResolver")
            .field("ambient_region", &self.config.ambient_region)
            .finish_non_exhaustive()
    }
}

impl ClientResolver {
    pub fn new(client: kube::Client, usage: Arc<dyn UsageTracker>, config: ControllerConfig) -> Self {
        Self {
            client,
            usage,
            config,
        }
    }

    /// Session for `record`, bound to `region`
    pub async fn get_session<R: Managed>(&self, record: &R, region: &str) -> Result<AwsSession> {
        let name = record.resource_spec().provider_config_name().to_string();
        let configs: Api<ProviderConfig> = Api::all(self.client.clone());
        let provider_config = configs.get(&name).await.map_err(|e| match e {
            kube::Error::Api(ref response) if response.code == 404 => Error::ConfigMissing(name.clone()),
            other => Error::from(other).wrap(format!("cannot get provider config {name}")),
        })?;

        self.usage
            .track(&Usage::of(record))
            .await
            .wrap_err("cannot track provider config usage")?;

        let base = self.base_identity(&provider_config.spec).await?;
        let ambient = session::ambient_config(
            &self.config.ambient_region,
            self.config.sdk_operation_timeout(),
        )
        .await;
        compose(
            &provider_config.spec,
            region,
            &ambient,
            base,
            self.config.endpoint_url_override.as_deref(),
        )
    }

    async fn base_identity(&self, spec: &ProviderConfigSpec) -> Result<BaseIdentity> {
        let credentials = &spec.credentials;
        let blob = match credentials.source {
            CredentialsSource::None => return Ok(BaseIdentity::Anonymous),
            CredentialsSource::InjectedIdentity => return Ok(BaseIdentity::Ambient),
            CredentialsSource::Secret => {
                let selector = credentials
                    .secret_ref
                    .as_ref()
                    .ok_or_else(|| Error::credentials("secretRef is required for source Secret"))?;
                credentials::from_secret(&self.client, selector).await?
            }
            CredentialsSource::Environment => {
                let selector = credentials
                    .env
                    .as_ref()
                    .ok_or_else(|| Error::credentials("env is required for source Environment"))?;
                credentials::from_env(selector)?
            }
            CredentialsSource::Filesystem => {
                let selector = credentials
                    .fs
                    .as_ref()
                    .ok_or_else(|| Error::credentials("fs is required for source Filesystem"))?;
                credentials::from_filesystem(selector).await?
            }
        };
        credentials::parse_profile(&blob).map(BaseIdentity::Static)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{
        AssumeRoleOptions, DynamicUrlConfig, ProviderCredentials, UrlConfig, WebIdentityOptions,
    };
    use aws_config::BehaviorVersion;

    fn ambient(region: &str) -> SdkConfig {
        SdkConfig::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .build()
    }

    fn spec(source: CredentialsSource) -> ProviderConfigSpec {
        ProviderConfigSpec {
            credentials: ProviderCredentials {
                source,
                ..ProviderCredentials::default()
            },
            assume_role: None,
            assume_role_with_web_identity: None,
            endpoint: None,
        }
    }

    fn static_credentials() -> BaseIdentity {
        BaseIdentity::Static(Credentials::new("AKID", "secret", None, None, "test"))
    }

    #[tokio::test]
    async fn static_credentials_are_installed() {
        let session = compose(
            &spec(CredentialsSource::Secret),
            "us-east-2",
            &ambient("eu-west-1"),
            static_credentials(),
            None,
        )
        .unwrap();
        assert_eq!(session.region(), "us-east-2");
        assert!(session.sdk_config().credentials_provider().is_some());
        assert!(session.endpoint_for("iam").unwrap().is_none());
    }

    #[tokio::test]
    async fn no_source_yields_anonymous_session() {
        let mut spec = spec(CredentialsSource::None);
        spec.assume_role = Some(AssumeRoleOptions {
            role_arn: "arn:aws:iam::123456789012:role/ignored".into(),
            external_id: None,
            tags: vec![],
            transitive_tag_keys: vec![],
        });
        let session = compose(&spec, "us-east-2", &ambient("us-east-2"), BaseIdentity::Anonymous, None)
            .unwrap();
        assert!(session.sdk_config().credentials_provider().is_none());
    }

    #[tokio::test]
    async fn global_region_signs_with_partition_region() {
        let session = compose(
            &spec(CredentialsSource::InjectedIdentity),
            "global",
            &ambient("eu-central-1"),
            BaseIdentity::Ambient,
            None,
        )
        .unwrap();
        assert_eq!(session.region(), "us-east-1");
    }

    #[tokio::test]
    async fn role_chaining_replaces_the_base_provider() {
        let mut spec = spec(CredentialsSource::Secret);
        spec.assume_role = Some(AssumeRoleOptions {
            role_arn: "arn:aws:iam::123456789012:role/provider".into(),
            external_id: Some("ext".into()),
            tags: vec![],
            transitive_tag_keys: vec![],
        });
        let session = compose(&spec, "us-east-2", &ambient("us-east-2"), static_credentials(), None)
            .unwrap();
        assert!(session.sdk_config().credentials_provider().is_some());
    }

    #[tokio::test]
    async fn web_identity_without_token_file_is_a_credentials_error() {
        std::env::remove_var(crate::constants::WEB_IDENTITY_TOKEN_FILE_ENV);
        let mut spec = spec(CredentialsSource::InjectedIdentity);
        spec.assume_role_with_web_identity = Some(WebIdentityOptions {
            role_arn: "arn:aws:iam::123456789012:role/web".into(),
            role_session_name: None,
            token_file: None,
        });
        let err = compose(&spec, "us-east-2", &ambient("us-east-2"), BaseIdentity::Ambient, None)
            .unwrap_err();
        assert!(matches!(err, Error::CredentialExtractionFailed(_)));
    }

    #[tokio::test]
    async fn endpoint_override_applies_per_service() {
        let mut spec = spec(CredentialsSource::InjectedIdentity);
        spec.endpoint = Some(EndpointConfig {
            url: UrlConfig {
                r#type: "Dynamic".into(),
                r#static: None,
                dynamic: Some(DynamicUrlConfig {
                    protocol: "https".into(),
                    host: "example.internal".into(),
                }),
            },
            hostname_immutable: None,
            partition_id: None,
            signing_name: None,
            signing_region: None,
            signing_method: None,
            source: None,
        });
        let session =
            compose(&spec, "us-east-2", &ambient("us-east-2"), BaseIdentity::Ambient, None).unwrap();
        assert_eq!(
            session.endpoint_for("elasticloadbalancing").unwrap().map(|e| e.url),
            Some("https://elasticloadbalancing.us-east-2.example.internal".to_string())
        );
        assert!(session.elb().is_ok());
    }

    #[tokio::test]
    async fn process_override_is_used_when_spec_has_no_endpoint() {
        let session = compose(
            &spec(CredentialsSource::InjectedIdentity),
            "us-east-2",
            &ambient("us-east-2"),
            BaseIdentity::Ambient,
            Some("http://localhost:4566"),
        )
        .unwrap();
        assert_eq!(
            session.endpoint_for("cloudfront").unwrap().map(|e| e.url),
            Some("http://localhost:4566".to_string())
        );
    }
}
