//! # Endpoint Override
//!
//! Resolves the endpoint a client should talk to from a ProviderConfig's
//! endpoint override. Resolution is pure and runs once per service client.

use crate::crd::{EndpointConfig, EndpointSource, UrlConfig};
use crate::error::{Error, Result};

/// URL kind returning one literal URL for every service
pub const STATIC_URL: &str = "Static";

/// URL kind composing the URL from service, region and host
pub const DYNAMIC_URL: &str = "Dynamic";

/// Services that have no regional endpoints
const GLOBAL_SERVICES: &[&str] = &["iam", "route53"];

/// Endpoint a service client is bound to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub url: String,
    pub hostname_immutable: bool,
    pub partition_id: Option<String>,
    pub signing_name: Option<String>,
    pub signing_region: Option<String>,
    pub signing_method: Option<String>,
    pub source: EndpointSource,
}

/// Resolve the endpoint for `service` in `region`.
///
/// Fails with `EndpointConfigInvalid` when the URL kind is unknown or the
/// selected variant carries no payload.
pub fn resolve(config: &EndpointConfig, service: &str, region: &str) -> Result<Endpoint> {
    let url = match config.url.r#type.as_str() {
        STATIC_URL => config
            .url
            .r#static
            .clone()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| Error::endpoint_config("static endpoint URL is missing"))?,
        DYNAMIC_URL => {
            let dynamic = config
                .url
                .dynamic
                .as_ref()
                .ok_or_else(|| Error::endpoint_config("dynamic endpoint URL is missing"))?;
            if GLOBAL_SERVICES.contains(&service) {
                format!("{}://{}.{}", dynamic.protocol, service, dynamic.host)
            } else {
                format!("{}://{}.{}.{}", dynamic.protocol, service, region, dynamic.host)
            }
        }
        other => {
            return Err(Error::endpoint_config(format!(
                "unsupported endpoint URL type {other:?}, must be {STATIC_URL} or {DYNAMIC_URL}"
            )))
        }
    };

    Ok(Endpoint {
        url,
        hostname_immutable: config.hostname_immutable.unwrap_or(false),
        partition_id: config.partition_id.clone(),
        signing_name: config.signing_name.clone(),
        signing_region: config.signing_region.clone(),
        signing_method: config.signing_method.clone(),
        source: config.source.unwrap_or_default(),
    })
}

/// Static override applied to every service, used for local testing
pub fn static_override(url: &str) -> EndpointConfig {
    EndpointConfig {
        url: UrlConfig {
            r#type: STATIC_URL.to_string(),
            r#static: Some(url.to_string()),
            dynamic: None,
        },
        hostname_immutable: Some(true),
        partition_id: None,
        signing_name: None,
        signing_region: None,
        signing_method: None,
        source: Some(EndpointSource::Custom),
    }
}
