//! # Credentials
//!
//! Extraction of static credentials from a ProviderConfig source and the
//! STS-backed providers used for role chaining.
//!
//! Static credentials are an INI credentials profile. Only the default
//! section is read; keys that appear before any section header belong to it.

use crate::constants::{DEFAULT_PROFILE_SECTION, SESSION_NAME_PREFIX, WEB_IDENTITY_TOKEN_FILE_ENV};
use crate::crd::{AssumeRoleOptions, EnvSelector, FsSelector, SecretKeySelector, WebIdentityOptions};
use crate::error::{Error, Result};
use aws_credential_types::provider::{self, error::CredentialsError, future, ProvideCredentials};
use aws_credential_types::Credentials;
use k8s_openapi::api::core::v1::Secret;
use kube::api::Api;
use std::time::SystemTime;
use tracing::debug;
use zeroize::Zeroizing;

const ACCESS_KEY_ID: &str = "aws_access_key_id";
const SECRET_ACCESS_KEY: &str = "aws_secret_access_key";
const SESSION_TOKEN: &str = "aws_session_token";

/// Bytes of the referenced Secret key
pub async fn from_secret(client: &kube::Client, selector: &SecretKeySelector) -> Result<Zeroizing<Vec<u8>>> {
    let secrets: Api<Secret> = Api::namespaced(client.clone(), &selector.namespace);
    let secret = secrets.get(&selector.name).await.map_err(|e| {
        Error::credentials(format!(
            "cannot get credentials secret {}/{}: {e}",
            selector.namespace, selector.name
        ))
    })?;
    secret
        .data
        .and_then(|mut data| data.remove(&selector.key))
        .map(|bytes| Zeroizing::new(bytes.0))
        .ok_or_else(|| {
            Error::credentials(format!(
                "secret {}/{} has no key {}",
                selector.namespace, selector.name, selector.key
            ))
        })
}

/// Bytes of the referenced environment variable
pub fn from_env(selector: &EnvSelector) -> Result<Zeroizing<Vec<u8>>> {
    std::env::var(&selector.name)
        .map(|v| Zeroizing::new(v.into_bytes()))
        .map_err(|_| Error::credentials(format!("environment variable {} is not set", selector.name)))
}

/// Bytes of the referenced file
pub async fn from_filesystem(selector: &FsSelector) -> Result<Zeroizing<Vec<u8>>> {
    tokio::fs::read(&selector.path)
        .await
        .map(Zeroizing::new)
        .map_err(|e| Error::credentials(format!("cannot read {}: {e}", selector.path)))
}

/// Parse the default profile of an INI credentials blob
pub fn parse_profile(data: &[u8]) -> Result<Credentials> {
    let text = Zeroizing::new(
        std::str::from_utf8(data)
            .map_err(|_| Error::credentials("credentials are not valid UTF-8"))?
            .to_string(),
    );

    let mut in_default = true;
    let mut access_key_id = None;
    let mut secret_access_key: Option<Zeroizing<String>> = None;
    let mut session_token: Option<Zeroizing<String>> = None;

    for line in text.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some(section) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            in_default = section.trim().eq_ignore_ascii_case(DEFAULT_PROFILE_SECTION);
            continue;
        }
        if !in_default {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim().to_string();
        match key.trim().to_ascii_lowercase().as_str() {
            ACCESS_KEY_ID => access_key_id = Some(value),
            SECRET_ACCESS_KEY => secret_access_key = Some(Zeroizing::new(value)),
            SESSION_TOKEN => session_token = Some(Zeroizing::new(value)),
            _ => {}
        }
    }

    let access_key_id = access_key_id
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::credentials(format!("{ACCESS_KEY_ID} is missing")))?;
    let secret_access_key = secret_access_key
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::credentials(format!("{SECRET_ACCESS_KEY} is missing")))?;

    Ok(Credentials::new(
        access_key_id,
        secret_access_key.as_str(),
        session_token
            .filter(|t| !t.is_empty())
            .map(|t| t.as_str().to_string()),
        None,
        "ProviderConfig",
    ))
}

fn session_name() -> String {
    format!("{SESSION_NAME_PREFIX}-{}", uuid::Uuid::new_v4())
}

fn minted(
    credentials: Option<&aws_sdk_sts::types::Credentials>,
    provider_name: &'static str,
) -> provider::Result {
    let credentials = credentials
        .ok_or_else(|| CredentialsError::provider_error("token service returned no credentials"))?;
    let expiry = SystemTime::try_from(*credentials.expiration()).ok();
    Ok(Credentials::new(
        credentials.access_key_id(),
        credentials.secret_access_key(),
        Some(credentials.session_token().to_string()),
        expiry,
        provider_name,
    ))
}

/// Credentials minted by `sts:AssumeRole` with a base identity
#[derive(Debug)]
pub struct AssumeRoleProvider {
    sts: aws_sdk_sts::Client,
    options: AssumeRoleOptions,
}

impl AssumeRoleProvider {
    /// `sts` must be built from the base identity
    pub fn new(sts: aws_sdk_sts::Client, options: AssumeRoleOptions) -> Self {
        Self { sts, options }
    }

    async fn assume(&self) -> provider::Result {
        let tags = self
            .options
            .tags
            .iter()
            .map(|t| {
                aws_sdk_sts::types::Tag::builder()
                    .key(&t.key)
                    .value(&t.value)
                    .build()
            })
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(CredentialsError::invalid_configuration)?;

        debug!(role_arn = %self.options.role_arn, "assuming role");
        let output = self
            .sts
            .assume_role()
            .role_arn(&self.options.role_arn)
            .role_session_name(session_name())
            .set_external_id(self.options.external_id.clone())
            .set_tags((!tags.is_empty()).then_some(tags))
            .set_transitive_tag_keys(
                (!self.options.transitive_tag_keys.is_empty())
                    .then(|| self.options.transitive_tag_keys.clone()),
            )
            .send()
            .await
            .map_err(|e| CredentialsError::provider_error(super::errors::CloudError::from(e)))?;
        minted(output.credentials(), "AssumeRole")
    }
}

impl ProvideCredentials for AssumeRoleProvider {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::new(self.assume())
    }
}

/// Credentials minted by `sts:AssumeRoleWithWebIdentity`.
///
/// The token file is re-read on every refresh since the kubelet rotates it.
#[derive(Debug)]
pub struct WebIdentityProvider {
    sts: aws_sdk_sts::Client,
    role_arn: String,
    session_name: String,
    token_file: String,
}

impl WebIdentityProvider {
    pub fn new(sts: aws_sdk_sts::Client, options: &WebIdentityOptions) -> Result<Self> {
        let token_file = match &options.token_file {
            Some(path) if !path.is_empty() => path.clone(),
            _ => std::env::var(WEB_IDENTITY_TOKEN_FILE_ENV).map_err(|_| {
                Error::credentials(format!(
                    "no token file configured and {WEB_IDENTITY_TOKEN_FILE_ENV} is not set"
                ))
            })?,
        };
        Ok(Self {
            sts,
            role_arn: options.role_arn.clone(),
            session_name: options
                .role_session_name
                .clone()
                .filter(|n| !n.is_empty())
                .unwrap_or_else(session_name),
            token_file,
        })
    }

    async fn assume(&self) -> provider::Result {
        let token = tokio::fs::read_to_string(&self.token_file)
            .await
            .map_err(|e| {
                CredentialsError::invalid_configuration(format!(
                    "cannot read web identity token {}: {e}",
                    self.token_file
                ))
            })?;

        debug!(role_arn = %self.role_arn, "assuming role with web identity");
        let output = self
            .sts
            .assume_role_with_web_identity()
            .role_arn(&self.role_arn)
            .role_session_name(&self.session_name)
            .web_identity_token(token.trim())
            .send()
            .await
            .map_err(|e| CredentialsError::provider_error(super::errors::CloudError::from(e)))?;
        minted(output.credentials(), "AssumeRoleWithWebIdentity")
    }
}

impl ProvideCredentials for WebIdentityProvider {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::new(self.assume())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn parses_default_section_case_insensitively() {
        let blob = b"[other]\naws_access_key_id = NOPE\n\n[DEFAULT]\naws_access_key_id = AKIDEXAMPLE\naws_secret_access_key = secret\naws_session_token = token\n";
        let creds = parse_profile(blob).unwrap();
        assert_eq!(creds.access_key_id(), "AKIDEXAMPLE");
        assert_eq!(creds.secret_access_key(), "secret");
        assert_eq!(creds.session_token(), Some("token"));
    }

    #[test]
    fn keys_before_any_section_belong_to_default() {
        let blob = b"aws_access_key_id=AKID\naws_secret_access_key=s3cr3t\n[prod]\naws_access_key_id=OTHER\n";
        let creds = parse_profile(blob).unwrap();
        assert_eq!(creds.access_key_id(), "AKID");
        assert_eq!(creds.session_token(), None);
    }

    #[test]
    fn missing_secret_key_is_an_extraction_failure() {
        let err = parse_profile(b"[default]\naws_access_key_id = AKID\n").unwrap_err();
        assert!(matches!(err, Error::CredentialExtractionFailed(_)));
        assert_eq!(err.kind(), ErrorKind::ConfigError);
    }

    #[test]
    fn reads_credentials_from_environment() {
        let name = "AWS_PROVIDER_TEST_CREDENTIALS_BLOB";
        std::env::set_var(name, "[default]\naws_access_key_id=A\naws_secret_access_key=B\n");
        let bytes = from_env(&EnvSelector { name: name.to_string() }).unwrap();
        assert_eq!(parse_profile(&bytes).unwrap().access_key_id(), "A");
        std::env::remove_var(name);

        assert!(from_env(&EnvSelector { name: name.to_string() }).is_err());
    }

    #[tokio::test]
    async fn reads_credentials_from_filesystem() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials");
        std::fs::write(&path, "[default]\naws_access_key_id=F\naws_secret_access_key=S\n").unwrap();
        let bytes = from_filesystem(&FsSelector {
            path: path.to_string_lossy().into_owned(),
        })
        .await
        .unwrap();
        assert_eq!(parse_profile(&bytes).unwrap().access_key_id(), "F");

        let missing = from_filesystem(&FsSelector {
            path: dir.path().join("absent").to_string_lossy().into_owned(),
        })
        .await;
        assert!(matches!(missing, Err(Error::CredentialExtractionFailed(_))));
    }
}
