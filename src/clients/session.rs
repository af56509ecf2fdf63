//! # Ambient Session
//!
//! The process-wide default SDK configuration. It is built once, on first
//! use, from the pod's environment and is read-only afterwards; every caller
//! gets its own copy to layer credentials and a region onto.

use crate::constants::{PRODUCT_NAME, PRODUCT_VERSION};
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_types::app_name::AppName;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{info, warn};

static AMBIENT: OnceCell<SdkConfig> = OnceCell::const_new();

/// User agent fragment appended to every request
pub fn app_name() -> Option<AppName> {
    match AppName::new(format!("{PRODUCT_NAME}-{PRODUCT_VERSION}")) {
        Ok(name) => Some(name),
        Err(e) => {
            warn!("Invalid user agent app name: {}", e);
            None
        }
    }
}

/// Copy of the ambient SDK configuration
///
/// `fallback_region` is used only when the environment supplies no region.
pub async fn ambient_config(fallback_region: &str, operation_timeout: Duration) -> SdkConfig {
    AMBIENT
        .get_or_init(|| async {
            let mut loader = aws_config::defaults(BehaviorVersion::latest()).timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(operation_timeout)
                    .build(),
            );
            if let Some(name) = app_name() {
                loader = loader.app_name(name);
            }
            let mut config = loader.load().await;
            if config.region().is_none() {
                config = config
                    .to_builder()
                    .region(Region::new(fallback_region.to_string()))
                    .build();
            }
            info!(
                region = config.region().map(|r| r.as_ref()).unwrap_or(fallback_region),
                "Loaded ambient AWS configuration"
            );
            config
        })
        .await
        .clone()
}
