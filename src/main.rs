//! # AWS Provider Controller
//!
//! A Kubernetes controller that drives declared AWS resources toward their
//! remote state.
//!
//! ## Overview
//!
//! One controller runs per served kind:
//!
//! 1. **Elastic Load Balancing** - classic `LoadBalancer`
//! 2. **IAM** - `Role`, `User`, `Group` and `UserGroupMembership`
//! 3. **CloudFront** - `Distribution`
//!
//! A further controller counts the usages of every `ProviderConfig` and
//! blocks its deletion while it is in use.
//!
//! Settings come from the environment (see [`ControllerConfig::from_env`]);
//! command-line flags override them.

use anyhow::Result;
use aws_provider_controller::config::{ControllerConfig, ServerConfig};
use aws_provider_controller::runtime::initialization::initialize;
use aws_provider_controller::runtime::watch_loop::run_all;
use clap::Parser;

/// AWS provider controller
#[derive(Parser, Debug)]
#[command(name = "aws-provider-controller", version, about, long_about = None)]
struct Args {
    /// Requeue interval while a remote object is still settling (seconds)
    #[arg(long, env = "POLL_INTERVAL_SECS")]
    poll_interval: Option<u64>,

    /// Maximum concurrent reconciliations per record kind
    #[arg(long, env = "MAX_CONCURRENT_RECONCILIATIONS")]
    max_reconcile_rate: Option<u16>,

    /// Port serving metrics and probes
    #[arg(long, env = "METRICS_PORT")]
    metrics_port: Option<u16>,
}

impl Args {
    fn apply(&self, controller: &mut ControllerConfig, server: &mut ServerConfig) {
        if let Some(secs) = self.poll_interval {
            controller.poll_interval_secs = secs;
        }
        if let Some(rate) = self.max_reconcile_rate {
            controller.max_concurrent_reconciliations = rate.max(1);
        }
        if let Some(port) = self.metrics_port {
            server.metrics_port = port;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut controller_config = ControllerConfig::from_env();
    let mut server_config = ServerConfig::from_env();
    args.apply(&mut controller_config, &mut server_config);

    let init = initialize(controller_config, server_config).await?;
    run_all(init.controllers(), std::sync::Arc::clone(&init.server_state)).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_environment_defaults() {
        let args = Args::parse_from([
            "aws-provider-controller",
            "--poll-interval",
            "5",
            "--max-reconcile-rate",
            "0",
            "--metrics-port",
            "9090",
        ]);
        let mut controller = ControllerConfig::default();
        let mut server = ServerConfig::default();
        args.apply(&mut controller, &mut server);
        assert_eq!(controller.poll_interval_secs, 5);
        assert_eq!(controller.max_concurrent_reconciliations, 1);
        assert_eq!(server.metrics_port, 9090);
    }
}
