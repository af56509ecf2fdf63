//! # Watch Loop
//!
//! One kube controller per record kind plus the ProviderConfig controller,
//! each restarted when its watch stream ends until shutdown is requested.

use crate::config::ControllerConfig;
use crate::controller::managed::{reconcile, ManagedContext};
use crate::controller::provider_config::{self, ProviderConfigContext};
use crate::controller::server::ServerState;
use crate::crd::{ProviderConfig, ProviderConfigUsage};
use crate::managed::Managed;
use crate::runtime::error_policy::{
    handle_provider_config_error, handle_reconciliation_error, handle_watch_stream_error,
};
use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use kube::api::Api;
use kube_runtime::controller::Config as RunConfig;
use kube_runtime::{watcher, Controller};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, info_span, warn, Instrument};

/// Drop successful events and classify errors, adjusting the watch backoff
async fn filter_event<T: std::fmt::Debug, E: std::fmt::Debug>(
    kind: &str,
    event: Result<T, E>,
    backoff: Arc<AtomicU64>,
    config: &ControllerConfig,
) {
    match event {
        Ok(_) => {
            backoff.store(config.backoff_start_ms, Ordering::Relaxed);
            debug!(resource.kind = kind, "watch.event.success");
        }
        Err(e) => {
            let error_string = format!("{e:?}");
            handle_watch_stream_error(
                kind,
                &error_string,
                &backoff,
                config.backoff_max_ms,
                config.watch_restart_delay(),
            )
            .await;
        }
    }
}

/// Run the controller for record kind `R` until shutdown
pub async fn run_managed<R: Managed>(
    api: Api<R>,
    ctx: Arc<ManagedContext<R>>,
    server_state: Arc<ServerState>,
) {
    let kind = R::kind(&()).to_string();
    let config = ctx.config.clone();
    let backoff = Arc::new(AtomicU64::new(config.backoff_start_ms));
    let (kind_ref, config_ref) = (kind.as_str(), &config);

    while server_state.ready() {
        info!(resource.kind = kind_ref, "Starting controller watch loop");
        Controller::new(api.clone(), watcher::Config::default().any_semantic())
            .with_config(RunConfig::default().concurrency(config.max_concurrent_reconciliations))
            .shutdown_on_signal()
            .run(reconcile::<R>, handle_reconciliation_error::<R>, Arc::clone(&ctx))
            .for_each(|event| filter_event(kind_ref, event, Arc::clone(&backoff), config_ref))
            .instrument(info_span!("controller.watch", resource.kind = kind_ref))
            .await;

        if !server_state.ready() {
            break;
        }
        warn!(
            resource.kind = kind.as_str(),
            delay_secs = config.watch_restart_delay_secs,
            "Controller watch stream ended, restarting"
        );
        tokio::time::sleep(config.watch_restart_delay()).await;
    }
    info!(resource.kind = kind.as_str(), "Controller stopped");
}

/// Run the ProviderConfig controller until shutdown
pub async fn run_provider_configs(ctx: Arc<ProviderConfigContext>, server_state: Arc<ServerState>) {
    let configs: Api<ProviderConfig> = Api::all(ctx.client.clone());
    let usages: Api<ProviderConfigUsage> = Api::all(ctx.client.clone());
    let config = ctx.config.clone();
    let backoff = Arc::new(AtomicU64::new(config.backoff_start_ms));
    let config_ref = &config;

    while server_state.ready() {
        info!(resource.kind = "ProviderConfig", "Starting controller watch loop");
        Controller::new(configs.clone(), watcher::Config::default())
            .watches(usages.clone(), watcher::Config::default(), |usage| {
                provider_config::usage_owner(&usage)
            })
            .shutdown_on_signal()
            .run(
                provider_config::reconcile,
                handle_provider_config_error,
                Arc::clone(&ctx),
            )
            .for_each(|event| {
                filter_event("ProviderConfig", event, Arc::clone(&backoff), config_ref)
            })
            .await;

        if !server_state.ready() {
            break;
        }
        tokio::time::sleep(config.watch_restart_delay()).await;
    }
    info!(resource.kind = "ProviderConfig", "Controller stopped");
}

/// Run every controller concurrently; returns once all have stopped
pub async fn run_all(controllers: Vec<BoxFuture<'static, ()>>, server_state: Arc<ServerState>) {
    let shutdown_state = Arc::clone(&server_state);
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Received shutdown signal, marking server not ready");
        shutdown_state.set_ready(false);
    });

    futures::future::join_all(controllers).await;
    info!("All controllers stopped");
}

/// Resolves on SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = terminate.recv() => {}
                }
            }
            Err(e) => {
                warn!("Cannot listen for SIGTERM: {}", e);
                let _ = ctrl_c.await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }
}

/// Box the controller for `R` for [`run_all`]
pub fn managed_task<R: Managed>(
    api: Api<R>,
    ctx: Arc<ManagedContext<R>>,
    server_state: Arc<ServerState>,
) -> BoxFuture<'static, ()> {
    run_managed(api, ctx, server_state).boxed()
}
