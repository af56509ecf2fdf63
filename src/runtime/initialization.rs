//! # Initialization
//!
//! Controller start-up: rustls setup, tracing, metrics, server startup,
//! Kubernetes client creation and the per-kind reconciler contexts.

use crate::clients::ClientResolver;
use crate::config::{ControllerConfig, ServerConfig};
use crate::controller::managed::ManagedContext;
use crate::controller::provider_config::ProviderConfigContext;
use crate::controller::server::{start_server, ServerState};
use crate::crd::{
    Distribution, Group, LoadBalancer, ProviderConfig, Role, User, UserGroupMembership,
};
use crate::managed::{
    Connector, KubeRecordStore, KubeReferenceReader, KubeUsageTracker, Managed, RecordStore,
    ReferenceReader, UsageTracker,
};
use crate::observability;
use crate::provider::{cloudfront, elb, iam, AwsConnector};
use crate::runtime::watch_loop::{managed_task, run_provider_configs};
use anyhow::{Context, Result};
use futures::future::BoxFuture;
use futures::FutureExt;
use kube::api::{Api, ListParams};
use kube::Client;
use std::sync::Arc;
use tracing::{error, info, warn};

type ConnectorFn<R> = fn(Arc<ClientResolver>, Arc<dyn RecordStore<R>>) -> AwsConnector<R>;

/// Everything the watch loops need
pub struct InitializationResult {
    /// Kubernetes client
    pub client: Client,
    /// Server state for health checks and shutdown
    pub server_state: Arc<ServerState>,
    pub controller_config: ControllerConfig,
    /// Session resolver shared by every record kind
    pub resolver: Arc<ClientResolver>,
    pub usage: Arc<dyn UsageTracker>,
    pub references: Arc<dyn ReferenceReader>,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("server_ready", &self.server_state.ready())
            .field("controller_config", &self.controller_config)
            .finish_non_exhaustive()
    }
}

impl InitializationResult {
    /// Reconciler context for kind `R`, backed by the cluster
    pub fn managed_context<R: Managed>(&self, connector: ConnectorFn<R>) -> Arc<ManagedContext<R>> {
        let store: Arc<dyn RecordStore<R>> = Arc::new(KubeRecordStore::<R>::new(self.client.clone()));
        let connector: Arc<dyn Connector<R>> =
            Arc::new(connector(Arc::clone(&self.resolver), Arc::clone(&store)));
        Arc::new(ManagedContext::new(
            connector,
            store,
            Arc::clone(&self.usage),
            Arc::clone(&self.references),
            self.controller_config.clone(),
        ))
    }

    fn task<R: Managed>(&self, connector: ConnectorFn<R>) -> BoxFuture<'static, ()> {
        managed_task(
            Api::<R>::all(self.client.clone()),
            self.managed_context(connector),
            Arc::clone(&self.server_state),
        )
    }

    /// One controller per served kind, plus the ProviderConfig controller
    pub fn controllers(&self) -> Vec<BoxFuture<'static, ()>> {
        let provider_configs = Arc::new(ProviderConfigContext {
            client: self.client.clone(),
            config: self.controller_config.clone(),
        });
        vec![
            self.task::<LoadBalancer>(elb::connector),
            self.task::<Role>(iam::role::connector),
            self.task::<User>(iam::user::connector),
            self.task::<Group>(iam::group::connector),
            self.task::<UserGroupMembership>(iam::membership::connector),
            self.task::<Distribution>(cloudfront::connector),
            run_provider_configs(provider_configs, Arc::clone(&self.server_state)).boxed(),
        ]
    }
}

/// Initialize the controller runtime
///
/// This function handles:
/// - rustls crypto provider setup
/// - Tracing subscriber setup
/// - Metrics registration
/// - HTTP server startup
/// - Kubernetes client creation
/// - Shared resolver, usage tracker and reference reader
pub async fn initialize(
    controller_config: ControllerConfig,
    server_config: ServerConfig,
) -> Result<InitializationResult> {
    // Must run before anything opens a TLS connection
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aws_provider_controller=info".into()),
        )
        .init();

    info!("Starting AWS provider controller");
    info!(
        "Build info: timestamp={}, datetime={}, git_hash={}",
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );
    info!(
        poll_interval_secs = controller_config.poll_interval_secs,
        sync_interval_secs = controller_config.sync_interval_secs,
        max_concurrent_reconciliations = controller_config.max_concurrent_reconciliations,
        "Controller configuration loaded"
    );

    observability::metrics::register_metrics().context("Failed to register metrics")?;

    let server_state = Arc::new(ServerState::default());
    let server_state_clone = Arc::clone(&server_state);
    let server_port = server_config.metrics_port;
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });
    wait_for_server_ready(&server_state, &server_handle, &server_config).await?;

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;
    check_provider_configs(&client).await;

    let usage: Arc<dyn UsageTracker> = Arc::new(KubeUsageTracker::new(client.clone()));
    let references: Arc<dyn ReferenceReader> = Arc::new(KubeReferenceReader::new(client.clone()));
    let resolver = Arc::new(ClientResolver::new(
        client.clone(),
        Arc::clone(&usage),
        controller_config.clone(),
    ));

    info!("Controller initialized, starting watch loops...");
    Ok(InitializationResult {
        client,
        server_state,
        controller_config,
        resolver,
        usage,
        references,
    })
}

/// Wait for the HTTP server to become ready
async fn wait_for_server_ready(
    server_state: &Arc<ServerState>,
    server_handle: &tokio::task::JoinHandle<()>,
    server_config: &ServerConfig,
) -> Result<()> {
    let startup_timeout = server_config.startup_timeout();
    let start_time = std::time::Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow::anyhow!("HTTP server failed to start"));
        }
        if server_state.ready() {
            info!("HTTP server is ready and accepting connections");
            return Ok(());
        }
        if start_time.elapsed() > startup_timeout {
            return Err(anyhow::anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }
        tokio::time::sleep(server_config.poll_interval()).await;
    }
}

/// Log whether the ProviderConfig CRD is queryable before the watches start
async fn check_provider_configs(client: &Client) {
    let configs: Api<ProviderConfig> = Api::all(client.clone());
    match configs.list(&ListParams::default()).await {
        Ok(list) => {
            let mut names: Vec<_> = list
                .items
                .iter()
                .filter_map(|c| c.metadata.name.as_deref())
                .collect();
            names.sort_unstable();
            info!(
                count = names.len(),
                names = names.join(", "),
                "Found existing ProviderConfig resources"
            );
        }
        Err(e) => {
            error!("ProviderConfig CRD is not queryable; {:?}. Is the CRD installed?", e);
            error!("Installation: cargo run --bin crdgen | kubectl apply -f -");
            warn!(error = %e, "Continuing; the watch loops will retry");
        }
    }
}
