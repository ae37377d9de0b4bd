//! # `ExternalSecret` Operator
//!
//! Process bootstrap: configuration, logging, metrics, adapter registration,
//! the optional environment-configured backend, then the controllers.

use anyhow::{Context as _, Result};
use externalsecret_operator::backend::{register_builtin, BackendManager, BackendRegistry};
use externalsecret_operator::config::ControllerConfig;
use externalsecret_operator::controller::{self, Context};
use externalsecret_operator::observability::{logging, metrics};
use externalsecret_operator::server::{start_server, ServerState};
use kube::Client;
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Required for rustls 0.23+ before any TLS connection is made
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        anyhow::bail!("Failed to install rustls crypto provider");
    }

    let config = ControllerConfig::from_env();
    logging::init_tracing(&config)?;

    info!("Starting ExternalSecret Operator");
    info!(
        datetime = env!("BUILD_DATETIME"),
        git_hash = env!("BUILD_GIT_HASH"),
        version = env!("CARGO_PKG_VERSION"),
        "Build info"
    );

    metrics::register_metrics()?;

    let registry = BackendRegistry::new();
    register_builtin(&registry);
    info!(kinds = ?registry.kinds(), "Registered backend types");

    let backends =
        Arc::new(BackendManager::new(registry).with_timeout(config.backend_timeout()));

    if std::env::var_os(&config.operator_config_env).is_some() {
        match backends.init_from_env(&config.env_backend_name).await {
            Ok(()) => info!(
                instance = %config.env_backend_name,
                "Configured backend from environment"
            ),
            Err(e) => error!(
                instance = %config.env_backend_name,
                error = %e,
                "Failed to configure backend from environment"
            ),
        }
    } else {
        warn!(
            variable = %config.operator_config_env,
            "No environment backend configured; relying on ExternalSecretBackend resources"
        );
    }

    let server_state = Arc::new(ServerState::default());
    let server_port = config.metrics_port;
    let server_state_clone = Arc::clone(&server_state);
    tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!(error = %e, "HTTP server error");
        }
    });

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let ctx = Arc::new(Context::new(client, backends, config));
    controller::run(ctx, server_state).await
}
