//! # Template Controller
//!
//! A Kubernetes controller that derives objects from a source object through
//! ordered patches and replicates them across namespaces.
//!
//! ## Overview
//!
//! A `Template` resource names one source object, a selector over target
//! objects, and an ordered patch pipeline. On every reconcile the controller:
//!
//! 1. **Resolves targets** - Evaluates the patch target selector against live objects
//! 2. **Materializes the source** - Fetches the patch base by exact coordinates
//! 3. **Derives desired state** - Applies merge patches and JSON patches in order
//! 4. **Replicates** - Copies the result into any `copyToNamespaces` destinations
//! 5. **Applies** - Creates or merge-updates live objects, skipping no-op updates
//! 6. **Reports** - Overwrites the Template status with per-target outcomes
//!
//! ## Features
//!
//! - **Dynamic targets**: any discoverable kind can be patched, nothing is compiled in
//! - **Per-target isolation**: one failing target never blocks the others
//! - **Prometheus metrics**: reconcile counts, durations, and target outcomes
//! - **Health probes**: HTTP endpoints for liveness and readiness checks

use anyhow::{Context, Result};
use futures::StreamExt;
use kube::{api::Api, Client};
use kube_runtime::{controller::Action, watcher, Controller};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use template_controller::constants;
use template_controller::controller::discovery::SchemaCache;
use template_controller::controller::reconciler::{reconcile, Reconciler};
use template_controller::crd::Template;
use template_controller::observability::metrics;
use template_controller::server::{start_server, ServerState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "template_controller=info".into()),
        )
        .init();

    info!(
        "Starting Template Controller (built {} / {})",
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );

    metrics::register_metrics()?;

    let server_state = Arc::new(ServerState {
        is_ready: std::sync::atomic::AtomicBool::new(false),
    });
    let server_port = std::env::var("METRICS_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(constants::DEFAULT_METRICS_PORT);

    let server_state_clone = Arc::clone(&server_state);
    tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {e}");
        }
    });

    let client = Client::try_default()
        .await
        .context("creating Kubernetes client")?;

    // Discovery runs once up front, then a background task keeps the mapping
    // current without blocking reconciles.
    let schemas = Arc::new(SchemaCache::new());
    let discovered = schemas
        .refresh(&client)
        .await
        .context("initial API discovery")?;
    info!("Discovered {discovered} API resources");

    {
        let schemas = Arc::clone(&schemas);
        let client = client.clone();
        tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval(Duration::from_secs(constants::DISCOVERY_REFRESH_SECS));
            // first tick fires immediately; the initial refresh already ran
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = schemas.refresh(&client).await {
                    warn!("Discovery refresh failed: {e:#}");
                }
            }
        });
    }

    // Watch Template resources across all namespaces
    let templates: Api<Template> = Api::all(client.clone());
    let reconciler = Arc::new(Reconciler::new(client, schemas));

    server_state.is_ready.store(true, Ordering::Relaxed);

    Controller::new(templates, watcher::Config::default())
        .shutdown_on_signal()
        .run(
            reconcile,
            |template, error, _ctx| {
                error!(
                    "Reconciliation error for {}: {error:?}",
                    template.metadata.name.as_deref().unwrap_or("unknown")
                );
                metrics::increment_reconciliation_errors();
                Action::requeue(Duration::from_secs(constants::ERROR_REQUEUE_SECS))
            },
            Arc::clone(&reconciler),
        )
        .for_each(|_| std::future::ready(()))
        .await;

    info!("Controller stopped");

    Ok(())
}
