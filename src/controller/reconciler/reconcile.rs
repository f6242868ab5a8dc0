//! Main reconciliation entry point for Template resources.
//!
//! Errors returned here are handled by the error policy in `main.rs`, which
//! turns them into a requeue. Per-target failures never surface as errors;
//! they land in the Template status instead.

use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn, Instrument, Level};

use crate::constants;
use crate::controller::discovery::SchemaResolver;
use crate::controller::engine::TemplateEngine;
use crate::controller::reconciler::status;
use crate::controller::reconciler::types::{Reconciler, ReconcilerError};
use crate::crd::Template;
use crate::observability::metrics;

/// Reconcile one Template generation.
///
/// The whole pass runs under a single deadline; expiry cancels in-flight
/// store calls and is treated as retryable, never fatal.
pub async fn reconcile(
    template: Arc<Template>,
    ctx: Arc<Reconciler>,
) -> Result<Action, ReconcilerError> {
    let name = template.metadata.name.as_deref().unwrap_or("unknown");
    let namespace = template.metadata.namespace.as_deref().unwrap_or("default");
    let span = tracing::span!(
        Level::INFO,
        "reconcile",
        resource.name = name,
        resource.namespace = namespace,
        resource.kind = "Template"
    );
    reconcile_inner(Arc::clone(&template), ctx)
        .instrument(span)
        .await
}

async fn reconcile_inner(
    template: Arc<Template>,
    ctx: Arc<Reconciler>,
) -> Result<Action, ReconcilerError> {
    let start = Instant::now();
    let name = template.metadata.name.as_deref().unwrap_or("unknown");

    info!("Reconciling Template: {name}");
    metrics::increment_reconciliations();

    let schemas: Arc<dyn SchemaResolver> = ctx.schemas.clone();
    let engine = TemplateEngine::new(Arc::clone(&ctx.store), schemas);
    let deadline = Duration::from_secs(constants::RECONCILE_DEADLINE_SECS);

    match tokio::time::timeout(deadline, engine.run(&template)).await {
        Err(_elapsed) => {
            warn!("Reconcile deadline exceeded for Template {name} after {deadline:?}");
            let message = format!("reconcile did not finish within {}s", deadline.as_secs());
            if let Err(status_error) =
                status::write_failure(&ctx, &template, "DeadlineExceeded", &message).await
            {
                warn!("Failed to update status after deadline expiry: {status_error:#}");
            }
            Err(ReconcilerError::DeadlineExceeded(deadline))
        }
        Ok(Err(engine_error)) => {
            error!("Reconcile failed for Template {name}: {engine_error}");
            if let Err(status_error) = status::write_failure(
                &ctx,
                &template,
                "ReconciliationFailed",
                &engine_error.to_string(),
            )
            .await
            {
                warn!("Failed to update status after reconcile failure: {status_error:#}");
            }
            Err(ReconcilerError::Engine(engine_error))
        }
        Ok(Ok(report)) => {
            status::write_report(&ctx, &template, &report)
                .await
                .map_err(ReconcilerError::Status)?;

            metrics::observe_reconcile_duration(start.elapsed().as_secs_f64());
            metrics::add_targets_applied(report.applied() as u64);
            metrics::add_targets_skipped(report.skipped() as u64);
            metrics::add_targets_failed(report.failed() as u64);

            info!(
                applied = report.applied(),
                skipped = report.skipped(),
                failed = report.failed(),
                "Reconciled Template: {name}"
            );
            Ok(Action::requeue(Duration::from_secs(
                constants::RESYNC_INTERVAL_SECS,
            )))
        }
    }
}
