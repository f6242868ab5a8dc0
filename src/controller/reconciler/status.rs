//! # Status Aggregator
//!
//! Folds per-target outcomes into a fresh `TemplateStatus` and writes it to
//! the status subresource. The status is overwritten wholesale on every
//! pass: it carries no history and is never an input to later reconciles.

use anyhow::Context;
use kube::api::{Patch, PatchParams};
use kube::Api;

use crate::constants;
use crate::controller::engine::report::ReconcileReport;
use crate::controller::reconciler::types::Reconciler;
use crate::crd::{Condition, TargetStatus, Template, TemplateStatus};

/// Build the status summarizing one completed pass.
#[must_use]
pub fn aggregate(template: &Template, report: &ReconcileReport) -> TemplateStatus {
    let failed = report.failed();
    let summary = format!(
        "applied {}, skipped {}, failed {} targets",
        report.applied(),
        report.skipped(),
        failed
    );
    let (ready, reason) = if failed == 0 {
        ("True", "ReconciliationSucceeded")
    } else {
        ("False", "TargetsFailed")
    };

    TemplateStatus {
        conditions: vec![ready_condition(ready, reason, &summary)],
        observed_generation: template.metadata.generation,
        last_reconcile_time: Some(chrono::Utc::now().to_rfc3339()),
        targets_applied: Some(report.applied() as i32),
        targets_skipped: Some(report.skipped() as i32),
        targets_failed: Some(failed as i32),
        last_error: report.last_error().map(str::to_string),
        targets: report
            .outcomes
            .iter()
            .map(|(coords, outcome)| TargetStatus {
                api_version: coords.api_version.clone(),
                kind: coords.kind.clone(),
                namespace: coords.namespace.clone(),
                name: coords.name.clone(),
                outcome: outcome.as_str().to_string(),
                message: (!outcome.message().is_empty())
                    .then(|| outcome.message().to_string()),
            })
            .collect(),
    }
}

/// Write the status for a completed pass.
pub async fn write_report(
    ctx: &Reconciler,
    template: &Template,
    report: &ReconcileReport,
) -> anyhow::Result<()> {
    patch_status(ctx, template, aggregate(template, report)).await
}

/// Write a pass-level failure status before the error is surfaced.
pub async fn write_failure(
    ctx: &Reconciler,
    template: &Template,
    reason: &str,
    message: &str,
) -> anyhow::Result<()> {
    let status = TemplateStatus {
        conditions: vec![ready_condition("False", reason, message)],
        observed_generation: template.metadata.generation,
        last_reconcile_time: Some(chrono::Utc::now().to_rfc3339()),
        targets_applied: Some(0),
        targets_skipped: Some(0),
        targets_failed: Some(0),
        last_error: Some(message.to_string()),
        targets: vec![],
    };
    patch_status(ctx, template, status).await
}

fn ready_condition(status: &str, reason: &str, message: &str) -> Condition {
    Condition {
        r#type: "Ready".to_string(),
        status: status.to_string(),
        last_transition_time: Some(chrono::Utc::now().to_rfc3339()),
        reason: Some(reason.to_string()),
        message: Some(message.to_string()),
    }
}

async fn patch_status(
    ctx: &Reconciler,
    template: &Template,
    status: TemplateStatus,
) -> anyhow::Result<()> {
    let api: Api<Template> = Api::namespaced(
        ctx.client.clone(),
        template.metadata.namespace.as_deref().unwrap_or("default"),
    );
    let patch = serde_json::json!({ "status": status });
    api.patch_status(
        template.metadata.name.as_deref().unwrap_or("unknown"),
        &PatchParams::apply(constants::FIELD_MANAGER),
        &Patch::Merge(patch),
    )
    .await
    .context("patching Template status")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::engine::report::TargetOutcome;
    use crate::controller::engine::ObjectCoords;
    use crate::crd::TemplateSpec;

    fn template() -> Template {
        let mut template = Template::new("app-config", TemplateSpec::default());
        template.metadata.generation = Some(7);
        template
    }

    fn coords(name: &str) -> ObjectCoords {
        ObjectCoords {
            api_version: "v1".to_string(),
            kind: "ConfigMap".to_string(),
            namespace: Some("prod".to_string()),
            name: name.to_string(),
        }
    }

    #[test]
    fn all_targets_applied_reports_ready() {
        let mut report = ReconcileReport::default();
        report.record(coords("a"), TargetOutcome::Applied("created".to_string()));
        report.record(coords("b"), TargetOutcome::Skipped("unchanged".to_string()));

        let status = aggregate(&template(), &report);
        assert_eq!(status.targets_applied, Some(1));
        assert_eq!(status.targets_skipped, Some(1));
        assert_eq!(status.targets_failed, Some(0));
        assert_eq!(status.observed_generation, Some(7));
        assert!(status.last_error.is_none());
        assert_eq!(status.targets.len(), 2);

        let ready = &status.conditions[0];
        assert_eq!(ready.r#type, "Ready");
        assert_eq!(ready.status, "True");
        assert_eq!(ready.reason.as_deref(), Some("ReconciliationSucceeded"));
    }

    #[test]
    fn failed_target_reports_not_ready_with_last_error() {
        let mut report = ReconcileReport::default();
        report.record(coords("a"), TargetOutcome::Applied("updated".to_string()));
        report.record(
            coords("b"),
            TargetOutcome::Failed("patch failed: jsonPatches[0]".to_string()),
        );

        let status = aggregate(&template(), &report);
        assert_eq!(status.targets_failed, Some(1));
        assert_eq!(
            status.last_error.as_deref(),
            Some("patch failed: jsonPatches[0]")
        );
        assert_eq!(status.conditions[0].status, "False");
        assert_eq!(status.conditions[0].reason.as_deref(), Some("TargetsFailed"));

        let failed = status
            .targets
            .iter()
            .find(|t| t.name == "b")
            .expect("target b reported");
        assert_eq!(failed.outcome, "Failed");
    }
}
