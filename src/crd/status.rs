//! Status types for the `Template` resource.
//!
//! The status is a terminal per-reconcile summary: it is overwritten
//! wholesale on every pass, carries no history, and is never read back as an
//! input to later reconciles.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Status of the Template resource
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TemplateStatus {
    /// Conditions represent the latest available observations
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Observed generation
    #[serde(default)]
    pub observed_generation: Option<i64>,
    /// Last reconciliation time
    #[serde(default)]
    pub last_reconcile_time: Option<String>,
    /// Number of targets applied in the last pass
    #[serde(default)]
    pub targets_applied: Option<i32>,
    /// Number of targets skipped in the last pass (already converged)
    #[serde(default)]
    pub targets_skipped: Option<i32>,
    /// Number of targets that failed in the last pass
    #[serde(default)]
    pub targets_failed: Option<i32>,
    /// Most recent per-target or pass-level error, if any
    #[serde(default)]
    pub last_error: Option<String>,
    /// Per-target outcomes of the last pass
    #[serde(default)]
    pub targets: Vec<TargetStatus>,
}

/// Outcome for a single target object
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TargetStatus {
    pub api_version: String,
    pub kind: String,
    #[serde(default)]
    pub namespace: Option<String>,
    pub name: String,
    /// One of Applied, Skipped, Failed
    pub outcome: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// Condition represents a status condition for the resource
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub r#type: String,
    pub status: String,
    #[serde(default)]
    pub last_transition_time: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}
