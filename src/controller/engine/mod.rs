//! # Template Engine
//!
//! The template application core: resolves the patch target selector to
//! concrete objects, materializes the source, derives one desired document
//! per target through the patch pipeline, expands copies across namespaces,
//! and applies everything idempotently.
//!
//! Failures that prevent computing any desired state ([`EngineError`]) abort
//! the pass; failures scoped to one target ([`TargetError`]) are recorded in
//! the report and never block the remaining targets.

pub mod apply;
pub mod patch;
pub mod replicate;
pub mod report;
pub mod resolver;
pub mod source;

use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use self::report::{ReconcileReport, TargetOutcome};
use crate::controller::discovery::{ResolutionError, SchemaResolver};
use crate::controller::store::{doc_name, doc_namespace, ObjectStore, StoreError};
use crate::crd::{Template, TemplateSpec};

/// Coordinates of one live or desired object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectCoords {
    pub api_version: String,
    pub kind: String,
    /// `None` for cluster-scoped objects
    pub namespace: Option<String>,
    pub name: String,
}

impl fmt::Display for ObjectCoords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{} {}/{}", self.api_version, self.kind, ns, self.name),
            None => write!(f, "{}/{} {}", self.api_version, self.kind, self.name),
        }
    }
}

impl ObjectCoords {
    /// Coordinates of a desired document, using whatever identity fields are
    /// present. Missing fields come back empty rather than failing; callers
    /// needing a real address validate separately.
    pub(crate) fn of_document(doc: &Value) -> Self {
        Self {
            api_version: doc
                .get("apiVersion")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            kind: doc
                .get("kind")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            namespace: doc_namespace(doc).map(str::to_string),
            name: doc_name(doc).unwrap_or_default().to_string(),
        }
    }
}

/// Pass-fatal failures: no desired state can be computed.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("source object {0} not found")]
    SourceNotFound(ObjectCoords),
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error("object store failure: {0}")]
    Store(#[from] StoreError),
}

/// Per-target failures, recorded in status without blocking other targets.
#[derive(Debug, Error)]
pub enum TargetError {
    #[error("patch failed: {0}")]
    PatchApply(String),
    #[error("invalid desired document: {0}")]
    Invalid(String),
    #[error("apply conflict persisted after {retries} retries")]
    ApplyConflict { retries: u32 },
    #[error("object store failure: {0}")]
    Store(StoreError),
}

/// Orchestrates one reconcile pass for one Template.
pub struct TemplateEngine {
    store: Arc<dyn ObjectStore>,
    schemas: Arc<dyn SchemaResolver>,
}

impl std::fmt::Debug for TemplateEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateEngine").finish_non_exhaustive()
    }
}

impl TemplateEngine {
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>, schemas: Arc<dyn SchemaResolver>) -> Self {
        Self { store, schemas }
    }

    /// Run one full pass. Target resolution happens before the first store
    /// write, so resolution failures abort without side effects.
    pub async fn run(&self, template: &Template) -> Result<ReconcileReport, EngineError> {
        let spec = &template.spec;
        let template_namespace = template.metadata.namespace.as_deref().unwrap_or("default");
        let mut report = ReconcileReport::default();

        if !spec.patch_target.kind.is_empty() {
            let target_mapping = self
                .schemas
                .resolve(&spec.patch_target.api_version, &spec.patch_target.kind)?;
            let targets = resolver::resolve_targets(
                self.store.as_ref(),
                self.schemas.as_ref(),
                &spec.patch_target,
                &target_mapping,
            )
            .await?;
            let base =
                source::materialize(self.store.as_ref(), self.schemas.as_ref(), &spec.source)
                    .await?;

            if targets.is_empty() {
                debug!("patchTarget resolved to no objects, patch flow is a no-op");
            }
            for target in targets {
                match patch::build_desired(&base, &target, spec) {
                    Ok(desired) => self.apply_all(&desired, spec, &mut report).await,
                    Err(error) => report.record(target, TargetOutcome::Failed(error.to_string())),
                }
            }
        }

        for (index, manifest) in spec.resources.iter().enumerate() {
            match source::prepare_embedded(manifest, template_namespace, self.schemas.as_ref()) {
                Ok(doc) => self.apply_all(&doc, spec, &mut report).await,
                Err(reason) => {
                    let mut coords = ObjectCoords::of_document(manifest);
                    if coords.name.is_empty() {
                        coords.name = format!("resources[{index}]");
                    }
                    report.record(coords, TargetOutcome::Failed(reason));
                }
            }
        }

        Ok(report)
    }

    /// Expand one desired document across `copyToNamespaces` and apply each
    /// copy, recording one outcome per applied document.
    async fn apply_all(&self, desired: &Value, spec: &TemplateSpec, report: &mut ReconcileReport) {
        for doc in replicate::replicate(desired, spec.copy_to_namespaces.as_ref()) {
            let coords = ObjectCoords::of_document(&doc);
            let mapping = match self.schemas.resolve(&coords.api_version, &coords.kind) {
                Ok(mapping) => mapping,
                Err(error) => {
                    report.record(coords, TargetOutcome::Failed(error.to_string()));
                    continue;
                }
            };
            let outcome = match apply::apply(self.store.as_ref(), &mapping, &doc).await {
                Ok(apply::ApplyOutcome::Created) => TargetOutcome::Applied("created".to_string()),
                Ok(apply::ApplyOutcome::Updated) => TargetOutcome::Applied("updated".to_string()),
                Ok(apply::ApplyOutcome::Unchanged) => {
                    TargetOutcome::Skipped("unchanged".to_string())
                }
                Err(error) => TargetOutcome::Failed(error.to_string()),
            };
            report.record(coords, outcome);
        }
    }
}
