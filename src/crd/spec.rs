//! The `Template` custom resource.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::selector::{CopyToNamespaces, JsonPatch, ObjectSelector, ResourceSelector};
use super::status::TemplateStatus;

/// Template Custom Resource Definition
///
/// A Template selects a source object and a set of target objects, derives a
/// desired state by applying an ordered patch pipeline to the source, and
/// optionally replicates the result into additional namespaces.
///
/// # Example
///
/// ```yaml
/// apiVersion: templating.microscaler.io/v1
/// kind: Template
/// metadata:
///   name: app-config
///   namespace: platform-system
/// spec:
///   source:
///     apiVersion: v1
///     kind: ConfigMap
///     namespace: platform-system
///     name: base-config
///   patchTarget:
///     apiVersion: v1
///     kind: ConfigMap
///     labelSelector:
///       matchLabels:
///         app.kubernetes.io/part-of: shop
///   patches:
///     - |
///       data:
///         environment: production
/// ```
#[derive(CustomResource, Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "Template",
    group = "templating.microscaler.io",
    version = "v1",
    namespaced,
    status = "TemplateStatus",
    printcolumn = r#"{"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSpec {
    /// Coordinates of the single object used as the patch base
    #[serde(default)]
    pub source: ObjectSelector,
    /// Selects the live objects that receive the derived result.
    /// An empty kind disables the patch flow (resources-only Template).
    #[serde(default)]
    pub patch_target: ResourceSelector,
    /// Raw manifests applied as additional static resources alongside the
    /// patch flow. Namespaced manifests without a namespace land in the
    /// Template's own namespace.
    #[serde(default)]
    pub resources: Vec<serde_json::Value>,
    /// Ordered merge-patch documents (YAML or JSON partial objects).
    /// Later entries override earlier ones on conflicting fields; an
    /// explicit null removes the key.
    #[serde(default)]
    pub patches: Vec<String>,
    /// Ordered JSON-patch entries, applied strictly after `patches`
    #[serde(default)]
    pub json_patches: Vec<JsonPatch>,
    /// Extra namespaces the derived objects are copied into
    #[serde(default)]
    pub copy_to_namespaces: Option<CopyToNamespaces>,
}
