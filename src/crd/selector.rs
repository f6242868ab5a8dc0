//! Selector types shared by the Template spec.
//!
//! An [`ObjectSelector`] names exactly one object by coordinates; a
//! [`ResourceSelector`] describes a class of objects through AND-ed
//! predicates. Empty predicate fields are unconstrained.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Exact coordinates of a single object. No wildcard matching.
///
/// When used as a refinement (e.g. on a [`JsonPatch`] entry) an empty field
/// leaves that coordinate unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObjectSelector {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub name: String,
}

/// Filter over a class of live objects.
///
/// All predicates are AND-ed; a predicate left empty matches everything of
/// the given kind. The namespace selector matches against namespace labels.
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSelector {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    /// Exact-name filter, empty matches any name
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub label_selector: LabelSelector,
    #[serde(default)]
    pub namespace_selector: LabelSelector,
    /// Required annotation key/value pairs
    #[serde(default)]
    pub annotation_selector: BTreeMap<String, String>,
}

/// One JSON-patch entry: an RFC 6902 operation list scoped to a target.
///
/// `object` refines which resolved target the operations apply to; every
/// non-empty field must match the target's coordinates or the entry is
/// skipped for that target.
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct JsonPatch {
    #[serde(default)]
    pub object: ObjectSelector,
    /// Serialized (YAML or JSON) list of RFC 6902 operations
    #[serde(default)]
    pub patch: String,
}

/// Destination namespaces the derived objects are additionally copied into.
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CopyToNamespaces {
    #[serde(default)]
    pub namespaces: Vec<String>,
}
