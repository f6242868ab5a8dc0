//! # Selector Resolver
//!
//! Turns a [`ResourceSelector`] into the concrete set of live object
//! coordinates it matches. Label and namespace selectors are pushed down to
//! the store as query strings; name and annotation predicates filter
//! client-side. An empty result set is valid and a no-op downstream.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use serde_json::Value;

use super::{EngineError, ObjectCoords};
use crate::controller::discovery::{ResolutionError, ResourceMapping, SchemaResolver};
use crate::controller::store::{doc_name, doc_namespace, ObjectStore};
use crate::crd::ResourceSelector;

/// Resolve `selector` against the live store.
///
/// Re-evaluated from scratch on every reconcile; nothing is cached across
/// generations. The returned coordinates are ordered by (namespace, name).
pub async fn resolve_targets(
    store: &dyn ObjectStore,
    schemas: &dyn SchemaResolver,
    selector: &ResourceSelector,
    mapping: &ResourceMapping,
) -> Result<Vec<ObjectCoords>, EngineError> {
    let label_query = query_string(&selector.label_selector)
        .map_err(|reason| resolution_error(selector, reason))?;

    // Cluster-scoped kinds and empty namespace selectors both resolve with a
    // single cross-namespace list; a non-empty namespace selector first
    // narrows to the namespaces whose labels match.
    let namespaces: Vec<Option<String>> = if !mapping.namespaced
        || selector_is_empty(&selector.namespace_selector)
    {
        vec![None]
    } else {
        let namespace_query = query_string(&selector.namespace_selector)
            .map_err(|reason| resolution_error(selector, reason))?;
        let namespace_mapping = schemas.resolve("v1", "Namespace")?;
        let namespaces = store
            .list(&namespace_mapping, None, namespace_query.as_deref())
            .await?;
        namespaces
            .iter()
            .filter_map(|ns| doc_name(ns).map(str::to_string))
            .map(Some)
            .collect()
    };

    let mut documents = Vec::new();
    for namespace in &namespaces {
        let mut page = store
            .list(mapping, namespace.as_deref(), label_query.as_deref())
            .await?;
        documents.append(&mut page);
    }

    let mut coords: Vec<ObjectCoords> = documents
        .iter()
        .filter(|doc| selector.name.is_empty() || doc_name(doc) == Some(selector.name.as_str()))
        .filter(|doc| annotations_match(doc, selector))
        .filter_map(|doc| {
            let name = doc_name(doc)?;
            Some(ObjectCoords {
                api_version: mapping.api_version(),
                kind: mapping.kind.clone(),
                namespace: mapping
                    .namespaced
                    .then(|| doc_namespace(doc).unwrap_or("default").to_string()),
                name: name.to_string(),
            })
        })
        .collect();
    coords.sort_by(|a, b| (&a.namespace, &a.name).cmp(&(&b.namespace, &b.name)));
    Ok(coords)
}

fn resolution_error(selector: &ResourceSelector, reason: String) -> EngineError {
    EngineError::Resolution(ResolutionError {
        api_version: selector.api_version.clone(),
        kind: selector.kind.clone(),
        reason,
    })
}

fn annotations_match(doc: &Value, selector: &ResourceSelector) -> bool {
    if selector.annotation_selector.is_empty() {
        return true;
    }
    let annotations = doc
        .get("metadata")
        .and_then(|meta| meta.get("annotations"))
        .and_then(Value::as_object);
    let Some(annotations) = annotations else {
        return false;
    };
    selector
        .annotation_selector
        .iter()
        .all(|(key, value)| annotations.get(key).and_then(Value::as_str) == Some(value.as_str()))
}

pub(crate) fn selector_is_empty(selector: &LabelSelector) -> bool {
    selector
        .match_labels
        .as_ref()
        .is_none_or(std::collections::BTreeMap::is_empty)
        && selector
            .match_expressions
            .as_ref()
            .is_none_or(Vec::is_empty)
}

/// Convert a [`LabelSelector`] to a Kubernetes query string.
///
/// `matchLabels` become `key=value` pairs; `matchExpressions` support the
/// `In`, `NotIn`, `Exists` and `DoesNotExist` operators. Returns `None` for
/// an empty selector (match everything).
pub(crate) fn query_string(selector: &LabelSelector) -> Result<Option<String>, String> {
    if selector_is_empty(selector) {
        return Ok(None);
    }

    let mut parts: Vec<String> = Vec::new();
    if let Some(labels) = &selector.match_labels {
        parts.extend(labels.iter().map(|(key, value)| format!("{key}={value}")));
    }
    if let Some(requirements) = &selector.match_expressions {
        for requirement in requirements {
            let values = requirement.values.as_deref().unwrap_or_default();
            let part = match requirement.operator.as_str() {
                operator @ ("In" | "NotIn") => {
                    if values.is_empty() {
                        return Err(format!(
                            "label selector operator {operator:?} requires values"
                        ));
                    }
                    format!(
                        "{} {} ({})",
                        requirement.key,
                        operator.to_ascii_lowercase(),
                        values.join(", ")
                    )
                }
                operator @ ("Exists" | "DoesNotExist") => {
                    if !values.is_empty() {
                        return Err(format!(
                            "label selector operator {operator:?} must not have values"
                        ));
                    }
                    if operator == "Exists" {
                        requirement.key.clone()
                    } else {
                        format!("!{}", requirement.key)
                    }
                }
                operator => {
                    return Err(format!("invalid label selector operator {operator:?}"));
                }
            };
            parts.push(part);
        }
    }
    Ok(Some(parts.join(",")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelectorRequirement;
    use std::collections::BTreeMap;

    #[test]
    fn empty_selector_yields_no_query() {
        assert_eq!(query_string(&LabelSelector::default()), Ok(None));
        assert!(selector_is_empty(&LabelSelector::default()));
    }

    #[test]
    fn match_labels_and_expressions_combine() {
        let selector = LabelSelector {
            match_labels: Some(BTreeMap::from([(
                "app".to_string(),
                "shop".to_string(),
            )])),
            match_expressions: Some(vec![
                LabelSelectorRequirement {
                    key: "tier".to_string(),
                    operator: "In".to_string(),
                    values: Some(vec!["web".to_string(), "worker".to_string()]),
                },
                LabelSelectorRequirement {
                    key: "legacy".to_string(),
                    operator: "DoesNotExist".to_string(),
                    values: None,
                },
                LabelSelectorRequirement {
                    key: "owner".to_string(),
                    operator: "Exists".to_string(),
                    values: None,
                },
            ]),
        };
        assert_eq!(
            query_string(&selector).unwrap().unwrap(),
            "app=shop,tier in (web, worker),!legacy,owner"
        );
    }

    #[test]
    fn binary_operator_without_values_is_rejected() {
        let selector = LabelSelector {
            match_labels: None,
            match_expressions: Some(vec![LabelSelectorRequirement {
                key: "tier".to_string(),
                operator: "NotIn".to_string(),
                values: None,
            }]),
        };
        assert!(query_string(&selector).is_err());
    }

    #[test]
    fn unknown_operator_is_rejected() {
        let selector = LabelSelector {
            match_labels: None,
            match_expressions: Some(vec![LabelSelectorRequirement {
                key: "tier".to_string(),
                operator: "Matches".to_string(),
                values: None,
            }]),
        };
        assert!(query_string(&selector).is_err());
    }

    #[test]
    fn annotation_predicates_require_all_pairs() {
        let mut selector = ResourceSelector {
            kind: "ConfigMap".to_string(),
            api_version: "v1".to_string(),
            ..ResourceSelector::default()
        };
        selector
            .annotation_selector
            .insert("team".to_string(), "payments".to_string());

        let matching = serde_json::json!({
            "metadata": {"name": "a", "annotations": {"team": "payments", "extra": "1"}}
        });
        let wrong_value = serde_json::json!({
            "metadata": {"name": "b", "annotations": {"team": "search"}}
        });
        let missing = serde_json::json!({"metadata": {"name": "c"}});

        assert!(annotations_match(&matching, &selector));
        assert!(!annotations_match(&wrong_value, &selector));
        assert!(!annotations_match(&missing, &selector));
    }
}
