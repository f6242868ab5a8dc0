//! # Patch Engine
//!
//! Derives one desired document per target from the sanitized source:
//! merge-patch documents first (RFC 7386), then JSON-patch operation sets
//! (RFC 6902), both in exact list order, then the target's identity stamped
//! last. Derived content is target-invariant; only identity differs per
//! target.

use json_patch::merge;
use serde_json::Value;
use tracing::debug;

use super::{ObjectCoords, TargetError};
use crate::crd::{ObjectSelector, TemplateSpec};

/// Build the desired document for one target.
///
/// The source is never mutated; every failure is scoped to this target.
pub fn build_desired(
    base: &Value,
    target: &ObjectCoords,
    spec: &TemplateSpec,
) -> Result<Value, TargetError> {
    let mut working = base.clone();

    for (index, document) in spec.patches.iter().enumerate() {
        let patch_doc = parse_document(document)
            .map_err(|reason| TargetError::PatchApply(format!("patches[{index}]: {reason}")))?;
        if !patch_doc.is_object() {
            return Err(TargetError::PatchApply(format!(
                "patches[{index}]: merge patch must be an object document"
            )));
        }
        merge(&mut working, &patch_doc);
    }

    for (index, entry) in spec.json_patches.iter().enumerate() {
        if !refines(&entry.object, target) {
            debug!("jsonPatches[{index}] does not refine to {target}, skipping");
            continue;
        }
        let operations: json_patch::Patch = parse_document(&entry.patch)
            .and_then(|value| serde_json::from_value(value).map_err(|e| e.to_string()))
            .map_err(|reason| {
                TargetError::PatchApply(format!("jsonPatches[{index}]: {reason}"))
            })?;
        json_patch::patch(&mut working, &operations).map_err(|error| {
            TargetError::PatchApply(format!("jsonPatches[{index}]: {error}"))
        })?;
    }

    stamp_identity(&mut working, target);
    Ok(working)
}

/// Parse a serialized document. YAML accepts JSON as a subset, so one parser
/// covers both forms the spec allows.
fn parse_document(raw: &str) -> Result<Value, String> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(raw).map_err(|e| e.to_string())?;
    serde_json::to_value(yaml).map_err(|e| e.to_string())
}

/// Whether a JSON-patch entry's selector refines to this target. Empty
/// selector fields are unconstrained; the selector never triggers a second
/// resolution.
fn refines(selector: &ObjectSelector, target: &ObjectCoords) -> bool {
    (selector.api_version.is_empty() || selector.api_version == target.api_version)
        && (selector.kind.is_empty() || selector.kind == target.kind)
        && (selector.namespace.is_empty()
            || Some(selector.namespace.as_str()) == target.namespace.as_deref())
        && (selector.name.is_empty() || selector.name == target.name)
}

fn stamp_identity(doc: &mut Value, target: &ObjectCoords) {
    if !doc.is_object() {
        *doc = Value::Object(serde_json::Map::new());
    }
    let Some(object) = doc.as_object_mut() else {
        return;
    };
    object.insert(
        "apiVersion".to_string(),
        Value::String(target.api_version.clone()),
    );
    object.insert("kind".to_string(), Value::String(target.kind.clone()));
    let meta = object
        .entry("metadata")
        .or_insert_with(|| Value::Object(serde_json::Map::new()));
    if !meta.is_object() {
        *meta = Value::Object(serde_json::Map::new());
    }
    let Some(meta) = meta.as_object_mut() else {
        return;
    };
    meta.insert("name".to_string(), Value::String(target.name.clone()));
    match &target.namespace {
        Some(ns) => {
            meta.insert("namespace".to_string(), Value::String(ns.clone()));
        }
        None => {
            meta.remove("namespace");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::JsonPatch;
    use serde_json::json;

    fn target(name: &str, namespace: &str) -> ObjectCoords {
        ObjectCoords {
            api_version: "v1".to_string(),
            kind: "ConfigMap".to_string(),
            namespace: Some(namespace.to_string()),
            name: name.to_string(),
        }
    }

    fn base() -> Value {
        json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": {"name": "base", "namespace": "templates"},
            "data": {"x": "1", "drop": "me"}
        })
    }

    fn spec() -> TemplateSpec {
        TemplateSpec {
            source: crate::crd::ObjectSelector::default(),
            patch_target: crate::crd::ResourceSelector::default(),
            resources: vec![],
            patches: vec![],
            json_patches: vec![],
            copy_to_namespaces: None,
        }
    }

    #[test]
    fn empty_patch_lists_yield_source_content_with_target_identity() {
        let desired = build_desired(&base(), &target("app", "prod"), &spec()).unwrap();
        assert_eq!(desired["data"], base()["data"]);
        assert_eq!(desired["metadata"]["name"], "app");
        assert_eq!(desired["metadata"]["namespace"], "prod");
    }

    #[test]
    fn merge_patches_apply_in_order_and_null_removes() {
        let mut spec = spec();
        spec.patches = vec![
            r#"{"data": {"y": "2", "z": "first"}}"#.to_string(),
            "data:\n  z: second\n  drop: null\n".to_string(),
        ];
        let desired = build_desired(&base(), &target("app", "prod"), &spec).unwrap();
        assert_eq!(desired["data"]["x"], "1");
        assert_eq!(desired["data"]["y"], "2");
        assert_eq!(desired["data"]["z"], "second");
        assert!(desired["data"].get("drop").is_none());
    }

    #[test]
    fn malformed_merge_patch_fails_the_target() {
        let mut spec = spec();
        spec.patches = vec!["- not\n- an\n- object\n".to_string()];
        let error = build_desired(&base(), &target("app", "prod"), &spec).unwrap_err();
        assert!(error.to_string().contains("patches[0]"));
    }

    #[test]
    fn json_patches_apply_after_merge_patches() {
        let mut spec = spec();
        spec.patches = vec![r#"{"data": {"y": "2"}}"#.to_string()];
        spec.json_patches = vec![JsonPatch {
            object: ObjectSelector::default(),
            patch: r#"[{"op": "replace", "path": "/data/y", "value": "3"}]"#.to_string(),
        }];
        let desired = build_desired(&base(), &target("app", "prod"), &spec).unwrap();
        assert_eq!(desired["data"]["y"], "3");
    }

    #[test]
    fn json_patch_remove_on_missing_path_fails() {
        let mut spec = spec();
        spec.json_patches = vec![JsonPatch {
            object: ObjectSelector::default(),
            patch: r#"[{"op": "remove", "path": "/data/absent"}]"#.to_string(),
        }];
        let error = build_desired(&base(), &target("app", "prod"), &spec).unwrap_err();
        assert!(matches!(error, TargetError::PatchApply(_)));
    }

    #[test]
    fn json_patch_entry_skips_non_matching_target() {
        let mut spec = spec();
        spec.json_patches = vec![JsonPatch {
            object: ObjectSelector {
                name: "other".to_string(),
                ..ObjectSelector::default()
            },
            // Would fail if applied; the refinement must skip it instead.
            patch: r#"[{"op": "remove", "path": "/data/absent"}]"#.to_string(),
        }];
        let desired = build_desired(&base(), &target("app", "prod"), &spec).unwrap();
        assert_eq!(desired["data"]["x"], "1");
    }

    #[test]
    fn refinement_matches_on_all_non_empty_fields() {
        let coords = target("app", "prod");
        assert!(refines(&ObjectSelector::default(), &coords));
        assert!(refines(
            &ObjectSelector {
                kind: "ConfigMap".to_string(),
                name: "app".to_string(),
                ..ObjectSelector::default()
            },
            &coords
        ));
        assert!(!refines(
            &ObjectSelector {
                namespace: "staging".to_string(),
                ..ObjectSelector::default()
            },
            &coords
        ));
    }

    #[test]
    fn identity_stamp_wins_over_patched_metadata() {
        let mut spec = spec();
        spec.patches = vec![r#"{"metadata": {"name": "hijacked"}}"#.to_string()];
        let desired = build_desired(&base(), &target("app", "prod"), &spec).unwrap();
        assert_eq!(desired["metadata"]["name"], "app");
    }
}
