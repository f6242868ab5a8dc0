//! # Source Materializer
//!
//! Fetches the single source object a Template is based on and sanitizes it
//! into the working base for patching. Also prepares the spec's embedded
//! `resources` manifests for apply.

use serde_json::Value;

use super::{EngineError, ObjectCoords};
use crate::controller::discovery::{ResolutionError, SchemaResolver};
use crate::controller::store::{ObjectStore, StoreError};
use crate::crd::ObjectSelector;

/// Fetch the source object by exact coordinates.
///
/// Absence is fatal for the pass: without a base no desired state exists.
pub async fn materialize(
    store: &dyn ObjectStore,
    schemas: &dyn SchemaResolver,
    selector: &ObjectSelector,
) -> Result<Value, EngineError> {
    let mapping = schemas.resolve(&selector.api_version, &selector.kind)?;
    if mapping.namespaced && selector.namespace.is_empty() {
        return Err(EngineError::Resolution(ResolutionError {
            api_version: selector.api_version.clone(),
            kind: selector.kind.clone(),
            reason: "source namespace required for namespaced kind".to_string(),
        }));
    }
    let namespace = mapping.namespaced.then_some(selector.namespace.as_str());

    match store.get(&mapping, namespace, &selector.name).await {
        Ok(doc) => Ok(sanitize(doc)),
        Err(StoreError::NotFound) => Err(EngineError::SourceNotFound(ObjectCoords {
            api_version: selector.api_version.clone(),
            kind: selector.kind.clone(),
            namespace: namespace.map(str::to_string),
            name: selector.name.clone(),
        })),
        Err(error) => Err(EngineError::Store(error)),
    }
}

/// Strip server-populated fields so they never flow into desired state.
#[must_use]
pub fn sanitize(mut doc: Value) -> Value {
    if let Some(meta) = doc.get_mut("metadata").and_then(Value::as_object_mut) {
        for field in [
            "resourceVersion",
            "uid",
            "creationTimestamp",
            "generation",
            "managedFields",
            "selfLink",
        ] {
            meta.remove(field);
        }
    }
    if let Some(object) = doc.as_object_mut() {
        object.remove("status");
    }
    doc
}

/// Validate one embedded `resources` manifest and prepare it for apply.
///
/// Namespaced manifests without a namespace land in the Template's own
/// namespace. Errors are scoped to this one document.
pub fn prepare_embedded(
    manifest: &Value,
    template_namespace: &str,
    schemas: &dyn SchemaResolver,
) -> Result<Value, String> {
    let api_version = manifest
        .get("apiVersion")
        .and_then(Value::as_str)
        .ok_or("embedded resource missing apiVersion")?;
    let kind = manifest
        .get("kind")
        .and_then(Value::as_str)
        .ok_or("embedded resource missing kind")?;
    manifest
        .get("metadata")
        .and_then(|meta| meta.get("name"))
        .and_then(Value::as_str)
        .ok_or("embedded resource missing metadata.name")?;

    let mapping = schemas
        .resolve(api_version, kind)
        .map_err(|e| e.to_string())?;

    let mut doc = sanitize(manifest.clone());
    if mapping.namespaced {
        let meta = doc
            .get_mut("metadata")
            .and_then(Value::as_object_mut)
            .ok_or("embedded resource metadata is not an object")?;
        meta.entry("namespace")
            .or_insert_with(|| Value::String(template_namespace.to_string()));
    }
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::discovery::{ResourceMapping, SchemaCache};
    use serde_json::json;

    fn schemas() -> SchemaCache {
        let cache = SchemaCache::new();
        cache.insert(ResourceMapping {
            group: String::new(),
            version: "v1".to_string(),
            kind: "ConfigMap".to_string(),
            plural: "configmaps".to_string(),
            namespaced: true,
        });
        cache
    }

    #[test]
    fn sanitize_strips_server_populated_fields() {
        let doc = json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": {
                "name": "base",
                "namespace": "default",
                "resourceVersion": "42",
                "uid": "5c0e3f4d",
                "creationTimestamp": "2025-01-01T00:00:00Z",
                "generation": 3,
                "managedFields": [{"manager": "kubectl"}],
                "labels": {"keep": "me"}
            },
            "data": {"x": "1"},
            "status": {"ignored": true}
        });
        let sanitized = sanitize(doc);
        let meta = sanitized["metadata"].as_object().unwrap();
        assert!(!meta.contains_key("resourceVersion"));
        assert!(!meta.contains_key("uid"));
        assert!(!meta.contains_key("creationTimestamp"));
        assert!(!meta.contains_key("generation"));
        assert!(!meta.contains_key("managedFields"));
        assert_eq!(meta["labels"]["keep"], "me");
        assert!(sanitized.get("status").is_none());
        assert_eq!(sanitized["data"]["x"], "1");
    }

    #[test]
    fn embedded_manifest_defaults_to_template_namespace() {
        let manifest = json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": {"name": "extra"},
            "data": {"k": "v"}
        });
        let doc = prepare_embedded(&manifest, "platform-system", &schemas()).unwrap();
        assert_eq!(doc["metadata"]["namespace"], "platform-system");
    }

    #[test]
    fn embedded_manifest_keeps_explicit_namespace() {
        let manifest = json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": {"name": "extra", "namespace": "prod"},
        });
        let doc = prepare_embedded(&manifest, "platform-system", &schemas()).unwrap();
        assert_eq!(doc["metadata"]["namespace"], "prod");
    }

    #[test]
    fn embedded_manifest_without_identity_is_rejected() {
        let missing_kind = json!({"apiVersion": "v1", "metadata": {"name": "x"}});
        let err = prepare_embedded(&missing_kind, "default", &schemas()).unwrap_err();
        assert!(err.contains("missing kind"));

        let missing_name = json!({"apiVersion": "v1", "kind": "ConfigMap", "metadata": {}});
        let err = prepare_embedded(&missing_name, "default", &schemas()).unwrap_err();
        assert!(err.contains("missing metadata.name"));
    }
}
