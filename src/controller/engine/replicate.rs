//! # Namespace Replicator
//!
//! Expands one desired document across the `copyToNamespaces` list. Copies
//! are independent deep copies: only the namespace field is substituted, and
//! owner references are cleared so a copy never couples its lifecycle to the
//! original's namespace.

use serde_json::Value;

use crate::crd::CopyToNamespaces;

/// The original document plus one copy per listed namespace.
///
/// The original is returned untouched; an empty or absent list yields only
/// the original.
#[must_use]
pub fn replicate(desired: &Value, copy_to: Option<&CopyToNamespaces>) -> Vec<Value> {
    let mut documents = vec![desired.clone()];
    let Some(copy_to) = copy_to else {
        return documents;
    };
    for namespace in &copy_to.namespaces {
        let mut copy = desired.clone();
        if let Some(meta) = copy.get_mut("metadata").and_then(Value::as_object_mut) {
            meta.insert(
                "namespace".to_string(),
                Value::String(namespace.clone()),
            );
            meta.remove("ownerReferences");
        }
        documents.push(copy);
    }
    documents
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn desired() -> Value {
        json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": {
                "name": "app",
                "namespace": "prod",
                "ownerReferences": [{"kind": "Template", "name": "app-config"}]
            },
            "data": {"x": "1"}
        })
    }

    #[test]
    fn no_copy_list_returns_only_the_original() {
        let documents = replicate(&desired(), None);
        assert_eq!(documents, vec![desired()]);
    }

    #[test]
    fn one_copy_per_namespace_with_owner_references_cleared() {
        let copy_to = CopyToNamespaces {
            namespaces: vec!["a".to_string(), "b".to_string()],
        };
        let documents = replicate(&desired(), Some(&copy_to));
        assert_eq!(documents.len(), 3);

        // original untouched, namespace included
        assert_eq!(documents[0], desired());

        assert_eq!(documents[1]["metadata"]["namespace"], "a");
        assert_eq!(documents[2]["metadata"]["namespace"], "b");
        for copy in &documents[1..] {
            assert!(copy["metadata"].get("ownerReferences").is_none());
            assert_eq!(copy["data"], desired()["data"]);
        }
    }
}
