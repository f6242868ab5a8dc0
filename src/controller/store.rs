//! # Object Store
//!
//! The engine's only window onto the cluster. The [`ObjectStore`] trait
//! carries the four operations the engine needs (get, list, create, update)
//! over plain JSON documents; [`KubeStore`] is the production implementation
//! on top of dynamically-typed `kube` APIs. Tests substitute an in-memory
//! store.

use async_trait::async_trait;
use kube::api::{Api, ListParams, PostParams};
use kube::core::DynamicObject;
use kube::Client;
use serde_json::Value;
use thiserror::Error;

use crate::controller::discovery::ResourceMapping;

/// Store failures the engine reacts to individually.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object not found")]
    NotFound,
    #[error("conflict: live object changed concurrently")]
    Conflict,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Live object store operating on JSON documents.
///
/// Namespace is `None` for cluster-scoped resources and for cross-namespace
/// list queries.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get(
        &self,
        mapping: &ResourceMapping,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<Value, StoreError>;

    async fn list(
        &self,
        mapping: &ResourceMapping,
        namespace: Option<&str>,
        label_selector: Option<&str>,
    ) -> Result<Vec<Value>, StoreError>;

    async fn create(&self, mapping: &ResourceMapping, doc: &Value) -> Result<(), StoreError>;

    async fn update(&self, mapping: &ResourceMapping, doc: &Value) -> Result<(), StoreError>;
}

/// `metadata.name` of a JSON object document.
pub(crate) fn doc_name(doc: &Value) -> Option<&str> {
    doc.get("metadata")?.get("name")?.as_str()
}

/// `metadata.namespace` of a JSON object document.
pub(crate) fn doc_namespace(doc: &Value) -> Option<&str> {
    doc.get("metadata")?.get("namespace")?.as_str()
}

/// Kubernetes-backed store over `Api<DynamicObject>`.
pub struct KubeStore {
    client: Client,
}

impl std::fmt::Debug for KubeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStore").finish_non_exhaustive()
    }
}

impl KubeStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, mapping: &ResourceMapping, namespace: Option<&str>) -> Api<DynamicObject> {
        let resource = mapping.api_resource();
        match namespace {
            Some(ns) if mapping.namespaced => {
                Api::namespaced_with(self.client.clone(), ns, &resource)
            }
            _ => Api::all_with(self.client.clone(), &resource),
        }
    }
}

fn map_kube_error(error: kube::Error) -> StoreError {
    match error {
        kube::Error::Api(response) if response.code == 404 => StoreError::NotFound,
        kube::Error::Api(response) if response.code == 409 => StoreError::Conflict,
        other => StoreError::Other(anyhow::Error::new(other)),
    }
}

fn to_dynamic(doc: &Value) -> Result<DynamicObject, StoreError> {
    serde_json::from_value(doc.clone())
        .map_err(|e| StoreError::Other(anyhow::anyhow!("document is not a valid object: {e}")))
}

fn to_value(object: &DynamicObject) -> Result<Value, StoreError> {
    serde_json::to_value(object)
        .map_err(|e| StoreError::Other(anyhow::anyhow!("serializing live object: {e}")))
}

#[async_trait]
impl ObjectStore for KubeStore {
    async fn get(
        &self,
        mapping: &ResourceMapping,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<Value, StoreError> {
        let object = self
            .api(mapping, namespace)
            .get(name)
            .await
            .map_err(map_kube_error)?;
        to_value(&object)
    }

    async fn list(
        &self,
        mapping: &ResourceMapping,
        namespace: Option<&str>,
        label_selector: Option<&str>,
    ) -> Result<Vec<Value>, StoreError> {
        let mut params = ListParams::default();
        if let Some(labels) = label_selector {
            params = params.labels(labels);
        }
        let objects = self
            .api(mapping, namespace)
            .list(&params)
            .await
            .map_err(map_kube_error)?;
        objects.items.iter().map(to_value).collect()
    }

    async fn create(&self, mapping: &ResourceMapping, doc: &Value) -> Result<(), StoreError> {
        let object = to_dynamic(doc)?;
        self.api(mapping, doc_namespace(doc))
            .create(&PostParams::default(), &object)
            .await
            .map_err(map_kube_error)?;
        Ok(())
    }

    async fn update(&self, mapping: &ResourceMapping, doc: &Value) -> Result<(), StoreError> {
        let name = doc_name(doc).ok_or_else(|| {
            StoreError::Other(anyhow::anyhow!("document missing metadata.name"))
        })?;
        let object = to_dynamic(doc)?;
        self.api(mapping, doc_namespace(doc))
            .replace(name, &PostParams::default(), &object)
            .await
            .map_err(map_kube_error)?;
        Ok(())
    }
}
