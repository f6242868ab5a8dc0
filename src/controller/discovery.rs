//! # Discovery
//!
//! Maps (apiVersion, kind) pairs to concrete API resources.
//!
//! The [`SchemaCache`] is the only state shared across concurrent
//! reconciles. It is read-only from the engine's point of view and refreshed
//! out-of-band by a background task in `main`.

use anyhow::Context;
use kube::core::ApiResource;
use kube::discovery::{Discovery, Scope};
use kube::Client;
use std::collections::HashMap;
use std::sync::RwLock;
use thiserror::Error;
use tracing::debug;

/// Raised when an (apiVersion, kind) pair cannot be mapped to a known
/// resource. Fatal for the reconcile pass, never for the process.
#[derive(Debug, Clone, Error)]
#[error("cannot resolve {api_version}/{kind}: {reason}")]
pub struct ResolutionError {
    pub api_version: String,
    pub kind: String,
    pub reason: String,
}

/// Concrete addressing information for one API resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceMapping {
    pub group: String,
    pub version: String,
    pub kind: String,
    pub plural: String,
    pub namespaced: bool,
}

impl ResourceMapping {
    /// The `group/version` form, or bare `version` for the core group.
    #[must_use]
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }

    pub(crate) fn api_resource(&self) -> ApiResource {
        ApiResource {
            group: self.group.clone(),
            version: self.version.clone(),
            api_version: self.api_version(),
            kind: self.kind.clone(),
            plural: self.plural.clone(),
        }
    }
}

/// Resolves (apiVersion, kind) pairs. Must be safe for concurrent reads.
pub trait SchemaResolver: Send + Sync {
    fn resolve(&self, api_version: &str, kind: &str) -> Result<ResourceMapping, ResolutionError>;
}

/// In-memory resource mapping built from API server discovery.
#[derive(Debug, Default)]
pub struct SchemaCache {
    mappings: RwLock<HashMap<(String, String), ResourceMapping>>,
}

impl SchemaCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cached mappings with a fresh discovery walk.
    ///
    /// Returns the number of resources discovered.
    pub async fn refresh(&self, client: &Client) -> anyhow::Result<usize> {
        let discovery = Discovery::new(client.clone())
            .run()
            .await
            .context("running API discovery")?;

        let mut next = HashMap::new();
        for group in discovery.groups() {
            for (resource, capabilities) in group.recommended_resources() {
                let mapping = ResourceMapping {
                    group: resource.group.clone(),
                    version: resource.version.clone(),
                    kind: resource.kind.clone(),
                    plural: resource.plural.clone(),
                    namespaced: matches!(capabilities.scope, Scope::Namespaced),
                };
                next.insert((mapping.api_version(), mapping.kind.clone()), mapping);
            }
        }

        let count = next.len();
        let mut mappings = self
            .mappings
            .write()
            .map_err(|_| anyhow::anyhow!("schema cache lock poisoned"))?;
        *mappings = next;
        debug!("Schema cache refreshed with {count} resource mappings");
        Ok(count)
    }

    /// Register a single mapping. Used when seeding the cache in tests.
    pub fn insert(&self, mapping: ResourceMapping) {
        if let Ok(mut mappings) = self.mappings.write() {
            mappings.insert((mapping.api_version(), mapping.kind.clone()), mapping);
        }
    }
}

impl SchemaResolver for SchemaCache {
    fn resolve(&self, api_version: &str, kind: &str) -> Result<ResourceMapping, ResolutionError> {
        let mappings = self.mappings.read().map_err(|_| ResolutionError {
            api_version: api_version.to_string(),
            kind: kind.to_string(),
            reason: "schema cache unavailable".to_string(),
        })?;
        mappings
            .get(&(api_version.to_string(), kind.to_string()))
            .cloned()
            .ok_or_else(|| ResolutionError {
                api_version: api_version.to_string(),
                kind: kind.to_string(),
                reason: "no such resource registered with the API server".to_string(),
            })
    }
}
