//! Core types for the reconciler.

use kube::Client;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::controller::discovery::SchemaCache;
use crate::controller::engine::EngineError;
use crate::controller::store::{KubeStore, ObjectStore};

/// Errors surfaced to the controller runtime; the error policy turns them
/// into a requeue.
#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("reconcile deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),
    #[error("status update failed: {0}")]
    Status(#[source] anyhow::Error),
}

/// Shared context handed to every reconcile invocation.
///
/// The schema cache is read-only here; a background task in `main` refreshes
/// it out-of-band.
#[derive(Clone)]
pub struct Reconciler {
    pub client: Client,
    pub store: Arc<dyn ObjectStore>,
    pub schemas: Arc<SchemaCache>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler").finish_non_exhaustive()
    }
}

impl Reconciler {
    #[must_use]
    pub fn new(client: Client, schemas: Arc<SchemaCache>) -> Self {
        let store = Arc::new(KubeStore::new(client.clone()));
        Self {
            client,
            store,
            schemas,
        }
    }
}
