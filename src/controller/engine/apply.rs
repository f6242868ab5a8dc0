//! # Apply Executor
//!
//! The only component with write side effects. Creates absent objects,
//! merges desired fields onto present ones (fields the engine does not own
//! are preserved), and skips updates when the merge changes nothing, so
//! converged objects cause no resourceVersion churn. Conflicts re-fetch the
//! live object and retry a bounded number of times.

use serde_json::Value;
use tracing::debug;

use super::TargetError;
use crate::constants::APPLY_CONFLICT_RETRIES;
use crate::controller::discovery::ResourceMapping;
use crate::controller::store::{doc_name, doc_namespace, ObjectStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Created,
    Updated,
    Unchanged,
}

/// Converge one desired document against the live store.
pub async fn apply(
    store: &dyn ObjectStore,
    mapping: &ResourceMapping,
    desired: &Value,
) -> Result<ApplyOutcome, TargetError> {
    let name = doc_name(desired)
        .ok_or_else(|| TargetError::Invalid("desired document missing metadata.name".to_string()))?
        .to_string();
    let namespace = doc_namespace(desired).map(str::to_string);

    for attempt in 0..=APPLY_CONFLICT_RETRIES {
        if attempt > 0 {
            debug!("apply conflict for {name}, retrying (attempt {attempt})");
        }
        match store.get(mapping, namespace.as_deref(), &name).await {
            Err(StoreError::NotFound) => match store.create(mapping, desired).await {
                Ok(()) => return Ok(ApplyOutcome::Created),
                // Object appeared concurrently; re-fetch and merge instead.
                Err(StoreError::Conflict) => {}
                Err(error) => return Err(TargetError::Store(error)),
            },
            Ok(live) => {
                let mut merged = live.clone();
                json_patch::merge(&mut merged, desired);
                if merged == live {
                    return Ok(ApplyOutcome::Unchanged);
                }
                match store.update(mapping, &merged).await {
                    Ok(()) => return Ok(ApplyOutcome::Updated),
                    // Stale resourceVersion; re-fetch and retry.
                    Err(StoreError::Conflict) => {}
                    Err(error) => return Err(TargetError::Store(error)),
                }
            }
            Err(error) => return Err(TargetError::Store(error)),
        }
    }

    Err(TargetError::ApplyConflict {
        retries: APPLY_CONFLICT_RETRIES,
    })
}
