//! # Reconciler
//!
//! Kube-facing reconciliation for `Template` resources.
//!
//! ## Reconciliation Flow
//!
//! 1. Resolve the patch target selector to concrete objects
//! 2. Materialize the source object
//! 3. Derive one desired document per target through the patch pipeline
//! 4. Expand copies across `copyToNamespaces`
//! 5. Apply everything idempotently
//! 6. Overwrite the Template status with per-target outcomes

pub mod reconcile;
pub mod status;
pub mod types;

pub use reconcile::reconcile;
pub use types::{Reconciler, ReconcilerError};
