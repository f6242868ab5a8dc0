//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! These values represent reasonable defaults and can be overridden via
//! environment variables where applicable.

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// Field manager name used for status patches
pub const FIELD_MANAGER: &str = "template-controller";

/// Overall deadline for one reconcile pass (seconds). Expiry cancels
/// in-flight store calls and requeues the Template.
pub const RECONCILE_DEADLINE_SECS: u64 = 120;

/// Bounded retries when an apply hits a resourceVersion conflict
pub const APPLY_CONFLICT_RETRIES: u32 = 3;

/// Requeue interval after a failed reconcile (seconds)
pub const ERROR_REQUEUE_SECS: u64 = 60;

/// Periodic resync interval after a successful reconcile (seconds).
/// Re-converges drifting targets without a watch event.
pub const RESYNC_INTERVAL_SECS: u64 = 300;

/// Interval for the out-of-band discovery refresh task (seconds)
pub const DISCOVERY_REFRESH_SECS: u64 = 300;
