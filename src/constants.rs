//! # Constants
//!
//! Shared constants used throughout the operator.

/// Environment variable holding the bootstrap backend envelope (JSON)
pub const OPERATOR_CONFIG_ENV: &str = "OPERATOR_CONFIG";

/// Instance name of the backend configured through [`OPERATOR_CONFIG_ENV`]
pub const DEFAULT_ENV_BACKEND_NAME: &str = "default";

/// Default deadline for one adapter `init`/`get` call (seconds)
pub const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 30;

/// Default requeue interval after a successful reconciliation (seconds)
pub const DEFAULT_RESYNC_INTERVAL_SECS: u64 = 300;

/// Default Fibonacci backoff floor (seconds)
pub const DEFAULT_BACKOFF_MIN_SECS: u64 = 5;

/// Default Fibonacci backoff ceiling (seconds)
pub const DEFAULT_BACKOFF_MAX_SECS: u64 = 300;

/// Default HTTP server port for metrics and health checks
pub const DEFAULT_METRICS_PORT: u16 = 5000;

/// Field manager used for server-side apply
pub const FIELD_MANAGER: &str = "externalsecret-operator";

/// Finalizer placed on `ExternalSecretBackend` resources
pub const BACKEND_FINALIZER: &str =
    "externalsecret-operator.container-solutions.com/backend-instance";

/// Value of `app.kubernetes.io/managed-by` on materialized secrets
pub const MANAGED_BY: &str = "externalsecret-operator";
