//! # Custom Resource Definitions
//!
//! CRD types owned by the operator.
//!
//! - `external_secret_backend.rs` - cluster-scoped backend instance declaration
//! - `external_secret.rs` - namespaced request to materialize one secret
//! - `status.rs` - shared status condition type

mod external_secret;
mod external_secret_backend;
mod status;

pub use external_secret::{ExternalSecret, ExternalSecretSpec, ExternalSecretStatus};
pub use external_secret_backend::{
    ExternalSecretBackend, ExternalSecretBackendSpec, ExternalSecretBackendStatus, SecretKeyRef,
};
pub use status::{Condition, READY};
