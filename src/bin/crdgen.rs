//! # CRD Generator
//!
//! Prints the `CustomResourceDefinition` YAML of every resource the operator
//! owns, as one multi-document stream.
//!
//! ```bash
//! cargo run --bin crdgen > config/crd/externalsecret-operator.yaml
//! cargo run --bin crdgen | kubectl apply -f -
//! ```

use externalsecret_operator::crd::{ExternalSecret, ExternalSecretBackend};
use kube::core::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    let documents = [
        serde_yaml::to_string(&ExternalSecretBackend::crd())?,
        serde_yaml::to_string(&ExternalSecret::crd())?,
    ];
    print!("{}", documents.join("---\n"));
    Ok(())
}
