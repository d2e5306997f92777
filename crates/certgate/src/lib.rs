//! Pre-flight signature and trust gate for provisioning operations.
//!
//! Before a provisioning operation installs a batch of artifacts, the gate
//! checks that every artifact is either signed by a trusted party or
//! explicitly accepted by an operator, and produces one decision for the
//! whole batch:
//!
//! - Signature classification through a [`SignatureVerifier`]
//! - Trust anchor lookup and persistence through a [`TrustOracle`]
//! - Unsigned-content policy (`allow`, `fail`, `prompt`)
//! - A single consolidated request to an optional [`ConsentProvider`]
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use certgate::{
//!     CertificateCheck, DsseVerifier, FileTrustStore, GateConfig, StaticConsent, TrustServices,
//! };
//!
//! # async fn example() -> certgate::TrustResult<()> {
//! let config = GateConfig::from_env()?;
//! let store = FileTrustStore::open(config.trust_store_path()?).await?;
//! let services = TrustServices::new(Arc::new(DsseVerifier::new()), Arc::new(store), Arc::new(config))
//!     .with_consent(Arc::new(StaticConsent::new()));
//!
//! let mut check = CertificateCheck::new(services);
//! check.add("plugins/org.example.core_1.0.0.jar");
//! let status = check.run().await;
//! if !status.may_proceed() {
//!     eprintln!("provisioning blocked: {}", status);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `CERTGATE_CONFIG` | YAML config file |
//! | `CERTGATE_UNSIGNED_POLICY` | `allow`, `fail` or `prompt` (default: `prompt`) |
//! | `CERTGATE_TRUST_STORE` | Trust store file (default: `<config dir>/certgate/trust-store.json`) |
//! | `CERTGATE_REQUIRE_CONSENT` | Fail instead of auto-approving without a consent provider |

pub mod checker;
pub mod config;
pub mod consent;
mod digest;
pub mod error;
pub mod policy;
pub mod trust;
pub mod types;
pub mod verify;

// Re-export main types
pub use checker::{CancelReason, CertificateCheck, RunStatus, TrustServices};
pub use config::{default_trust_store_path, GateConfig};
pub use consent::{ConsentProvider, ConsentRequest, ConsentResult, StaticConsent};
pub use error::{TrustError, TrustResult};
pub use policy::{ConfigSource, EnvConfig, UnsignedPolicy, UNSIGNED_POLICY_KEY};
pub use trust::{AnchorMetadata, FileTrustStore, TrustOracle, TrustStore};
pub use types::{
    Artifact, Certificate, DsseEnvelope, DsseSignature, SignerChain, TrustAnchor, TrustStoreFile,
};
pub use verify::{
    add_signature, compute_digest, sidecar_path, sign_artifact, write_sidecar, DsseVerifier,
    SignatureVerifier, SignedContent, PAYLOAD_TYPE_ARTIFACT_V1,
};
