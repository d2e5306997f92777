//! The trust decision engine.
//!
//! A [`CertificateCheck`] collects the artifacts of one provisioning
//! operation and then runs once:
//!
//! 1. Classify every artifact as signed or unsigned
//! 2. Collect untrusted signer chains, one per distinct leaf
//! 3. Apply the unsigned-content policy
//! 4. Ask the consent provider at most once
//! 5. Reconcile the answer and optionally persist accepted anchors
//!
//! Any verifier or trust-store failure during classification ends the run
//! immediately with [`RunStatus::Error`]. Persistence failures after the
//! operator accepted end with [`RunStatus::Info`].

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::consent::{ConsentProvider, ConsentRequest, ConsentResult};
use crate::error::{TrustError, TrustResult};
use crate::policy::{ConfigSource, UnsignedPolicy};
use crate::trust::TrustOracle;
use crate::types::{Artifact, Certificate, SignerChain};
use crate::verify::SignatureVerifier;

/// Collaborators for a check, resolved once by the caller.
#[derive(Clone)]
pub struct TrustServices {
    verifier: Arc<dyn SignatureVerifier>,
    oracle: Arc<dyn TrustOracle>,
    consent: Option<Arc<dyn ConsentProvider>>,
    config: Arc<dyn ConfigSource>,
    require_consent_provider: bool,
}

impl TrustServices {
    /// Services without a consent provider.
    pub fn new(
        verifier: Arc<dyn SignatureVerifier>,
        oracle: Arc<dyn TrustOracle>,
        config: Arc<dyn ConfigSource>,
    ) -> Self {
        Self {
            verifier,
            oracle,
            consent: None,
            config,
            require_consent_provider: false,
        }
    }

    /// Register a consent provider.
    pub fn with_consent(mut self, consent: Arc<dyn ConsentProvider>) -> Self {
        self.consent = Some(consent);
        self
    }

    /// Fail runs instead of approving them when no consent provider is
    /// registered.
    pub fn require_consent_provider(mut self, require: bool) -> Self {
        self.require_consent_provider = require;
        self
    }

    pub fn has_consent_provider(&self) -> bool {
        self.consent.is_some()
    }
}

impl fmt::Debug for TrustServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrustServices")
            .field("consent", &self.consent.is_some())
            .field("require_consent_provider", &self.require_consent_provider)
            .finish_non_exhaustive()
    }
}

/// Why a run was cancelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelReason {
    /// The operator declined to proceed with unsigned or untrusted content.
    UnsignedRejected,

    /// Untrusted signers were presented and none were accepted.
    CertificatesRejected,

    /// Some presented signers were left unaccepted.
    CertificatesNotAccepted { remaining: Vec<String> },
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsignedRejected => f.write_str("operator declined the content"),
            Self::CertificatesRejected => f.write_str("untrusted signers were rejected"),
            Self::CertificatesNotAccepted { remaining } => {
                write!(f, "signers not accepted: [{}]", remaining.join(", "))
            }
        }
    }
}

/// Aggregate outcome of a run.
#[derive(Debug)]
pub enum RunStatus {
    /// No objection.
    Ok,

    /// The operator declined; abort without treating it as a failure.
    Cancelled(CancelReason),

    /// Fatal failure; the provisioning operation must not proceed.
    Error(TrustError),

    /// Accepted, but recording the new anchors failed.
    Info(TrustError),
}

impl RunStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Whether the provisioning operation may proceed.
    pub fn may_proceed(&self) -> bool {
        matches!(self, Self::Ok | Self::Info(_))
    }

    /// Error carried by `Error` or `Info`.
    pub fn detail(&self) -> Option<&TrustError> {
        match self {
            Self::Error(e) | Self::Info(e) => Some(e),
            _ => None,
        }
    }

    /// Exit code for CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Ok | Self::Info(_) => 0,
            Self::Cancelled(_) => 3,
            Self::Error(e) => e.exit_code(),
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => f.write_str("ok"),
            Self::Cancelled(reason) => write!(f, "cancelled: {}", reason),
            Self::Error(e) => write!(f, "error: {}", e),
            Self::Info(e) => write!(f, "info: {}", e),
        }
    }
}

/// Untrusted chains keyed by leaf, first seen wins.
///
/// `leaves[i]` is always `chains[i].leaf()`.
#[derive(Debug, Default)]
struct UntrustedChains {
    leaves: Vec<Certificate>,
    chains: Vec<SignerChain>,
}

impl UntrustedChains {
    /// Record a chain unless its leaf is already known.
    fn record(&mut self, chain: &SignerChain) -> bool {
        if self.leaves.contains(chain.leaf()) {
            return false;
        }
        self.leaves.push(chain.leaf().clone());
        self.chains.push(chain.clone());
        true
    }

    fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }
}

#[derive(Debug, Default)]
struct Classification {
    unsigned: Vec<Artifact>,
    untrusted: UntrustedChains,
}

/// One batch of artifacts awaiting a trust decision.
#[derive(Debug)]
pub struct CertificateCheck {
    services: TrustServices,
    artifacts: Vec<Artifact>,
}

impl CertificateCheck {
    pub fn new(services: TrustServices) -> Self {
        Self {
            services,
            artifacts: Vec::new(),
        }
    }

    /// Append one artifact.
    pub fn add(&mut self, artifact: impl Into<Artifact>) {
        self.artifacts.push(artifact.into());
    }

    /// Append artifacts in order.
    pub fn extend<I>(&mut self, artifacts: I)
    where
        I: IntoIterator,
        I::Item: Into<Artifact>,
    {
        self.artifacts
            .extend(artifacts.into_iter().map(Into::into));
    }

    /// Append the candidates that are artifact references, skipping the rest.
    pub fn add_candidates<I>(&mut self, candidates: I)
    where
        I: IntoIterator,
        I::Item: TryInto<Artifact>,
    {
        self.artifacts
            .extend(candidates.into_iter().filter_map(|c| c.try_into().ok()));
    }

    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Run the check. Consumes the batch.
    pub async fn run(self) -> RunStatus {
        let count = self.artifacts.len();
        let status = self.evaluate().await;
        match &status {
            RunStatus::Error(e) => warn!(artifacts = count, error = %e, "certificate check failed"),
            other => info!(artifacts = count, status = %other, "certificate check finished"),
        }
        status
    }

    async fn evaluate(self) -> RunStatus {
        if self.artifacts.is_empty() {
            return RunStatus::Ok;
        }

        let consent = match &self.services.consent {
            Some(consent) => Arc::clone(consent),
            None if self.services.require_consent_provider => {
                return RunStatus::Error(TrustError::NoConsentProvider);
            }
            None => {
                warn!(
                    artifacts = self.artifacts.len(),
                    "no consent provider registered, skipping certificate checks"
                );
                return RunStatus::Ok;
            }
        };

        let Classification {
            unsigned,
            untrusted,
        } = match self.classify().await {
            Ok(classification) => classification,
            Err(e) => return RunStatus::Error(e),
        };

        let policy = UnsignedPolicy::resolve(self.services.config.as_ref());

        // Unsigned content under a fail policy ends the run before anyone is asked.
        if !unsigned.is_empty() && policy == UnsignedPolicy::Fail {
            return RunStatus::Error(TrustError::UnsignedNotAllowed {
                artifacts: unsigned.iter().map(ToString::to_string).collect(),
            });
        }

        let request = ConsentRequest {
            untrusted_chains: (!untrusted.is_empty()).then(|| untrusted.chains.clone()),
            unsigned_details: (policy != UnsignedPolicy::Allow && !unsigned.is_empty())
                .then(|| unsigned.iter().map(ToString::to_string).collect()),
        };

        if request.is_empty() {
            return RunStatus::Ok;
        }

        info!(
            untrusted = untrusted.leaves.len(),
            unsigned = request.unsigned_details.as_ref().map_or(0, Vec::len),
            %policy,
            "requesting operator consent"
        );

        let decision = match consent.request_decision(&request).await {
            Ok(decision) => decision,
            Err(e) => return RunStatus::Error(e),
        };

        self.reconcile(&request, &untrusted, decision).await
    }

    async fn classify(&self) -> TrustResult<Classification> {
        let mut classification = Classification::default();

        for artifact in &self.artifacts {
            let content = self.services.verifier.classify(artifact).await?;
            if !content.signed {
                debug!(artifact = %artifact, "unsigned");
                classification.unsigned.push(artifact.clone());
                continue;
            }

            for chain in &content.chains {
                match self.services.oracle.find_anchor(chain).await? {
                    Some(anchor) => {
                        debug!(artifact = %artifact, leaf = %chain.leaf(), anchor = %anchor, "trusted");
                    }
                    None => {
                        if classification.untrusted.record(chain) {
                            debug!(artifact = %artifact, leaf = %chain.leaf(), "untrusted signer");
                        }
                    }
                }
            }
        }

        Ok(classification)
    }

    async fn reconcile(
        &self,
        request: &ConsentRequest,
        untrusted: &UntrustedChains,
        decision: ConsentResult,
    ) -> RunStatus {
        if !decision.trust_unsigned_content {
            return RunStatus::Cancelled(CancelReason::UnsignedRejected);
        }

        let trusted = match (&request.untrusted_chains, &decision.trusted_certificates) {
            (Some(_), None) => return RunStatus::Cancelled(CancelReason::CertificatesRejected),
            (_, trusted) => trusted.as_deref().unwrap_or_default(),
        };

        let remaining: Vec<String> = untrusted
            .leaves
            .iter()
            .filter(|leaf| !trusted.contains(*leaf))
            .map(ToString::to_string)
            .collect();
        if !remaining.is_empty() {
            return RunStatus::Cancelled(CancelReason::CertificatesNotAccepted { remaining });
        }

        if decision.persist_trust {
            for certificate in trusted {
                let label = certificate.to_string();
                if let Err(e) = self.services.oracle.add_anchor(certificate, &label).await {
                    warn!(certificate = %certificate, error = %e, "failed to persist trust anchor");
                    return RunStatus::Info(e);
                }
                debug!(certificate = %certificate, "persisted trust anchor");
            }
        }

        RunStatus::Ok
    }
}
