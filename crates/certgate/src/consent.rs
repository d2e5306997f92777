//! Operator consent.

use async_trait::async_trait;

use crate::error::TrustResult;
use crate::types::{Certificate, SignerChain};

/// What the operator is asked to accept.
///
/// `None` means "not asked", which is different from an empty list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsentRequest {
    /// Untrusted signer chains, one per distinct leaf.
    pub untrusted_chains: Option<Vec<SignerChain>>,

    /// Display strings of unsigned artifacts.
    pub unsigned_details: Option<Vec<String>>,
}

impl ConsentRequest {
    /// Nothing needs operator attention.
    pub fn is_empty(&self) -> bool {
        self.untrusted_chains.is_none() && self.unsigned_details.is_none()
    }
}

/// The operator's answer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsentResult {
    /// Whether unsigned content (and the operation as a whole) may proceed.
    pub trust_unsigned_content: bool,

    /// Leaf certificates the operator accepted; `None` when no selection
    /// was made.
    pub trusted_certificates: Option<Vec<Certificate>>,

    /// Whether accepted certificates should become permanent anchors.
    pub persist_trust: bool,
}

impl ConsentResult {
    /// Reject everything.
    pub fn reject() -> Self {
        Self::default()
    }

    /// Accept unsigned content without selecting any certificates.
    pub fn accept_unsigned() -> Self {
        Self {
            trust_unsigned_content: true,
            ..Self::default()
        }
    }

    /// Proceed, trusting the given certificates.
    pub fn trust(certificates: Vec<Certificate>) -> Self {
        Self {
            trust_unsigned_content: true,
            trusted_certificates: Some(certificates),
            persist_trust: false,
        }
    }

    /// Set whether the accepted certificates are persisted.
    pub fn persist(mut self, persist: bool) -> Self {
        self.persist_trust = persist;
        self
    }
}

/// Surface that asks an operator for a trust decision.
#[async_trait]
pub trait ConsentProvider: Send + Sync {
    async fn request_decision(&self, request: &ConsentRequest) -> TrustResult<ConsentResult>;
}

/// Answers every request the same way without asking anyone.
///
/// Accepts unsigned content and every presented leaf certificate.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticConsent {
    persist: bool,
}

impl StaticConsent {
    pub fn new() -> Self {
        Self { persist: false }
    }

    /// Persist the accepted leaves as anchors.
    pub fn persisting(mut self) -> Self {
        self.persist = true;
        self
    }
}

#[async_trait]
impl ConsentProvider for StaticConsent {
    async fn request_decision(&self, request: &ConsentRequest) -> TrustResult<ConsentResult> {
        let trusted = request
            .untrusted_chains
            .as_ref()
            .map(|chains| chains.iter().map(|c| c.leaf().clone()).collect());

        Ok(ConsentResult {
            trust_unsigned_content: true,
            trusted_certificates: trusted,
            persist_trust: self.persist,
        })
    }
}
