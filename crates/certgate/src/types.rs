//! Core value types and the sidecar/trust-store wire formats.

use std::fmt;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Utc};
use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};

use crate::digest::sha256_bytes;
use crate::error::{TrustError, TrustResult};

/// Reference to one unit of content that must pass the gate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Artifact(PathBuf);

impl Artifact {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl From<PathBuf> for Artifact {
    fn from(path: PathBuf) -> Self {
        Self(path)
    }
}

impl From<&Path> for Artifact {
    fn from(path: &Path) -> Self {
        Self(path.to_path_buf())
    }
}

impl From<&str> for Artifact {
    fn from(path: &str) -> Self {
        Self(PathBuf::from(path))
    }
}

impl From<String> for Artifact {
    fn from(path: String) -> Self {
        Self(PathBuf::from(path))
    }
}

/// Only JSON strings name artifacts; every other value is rejected.
impl TryFrom<&serde_json::Value> for Artifact {
    type Error = TrustError;

    fn try_from(value: &serde_json::Value) -> TrustResult<Self> {
        match value {
            serde_json::Value::String(path) if !path.is_empty() => Ok(Self::from(path.as_str())),
            other => Err(TrustError::Config {
                message: format!("not an artifact reference: {}", other),
            }),
        }
    }
}

impl TryFrom<serde_json::Value> for Artifact {
    type Error = TrustError;

    fn try_from(value: serde_json::Value) -> TrustResult<Self> {
        Self::try_from(&value)
    }
}

/// A signer certificate: an Ed25519 public key in SPKI DER form.
///
/// Equality and hashing are over the DER bytes. The key id
/// (`sha256:<hex>` of the DER) is the human-facing identity.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Certificate {
    der: Vec<u8>,
}

impl Certificate {
    /// Wrap raw SPKI DER bytes without validating them.
    pub fn from_der(der: impl Into<Vec<u8>>) -> Self {
        Self { der: der.into() }
    }

    /// Decode a Base64-encoded SPKI DER certificate.
    pub fn from_base64(b64: &str) -> TrustResult<Self> {
        let der = BASE64.decode(b64).map_err(|e| TrustError::Config {
            message: format!("invalid base64 certificate: {}", e),
        })?;
        Ok(Self::from_der(der))
    }

    /// Encode an Ed25519 verifying key as a certificate.
    pub fn from_verifying_key(key: &VerifyingKey) -> TrustResult<Self> {
        use pkcs8::EncodePublicKey;
        let doc = key.to_public_key_der().map_err(|e| TrustError::Config {
            message: format!("failed to encode public key: {}", e),
        })?;
        Ok(Self::from_der(doc.as_bytes()))
    }

    /// Parse an SPKI PEM public key.
    pub fn from_pem(pem: &str) -> TrustResult<Self> {
        use pkcs8::DecodePublicKey;
        let key = VerifyingKey::from_public_key_pem(pem).map_err(|e| TrustError::Config {
            message: format!("invalid SPKI PEM public key: {}", e),
        })?;
        Self::from_verifying_key(&key)
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.der)
    }

    /// Key id: `sha256:<hex>` of the SPKI DER bytes.
    pub fn key_id(&self) -> String {
        sha256_bytes(&self.der)
    }

    /// Decode the Ed25519 verifying key.
    pub fn verifying_key(&self) -> TrustResult<VerifyingKey> {
        use pkcs8::DecodePublicKey;
        VerifyingKey::from_public_key_der(&self.der).map_err(|e| TrustError::Config {
            message: format!("invalid certificate {}: {}", self.key_id(), e),
        })
    }
}

impl fmt::Display for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key_id())
    }
}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Certificate").field(&self.key_id()).finish()
    }
}

impl TryFrom<String> for Certificate {
    type Error = TrustError;

    fn try_from(b64: String) -> TrustResult<Self> {
        Self::from_base64(&b64)
    }
}

impl From<Certificate> for String {
    fn from(cert: Certificate) -> Self {
        cert.to_base64()
    }
}

/// Certificate path for one signature on one artifact, leaf first.
///
/// Never empty: the leaf is required at construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignerChain {
    certificates: Vec<Certificate>,
}

impl SignerChain {
    pub fn new(leaf: Certificate, issuers: Vec<Certificate>) -> Self {
        let mut certificates = Vec::with_capacity(issuers.len() + 1);
        certificates.push(leaf);
        certificates.extend(issuers);
        Self { certificates }
    }

    /// A chain consisting of the leaf alone.
    pub fn leaf_only(leaf: Certificate) -> Self {
        Self::new(leaf, Vec::new())
    }

    /// The signer's own certificate.
    pub fn leaf(&self) -> &Certificate {
        &self.certificates[0]
    }

    pub fn issuers(&self) -> &[Certificate] {
        &self.certificates[1..]
    }

    pub fn certificates(&self) -> &[Certificate] {
        &self.certificates
    }
}

impl fmt::Display for SignerChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, cert) in self.certificates.iter().enumerate() {
            if i > 0 {
                f.write_str(" <- ")?;
            }
            write!(f, "{}", cert)?;
        }
        Ok(())
    }
}

/// DSSE envelope stored next to an artifact (`<artifact>.dsse.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DsseEnvelope {
    /// Payload type (e.g., "application/vnd.certgate.artifact-digest;v=1").
    #[serde(rename = "payloadType")]
    pub payload_type: String,

    /// Base64-encoded payload.
    pub payload: String,

    /// Signatures.
    pub signatures: Vec<DsseSignature>,
}

/// DSSE signature with the signer's certificate chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DsseSignature {
    /// Key ID of the leaf certificate.
    #[serde(rename = "keyid")]
    pub key_id: String,

    /// Base64-encoded signature.
    #[serde(rename = "sig")]
    pub signature: String,

    /// Base64 SPKI DER certificates, leaf first.
    #[serde(default)]
    pub chain: Vec<String>,
}

/// A persisted trust anchor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustAnchor {
    /// Key ID (sha256:...).
    pub key_id: String,

    /// Anchor certificate.
    pub certificate: Certificate,

    /// Human-readable label.
    #[serde(default)]
    pub label: Option<String>,

    /// When the anchor was added.
    #[serde(default)]
    pub added_at: Option<DateTime<Utc>>,
}

/// On-disk trust store document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustStoreFile {
    /// Schema version.
    pub version: u8,

    /// Recorded anchors.
    #[serde(default)]
    pub anchors: Vec<TrustAnchor>,
}

impl Default for TrustStoreFile {
    fn default() -> Self {
        Self {
            version: TRUST_STORE_FILE_VERSION,
            anchors: Vec::new(),
        }
    }
}

/// Current trust store file schema version.
pub const TRUST_STORE_FILE_VERSION: u8 = 1;
