//! Artifact signature classification.
//!
//! The gate only sees [`SignatureVerifier`]. [`DsseVerifier`] is the bundled
//! implementation: each artifact may carry a DSSE envelope sidecar
//! (`<artifact>.dsse.json`) whose payload is the artifact's SHA-256 digest
//! and whose signatures are Ed25519 over the DSSE PAE.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier};
use tokio::fs;

use crate::digest::{sha256_bytes, sha256_file};
use crate::error::{TrustError, TrustResult};
use crate::types::{Artifact, Certificate, DsseEnvelope, DsseSignature, SignerChain};

/// Payload type for artifact digest statements (DSSE-style binding).
pub const PAYLOAD_TYPE_ARTIFACT_V1: &str = "application/vnd.certgate.artifact-digest;v=1";

/// Suffix appended to an artifact path to locate its signature envelope.
pub const SIDECAR_SUFFIX: &str = ".dsse.json";

/// Signature status of one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedContent {
    /// Whether the artifact carries a valid signature.
    pub signed: bool,

    /// One chain per signer; empty when unsigned.
    pub chains: Vec<SignerChain>,
}

impl SignedContent {
    pub fn unsigned() -> Self {
        Self {
            signed: false,
            chains: Vec::new(),
        }
    }

    pub fn signed(chains: Vec<SignerChain>) -> Self {
        Self {
            signed: true,
            chains,
        }
    }
}

/// Classifies artifacts as signed or unsigned.
///
/// Errors are [`TrustError::Verification`] when content cannot be validated
/// as signed content and [`TrustError::Io`] when it cannot be read. Valid
/// content without a signature is not an error.
#[async_trait]
pub trait SignatureVerifier: Send + Sync {
    async fn classify(&self, artifact: &Artifact) -> TrustResult<SignedContent>;
}

/// Verifies DSSE sidecar envelopes next to artifact files.
#[derive(Debug, Clone, Default)]
pub struct DsseVerifier;

impl DsseVerifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SignatureVerifier for DsseVerifier {
    async fn classify(&self, artifact: &Artifact) -> TrustResult<SignedContent> {
        let digest = sha256_file(artifact.path()).await.map_err(|e| TrustError::Io {
            artifact: artifact.to_string(),
            message: e.to_string(),
        })?;

        let sidecar = sidecar_path(artifact.path());
        let raw = match fs::read(&sidecar).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(SignedContent::unsigned());
            }
            Err(e) => {
                return Err(TrustError::Io {
                    artifact: artifact.to_string(),
                    message: format!("failed to read {}: {}", sidecar.display(), e),
                });
            }
        };

        let envelope: DsseEnvelope = serde_json::from_slice(&raw)
            .map_err(|e| TrustError::verification(artifact, format!("invalid DSSE envelope: {}", e)))?;

        let chains = verify_envelope(&digest, &envelope).map_err(|reason| {
            TrustError::verification(artifact, reason)
        })?;

        Ok(SignedContent::signed(chains))
    }
}

/// Sidecar location for an artifact.
pub fn sidecar_path(artifact: &Path) -> PathBuf {
    let mut name = artifact.as_os_str().to_os_string();
    name.push(SIDECAR_SUFFIX);
    PathBuf::from(name)
}

/// Compute the `sha256:<hex>` digest of artifact bytes.
pub fn compute_digest(content: &[u8]) -> String {
    sha256_bytes(content)
}

/// Build DSSE Pre-Authentication Encoding (PAE).
///
/// ```text
/// PAE(type, payload) = "DSSEv1" SP LEN(type) SP type SP LEN(payload) SP payload
/// ```
pub fn build_pae(payload_type: &str, payload: &[u8]) -> Vec<u8> {
    let type_len = payload_type.len().to_string();
    let payload_len = payload.len().to_string();

    let mut pae = Vec::new();
    pae.extend_from_slice(b"DSSEv1 ");
    pae.extend_from_slice(type_len.as_bytes());
    pae.push(b' ');
    pae.extend_from_slice(payload_type.as_bytes());
    pae.push(b' ');
    pae.extend_from_slice(payload_len.as_bytes());
    pae.push(b' ');
    pae.extend_from_slice(payload);
    pae
}

/// Verify every signature in the envelope against the artifact digest.
///
/// Returns one chain per signature, in envelope order.
fn verify_envelope(digest: &str, envelope: &DsseEnvelope) -> Result<Vec<SignerChain>, String> {
    if envelope.payload_type != PAYLOAD_TYPE_ARTIFACT_V1 {
        return Err(format!(
            "payload type mismatch: expected {}, got {}",
            PAYLOAD_TYPE_ARTIFACT_V1, envelope.payload_type
        ));
    }

    let payload = BASE64
        .decode(&envelope.payload)
        .map_err(|e| format!("invalid base64 payload: {}", e))?;

    if payload != digest.as_bytes() {
        return Err(format!(
            "digest mismatch: envelope covers {}, artifact is {}",
            String::from_utf8_lossy(&payload),
            digest
        ));
    }

    if envelope.signatures.is_empty() {
        return Err("no signatures in envelope".to_string());
    }

    let pae = build_pae(&envelope.payload_type, &payload);
    envelope
        .signatures
        .iter()
        .map(|sig| verify_single_signature(&pae, sig))
        .collect()
}

fn verify_single_signature(pae: &[u8], sig: &DsseSignature) -> Result<SignerChain, String> {
    let mut certificates = sig
        .chain
        .iter()
        .map(|b64| Certificate::from_base64(b64).map_err(|e| e.to_string()))
        .collect::<Result<Vec<_>, _>>()?;

    if certificates.is_empty() {
        return Err(format!("signature {} has no certificate chain", sig.key_id));
    }
    let leaf = certificates.remove(0);

    if leaf.key_id() != sig.key_id {
        return Err(format!(
            "key_id mismatch: claimed {}, leaf certificate is {}",
            sig.key_id,
            leaf.key_id()
        ));
    }

    let key = leaf
        .verifying_key()
        .map_err(|e| format!("invalid leaf certificate {}: {}", sig.key_id, e))?;

    let signature_bytes = BASE64
        .decode(&sig.signature)
        .map_err(|e| format!("invalid base64 signature: {}", e))?;
    let signature = Signature::from_slice(&signature_bytes)
        .map_err(|e| format!("invalid signature bytes: {}", e))?;

    key.verify(pae, &signature)
        .map_err(|_| format!("ed25519 verification failed for {}", sig.key_id))?;

    Ok(SignerChain::new(leaf, certificates))
}

/// Sign artifact content, producing a single-signature envelope.
///
/// `issuers` are appended after the signer's own certificate in the chain.
pub fn sign_artifact(
    content: &[u8],
    signing_key: &SigningKey,
    issuers: &[Certificate],
) -> TrustResult<DsseEnvelope> {
    let mut envelope = DsseEnvelope {
        payload_type: PAYLOAD_TYPE_ARTIFACT_V1.to_string(),
        payload: BASE64.encode(compute_digest(content)),
        signatures: Vec::new(),
    };
    add_signature(&mut envelope, signing_key, issuers)?;
    Ok(envelope)
}

/// Append another signer to an existing envelope.
pub fn add_signature(
    envelope: &mut DsseEnvelope,
    signing_key: &SigningKey,
    issuers: &[Certificate],
) -> TrustResult<()> {
    let payload = BASE64
        .decode(&envelope.payload)
        .map_err(|e| TrustError::Config {
            message: format!("invalid base64 payload: {}", e),
        })?;
    let pae = build_pae(&envelope.payload_type, &payload);

    let leaf = Certificate::from_verifying_key(&signing_key.verifying_key())?;
    let signature = signing_key.sign(&pae);

    let mut chain = vec![leaf.to_base64()];
    chain.extend(issuers.iter().map(Certificate::to_base64));

    envelope.signatures.push(DsseSignature {
        key_id: leaf.key_id(),
        signature: BASE64.encode(signature.to_bytes()),
        chain,
    });
    Ok(())
}

/// Write an envelope to the artifact's sidecar path.
pub async fn write_sidecar(artifact: &Path, envelope: &DsseEnvelope) -> TrustResult<PathBuf> {
    let path = sidecar_path(artifact);
    let json = serde_json::to_string_pretty(envelope).map_err(|e| TrustError::Config {
        message: format!("failed to serialize envelope: {}", e),
    })?;
    fs::write(&path, json).await.map_err(|e| TrustError::Io {
        artifact: artifact.display().to_string(),
        message: format!("failed to write {}: {}", path.display(), e),
    })?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn generate_keypair() -> SigningKey {
        SigningKey::generate(&mut rand::thread_rng())
    }

    async fn write_artifact(dir: &TempDir, name: &str, content: &[u8]) -> Artifact {
        let path = dir.path().join(name);
        fs::write(&path, content).await.unwrap();
        Artifact::new(path)
    }

    #[test]
    fn test_build_pae() {
        let pae = build_pae("application/example", b"hello world");
        let expected = b"DSSEv1 19 application/example 11 hello world";
        assert_eq!(pae, expected.to_vec());
    }

    #[test]
    fn test_sidecar_path_appends_suffix() {
        assert_eq!(
            sidecar_path(Path::new("/plugins/a-1.0.jar")),
            PathBuf::from("/plugins/a-1.0.jar.dsse.json")
        );
    }

    #[tokio::test]
    async fn test_missing_sidecar_is_unsigned() {
        let dir = TempDir::new().unwrap();
        let artifact = write_artifact(&dir, "plain.jar", b"no signature").await;

        let content = DsseVerifier::new().classify(&artifact).await.unwrap();
        assert_eq!(content, SignedContent::unsigned());
    }

    #[tokio::test]
    async fn test_missing_artifact_is_io_error() {
        let dir = TempDir::new().unwrap();
        let artifact = Artifact::new(dir.path().join("gone.jar"));

        let err = DsseVerifier::new().classify(&artifact).await.unwrap_err();
        assert!(matches!(err, TrustError::Io { .. }));
    }

    #[tokio::test]
    async fn test_signed_artifact_yields_chain() {
        let dir = TempDir::new().unwrap();
        let content = b"bundle bytes";
        let artifact = write_artifact(&dir, "signed.jar", content).await;

        let signer = generate_keypair();
        let issuer =
            Certificate::from_verifying_key(&generate_keypair().verifying_key()).unwrap();
        let envelope = sign_artifact(content, &signer, &[issuer.clone()]).unwrap();
        write_sidecar(artifact.path(), &envelope).await.unwrap();

        let result = DsseVerifier::new().classify(&artifact).await.unwrap();
        assert!(result.signed);
        assert_eq!(result.chains.len(), 1);

        let chain = &result.chains[0];
        let leaf = Certificate::from_verifying_key(&signer.verifying_key()).unwrap();
        assert_eq!(chain.leaf(), &leaf);
        assert_eq!(chain.issuers(), &[issuer]);
    }

    #[tokio::test]
    async fn test_multiple_signers_yield_chain_per_signature() {
        let dir = TempDir::new().unwrap();
        let content = b"co-signed";
        let artifact = write_artifact(&dir, "cosigned.jar", content).await;

        let first = generate_keypair();
        let second = generate_keypair();
        let mut envelope = sign_artifact(content, &first, &[]).unwrap();
        add_signature(&mut envelope, &second, &[]).unwrap();
        write_sidecar(artifact.path(), &envelope).await.unwrap();

        let result = DsseVerifier::new().classify(&artifact).await.unwrap();
        assert_eq!(result.chains.len(), 2);
        assert_eq!(
            result.chains[1].leaf(),
            &Certificate::from_verifying_key(&second.verifying_key()).unwrap()
        );
    }

    #[tokio::test]
    async fn test_tampered_artifact_is_verification_error() {
        let dir = TempDir::new().unwrap();
        let artifact = write_artifact(&dir, "tampered.jar", b"original").await;

        let envelope = sign_artifact(b"original", &generate_keypair(), &[]).unwrap();
        write_sidecar(artifact.path(), &envelope).await.unwrap();
        fs::write(artifact.path(), b"modified").await.unwrap();

        let err = DsseVerifier::new().classify(&artifact).await.unwrap_err();
        assert!(matches!(err, TrustError::Verification { .. }));
    }

    #[tokio::test]
    async fn test_forged_signature_is_verification_error() {
        let dir = TempDir::new().unwrap();
        let content = b"payload";
        let artifact = write_artifact(&dir, "forged.jar", content).await;

        let mut envelope = sign_artifact(content, &generate_keypair(), &[]).unwrap();
        let other = sign_artifact(b"different", &generate_keypair(), &[]).unwrap();
        envelope.signatures[0].signature = other.signatures[0].signature.clone();
        write_sidecar(artifact.path(), &envelope).await.unwrap();

        let err = DsseVerifier::new().classify(&artifact).await.unwrap_err();
        match err {
            TrustError::Verification { reason, .. } => {
                assert!(reason.contains("ed25519 verification failed"), "{}", reason)
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_key_id_mismatch_is_verification_error() {
        let dir = TempDir::new().unwrap();
        let content = b"payload";
        let artifact = write_artifact(&dir, "mislabeled.jar", content).await;

        let mut envelope = sign_artifact(content, &generate_keypair(), &[]).unwrap();
        envelope.signatures[0].key_id =
            "sha256:0000000000000000000000000000000000000000000000000000000000000000".to_string();
        write_sidecar(artifact.path(), &envelope).await.unwrap();

        let err = DsseVerifier::new().classify(&artifact).await.unwrap_err();
        assert!(matches!(err, TrustError::Verification { .. }));
    }

    #[tokio::test]
    async fn test_malformed_sidecar_is_verification_error() {
        let dir = TempDir::new().unwrap();
        let artifact = write_artifact(&dir, "broken.jar", b"payload").await;
        fs::write(sidecar_path(artifact.path()), b"{not json")
            .await
            .unwrap();

        let err = DsseVerifier::new().classify(&artifact).await.unwrap_err();
        assert!(matches!(err, TrustError::Verification { .. }));
    }

    #[tokio::test]
    async fn test_empty_signature_list_is_verification_error() {
        let dir = TempDir::new().unwrap();
        let content = b"payload";
        let artifact = write_artifact(&dir, "empty.jar", content).await;

        let mut envelope = sign_artifact(content, &generate_keypair(), &[]).unwrap();
        envelope.signatures.clear();
        write_sidecar(artifact.path(), &envelope).await.unwrap();

        let err = DsseVerifier::new().classify(&artifact).await.unwrap_err();
        assert!(matches!(err, TrustError::Verification { .. }));
    }

    #[tokio::test]
    async fn test_wrong_payload_type_is_verification_error() {
        let dir = TempDir::new().unwrap();
        let content = b"payload";
        let artifact = write_artifact(&dir, "typed.jar", content).await;

        let mut envelope = sign_artifact(content, &generate_keypair(), &[]).unwrap();
        envelope.payload_type = "application/vnd.other+json".to_string();
        write_sidecar(artifact.path(), &envelope).await.unwrap();

        let err = DsseVerifier::new().classify(&artifact).await.unwrap_err();
        assert!(matches!(err, TrustError::Verification { .. }));
    }
}
