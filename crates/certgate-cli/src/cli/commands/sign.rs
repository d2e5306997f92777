//! `certgate sign` - Sign an artifact.

use anyhow::{Context, Result};
use certgate::{add_signature, sidecar_path, sign_artifact, write_sidecar, Certificate, DsseEnvelope};
use ed25519_dalek::SigningKey;
use std::path::Path;

use crate::cli::args::SignArgs;
use crate::exit_codes::{CONFIG_ERROR, SUCCESS};

pub async fn cmd_sign(args: SignArgs) -> i32 {
    match run_sign(args).await {
        Ok(()) => SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            CONFIG_ERROR
        }
    }
}

async fn run_sign(args: SignArgs) -> Result<()> {
    let signing_key = load_private_key_pem(&args.key)?;

    let mut issuers = Vec::with_capacity(args.issuers.len());
    for path in &args.issuers {
        let pem = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read issuer: {}", path.display()))?;
        let certificate = Certificate::from_pem(&pem)
            .with_context(|| format!("invalid issuer certificate: {}", path.display()))?;
        issuers.push(certificate);
    }

    let content = tokio::fs::read(&args.artifact)
        .await
        .with_context(|| format!("failed to read artifact: {}", args.artifact.display()))?;

    let fresh = sign_artifact(&content, &signing_key, &issuers)?;
    let envelope = if args.append {
        let mut existing = read_sidecar(&args.artifact).await?;
        if existing.payload != fresh.payload || existing.payload_type != fresh.payload_type {
            anyhow::bail!(
                "existing signature does not cover the current content of {}",
                args.artifact.display()
            );
        }
        add_signature(&mut existing, &signing_key, &issuers)?;
        existing
    } else {
        fresh
    };

    let written = write_sidecar(&args.artifact, &envelope).await?;
    let leaf = Certificate::from_verifying_key(&signing_key.verifying_key())?;

    println!("Signed artifact:");
    println!("  Artifact:   {}", args.artifact.display());
    println!("  Signature:  {}", written.display());
    println!();
    println!("  key_id:     {}", leaf.key_id());
    println!("  chain:      {} certificate(s)", issuers.len() + 1);
    println!("  signatures: {}", envelope.signatures.len());

    Ok(())
}

fn load_private_key_pem(path: &Path) -> Result<SigningKey> {
    use pkcs8::DecodePrivateKey;

    let pem = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read private key: {}", path.display()))?;
    SigningKey::from_pkcs8_pem(&pem)
        .map_err(|e| anyhow::anyhow!("invalid PKCS#8 private key {}: {}", path.display(), e))
}

async fn read_sidecar(artifact: &Path) -> Result<DsseEnvelope> {
    let path = sidecar_path(artifact);
    let json = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("no existing signature to append to: {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("invalid signature file: {}", path.display()))
}
