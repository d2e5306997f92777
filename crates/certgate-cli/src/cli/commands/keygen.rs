//! `certgate keygen` - create a signing identity.

use anyhow::{Context, Result};
use certgate::Certificate;
use ed25519_dalek::SigningKey;
use pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
use std::fs;
use std::path::Path;

use crate::cli::args::KeygenArgs;
use crate::exit_codes::{CONFIG_ERROR, SUCCESS};

pub const PRIVATE_KEY_FILE: &str = "private_key.pem";
pub const PUBLIC_KEY_FILE: &str = "public_key.pem";

pub fn cmd_keygen(args: KeygenArgs) -> i32 {
    match run_keygen(&args) {
        Ok(()) => SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            CONFIG_ERROR
        }
    }
}

fn run_keygen(args: &KeygenArgs) -> Result<()> {
    fs::create_dir_all(&args.out)
        .with_context(|| format!("cannot create {}", args.out.display()))?;

    let private_path = args.out.join(PRIVATE_KEY_FILE);
    let public_path = args.out.join(PUBLIC_KEY_FILE);
    if !args.force {
        if let Some(existing) = [&private_path, &public_path].into_iter().find(|p| p.exists()) {
            anyhow::bail!(
                "{} exists, refusing to replace a signing identity (use --force)",
                existing.display()
            );
        }
    }

    let signing_key = SigningKey::generate(&mut rand::thread_rng());
    let certificate = Certificate::from_verifying_key(&signing_key.verifying_key())?;

    let private_pem = signing_key
        .to_pkcs8_pem(LineEnding::LF)
        .context("cannot encode PKCS#8 private key")?;
    write_secret(&private_path, private_pem.as_bytes())?;

    let public_pem = signing_key
        .verifying_key()
        .to_public_key_pem(LineEnding::LF)
        .context("cannot encode SPKI public key")?;
    fs::write(&public_path, public_pem)
        .with_context(|| format!("cannot write {}", public_path.display()))?;

    println!("signing key:  {} (keep private, mode 0600)", private_path.display());
    println!("certificate:  {}", public_path.display());
    println!("key_id: {}", certificate.key_id());
    println!();
    println!(
        "Trust it elsewhere with: certgate trust add {}",
        public_path.display()
    );
    Ok(())
}

/// Write a file readable by the owner only.
fn write_secret(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes).with_context(|| format!("cannot write {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .with_context(|| format!("cannot restrict permissions on {}", path.display()))?;
    }
    Ok(())
}
