//! SHA-256 digests in `sha256:<hex>` form.

use std::path::Path;

use sha2::{Digest, Sha256};
use tokio::fs::File;
use tokio::io::AsyncReadExt;

const PREFIX: &str = "sha256:";
const CHUNK: usize = 64 * 1024;

pub(crate) fn sha256_bytes(bytes: &[u8]) -> String {
    format!("{}{}", PREFIX, hex::encode(Sha256::digest(bytes)))
}

/// Hash a file without loading it whole.
pub(crate) async fn sha256_file(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0_u8; CHUNK];

    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(format!("{}{}", PREFIX, hex::encode(hasher.finalize())))
}
