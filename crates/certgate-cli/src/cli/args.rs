use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "certgate",
    version,
    about = "Pre-flight signature and trust gate for provisioning operations"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Check a batch of artifacts before they are installed
    Check(CheckArgs),
    /// Generate ed25519 keypair for signing
    Keygen(KeygenArgs),
    /// Sign an artifact (writes a DSSE sidecar next to it)
    Sign(SignArgs),
    /// Manage trust anchors
    Trust(TrustArgs),
    Version,
}

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// Artifacts in the batch
    #[arg(required = true)]
    pub artifacts: Vec<PathBuf>,

    /// Unsigned-content policy: allow, fail or prompt
    #[arg(long)]
    pub policy: Option<String>,

    /// Accept unsigned content and every presented signer without asking
    #[arg(long, short = 'y', conflicts_with = "no_prompt")]
    pub yes: bool,

    /// Register no consent provider
    #[arg(long)]
    pub no_prompt: bool,

    /// Fail when consent is needed but nobody can be asked
    #[arg(long)]
    pub strict: bool,

    /// Trust store file
    #[arg(long, env = "CERTGATE_TRUST_STORE")]
    pub trust_store: Option<PathBuf>,

    /// YAML config file
    #[arg(long, env = "CERTGATE_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct KeygenArgs {
    /// Output directory for keypair files
    #[arg(long, default_value = ".")]
    pub out: PathBuf,

    /// Force overwrite existing files
    #[arg(long, short)]
    pub force: bool,
}

#[derive(Args, Debug, Clone)]
pub struct SignArgs {
    /// Artifact to sign
    pub artifact: PathBuf,

    /// Private key file (PKCS#8 PEM)
    #[arg(long, short)]
    pub key: PathBuf,

    /// Issuer certificate (SPKI PEM), appended to the chain in order.
    /// Shown to the operator only; trust is decided on the signing key.
    #[arg(long = "issuer")]
    pub issuers: Vec<PathBuf>,

    /// Add a signature to an existing sidecar instead of replacing it
    #[arg(long)]
    pub append: bool,
}

#[derive(Args, Debug, Clone)]
pub struct TrustArgs {
    #[command(subcommand)]
    pub cmd: TrustSub,

    /// Trust store file
    #[arg(long, global = true, env = "CERTGATE_TRUST_STORE")]
    pub trust_store: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum TrustSub {
    /// List trust anchors
    List(TrustListArgs),
    /// Trust a public key (SPKI PEM)
    Add(TrustAddArgs),
    /// Remove a trust anchor by key id
    Remove(TrustRemoveArgs),
}

#[derive(Args, Debug, Clone)]
pub struct TrustListArgs {
    /// Print anchors as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct TrustAddArgs {
    /// Public key file (SPKI PEM)
    pub pem: PathBuf,

    /// Human-readable label (defaults to the key id)
    #[arg(long)]
    pub label: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct TrustRemoveArgs {
    /// Key id (`sha256:<hex>`)
    pub key_id: String,
}
