//! `certgate check` - run the trust gate over a batch of artifacts.

use std::sync::Arc;

use anyhow::Result;
use certgate::{
    CertificateCheck, DsseVerifier, FileTrustStore, GateConfig, RunStatus, StaticConsent,
    TrustError, TrustServices, UnsignedPolicy,
};

use crate::cli::args::CheckArgs;
use crate::prompt::TerminalConsent;

pub async fn run(args: CheckArgs) -> Result<i32> {
    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => return Ok(report_error(&e)),
    };

    let store_path = match config.trust_store_path() {
        Ok(path) => path,
        Err(e) => return Ok(report_error(&e)),
    };
    let store = match FileTrustStore::open(&store_path).await {
        Ok(store) => store,
        Err(e) => return Ok(report_error(&e)),
    };
    tracing::debug!(
        trust_store = %store_path.display(),
        policy = %config.unsigned_policy(),
        "starting certificate check"
    );

    let mut services = TrustServices::new(
        Arc::new(DsseVerifier::new()),
        Arc::new(store),
        Arc::new(config.clone()),
    )
    .require_consent_provider(config.require_consent_provider);

    if args.yes {
        services = services.with_consent(Arc::new(StaticConsent::new()));
    } else if !args.no_prompt {
        services = services.with_consent(Arc::new(TerminalConsent::new()));
    }

    let mut check = CertificateCheck::new(services);
    check.extend(args.artifacts.iter().map(|p| p.as_path()));
    let count = check.len();

    let status = check.run().await;
    match &status {
        RunStatus::Ok => println!("ok: {count} artifact(s) may be installed"),
        RunStatus::Info(e) => {
            println!("ok: {count} artifact(s) may be installed");
            eprintln!("warning: {e}");
        }
        RunStatus::Cancelled(reason) => eprintln!("cancelled: {reason}"),
        RunStatus::Error(e) => eprintln!("error: {e}"),
    }

    Ok(status.exit_code())
}

/// Config file, then environment, then flags.
fn load_config(args: &CheckArgs) -> Result<GateConfig, TrustError> {
    let base = match &args.config {
        Some(path) => GateConfig::load(path)?,
        None => GateConfig::default(),
    };
    let mut config = base.merge_env();

    if let Some(policy) = &args.policy {
        let policy: UnsignedPolicy = policy.parse()?;
        config = config.with_unsigned_policy(policy);
    }
    if let Some(path) = &args.trust_store {
        config = config.with_trust_store(path);
    }
    if args.strict {
        config = config.with_require_consent_provider(true);
    }
    Ok(config)
}

fn report_error(e: &TrustError) -> i32 {
    eprintln!("error: {e}");
    e.exit_code()
}
