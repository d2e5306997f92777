//! `certgate trust` - manage trust anchors.

use anyhow::{Context, Result};
use certgate::{Certificate, FileTrustStore, GateConfig, TrustOracle};
use std::path::PathBuf;

use crate::cli::args::{TrustAddArgs, TrustArgs, TrustListArgs, TrustRemoveArgs, TrustSub};
use crate::exit_codes::{CONFIG_ERROR, SUCCESS};

pub async fn run(args: TrustArgs) -> Result<i32> {
    let path = match store_path(args.trust_store) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("error: {e:#}");
            return Ok(CONFIG_ERROR);
        }
    };
    let store = match FileTrustStore::open(&path).await {
        Ok(store) => store,
        Err(e) => {
            eprintln!("error: {e}");
            return Ok(e.exit_code());
        }
    };

    match args.cmd {
        TrustSub::List(list) => cmd_list(&store, list).await,
        TrustSub::Add(add) => cmd_add(&store, add).await,
        TrustSub::Remove(remove) => cmd_remove(&store, remove).await,
    }
}

fn store_path(flag: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = flag {
        return Ok(path);
    }
    let config = GateConfig::from_env()?;
    Ok(config.trust_store_path()?)
}

async fn cmd_list(store: &FileTrustStore, args: TrustListArgs) -> Result<i32> {
    let anchors = store.list_anchors().await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&anchors)?);
        return Ok(SUCCESS);
    }

    if anchors.is_empty() {
        println!("No trust anchors in {}", store.path().display());
        return Ok(SUCCESS);
    }
    for anchor in &anchors {
        let added = anchor
            .added_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{}  {}  {}",
            anchor.key_id,
            added,
            anchor.label.as_deref().unwrap_or("-")
        );
    }
    Ok(SUCCESS)
}

async fn cmd_add(store: &FileTrustStore, args: TrustAddArgs) -> Result<i32> {
    let pem = std::fs::read_to_string(&args.pem)
        .with_context(|| format!("failed to read public key: {}", args.pem.display()))?;
    let certificate = match Certificate::from_pem(&pem) {
        Ok(certificate) => certificate,
        Err(e) => {
            eprintln!("error: {}: {e}", args.pem.display());
            return Ok(e.exit_code());
        }
    };

    let key_id = certificate.key_id();
    if store.store().is_trusted(&certificate).await {
        println!("already trusted: {key_id}");
        return Ok(SUCCESS);
    }

    let label = args.label.unwrap_or_else(|| key_id.clone());
    if let Err(e) = store.add_anchor(&certificate, &label).await {
        eprintln!("error: {e}");
        return Ok(e.exit_code());
    }
    println!("trusted: {key_id} ({label})");
    Ok(SUCCESS)
}

async fn cmd_remove(store: &FileTrustStore, args: TrustRemoveArgs) -> Result<i32> {
    match store.remove_anchor(&args.key_id).await {
        Ok(true) => {
            println!("removed: {}", args.key_id);
            Ok(SUCCESS)
        }
        Ok(false) => {
            eprintln!("error: no trust anchor with key id {}", args.key_id);
            Ok(CONFIG_ERROR)
        }
        Err(e) => {
            eprintln!("error: {e}");
            Ok(e.exit_code())
        }
    }
}
