//! Trust anchor stores.
//!
//! The gate consults a [`TrustOracle`] to decide whether a signer chain is
//! already trusted and to record anchors the operator accepted. Anchors come
//! from:
//! - Pinned anchors (supplied by the embedding application, never removable)
//! - A trust store file ([`FileTrustStore`])
//! - Operator decisions persisted during a run

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::error::{TrustError, TrustResult};
use crate::types::{
    Certificate, SignerChain, TrustAnchor, TrustStoreFile, TRUST_STORE_FILE_VERSION,
};

/// Lookup and persistence of trust anchors.
#[async_trait]
pub trait TrustOracle: Send + Sync {
    /// Find the anchor that makes `chain` trusted, if any.
    ///
    /// Fails with [`TrustError::StoreConnection`] when the store cannot be
    /// consulted.
    async fn find_anchor(&self, chain: &SignerChain) -> TrustResult<Option<Certificate>>;

    /// Durably record `certificate` as a trust anchor.
    ///
    /// Fails with [`TrustError::StoreConnection`] or
    /// [`TrustError::StoreSecurity`].
    async fn add_anchor(&self, certificate: &Certificate, label: &str) -> TrustResult<()>;
}

/// In-memory trust store.
#[derive(Debug, Clone)]
pub struct TrustStore {
    inner: Arc<RwLock<TrustStoreInner>>,
}

#[derive(Debug, Default)]
struct TrustStoreInner {
    /// Key ID -> anchor certificate
    anchors: BTreeMap<String, Certificate>,

    /// Key ID -> metadata
    metadata: BTreeMap<String, AnchorMetadata>,
}

/// Metadata for a trust anchor.
#[derive(Debug, Clone)]
pub struct AnchorMetadata {
    /// Human-readable label.
    pub label: Option<String>,

    /// When the anchor was added.
    pub added_at: Option<DateTime<Utc>>,

    /// Whether this is a pinned anchor.
    pub is_pinned: bool,
}

impl TrustStore {
    /// Create an empty trust store.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(TrustStoreInner::default())),
        }
    }

    /// Create a trust store with pinned anchors.
    ///
    /// Pinned anchors are always trusted and cannot be removed.
    pub async fn with_pinned_anchors(anchors: Vec<Certificate>) -> Self {
        let store = Self::new();
        for anchor in anchors {
            store.add_pinned_anchor(anchor).await;
        }
        store
    }

    /// Add a pinned anchor.
    pub async fn add_pinned_anchor(&self, certificate: Certificate) {
        let key_id = certificate.key_id();
        let mut inner = self.inner.write().await;
        inner.anchors.insert(key_id.clone(), certificate);
        inner.metadata.insert(
            key_id,
            AnchorMetadata {
                label: None,
                added_at: Some(Utc::now()),
                is_pinned: true,
            },
        );
    }

    /// Add an anchor. Re-adding a known anchor keeps its original metadata.
    pub async fn insert(&self, anchor: TrustAnchor) {
        let mut inner = self.inner.write().await;
        if inner.anchors.contains_key(&anchor.key_id) {
            return;
        }
        inner
            .anchors
            .insert(anchor.key_id.clone(), anchor.certificate);
        inner.metadata.insert(
            anchor.key_id,
            AnchorMetadata {
                label: anchor.label,
                added_at: anchor.added_at,
                is_pinned: false,
            },
        );
    }

    /// Remove a non-pinned anchor. Returns whether it was present.
    pub async fn remove(&self, key_id: &str) -> TrustResult<bool> {
        let mut inner = self.inner.write().await;
        if inner.metadata.get(key_id).is_some_and(|m| m.is_pinned) {
            return Err(TrustError::store_security(format!(
                "pinned anchor cannot be removed: {}",
                key_id
            )));
        }
        inner.metadata.remove(key_id);
        Ok(inner.anchors.remove(key_id).is_some())
    }

    /// Check if a certificate is a trust anchor.
    pub async fn is_trusted(&self, certificate: &Certificate) -> bool {
        let inner = self.inner.read().await;
        inner
            .anchors
            .get(&certificate.key_id())
            .is_some_and(|anchor| anchor == certificate)
    }

    /// All anchors, ordered by key id. Pinned anchors included.
    pub async fn list_anchors(&self) -> Vec<TrustAnchor> {
        let inner = self.inner.read().await;
        inner
            .anchors
            .iter()
            .map(|(key_id, certificate)| {
                let meta = inner.metadata.get(key_id);
                TrustAnchor {
                    key_id: key_id.clone(),
                    certificate: certificate.clone(),
                    label: meta.and_then(|m| m.label.clone()),
                    added_at: meta.and_then(|m| m.added_at),
                }
            })
            .collect()
    }

    /// Look up one anchor by key id.
    pub async fn anchor(&self, key_id: &str) -> Option<TrustAnchor> {
        let inner = self.inner.read().await;
        let certificate = inner.anchors.get(key_id)?;
        let meta = inner.metadata.get(key_id);
        Some(TrustAnchor {
            key_id: key_id.to_string(),
            certificate: certificate.clone(),
            label: meta.and_then(|m| m.label.clone()),
            added_at: meta.and_then(|m| m.added_at),
        })
    }

    /// Get metadata for an anchor.
    pub async fn get_metadata(&self, key_id: &str) -> Option<AnchorMetadata> {
        let inner = self.inner.read().await;
        inner.metadata.get(key_id).cloned()
    }

    async fn persistent_anchors(&self) -> Vec<TrustAnchor> {
        let pinned: Vec<String> = {
            let inner = self.inner.read().await;
            inner
                .metadata
                .iter()
                .filter(|(_, m)| m.is_pinned)
                .map(|(k, _)| k.clone())
                .collect()
        };
        self.list_anchors()
            .await
            .into_iter()
            .filter(|a| !pinned.contains(&a.key_id))
            .collect()
    }
}

impl Default for TrustStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TrustOracle for TrustStore {
    /// Only the leaf is looked up. Issuer certificates in a sidecar are not
    /// signature-checked, so an issuer match says nothing about the signer.
    async fn find_anchor(&self, chain: &SignerChain) -> TrustResult<Option<Certificate>> {
        let leaf = chain.leaf();
        Ok(self.is_trusted(leaf).await.then(|| leaf.clone()))
    }

    async fn add_anchor(&self, certificate: &Certificate, label: &str) -> TrustResult<()> {
        self.insert(TrustAnchor {
            key_id: certificate.key_id(),
            certificate: certificate.clone(),
            label: Some(label.to_string()),
            added_at: Some(Utc::now()),
        })
        .await;
        Ok(())
    }
}

/// Trust store backed by a JSON file.
///
/// The file is loaded once on [`FileTrustStore::open`]; every change is
/// written back with write-then-rename.
#[derive(Debug, Clone)]
pub struct FileTrustStore {
    path: PathBuf,
    store: TrustStore,
    write_lock: Arc<Mutex<()>>,
}

impl FileTrustStore {
    /// Open a trust store file. A missing file is an empty store.
    pub async fn open(path: impl Into<PathBuf>) -> TrustResult<Self> {
        Self::open_with(path, TrustStore::new()).await
    }

    /// Open a trust store file on top of an existing (e.g. pinned) store.
    pub async fn open_with(path: impl Into<PathBuf>, store: TrustStore) -> TrustResult<Self> {
        let path = path.into();
        for anchor in load_anchors(&path).await? {
            store.insert(anchor).await;
        }
        debug!(path = %path.display(), "opened trust store");
        Ok(Self {
            path,
            store,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The in-memory view of this store.
    pub fn store(&self) -> &TrustStore {
        &self.store
    }

    pub async fn list_anchors(&self) -> Vec<TrustAnchor> {
        self.store.list_anchors().await
    }

    /// Remove an anchor and persist. Returns whether it was present.
    ///
    /// If the file cannot be written the anchor stays in memory.
    pub async fn remove_anchor(&self, key_id: &str) -> TrustResult<bool> {
        let _guard = self.write_lock.lock().await;
        let Some(anchor) = self.store.anchor(key_id).await else {
            return Ok(false);
        };
        self.store.remove(key_id).await?;
        if let Err(e) = self.persist().await {
            warn!(key_id = %key_id, error = %e, "restoring anchor after failed write");
            self.store.insert(anchor).await;
            return Err(e);
        }
        Ok(true)
    }

    async fn persist(&self) -> TrustResult<()> {
        let document = TrustStoreFile {
            version: TRUST_STORE_FILE_VERSION,
            anchors: self.store.persistent_anchors().await,
        };
        let json = serde_json::to_string_pretty(&document)
            .map_err(|e| TrustError::store_connection(format!("failed to serialize trust store: {}", e)))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    TrustError::store_connection(format!(
                        "failed to create {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }
        write_atomic(&self.path, &json).await?;
        debug!(path = %self.path.display(), anchors = document.anchors.len(), "wrote trust store");
        Ok(())
    }
}

#[async_trait]
impl TrustOracle for FileTrustStore {
    async fn find_anchor(&self, chain: &SignerChain) -> TrustResult<Option<Certificate>> {
        self.store.find_anchor(chain).await
    }

    async fn add_anchor(&self, certificate: &Certificate, label: &str) -> TrustResult<()> {
        certificate.verifying_key().map_err(|e| {
            TrustError::store_security(format!("refusing to store invalid certificate: {}", e))
        })?;

        let key_id = certificate.key_id();
        let _guard = self.write_lock.lock().await;
        if self.store.anchor(&key_id).await.is_some() {
            return Ok(());
        }
        self.store.add_anchor(certificate, label).await?;
        if let Err(e) = self.persist().await {
            warn!(key_id = %key_id, error = %e, "dropping anchor after failed write");
            self.store.remove(&key_id).await?;
            return Err(e);
        }
        Ok(())
    }
}

async fn load_anchors(path: &Path) -> TrustResult<Vec<TrustAnchor>> {
    let raw = match fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(TrustError::store_connection(format!(
                "failed to read {}: {}",
                path.display(),
                e
            )))
        }
    };

    let document: TrustStoreFile = serde_json::from_str(&raw).map_err(|e| {
        TrustError::store_security(format!("invalid trust store {}: {}", path.display(), e))
    })?;

    if document.version != TRUST_STORE_FILE_VERSION {
        return Err(TrustError::store_security(format!(
            "unsupported trust store version {} in {}",
            document.version,
            path.display()
        )));
    }

    for anchor in &document.anchors {
        let computed = anchor.certificate.key_id();
        if computed != anchor.key_id {
            return Err(TrustError::store_security(format!(
                "key_id mismatch: claimed {}, computed {}",
                anchor.key_id, computed
            )));
        }
    }

    Ok(document.anchors)
}

async fn write_atomic(path: &Path, content: &str) -> TrustResult<()> {
    let temp_path = path.with_extension("tmp");

    fs::write(&temp_path, content)
        .await
        .map_err(|e| TrustError::store_connection(format!("failed to write temp file: {}", e)))?;

    fs::rename(&temp_path, path)
        .await
        .map_err(|e| TrustError::store_connection(format!("failed to rename temp file: {}", e)))?;

    Ok(())
}
