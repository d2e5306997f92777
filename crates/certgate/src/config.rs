//! Gate configuration.
//!
//! Sources, lowest precedence first: defaults, YAML file, environment.
//! Callers apply command-line overrides on top with the `with_*` builders.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{TrustError, TrustResult};
use crate::policy::{ConfigSource, UnsignedPolicy, UNSIGNED_POLICY_ENV, UNSIGNED_POLICY_KEY};

/// Environment variable naming a YAML config file.
pub const CONFIG_ENV: &str = "CERTGATE_CONFIG";

/// Environment variable overriding the trust store location.
pub const TRUST_STORE_ENV: &str = "CERTGATE_TRUST_STORE";

/// Environment variable enabling strict consent mode.
pub const REQUIRE_CONSENT_ENV: &str = "CERTGATE_REQUIRE_CONSENT";

/// Trust gate configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GateConfig {
    /// Raw unsigned-content policy value (`allow`, `fail`, `prompt`).
    #[serde(default)]
    pub unsigned_policy: Option<String>,

    /// Trust store file.
    #[serde(default)]
    pub trust_store: Option<PathBuf>,

    /// Fail instead of auto-approving when no consent provider is registered.
    #[serde(default)]
    pub require_consent_provider: bool,
}

impl GateConfig {
    /// Load configuration from a YAML file.
    pub fn load(path: &Path) -> TrustResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| TrustError::Config {
            message: format!("failed to read config {}: {}", path.display(), e),
        })?;
        serde_yaml::from_str(&raw).map_err(|e| TrustError::Config {
            message: format!("invalid config {}: {}", path.display(), e),
        })
    }

    /// Create config from environment variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `CERTGATE_CONFIG` | YAML config file loaded first |
    /// | `CERTGATE_UNSIGNED_POLICY` | `allow`, `fail` or `prompt` |
    /// | `CERTGATE_TRUST_STORE` | Trust store file |
    /// | `CERTGATE_REQUIRE_CONSENT` | `1`/`true` enables strict consent mode |
    pub fn from_env() -> TrustResult<Self> {
        let base = match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::load(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        Ok(base.merge_env())
    }

    /// Overlay environment variables onto this config.
    pub fn merge_env(mut self) -> Self {
        if let Ok(policy) = std::env::var(UNSIGNED_POLICY_ENV) {
            self.unsigned_policy = Some(policy);
        }
        if let Ok(path) = std::env::var(TRUST_STORE_ENV) {
            self.trust_store = Some(PathBuf::from(path));
        }
        if let Ok(v) = std::env::var(REQUIRE_CONSENT_ENV) {
            self.require_consent_provider = v == "1" || v.eq_ignore_ascii_case("true");
        }
        self
    }

    /// Set the unsigned policy.
    pub fn with_unsigned_policy(mut self, policy: UnsignedPolicy) -> Self {
        self.unsigned_policy = Some(policy.as_str().to_string());
        self
    }

    /// Set the trust store path.
    pub fn with_trust_store(mut self, path: impl Into<PathBuf>) -> Self {
        self.trust_store = Some(path.into());
        self
    }

    /// Require a consent provider.
    pub fn with_require_consent_provider(mut self, require: bool) -> Self {
        self.require_consent_provider = require;
        self
    }

    /// Effective unsigned policy.
    pub fn unsigned_policy(&self) -> UnsignedPolicy {
        UnsignedPolicy::resolve(self)
    }

    /// Configured trust store path, or the per-user default.
    pub fn trust_store_path(&self) -> TrustResult<PathBuf> {
        match &self.trust_store {
            Some(path) => Ok(path.clone()),
            None => default_trust_store_path(),
        }
    }
}

impl ConfigSource for GateConfig {
    fn get(&self, key: &str) -> Option<String> {
        match key {
            UNSIGNED_POLICY_KEY => self.unsigned_policy.clone(),
            _ => None,
        }
    }
}

/// Default trust store: `<config dir>/certgate/trust-store.json`.
pub fn default_trust_store_path() -> TrustResult<PathBuf> {
    let base = dirs::config_dir()
        .or_else(dirs::home_dir)
        .ok_or_else(|| TrustError::Config {
            message: "could not determine config directory".to_string(),
        })?;

    Ok(base.join("certgate").join("trust-store.json"))
}
