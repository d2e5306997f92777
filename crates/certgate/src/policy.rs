//! Unsigned-content policy resolution.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TrustError;

/// Configuration key holding the unsigned-content policy.
pub const UNSIGNED_POLICY_KEY: &str = "certgate.unsignedPolicy";

/// Environment variable read by [`EnvConfig`] for [`UNSIGNED_POLICY_KEY`].
pub const UNSIGNED_POLICY_ENV: &str = "CERTGATE_UNSIGNED_POLICY";

/// Source of string-valued configuration lookups.
pub trait ConfigSource: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

impl ConfigSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

/// Reads configuration keys from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvConfig;

impl ConfigSource for EnvConfig {
    fn get(&self, key: &str) -> Option<String> {
        match key {
            UNSIGNED_POLICY_KEY => std::env::var(UNSIGNED_POLICY_ENV).ok(),
            _ => None,
        }
    }
}

/// How unsigned artifacts are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnsignedPolicy {
    /// Unsigned content passes without asking.
    Allow,
    /// Any unsigned content fails the run.
    Fail,
    /// Unsigned content is listed in the consent request.
    #[default]
    Prompt,
}

impl UnsignedPolicy {
    /// Resolve the policy from configuration.
    ///
    /// Values match exactly (`allow`, `fail`, `prompt`); anything else,
    /// including a missing key, resolves to [`UnsignedPolicy::Prompt`].
    pub fn resolve(config: &dyn ConfigSource) -> Self {
        match config.get(UNSIGNED_POLICY_KEY) {
            Some(value) => value.parse().unwrap_or_else(|_| {
                tracing::debug!(value = %value, "unrecognized unsigned policy, using prompt");
                Self::Prompt
            }),
            None => Self::Prompt,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Fail => "fail",
            Self::Prompt => "prompt",
        }
    }
}

impl fmt::Display for UnsignedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnsignedPolicy {
    type Err = TrustError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "allow" => Ok(Self::Allow),
            "fail" => Ok(Self::Fail),
            "prompt" => Ok(Self::Prompt),
            other => Err(TrustError::Config {
                message: format!(
                    "unknown unsigned policy '{}' (expected allow, fail or prompt)",
                    other
                ),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn config(value: Option<&str>) -> HashMap<String, String> {
        let mut map = HashMap::new();
        if let Some(v) = value {
            map.insert(UNSIGNED_POLICY_KEY.to_string(), v.to_string());
        }
        map
    }

    #[test]
    fn test_resolve_recognized_values() {
        assert_eq!(UnsignedPolicy::resolve(&config(Some("allow"))), UnsignedPolicy::Allow);
        assert_eq!(UnsignedPolicy::resolve(&config(Some("fail"))), UnsignedPolicy::Fail);
        assert_eq!(UnsignedPolicy::resolve(&config(Some("prompt"))), UnsignedPolicy::Prompt);
    }

    #[test]
    fn test_resolve_defaults_to_prompt() {
        assert_eq!(UnsignedPolicy::resolve(&config(None)), UnsignedPolicy::Prompt);
        assert_eq!(UnsignedPolicy::resolve(&config(Some("never"))), UnsignedPolicy::Prompt);
        assert_eq!(UnsignedPolicy::resolve(&config(Some(""))), UnsignedPolicy::Prompt);
    }

    #[test]
    fn test_resolve_is_case_sensitive() {
        assert_eq!(UnsignedPolicy::resolve(&config(Some("FAIL"))), UnsignedPolicy::Prompt);
        assert_eq!(UnsignedPolicy::resolve(&config(Some("Allow"))), UnsignedPolicy::Prompt);
    }

    #[test]
    fn test_from_str_rejects_unknown() {
        let err = "sometimes".parse::<UnsignedPolicy>().unwrap_err();
        assert!(matches!(err, TrustError::Config { .. }));
    }

    #[test]
    #[serial]
    fn test_env_config() {
        std::env::set_var(UNSIGNED_POLICY_ENV, "fail");
        assert_eq!(UnsignedPolicy::resolve(&EnvConfig), UnsignedPolicy::Fail);

        std::env::remove_var(UNSIGNED_POLICY_ENV);
        assert_eq!(UnsignedPolicy::resolve(&EnvConfig), UnsignedPolicy::Prompt);
        assert_eq!(EnvConfig.get("some.other.key"), None);
    }
}
