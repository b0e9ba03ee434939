//! Typed configuration surface for the client SDK (§6.6).
//!
//! `LedgerClientConfig` is the single struct callers populate (from JSON,
//! TOML, or environment overlay) and pass into the rest of the workspace.
//! Construction validates every guardrail eagerly — a config error is
//! raised once, at startup, never deferred to first use.

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Guardrails for the tick helper (component B).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TickOffsetConfig {
    pub min_offset: u64,
    pub default_offset: u64,
    pub max_offset: u64,
}

impl Default for TickOffsetConfig {
    fn default() -> Self {
        Self {
            min_offset: 0,
            default_offset: 5,
            max_offset: 50,
        }
    }
}

/// Default behavior of the confirmation engine (component C).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ConfirmationConfig {
    pub timeout_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 60_000,
            poll_interval_ms: 1_000,
        }
    }
}

/// Which of the three preemption policies the transaction queue uses by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QueuePolicy {
    WaitForConfirm,
    Reject,
    ReplaceHigherTick,
}

impl Default for QueuePolicy {
    fn default() -> Self {
        QueuePolicy::WaitForConfirm
    }
}

/// Vault defaults (KDF parameters, lock timeout).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VaultDefaultsConfig {
    pub scrypt_log_n: u8,
    pub scrypt_r: u32,
    pub scrypt_p: u32,
    pub lock_timeout_ms: u64,
}

impl Default for VaultDefaultsConfig {
    fn default() -> Self {
        Self {
            scrypt_log_n: 13,
            scrypt_r: 8,
            scrypt_p: 1,
            lock_timeout_ms: 0,
        }
    }
}

/// The SDK's top-level configuration struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerClientConfig {
    pub rpc_base_url: String,
    pub logstream_url: String,
    #[serde(default)]
    pub tick_offset: TickOffsetConfig,
    #[serde(default)]
    pub confirmation: ConfirmationConfig,
    #[serde(default)]
    pub queue_policy: QueuePolicy,
    #[serde(default = "default_concurrency")]
    pub max_concurrency: usize,
    #[serde(default)]
    pub vault: VaultDefaultsConfig,
}

fn default_concurrency() -> usize {
    64
}

impl LedgerClientConfig {
    /// Parse and validate configuration from a JSON or TOML string.
    ///
    /// `is_toml` selects the parser; both formats deserialize into the same
    /// struct shape.
    pub fn parse(text: &str, is_toml: bool) -> Result<Self, ConfigError> {
        let config: Self = if is_toml {
            toml::from_str(text).map_err(|err| ConfigError::Invalid {
                field: "<toml>".into(),
                reason: err.to_string(),
            })?
        } else {
            serde_json::from_str(text).map_err(|err| ConfigError::Invalid {
                field: "<json>".into(),
                reason: err.to_string(),
            })?
        };
        config.validate()?;
        Ok(config)
    }

    /// Re-validate the guardrail invariants named in §4.B/§6.6.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let offsets = &self.tick_offset;
        if offsets.min_offset > offsets.max_offset {
            return Err(ConfigError::Invalid {
                field: "tick_offset".into(),
                reason: format!(
                    "min_offset ({}) must be <= max_offset ({})",
                    offsets.min_offset, offsets.max_offset
                ),
            });
        }
        if !(offsets.min_offset..=offsets.max_offset).contains(&offsets.default_offset) {
            return Err(ConfigError::Invalid {
                field: "tick_offset.default_offset".into(),
                reason: "default_offset must lie within [min_offset, max_offset]".into(),
            });
        }
        if self.confirmation.timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "confirmation.timeout_ms".into(),
                reason: "must be greater than zero".into(),
            });
        }
        if self.confirmation.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "confirmation.poll_interval_ms".into(),
                reason: "must be greater than zero".into(),
            });
        }
        if self.max_concurrency == 0 {
            return Err(ConfigError::Invalid {
                field: "max_concurrency".into(),
                reason: "must be greater than zero".into(),
            });
        }
        url::Url::parse(&self.rpc_base_url).map_err(|err| ConfigError::Invalid {
            field: "rpc_base_url".into(),
            reason: err.to_string(),
        })?;
        Ok(())
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_millis(self.confirmation.timeout_ms)
    }

    pub fn confirmation_poll_interval(&self) -> Duration {
        Duration::from_millis(self.confirmation.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_json() -> String {
        r#"{
            "rpc_base_url": "https://rpc.example.test",
            "logstream_url": "wss://rpc.example.test/ws/logs"
        }"#
        .to_string()
    }

    #[test]
    fn defaults_fill_in_and_validate() {
        let config = LedgerClientConfig::parse(&base_json(), false).unwrap();
        assert_eq!(config.tick_offset.default_offset, 5);
        assert_eq!(config.queue_policy, QueuePolicy::WaitForConfirm);
    }

    #[test]
    fn rejects_inverted_offset_range() {
        let json = r#"{
            "rpc_base_url": "https://rpc.example.test",
            "logstream_url": "wss://rpc.example.test/ws/logs",
            "tick_offset": {"min_offset": 10, "default_offset": 5, "max_offset": 1}
        }"#;
        let err = LedgerClientConfig::parse(json, false).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field, .. } if field == "tick_offset"));
    }

    #[test]
    fn parses_toml_equivalently() {
        let toml_text = r#"
            rpc_base_url = "https://rpc.example.test"
            logstream_url = "wss://rpc.example.test/ws/logs"
        "#;
        let config = LedgerClientConfig::parse(toml_text, true).unwrap();
        assert_eq!(config.max_concurrency, 64);
    }
}
