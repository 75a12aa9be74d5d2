//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.
//! Every section has defaults so a minimal file only needs the rename rules.

use serde::{Deserialize, Serialize};

/// Root configuration for the rename-headers proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Upstream the proxy forwards every request to.
    pub upstream: UpstreamConfig,

    /// Header rename rules and the interceptor's name.
    pub rename: RenameConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Upstream server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the upstream (e.g., "http://127.0.0.1:3000").
    /// Only scheme and authority are used; the request path is kept.
    pub address: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            address: "http://127.0.0.1:3000".to_string(),
        }
    }
}

/// Rename interceptor configuration.
///
/// `RenameConfig::default()` has no rules, which does not validate:
/// an interceptor without rules is a configuration mistake.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RenameConfig {
    /// Instance name, used in logs only.
    pub name: String,

    /// Ordered rename rules.
    #[serde(alias = "renameData")]
    pub rename_data: Vec<RenameRuleConfig>,
}

impl Default for RenameConfig {
    fn default() -> Self {
        Self {
            name: "rename-headers".to_string(),
            rename_data: Vec::new(),
        }
    }
}

/// One unvalidated rename rule as written in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RenameRuleConfig {
    /// Header whose values are moved.
    #[serde(alias = "existingHeaderName")]
    pub existing_header_name: String,

    /// Header the values are moved to.
    #[serde(alias = "newHeaderName")]
    pub new_header_name: String,
}

impl RenameRuleConfig {
    pub fn new(existing: impl Into<String>, new: impl Into<String>) -> Self {
        Self {
            existing_header_name: existing.into(),
            new_header_name: new.into(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Time allowed until the response head is produced, in seconds.
    /// Streaming bodies and upgraded connections are not bounded by it.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    /// `RUST_LOG` takes precedence when set.
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
