//! Node configuration with TOML file support.

use agora_types::{GovernorMetadata, Principal, SystemParams};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use crate::NodeError;

/// A service proposals may call, reachable over HTTP.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEndpoint {
    pub id: Principal,
    /// Base URL; methods are posted to `{url}/{method}`.
    pub url: String,
}

/// Initial governance parameters, used only when the store holds none.
///
/// Durations are whole seconds and thresholds are bounded by `u64` so the
/// section stays representable in TOML.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenesisParams {
    pub voting_delay_secs: u64,
    pub voting_period_secs: u64,
    pub timelock_delay_secs: u64,
    pub proposal_threshold: u64,
    pub quorum_threshold: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guardian: Option<Principal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Default for GenesisParams {
    fn default() -> Self {
        Self {
            voting_delay_secs: 15,
            voting_period_secs: 30,
            timelock_delay_secs: 15,
            proposal_threshold: 1,
            quorum_threshold: 1,
            guardian: None,
            name: None,
            description: None,
        }
    }
}

impl GenesisParams {
    pub fn to_system_params(&self) -> SystemParams {
        let secs = |s: u64| agora_types::Timestamp::from_secs(s).as_nanos();
        let metadata = self.name.as_ref().map(|name| GovernorMetadata {
            name: name.clone(),
            description: self.description.clone().unwrap_or_default(),
        });
        SystemParams {
            voting_delay_ns: secs(self.voting_delay_secs),
            voting_period_ns: secs(self.voting_period_secs),
            timelock_delay_ns: secs(self.timelock_delay_secs),
            proposal_threshold: u128::from(self.proposal_threshold),
            quorum_threshold: u128::from(self.quorum_threshold),
            guardian: self.guardian,
            metadata,
        }
    }
}

/// Configuration for an Agora node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Data directory for the LMDB store.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Principal of the governor itself. Payloads targeting it are handled
    /// by the parameter registry instead of being sent out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub governor_id: Option<Principal>,

    /// Whether to enable the RPC server.
    #[serde(default = "default_true")]
    pub enable_rpc: bool,

    /// Address the RPC server binds to.
    #[serde(default = "default_rpc_bind")]
    pub rpc_bind: IpAddr,

    /// RPC port (if enabled).
    #[serde(default = "default_rpc_port")]
    pub rpc_port: u16,

    /// Whether to serve Prometheus metrics at `/metrics`.
    #[serde(default)]
    pub enable_metrics: bool,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Base URL of the token ledger.
    #[serde(default = "default_ledger_url")]
    pub ledger_url: String,

    /// Timeout for a single ledger request, in seconds.
    #[serde(default = "default_ledger_timeout_secs")]
    pub ledger_timeout_secs: u64,

    /// Services proposals may target.
    #[serde(default)]
    pub services: Vec<ServiceEndpoint>,

    /// Timeout for a proposal's outbound call, in seconds.
    #[serde(default = "default_dispatch_timeout_secs")]
    pub dispatch_timeout_secs: u64,

    /// Period of the execution sweep, in seconds. 0 disables it.
    #[serde(default = "default_auto_execute_interval_secs")]
    pub auto_execute_interval_secs: u64,

    /// Parameters for a fresh store.
    #[serde(default)]
    pub system_params: GenesisParams,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./agora_data")
}

fn default_true() -> bool {
    true
}

fn default_rpc_bind() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

fn default_rpc_port() -> u16 {
    7077
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_ledger_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_ledger_timeout_secs() -> u64 {
    10
}

fn default_dispatch_timeout_secs() -> u64 {
    30
}

fn default_auto_execute_interval_secs() -> u64 {
    10
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    pub fn rpc_addr(&self) -> SocketAddr {
        SocketAddr::new(self.rpc_bind, self.rpc_port)
    }

    /// The governor's own principal; a node cannot start without one.
    pub fn require_governor_id(&self) -> Result<Principal, NodeError> {
        match self.governor_id {
            Some(id) if !id.is_anonymous() => Ok(id),
            Some(_) => Err(NodeError::Config(
                "governor_id must not be the anonymous principal".into(),
            )),
            None => Err(NodeError::Config("governor_id is not set".into())),
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            governor_id: None,
            enable_rpc: default_true(),
            rpc_bind: default_rpc_bind(),
            rpc_port: default_rpc_port(),
            enable_metrics: false,
            log_format: default_log_format(),
            log_level: default_log_level(),
            ledger_url: default_ledger_url(),
            ledger_timeout_secs: default_ledger_timeout_secs(),
            services: Vec::new(),
            dispatch_timeout_secs: default_dispatch_timeout_secs(),
            auto_execute_interval_secs: default_auto_execute_interval_secs(),
            system_params: GenesisParams::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = NodeConfig {
            governor_id: Some(Principal::new([0xaa; 32])),
            services: vec![ServiceEndpoint {
                id: Principal::new([7; 32]),
                url: "http://127.0.0.1:9000".into(),
            }],
            ..NodeConfig::default()
        };
        let toml_str = config.to_toml_string().expect("serializable");
        let parsed = NodeConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed.rpc_port, config.rpc_port);
        assert_eq!(parsed.governor_id, config.governor_id);
        assert_eq!(parsed.services, config.services);
        assert_eq!(parsed.system_params, config.system_params);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = NodeConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.rpc_port, 7077);
        assert_eq!(config.auto_execute_interval_secs, 10);
        assert_eq!(config.log_format, "human");
        assert!(config.governor_id.is_none());
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = format!(
            r#"
            rpc_port = 9999
            governor_id = "{}"

            [system_params]
            voting_period_secs = 120
            guardian = "{}"

            [[services]]
            id = "{}"
            url = "http://svc"
        "#,
            "aa".repeat(32),
            "09".repeat(32),
            "07".repeat(32),
        );
        let config = NodeConfig::from_toml_str(&toml).expect("should parse");
        assert_eq!(config.rpc_port, 9999);
        assert_eq!(config.log_format, "human"); // default
        assert_eq!(config.system_params.voting_period_secs, 120);
        assert_eq!(config.system_params.voting_delay_secs, 15);
        assert_eq!(config.services.len(), 1);
        assert_eq!(
            config.require_governor_id().unwrap(),
            Principal::new([0xaa; 32])
        );
    }

    #[test]
    fn genesis_params_convert_to_nanoseconds() {
        let genesis = GenesisParams {
            name: Some("Agora".into()),
            ..GenesisParams::default()
        };
        let params = genesis.to_system_params();
        assert_eq!(params.voting_delay_ns, SystemParams::default().voting_delay_ns);
        assert_eq!(params.voting_period_ns, 30_000_000_000);
        assert_eq!(params.metadata.unwrap().name, "Agora");
    }

    #[test]
    fn governor_id_is_required() {
        let config = NodeConfig::default();
        assert!(matches!(
            config.require_governor_id(),
            Err(NodeError::Config(_))
        ));
        let config = NodeConfig {
            governor_id: Some(Principal::ANONYMOUS),
            ..NodeConfig::default()
        };
        assert!(config.require_governor_id().is_err());
    }

    #[test]
    fn missing_file_returns_config_error() {
        let result = NodeConfig::from_toml_file("/nonexistent/agora.toml");
        assert!(matches!(result, Err(NodeError::Config(_))));
    }
}
