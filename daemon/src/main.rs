//! Agora daemon: runs a governor node.

use agora_node::{init_logging, AgoraNode, LogFormat, NodeConfig};
use agora_types::Principal;
use anyhow::Context;
use clap::Parser;
use std::net::IpAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "agora-daemon", about = "Agora governor node daemon")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "AGORA_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory for the LMDB store.
    #[arg(long, env = "AGORA_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// The governor's own principal (64 hex digits).
    #[arg(long, env = "AGORA_GOVERNOR_ID")]
    governor_id: Option<String>,

    /// Disable the RPC server.
    #[arg(long, env = "AGORA_DISABLE_RPC")]
    no_rpc: bool,

    /// Address the RPC server binds to.
    #[arg(long, env = "AGORA_RPC_BIND")]
    rpc_bind: Option<IpAddr>,

    /// RPC server port.
    #[arg(long, env = "AGORA_RPC_PORT")]
    rpc_port: Option<u16>,

    /// Enable Prometheus metrics endpoint.
    #[arg(long, env = "AGORA_ENABLE_METRICS")]
    metrics: bool,

    /// Base URL of the token ledger.
    #[arg(long, env = "AGORA_LEDGER_URL")]
    ledger_url: Option<String>,

    /// Period of the execution sweep in seconds (0 disables it).
    #[arg(long, env = "AGORA_AUTO_EXECUTE_INTERVAL_SECS")]
    auto_execute_interval_secs: Option<u64>,

    /// Log format: "human" or "json".
    #[arg(long, env = "AGORA_LOG_FORMAT")]
    log_format: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "AGORA_LOG_LEVEL")]
    log_level: Option<String>,

    /// Subcommand.
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Run the node.
    Run,
    /// Print the effective configuration as TOML and exit.
    PrintConfig,
}

/// Apply CLI flags and env vars on top of `base`.
fn merge(cli: &Cli, base: NodeConfig) -> anyhow::Result<NodeConfig> {
    let governor_id = match &cli.governor_id {
        Some(text) => Some(
            text.parse::<Principal>()
                .with_context(|| format!("invalid governor id \"{text}\""))?,
        ),
        None => base.governor_id,
    };
    Ok(NodeConfig {
        data_dir: cli.data_dir.clone().unwrap_or(base.data_dir),
        governor_id,
        enable_rpc: base.enable_rpc && !cli.no_rpc,
        rpc_bind: cli.rpc_bind.unwrap_or(base.rpc_bind),
        rpc_port: cli.rpc_port.unwrap_or(base.rpc_port),
        enable_metrics: cli.metrics || base.enable_metrics,
        ledger_url: cli.ledger_url.clone().unwrap_or(base.ledger_url),
        auto_execute_interval_secs: cli
            .auto_execute_interval_secs
            .unwrap_or(base.auto_execute_interval_secs),
        log_format: cli.log_format.clone().unwrap_or(base.log_format),
        log_level: cli.log_level.clone().unwrap_or(base.log_level),
        ..base
    })
}

fn load_config(cli: &Cli) -> anyhow::Result<NodeConfig> {
    let base = match &cli.config {
        Some(path) => NodeConfig::from_toml_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => NodeConfig::default(),
    };
    merge(cli, base)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match config.log_format.parse::<LogFormat>() {
        Ok(format) => {
            init_logging(format, &config.log_level);
        }
        Err(e) => {
            agora_utils::init_tracing();
            tracing::warn!("{e}, falling back to default logging");
        }
    }

    match cli.command {
        Command::PrintConfig => {
            println!("{}", config.to_toml_string()?);
        }
        Command::Run => {
            tracing::info!(
                data_dir = %config.data_dir.display(),
                rpc = %if config.enable_rpc {
                    config.rpc_addr().to_string()
                } else {
                    "off".into()
                },
                metrics = config.enable_metrics,
                "starting Agora node"
            );

            let mut node = AgoraNode::new(config).await?;
            node.start().await?;

            tracing::info!("shutdown signal received, stopping node");
            node.stop().await?;

            tracing::info!("Agora daemon exited cleanly");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["agora-daemon"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).expect("valid args")
    }

    #[test]
    fn flags_override_file_values() {
        let base = NodeConfig {
            rpc_port: 9000,
            ledger_url: "http://file".into(),
            ..NodeConfig::default()
        };
        let cli = parse(&[
            "--rpc-port",
            "9100",
            "--governor-id",
            &"aa".repeat(32),
            "--no-rpc",
            "run",
        ]);
        let merged = merge(&cli, base).unwrap();
        assert_eq!(merged.rpc_port, 9100);
        assert_eq!(merged.ledger_url, "http://file");
        assert_eq!(merged.governor_id, Some(Principal::new([0xaa; 32])));
        assert!(!merged.enable_rpc);
    }

    #[test]
    fn absent_flags_keep_file_values() {
        let base = NodeConfig {
            governor_id: Some(Principal::new([3; 32])),
            enable_metrics: true,
            auto_execute_interval_secs: 0,
            ..NodeConfig::default()
        };
        let merged = merge(&parse(&["print-config"]), base).unwrap();
        assert_eq!(merged.governor_id, Some(Principal::new([3; 32])));
        assert!(merged.enable_metrics);
        assert!(merged.enable_rpc);
        assert_eq!(merged.auto_execute_interval_secs, 0);
    }

    #[test]
    fn malformed_governor_id_is_rejected() {
        let cli = parse(&["--governor-id", "xyz", "run"]);
        assert!(merge(&cli, NodeConfig::default()).is_err());
    }
}
