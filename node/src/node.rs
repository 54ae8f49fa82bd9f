//! The running node: store, collaborators, governor and background tasks.

use std::sync::Arc;
use std::time::Duration;

use agora_governance::{
    Clock, Dispatcher, EventBus, ExecutionDispatcher, Governor, SharedStore, SystemClock,
    TokenLedger,
};
use agora_rpc::{RpcServer, RpcState};
use agora_store_lmdb::{check_data_dir, check_integrity, LmdbEnvironment, Migrator};
use agora_utils::format_duration_ns;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn, Instrument};

use crate::config::NodeConfig;
use crate::http_dispatcher::HttpDispatcher;
use crate::http_ledger::HttpLedger;
use crate::metrics::GovernorMetrics;
use crate::shutdown::ShutdownController;
use crate::tracing_spans::sweep_span;
use crate::NodeError;

/// How long `stop` waits for background tasks.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// A running Agora node.
pub struct AgoraNode {
    pub config: NodeConfig,
    pub governor: Arc<Governor>,
    pub metrics: Arc<GovernorMetrics>,
    pub shutdown: Arc<ShutdownController>,
    env: LmdbEnvironment,
    /// Handles for spawned background tasks (joined during shutdown).
    task_handles: Vec<JoinHandle<()>>,
}

impl AgoraNode {
    /// Create a node talking to the configured ledger and services over
    /// HTTP, with the system clock.
    pub async fn new(config: NodeConfig) -> Result<Self, NodeError> {
        let ledger = HttpLedger::new(
            config.ledger_url.clone(),
            Duration::from_secs(config.ledger_timeout_secs),
        )?;
        let dispatcher = HttpDispatcher::new(
            &config.services,
            Duration::from_secs(config.dispatch_timeout_secs),
        )?;
        info!(
            ledger = %config.ledger_url,
            services = dispatcher.service_count(),
            "HTTP collaborators configured"
        );
        Self::with_collaborators(
            config,
            Arc::new(ledger),
            Arc::new(dispatcher),
            Arc::new(SystemClock::new()),
        )
        .await
    }

    /// Create a node with the given ledger, dispatcher and clock.
    ///
    /// Opens the LMDB environment at `config.data_dir`, checks it, runs
    /// migrations, and restores the governor from it.
    pub async fn with_collaborators(
        config: NodeConfig,
        ledger: Arc<dyn TokenLedger>,
        dispatcher: Arc<dyn Dispatcher>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, NodeError> {
        let governor_id = config.require_governor_id()?;

        check_data_dir(&config.data_dir).map_err(NodeError::Integrity)?;
        let env = LmdbEnvironment::open_default(&config.data_dir)?;
        let report = check_integrity(env.env())?;
        if !report.is_healthy() {
            return Err(NodeError::Integrity(report.errors.join("; ")));
        }
        info!(
            databases = report.databases_checked,
            entries = report.total_entries,
            "LMDB integrity check passed"
        );
        Migrator::run(&env.meta_store())?;

        let metrics = Arc::new(GovernorMetrics::new());
        let mut events = EventBus::new();
        metrics.subscribe(&mut events);

        let store: SharedStore = Arc::new(env.governance_store());
        let governor = Governor::restore(
            store,
            config.system_params.to_system_params(),
            ledger,
            ExecutionDispatcher::new(governor_id, dispatcher),
            clock,
            events,
        )?;

        let params = governor.get_system_params().await;
        let proposal_count = governor.proposal_count().await;
        metrics.proposal_count.set(proposal_count as i64);
        info!(
            governor = %governor_id,
            proposals = proposal_count,
            params_version = params.version,
            voting_delay = %format_duration_ns(params.params.voting_delay_ns),
            voting_period = %format_duration_ns(params.params.voting_period_ns),
            timelock = %format_duration_ns(params.params.timelock_delay_ns),
            "governor restored"
        );

        Ok(Self {
            config,
            governor: Arc::new(governor),
            metrics,
            shutdown: Arc::new(ShutdownController::new()),
            env,
            task_handles: Vec::new(),
        })
    }

    /// Spawn the RPC server and the execution sweep.
    pub fn spawn_tasks(&mut self) {
        if self.config.enable_rpc {
            let state = RpcState {
                governor: Arc::clone(&self.governor),
                metrics: self
                    .config
                    .enable_metrics
                    .then(|| self.metrics.registry.clone()),
            };
            let server = RpcServer::new(self.config.rpc_addr(), state);
            let shutdown = self.shutdown.signal();
            let rpc_handle = tokio::spawn(async move {
                match server.serve(shutdown).await {
                    Ok(()) => info!("RPC server exited"),
                    Err(e) => error!("RPC server error: {e}"),
                }
            });
            self.task_handles.push(rpc_handle);
        }

        if self.config.auto_execute_interval_secs > 0 {
            let period = Duration::from_secs(self.config.auto_execute_interval_secs);
            let governor = Arc::clone(&self.governor);
            let mut shutdown_rx = self.shutdown.subscribe();

            let sweep_handle = tokio::spawn(async move {
                let mut interval = tokio::time::interval(period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
                let mut run = 0u64;
                loop {
                    tokio::select! {
                        biased;
                        _ = shutdown_rx.recv() => {
                            info!("execution sweep shutting down");
                            break;
                        }
                        _ = interval.tick() => {
                            run += 1;
                            let results = governor.execute_due().instrument(sweep_span(run)).await;
                            if !results.is_empty() {
                                let failed = results.iter().filter(|(_, r)| r.is_err()).count();
                                info!(
                                    executed = results.len() - failed,
                                    failed,
                                    "execution sweep finished"
                                );
                            }
                        }
                    }
                }
            });
            self.task_handles.push(sweep_handle);
        } else {
            info!("automatic execution disabled");
        }
    }

    /// Spawn background tasks and run until SIGINT/SIGTERM.
    pub async fn start(&mut self) -> Result<(), NodeError> {
        self.spawn_tasks();
        info!(
            rpc = %if self.config.enable_rpc {
                self.config.rpc_addr().to_string()
            } else {
                "off".into()
            },
            "Agora node started"
        );
        self.shutdown.wait_for_signal().await;
        Ok(())
    }

    /// Stop the node gracefully.
    ///
    /// 1. Sends the shutdown signal to all background tasks.
    /// 2. Waits for them to finish (with timeout).
    /// 3. Flushes LMDB.
    pub async fn stop(&mut self) -> Result<(), NodeError> {
        info!("Agora node stopping");
        self.shutdown.shutdown();

        let handles: Vec<JoinHandle<()>> = self.task_handles.drain(..).collect();
        let wait_all = async {
            for handle in handles {
                let _ = handle.await;
            }
        };
        let timed_out = tokio::time::timeout(SHUTDOWN_TIMEOUT, wait_all)
            .await
            .is_err();
        if timed_out {
            warn!(
                "shutdown timeout ({:?}), some tasks may still be running",
                SHUTDOWN_TIMEOUT
            );
        }

        if let Err(e) = self.env.force_sync() {
            warn!("LMDB force_sync failed: {e}");
        } else {
            info!("LMDB flushed to disk");
        }

        if timed_out {
            return Err(NodeError::ShutdownTimeout);
        }
        info!("Agora node stopped");
        Ok(())
    }
}
