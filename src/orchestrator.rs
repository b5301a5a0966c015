//! The outer scheduling loop.
//!
//! Two long-lived states: Running and Terminated. Terminated is entered
//! only through cancellation; every other failure is either absorbed per
//! account or retried per cycle after a short backoff. The one exception
//! is a missing credential file, which escapes `run` and ends the process.

use crate::accounts::{Account, AccountSource};
use crate::chain::connector::ChainConnector;
use crate::chain::contract::RewardContractClient;
use crate::error::Result;
use crate::pipeline::{self, ClaimOutcome};
use crate::proxy;
use crate::signer::Wallet;
use async_trait::async_trait;
use ethers::types::Address;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Seam between the scheduler and the chain: everything needed to take
/// one account through connect, bind, and claim.
#[async_trait]
pub trait AccountClaimer: Send + Sync {
    async fn claim(&self, account: &Account) -> ClaimOutcome;
}

/// Production claimer: proxy-aware connection, typed contract, pipeline.
pub struct ChainClaimer {
    connector: ChainConnector,
    contract_address: Address,
}

impl ChainClaimer {
    pub fn new(connector: ChainConnector, contract_address: Address) -> Self {
        Self {
            connector,
            contract_address,
        }
    }
}

#[async_trait]
impl AccountClaimer for ChainClaimer {
    async fn claim(&self, account: &Account) -> ClaimOutcome {
        let route = proxy::format_proxy(account.proxy().unwrap_or(""));

        let connection = match self.connector.connect(&route).await {
            Ok(connection) => connection,
            Err(e) => {
                // The one log line for this failure, attributed to the
                // account whenever the key parses.
                let address = Wallet::derive_address(account.private_key());
                match address {
                    Some(address) => {
                        error!("Connection failed for address {:?}, skipping account: {}", address, e)
                    }
                    None => error!("Connection failed for address unknown, skipping account: {}", e),
                }
                return ClaimOutcome::Failed { address, error: e };
            }
        };

        let chain_id = connection.chain_id();
        let client = RewardContractClient::new(connection, self.contract_address);
        pipeline::run_claim_pipeline(&client, account, chain_id).await
    }
}

/// Scheduler settings, split out so tests can shrink the waits.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Pause between successful cycles
    pub cycle_interval: Duration,
    /// Backoff after a failed cycle
    pub error_backoff: Duration,
    /// Exit after the first successful cycle
    pub run_once: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            cycle_interval: Duration::from_secs(6 * 60 * 60),
            error_backoff: Duration::from_secs(60),
            run_once: false,
        }
    }
}

/// Scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    Running,
    Terminated,
}

/// Per-cycle counters for the completion summary line.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleStats {
    pub accounts: usize,
    pub claimed: usize,
    pub already_claimed: usize,
    pub failed: usize,
}

/// Drives claim cycles until cancelled.
pub struct ClaimOrchestrator<S, C> {
    source: S,
    claimer: C,
    config: OrchestratorConfig,
    shutdown: watch::Receiver<bool>,
    state: OrchestratorState,
}

impl<S: AccountSource, C: AccountClaimer> ClaimOrchestrator<S, C> {
    pub fn new(
        source: S,
        claimer: C,
        config: OrchestratorConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            source,
            claimer,
            config,
            shutdown,
            state: OrchestratorState::Running,
        }
    }

    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    /// Run cycles indefinitely. The only error that escapes is the fatal
    /// missing-credentials case; cancellation returns `Ok` after a clean
    /// transition to Terminated.
    pub async fn run(&mut self) -> Result<()> {
        info!("Claim daemon started");

        loop {
            if self.cancelled() {
                break;
            }

            match self.run_cycle().await {
                Ok(stats) => {
                    info!(
                        "Cycle complete: {} accounts, {} claimed, {} already claimed, {} failed",
                        stats.accounts, stats.claimed, stats.already_claimed, stats.failed
                    );
                    if self.config.run_once {
                        return Ok(());
                    }
                    info!("Next cycle in {:?}", self.config.cycle_interval);
                    self.wait(self.config.cycle_interval).await;
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    error!(
                        "Cycle failed: {}; retrying in {:?}",
                        e, self.config.error_backoff
                    );
                    self.wait(self.config.error_backoff).await;
                }
            }
        }

        self.state = OrchestratorState::Terminated;
        warn!("Claim daemon stopped");
        Ok(())
    }

    /// One pass over every account, strictly sequential. Per-account
    /// failures are counted, never propagated; only loading the account
    /// list can fail the cycle.
    pub async fn run_cycle(&self) -> Result<CycleStats> {
        let accounts = self.source.load()?;
        let mut stats = CycleStats {
            accounts: accounts.len(),
            ..CycleStats::default()
        };

        for account in &accounts {
            match self.claimer.claim(account).await {
                ClaimOutcome::Claimed { .. } => stats.claimed += 1,
                ClaimOutcome::AlreadyClaimed { .. } => stats.already_claimed += 1,
                ClaimOutcome::Failed { .. } => stats.failed += 1,
            }
        }

        Ok(stats)
    }

    fn cancelled(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Sleep that the shutdown signal can cut short.
    async fn wait(&mut self, duration: Duration) {
        let sleep = tokio::time::sleep(duration);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => return,
                changed = self.shutdown.changed() => {
                    // A closed channel counts as cancellation.
                    if changed.is_err() || *self.shutdown.borrow() {
                        return;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClaimdError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct StaticSource(Vec<Account>);

    impl AccountSource for StaticSource {
        fn load(&self) -> Result<Vec<Account>> {
            Ok(self.0.clone())
        }
    }

    struct CountingClaimer {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl AccountClaimer for CountingClaimer {
        async fn claim(&self, _account: &Account) -> ClaimOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            ClaimOutcome::AlreadyClaimed {
                address: Address::zero(),
                epoch: 1,
            }
        }
    }

    #[test]
    fn test_default_config_matches_cadence() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.cycle_interval, Duration::from_secs(21_600));
        assert_eq!(config.error_backoff, Duration::from_secs(60));
        assert!(!config.run_once);
    }

    #[tokio::test]
    async fn test_run_once_processes_every_account_and_exits() {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = StaticSource(vec![
            Account::new("0xaa".into(), None),
            Account::new("0xbb".into(), Some("h:1".into())),
        ]);
        let claimer = CountingClaimer {
            calls: calls.clone(),
        };
        let (_tx, rx) = watch::channel(false);

        let config = OrchestratorConfig {
            run_once: true,
            ..OrchestratorConfig::default()
        };
        let mut orchestrator = ClaimOrchestrator::new(source, claimer, config, rx);

        orchestrator.run().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_missing_credentials_escapes_run() {
        struct MissingSource;
        impl AccountSource for MissingSource {
            fn load(&self) -> Result<Vec<Account>> {
                Err(ClaimdError::CredentialsMissing("private_keys.txt".into()))
            }
        }

        let calls = Arc::new(AtomicUsize::new(0));
        let claimer = CountingClaimer {
            calls: calls.clone(),
        };
        let (_tx, rx) = watch::channel(false);
        let mut orchestrator =
            ClaimOrchestrator::new(MissingSource, claimer, OrchestratorConfig::default(), rx);

        let err = orchestrator.run().await.unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_pre_cancelled_signal_terminates_without_a_cycle() {
        let calls = Arc::new(AtomicUsize::new(0));
        let claimer = CountingClaimer {
            calls: calls.clone(),
        };
        let source = StaticSource(vec![Account::new("0xaa".into(), None)]);
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();

        let mut orchestrator =
            ClaimOrchestrator::new(source, claimer, OrchestratorConfig::default(), rx);
        orchestrator.run().await.unwrap();

        assert_eq!(orchestrator.state(), OrchestratorState::Terminated);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
