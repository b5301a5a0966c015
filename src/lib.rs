pub mod accounts;
pub mod chain;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod pipeline;
pub mod proxy;
pub mod signer;

pub use accounts::{Account, AccountSource, FileAccountSource};
pub use chain::{ChainConnector, ClaimStatus, Connection, RewardContract, RewardContractClient};
pub use config::AppConfig;
pub use error::{ClaimdError, Result};
pub use orchestrator::{
    AccountClaimer, ChainClaimer, ClaimOrchestrator, CycleStats, OrchestratorConfig,
    OrchestratorState,
};
pub use pipeline::{run_claim_pipeline, ClaimOutcome, EligibilitySnapshot};
pub use proxy::{format_proxy, ProxyRoute};
pub use signer::Wallet;
