//! Per-account claim pipeline: eligibility decision and claim execution.
//!
//! Every error is caught at this boundary and folded into the returned
//! outcome. One account's failure never reaches the orchestrator as an
//! error, so it can never abort another account or the cycle.

use crate::accounts::Account;
use crate::chain::contract::RewardContract;
use crate::error::{ClaimdError, Result};
use crate::signer::Wallet;
use ethers::types::{Address, H256};
use tracing::{error, info};

/// Fresh per-account view of on-chain claim state. Read once per account
/// per cycle and never cached: the chain moves between cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EligibilitySnapshot {
    pub genesis_claimed: bool,
    pub current_epoch: u64,
    pub epoch_claimed: bool,
}

impl EligibilitySnapshot {
    /// An account may claim unless both the genesis claim and the current
    /// epoch's claim are already done.
    pub fn eligible(&self) -> bool {
        (self.genesis_claimed && !self.epoch_claimed) || !self.genesis_claimed
    }
}

/// Result of one pipeline invocation. Failures are data here, inspected by
/// the orchestrator, never propagated exceptions.
#[derive(Debug)]
pub enum ClaimOutcome {
    /// A claim transaction was submitted and confirmed.
    Claimed { address: Address, tx_hash: H256 },
    /// Both genesis and current-epoch rewards were already claimed.
    AlreadyClaimed { address: Address, epoch: u64 },
    /// Something failed. The address is `None` when it could not be
    /// derived before the failure.
    Failed {
        address: Option<Address>,
        error: ClaimdError,
    },
}

impl ClaimOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, ClaimOutcome::Failed { .. })
    }
}

/// Run the claim decision and, when eligible, the claim itself for one
/// account against an already-bound contract.
pub async fn run_claim_pipeline(
    contract: &dyn RewardContract,
    account: &Account,
    chain_id: u64,
) -> ClaimOutcome {
    let wallet = match Wallet::from_private_key(account.private_key(), chain_id) {
        Ok(wallet) => wallet,
        Err(e) => {
            // Best-effort logging: the address is unknown if key parsing
            // itself failed.
            error!("Error processing address unknown: {}", e);
            return ClaimOutcome::Failed {
                address: None,
                error: e,
            };
        }
    };
    let address = wallet.address();

    match try_claim(contract, &wallet).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Error processing address {:?}: {}", address, e);
            ClaimOutcome::Failed {
                address: Some(address),
                error: e,
            }
        }
    }
}

async fn try_claim(contract: &dyn RewardContract, wallet: &Wallet) -> Result<ClaimOutcome> {
    let address = wallet.address();

    let genesis_claimed = contract.genesis_claim_status(address).await?;
    let current_epoch = contract.current_epoch().await?;
    let status = contract.claim_status(address, current_epoch).await?;

    let snapshot = EligibilitySnapshot {
        genesis_claimed,
        current_epoch,
        epoch_claimed: status.claimed,
    };

    if snapshot.eligible() {
        info!("Claiming reward for address {:?}", address);
        let tx_hash = contract.submit_claim(wallet).await?;
        info!(
            "Claim for address {:?} confirmed, tx hash 0x{}",
            address,
            hex::encode(tx_hash)
        );
        Ok(ClaimOutcome::Claimed { address, tx_hash })
    } else {
        info!(
            "Reward for address {:?} already claimed in epoch {}",
            address, current_epoch
        );
        Ok(ClaimOutcome::AlreadyClaimed {
            address,
            epoch: current_epoch,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::contract::{ClaimStatus, MockRewardContract};
    use ethers::types::U256;

    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn account() -> Account {
        Account::new(TEST_KEY.to_string(), None)
    }

    fn snapshot(genesis_claimed: bool, epoch_claimed: bool) -> EligibilitySnapshot {
        EligibilitySnapshot {
            genesis_claimed,
            current_epoch: 7,
            epoch_claimed,
        }
    }

    #[test]
    fn test_eligibility_truth_table() {
        // Ineligible only when both claims are already done.
        assert!(snapshot(false, false).eligible());
        assert!(snapshot(false, true).eligible());
        assert!(snapshot(true, false).eligible());
        assert!(!snapshot(true, true).eligible());
    }

    #[tokio::test]
    async fn test_fully_claimed_account_skips_submission() {
        let mut contract = MockRewardContract::new();
        contract
            .expect_genesis_claim_status()
            .times(1)
            .returning(|_| Ok(true));
        contract.expect_current_epoch().times(1).returning(|| Ok(7));
        contract.expect_claim_status().times(1).returning(|_, _| {
            Ok(ClaimStatus {
                buffer_amount: U256::zero(),
                claimed: true,
            })
        });
        contract.expect_submit_claim().times(0);

        let outcome = run_claim_pipeline(&contract, &account(), 1942).await;
        assert!(matches!(
            outcome,
            ClaimOutcome::AlreadyClaimed { epoch: 7, .. }
        ));
    }

    #[tokio::test]
    async fn test_unclaimed_genesis_triggers_claim() {
        let mut contract = MockRewardContract::new();
        contract
            .expect_genesis_claim_status()
            .times(1)
            .returning(|_| Ok(false));
        contract.expect_current_epoch().times(1).returning(|| Ok(3));
        contract.expect_claim_status().times(1).returning(|_, _| {
            Ok(ClaimStatus {
                buffer_amount: U256::zero(),
                // Even a "claimed" epoch does not block a missing genesis
                // claim.
                claimed: true,
            })
        });
        contract
            .expect_submit_claim()
            .times(1)
            .returning(|_| Ok(H256::repeat_byte(0xab)));

        let outcome = run_claim_pipeline(&contract, &account(), 1942).await;
        match outcome {
            ClaimOutcome::Claimed { tx_hash, .. } => {
                assert_eq!(tx_hash, H256::repeat_byte(0xab));
            }
            other => panic!("expected Claimed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rpc_failure_yields_failure_with_address() {
        let mut contract = MockRewardContract::new();
        contract
            .expect_genesis_claim_status()
            .times(1)
            .returning(|_| Err(ClaimdError::chain_call("userGenesisClaimStatus", "timeout")));

        let outcome = run_claim_pipeline(&contract, &account(), 1942).await;
        match outcome {
            ClaimOutcome::Failed { address, error } => {
                assert!(address.is_some());
                assert!(matches!(error, ClaimdError::ChainCall { .. }));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_submission_failure_is_contained() {
        let mut contract = MockRewardContract::new();
        contract
            .expect_genesis_claim_status()
            .times(1)
            .returning(|_| Ok(false));
        contract.expect_current_epoch().times(1).returning(|| Ok(3));
        contract.expect_claim_status().times(1).returning(|_, _| {
            Ok(ClaimStatus {
                buffer_amount: U256::zero(),
                claimed: false,
            })
        });
        contract
            .expect_submit_claim()
            .times(1)
            .returning(|_| Err(ClaimdError::Transaction("reverted".into())));

        let outcome = run_claim_pipeline(&contract, &account(), 1942).await;
        assert!(outcome.is_failure());
    }

    #[tokio::test]
    async fn test_invalid_key_fails_with_unknown_address() {
        // No expectations: nothing on-chain may be touched when the key
        // cannot be parsed.
        let contract = MockRewardContract::new();
        let bad_account = Account::new("not-a-key".to_string(), None);

        let outcome = run_claim_pipeline(&contract, &bad_account, 1942).await;
        match outcome {
            ClaimOutcome::Failed { address, .. } => assert!(address.is_none()),
            other => panic!("expected Failed, got {other:?}"),
        }
    }
}
