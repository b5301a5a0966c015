//! Typed binding to the on-chain reward contract.
//!
//! The `RewardContract` trait is the capability set the pipeline runs
//! against; the ethers-backed client below is the production
//! implementation, and tests substitute mocks.

use crate::chain::connector::Connection;
use crate::error::{ClaimdError, Result};
use crate::signer::Wallet;
use async_trait::async_trait;
use ethers::contract::abigen;
use ethers::providers::{Http, Middleware, Provider};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, H256, U256};
use tracing::debug;

abigen!(
    RewardDistributor,
    r#"[
        function userGenesisClaimStatus(address user) external view returns (bool)
        function currentEpoch() external view returns (uint256)
        function userClaimStatus(address user, uint256 epoch) external view returns (uint256, bool)
        function claimReward() external
    ]"#
);

/// Claim state for one account in one epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimStatus {
    pub buffer_amount: U256,
    pub claimed: bool,
}

/// The reward contract's capability set.
///
/// Read calls are fresh network round-trips every time; nothing here is
/// cached. Every RPC failure carries the name of the method that failed.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RewardContract: Send + Sync {
    /// Whether the one-time genesis claim has been made for `account`.
    async fn genesis_claim_status(&self, account: Address) -> Result<bool>;

    /// The current reward epoch.
    async fn current_epoch(&self) -> Result<u64>;

    /// Claim state of `account` for `epoch`.
    async fn claim_status(&self, account: Address, epoch: u64) -> Result<ClaimStatus>;

    /// Build, sign, submit, and confirm a claim transaction for `wallet`.
    /// Blocks until the receipt is available.
    async fn submit_claim(&self, wallet: &Wallet) -> Result<H256>;
}

/// Production handle binding a connection to the deployed contract.
pub struct RewardContractClient {
    contract: RewardDistributor<Provider<Http>>,
    connection: Connection,
}

impl RewardContractClient {
    pub fn new(connection: Connection, address: Address) -> Self {
        let contract = RewardDistributor::new(address, connection.provider());
        Self {
            contract,
            connection,
        }
    }
}

#[async_trait]
impl RewardContract for RewardContractClient {
    async fn genesis_claim_status(&self, account: Address) -> Result<bool> {
        self.contract
            .user_genesis_claim_status(account)
            .call()
            .await
            .map_err(|e| ClaimdError::chain_call("userGenesisClaimStatus", e))
    }

    async fn current_epoch(&self) -> Result<u64> {
        let epoch = self
            .contract
            .current_epoch()
            .call()
            .await
            .map_err(|e| ClaimdError::chain_call("currentEpoch", e))?;

        if epoch > U256::from(u64::MAX) {
            return Err(ClaimdError::chain_call(
                "currentEpoch",
                format!("epoch {epoch} exceeds u64 range"),
            ));
        }
        Ok(epoch.as_u64())
    }

    async fn claim_status(&self, account: Address, epoch: u64) -> Result<ClaimStatus> {
        let (buffer_amount, claimed) = self
            .contract
            .user_claim_status(account, U256::from(epoch))
            .call()
            .await
            .map_err(|e| ClaimdError::chain_call("userClaimStatus", e))?;

        Ok(ClaimStatus {
            buffer_amount,
            claimed,
        })
    }

    async fn submit_claim(&self, wallet: &Wallet) -> Result<H256> {
        let provider = self.connection.provider();
        let from = wallet.address();

        let nonce = provider
            .get_transaction_count(from, None)
            .await
            .map_err(|e| ClaimdError::chain_call("eth_getTransactionCount", e))?;
        let gas_price = provider
            .get_gas_price()
            .await
            .map_err(|e| ClaimdError::chain_call("eth_gasPrice", e))?;

        let mut tx: TypedTransaction = self.contract.claim_reward().tx.clone();
        tx.set_from(from);
        tx.set_nonce(nonce);
        tx.set_gas_price(gas_price);
        tx.set_chain_id(self.connection.chain_id());

        let gas_limit = provider
            .estimate_gas(&tx, None)
            .await
            .map_err(|e| ClaimdError::chain_call("eth_estimateGas", e))?;
        tx.set_gas(gas_limit);

        let raw = wallet.sign_transaction(&tx).await?;
        let pending = provider
            .send_raw_transaction(raw)
            .await
            .map_err(|e| ClaimdError::chain_call("eth_sendRawTransaction", e))?;
        let tx_hash = *pending;
        debug!("Claim transaction {tx_hash:?} submitted, waiting for receipt");

        let receipt = pending
            .await
            .map_err(|e| {
                ClaimdError::Transaction(format!("confirmation failed for {tx_hash:?}: {e}"))
            })?
            .ok_or_else(|| {
                ClaimdError::Transaction(format!(
                    "transaction {tx_hash:?} was dropped before confirmation"
                ))
            })?;

        Ok(receipt.transaction_hash)
    }
}
