use crate::error::{ClaimdError, Result};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, Signature};
use zeroize::Zeroize;

/// Signing identity for one claim account.
///
/// # Security
/// The private key hex is only held during construction and zeroized
/// immediately after the underlying wallet is built, so the raw key never
/// outlives this constructor in our memory.
#[derive(Clone)]
pub struct Wallet {
    inner: LocalWallet,
    chain_id: u64,
}

impl Wallet {
    /// Create a wallet from a private key hex string, with or without the
    /// `0x` prefix.
    pub fn from_private_key(private_key: &str, chain_id: u64) -> Result<Self> {
        let mut secure_key = private_key.trim().trim_start_matches("0x").to_string();

        let parsed = secure_key.parse::<LocalWallet>();
        secure_key.zeroize();

        let wallet = parsed
            .map_err(|e| ClaimdError::Wallet(format!("Invalid private key: {e}")))?
            .with_chain_id(chain_id);

        Ok(Self {
            inner: wallet,
            chain_id,
        })
    }

    /// Derive the address for a private key without keeping a wallet
    /// around, for log attribution before a chain id is known. `None`
    /// when the key does not parse.
    pub fn derive_address(private_key: &str) -> Option<Address> {
        let mut secure_key = private_key.trim().trim_start_matches("0x").to_string();

        let parsed = secure_key.parse::<LocalWallet>();
        secure_key.zeroize();

        parsed.ok().map(|wallet| wallet.address())
    }

    /// Get the wallet address
    pub fn address(&self) -> Address {
        self.inner.address()
    }

    /// Get the chain ID
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Sign a fully-populated transaction, returning the raw RLP bytes
    /// ready for `eth_sendRawTransaction`.
    pub async fn sign_transaction(&self, tx: &TypedTransaction) -> Result<Bytes> {
        let signature: Signature = self
            .inner
            .sign_transaction(tx)
            .await
            .map_err(|e| ClaimdError::Wallet(format!("Failed to sign transaction: {e}")))?;

        Ok(tx.rlp_signed(&signature))
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address())
            .field("chain_id", &self.chain_id)
            .finish()
    }
}
