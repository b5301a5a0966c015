use thiserror::Error;

/// Main error type for the claim daemon
#[derive(Error, Debug)]
pub enum ClaimdError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Validation(String),

    // The credential source is absent. This is the one fatal error;
    // everything else is retried or skipped.
    #[error("Credential file not found: {0}")]
    CredentialsMissing(String),

    // Network errors
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Connection failed: {0}")]
    Connection(String),

    // Contract/RPC call errors, tagged with the failing method
    #[error("Chain call '{method}' failed: {reason}")]
    ChainCall {
        method: &'static str,
        reason: String,
    },

    // Crypto/signing errors
    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Transaction failed: {0}")]
    Transaction(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl ClaimdError {
    pub fn chain_call(method: &'static str, err: impl std::fmt::Display) -> Self {
        ClaimdError::ChainCall {
            method,
            reason: err.to_string(),
        }
    }

    /// Whether this error must terminate the process instead of being
    /// absorbed by the cycle loop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ClaimdError::CredentialsMissing(_))
    }
}

/// Result type alias for ClaimdError
pub type Result<T> = std::result::Result<T, ClaimdError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_missing_credentials_is_fatal() {
        assert!(ClaimdError::CredentialsMissing("private_keys.txt".into()).is_fatal());
        assert!(!ClaimdError::Connection("refused".into()).is_fatal());
        assert!(!ClaimdError::chain_call("currentEpoch", "timeout").is_fatal());
    }

    #[test]
    fn test_chain_call_carries_method_name() {
        let err = ClaimdError::chain_call("userClaimStatus", "execution reverted");
        assert_eq!(
            err.to_string(),
            "Chain call 'userClaimStatus' failed: execution reverted"
        );
    }
}
