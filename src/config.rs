use config::{Config, ConfigError, Environment, File};
use ethers::types::Address;
use serde::Deserialize;
use std::path::Path;
use url::Url;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub accounts: AccountsConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    /// JSON-RPC endpoint used for all reads and writes
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    /// Reward contract address
    #[serde(default = "default_contract_address")]
    pub contract_address: String,
    /// Transport timeout applied to every RPC request, proxied or direct
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            contract_address: default_contract_address(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountsConfig {
    /// File with one private key per line
    #[serde(default = "default_private_keys_file")]
    pub private_keys_file: String,
    /// File with one proxy per line, paired positionally with the keys
    #[serde(default = "default_proxy_file")]
    pub proxy_file: String,
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            private_keys_file: default_private_keys_file(),
            proxy_file: default_proxy_file(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Pause between successful cycles in seconds (default: 6 hours)
    #[serde(default = "default_cycle_interval_secs")]
    pub cycle_interval_secs: u64,
    /// Backoff after a failed cycle in seconds
    #[serde(default = "default_error_backoff_secs")]
    pub error_backoff_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            cycle_interval_secs: default_cycle_interval_secs(),
            error_backoff_secs: default_error_backoff_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_rpc_url() -> String {
    "https://rpc.testnet.humanity.org".to_string()
}

fn default_contract_address() -> String {
    "0xa18f6FCB2Fd4884436d10610E69DB7BFa1bFe8C7".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_private_keys_file() -> String {
    "private_keys.txt".to_string()
}

fn default_proxy_file() -> String {
    "proxy.txt".to_string()
}

fn default_cycle_interval_secs() -> u64 {
    6 * 60 * 60
}

fn default_error_backoff_secs() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Load default config file if present
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Override with environment variables (CLAIMD_CHAIN__RPC_URL, etc.)
            .add_source(
                Environment::with_prefix("CLAIMD")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        match Url::parse(&self.chain.rpc_url) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            Ok(url) => errors.push(format!("rpc_url has unsupported scheme '{}'", url.scheme())),
            Err(e) => errors.push(format!("rpc_url is not a valid URL: {e}")),
        }

        if self.chain.contract_address.parse::<Address>().is_err() {
            errors.push(format!(
                "contract_address '{}' is not a valid address",
                self.chain.contract_address
            ));
        }

        if self.chain.request_timeout_secs == 0 {
            errors.push("request_timeout_secs must be positive".to_string());
        }

        if self.scheduler.cycle_interval_secs == 0 {
            errors.push("cycle_interval_secs must be positive".to_string());
        }

        if self.scheduler.error_backoff_secs == 0 {
            errors.push("error_backoff_secs must be positive".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chain.request_timeout_secs, 30);
        assert_eq!(config.scheduler.cycle_interval_secs, 21_600);
        assert_eq!(config.scheduler.error_backoff_secs, 60);
        assert_eq!(config.accounts.private_keys_file, "private_keys.txt");
    }

    #[test]
    fn test_validate_rejects_bad_endpoint_and_address() {
        let mut config = AppConfig::default();
        config.chain.rpc_url = "not a url".to_string();
        config.chain.contract_address = "0x1234".to_string();

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_validate_rejects_zero_intervals() {
        let mut config = AppConfig::default();
        config.scheduler.cycle_interval_secs = 0;
        config.chain.request_timeout_secs = 0;

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
    }
}
