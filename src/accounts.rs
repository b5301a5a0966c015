//! Account list loading.
//!
//! Credentials and proxies live in two line-oriented files paired by
//! position. The credential file is mandatory; the proxy file is optional
//! and a short proxy list is padded with direct connections.

use crate::error::{ClaimdError, Result};
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::warn;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// One claim account: a signing key and an optional proxy.
///
/// The key hex is wiped from memory when the account is dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Account {
    private_key: String,
    #[zeroize(skip)]
    proxy: Option<String>,
}

impl Account {
    pub fn new(private_key: String, proxy: Option<String>) -> Self {
        Self { private_key, proxy }
    }

    pub fn private_key(&self) -> &str {
        &self.private_key
    }

    pub fn proxy(&self) -> Option<&str> {
        self.proxy.as_deref()
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("private_key", &"<redacted>")
            .field("proxy", &self.proxy)
            .finish()
    }
}

/// Where the per-cycle account list comes from.
pub trait AccountSource: Send + Sync {
    fn load(&self) -> Result<Vec<Account>>;
}

/// Production source: the credential and proxy files from configuration.
#[derive(Debug, Clone)]
pub struct FileAccountSource {
    keys_path: PathBuf,
    proxy_path: PathBuf,
}

impl FileAccountSource {
    pub fn new(keys_path: PathBuf, proxy_path: PathBuf) -> Self {
        Self {
            keys_path,
            proxy_path,
        }
    }
}

impl AccountSource for FileAccountSource {
    fn load(&self) -> Result<Vec<Account>> {
        load_accounts(&self.keys_path, &self.proxy_path)
    }
}

/// Read non-empty trimmed lines from a file.
fn read_lines(path: &Path) -> std::io::Result<Vec<String>> {
    let contents = std::fs::read_to_string(path)?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Load the account list, pairing keys with proxies positionally.
///
/// A missing credential file is fatal. A missing proxy file, or a proxy
/// list shorter than the key list, degrades the affected accounts to
/// direct connections with a warning. Surplus proxy lines are ignored.
pub fn load_accounts(keys_path: &Path, proxy_path: &Path) -> Result<Vec<Account>> {
    let keys = match read_lines(keys_path) {
        Ok(keys) => keys,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(ClaimdError::CredentialsMissing(
                keys_path.display().to_string(),
            ));
        }
        Err(e) => return Err(e.into()),
    };

    let mut proxies = match read_lines(proxy_path) {
        Ok(proxies) => proxies,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!(
                "Proxy file {} not found, all accounts will connect directly",
                proxy_path.display()
            );
            Vec::new()
        }
        Err(e) => return Err(e.into()),
    };

    if proxies.len() < keys.len() {
        if !proxies.is_empty() {
            warn!(
                "Proxy count ({}) is below key count ({}), remaining accounts will connect directly",
                proxies.len(),
                keys.len()
            );
        }
        proxies.resize(keys.len(), String::new());
    }

    Ok(keys
        .into_iter()
        .zip(proxies)
        .map(|(key, proxy)| {
            let proxy = if proxy.is_empty() { None } else { Some(proxy) };
            Account::new(key, proxy)
        })
        .collect())
}
