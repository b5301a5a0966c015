//! Proxy-aware RPC connection establishment.

use crate::error::{ClaimdError, Result};
use crate::proxy::ProxyRoute;
use ethers::providers::{Http, Middleware, Provider};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

/// An established, liveness-checked RPC channel bound to one node URL and
/// one route. Built per account per cycle; routes differ between accounts,
/// so connections are never pooled.
#[derive(Debug, Clone)]
pub struct Connection {
    provider: Arc<Provider<Http>>,
    chain_id: u64,
}

impl Connection {
    pub fn provider(&self) -> Arc<Provider<Http>> {
        self.provider.clone()
    }

    /// Chain id reported by the liveness probe.
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }
}

/// Builds per-account RPC connections, optionally tunneled through a proxy.
#[derive(Debug, Clone)]
pub struct ChainConnector {
    node_url: Url,
    request_timeout: Duration,
}

impl ChainConnector {
    pub fn new(node_url: Url, request_timeout: Duration) -> Self {
        Self {
            node_url,
            request_timeout,
        }
    }

    /// Establish a connection and verify the node actually answers.
    ///
    /// The request timeout applies to every route, proxied or direct. A
    /// proxy URL the transport rejects degrades to a direct connection
    /// with a warning; a failed liveness probe is a hard error, logged by
    /// the caller together with the account it belongs to. Retry policy
    /// lives in the orchestrator, not here.
    pub async fn connect(&self, route: &ProxyRoute) -> Result<Connection> {
        let client = self.build_client(route)?;
        let transport = Http::new_with_client(self.node_url.clone(), client);
        let provider = Provider::new(transport);

        match provider.get_chainid().await {
            Ok(chain_id) => {
                info!("Connected to {} (proxy: {})", self.node_url, route);
                Ok(Connection {
                    provider: Arc::new(provider),
                    chain_id: chain_id.as_u64(),
                })
            }
            Err(e) => Err(ClaimdError::Connection(format!(
                "{} unreachable: {}",
                self.node_url, e
            ))),
        }
    }

    fn build_client(&self, route: &ProxyRoute) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder().timeout(self.request_timeout);

        if let Some(proxy) = Self::proxy_for(route) {
            builder = builder.proxy(proxy);
        }

        Ok(builder.build()?)
    }

    /// Transport proxy for a route, or `None` for a direct connection.
    /// A proxy URL the transport rejects degrades to direct with one
    /// warning.
    fn proxy_for(route: &ProxyRoute) -> Option<reqwest::Proxy> {
        let proxy_url = route.url()?;
        match reqwest::Proxy::all(proxy_url) {
            Ok(proxy) => Some(proxy),
            Err(e) => {
                warn!(
                    "Proxy {} rejected ({}), falling back to a direct connection",
                    proxy_url, e
                );
                None
            }
        }
    }
}
