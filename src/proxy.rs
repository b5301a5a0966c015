//! Proxy string normalization.
//!
//! Proxy lists come from operators in loose formats: full URLs, bare
//! `host:port` pairs, or nothing at all. Normalization never fails hard;
//! anything the transport later rejects degrades to a direct connection.

use std::fmt;

/// How a connection to the RPC node is routed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyRoute {
    /// Connect to the node directly.
    Direct,
    /// Tunnel through the given proxy URL (scheme included).
    Proxied(String),
}

impl ProxyRoute {
    pub fn is_direct(&self) -> bool {
        matches!(self, ProxyRoute::Direct)
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            ProxyRoute::Direct => None,
            ProxyRoute::Proxied(url) => Some(url),
        }
    }
}

impl fmt::Display for ProxyRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyRoute::Direct => write!(f, "direct"),
            ProxyRoute::Proxied(url) => write!(f, "{url}"),
        }
    }
}

/// Normalize a raw proxy string into a route.
///
/// Empty input means direct. Recognized schemes (`socks5://`, `http://`,
/// `https://`) pass through unchanged; anything else is assumed to be a
/// bare `host:port` and gets an `http://` prefix.
pub fn format_proxy(raw: &str) -> ProxyRoute {
    let raw = raw.trim();
    if raw.is_empty() {
        return ProxyRoute::Direct;
    }

    if raw.starts_with("socks5://") || raw.starts_with("http://") || raw.starts_with("https://") {
        ProxyRoute::Proxied(raw.to_string())
    } else {
        ProxyRoute::Proxied(format!("http://{raw}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_is_direct() {
        assert_eq!(format_proxy(""), ProxyRoute::Direct);
        assert_eq!(format_proxy("   "), ProxyRoute::Direct);
        assert!(format_proxy("").is_direct());
    }

    #[test]
    fn test_known_schemes_pass_through() {
        assert_eq!(
            format_proxy("socks5://h:1"),
            ProxyRoute::Proxied("socks5://h:1".to_string())
        );
        assert_eq!(
            format_proxy("http://h:1"),
            ProxyRoute::Proxied("http://h:1".to_string())
        );
        assert_eq!(
            format_proxy("https://h:1"),
            ProxyRoute::Proxied("https://h:1".to_string())
        );
    }

    #[test]
    fn test_bare_host_port_gets_http_scheme() {
        assert_eq!(
            format_proxy("h:1"),
            ProxyRoute::Proxied("http://h:1".to_string())
        );
        assert_eq!(
            format_proxy("10.0.0.1:8080"),
            ProxyRoute::Proxied("http://10.0.0.1:8080".to_string())
        );
    }

    #[test]
    fn test_display_labels_routes() {
        assert_eq!(ProxyRoute::Direct.to_string(), "direct");
        assert_eq!(
            format_proxy("h:1").to_string(),
            "http://h:1"
        );
    }
}
