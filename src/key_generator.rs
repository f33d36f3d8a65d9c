//! Throttle key extraction from incoming requests.

use axum::http::HeaderMap;
use std::net::SocketAddr;

/// Key used when no address can be determined
pub const UNKNOWN_KEY: &str = "unknown";

/// Where the client address is taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStrategy {
    /// The socket peer only
    PeerAddress,
    /// `X-Forwarded-For`, then `X-Real-IP`, then the socket peer.
    /// Only safe behind a proxy that overwrites these headers.
    ForwardedHeaders,
}

/// Derives throttle keys from request metadata
#[derive(Debug, Clone)]
pub struct KeyGenerator {
    strategy: KeyStrategy,
}

impl KeyGenerator {
    pub fn new(strategy: KeyStrategy) -> Self {
        Self { strategy }
    }

    /// Generate the throttle key for a request
    pub fn generate_key(&self, headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
        let forwarded = match self.strategy {
            KeyStrategy::PeerAddress => None,
            KeyStrategy::ForwardedHeaders => Self::extract_forwarded_ip(headers),
        };

        forwarded
            .or_else(|| peer.map(|addr| addr.ip().to_string()))
            .unwrap_or_else(|| UNKNOWN_KEY.to_string())
    }

    /// Client IP announced by a proxy, if any
    pub fn extract_forwarded_ip(headers: &HeaderMap) -> Option<String> {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };

        header("x-forwarded-for")
            .and_then(|xff| xff.split(',').next().map(|ip| ip.trim().to_string()))
            .filter(|ip| !ip.is_empty())
            .or_else(|| header("x-real-ip").map(|ip| ip.trim().to_string()))
            .filter(|ip| !ip.is_empty())
    }
}

impl Default for KeyGenerator {
    fn default() -> Self {
        Self::new(KeyStrategy::PeerAddress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn peer() -> Option<SocketAddr> {
        Some("172.16.0.9:51234".parse().unwrap())
    }

    fn create_test_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("192.168.1.1, 10.0.0.1"));
        headers.insert("x-real-ip", HeaderValue::from_static("203.0.113.1"));
        headers
    }

    #[test]
    fn test_peer_strategy_ignores_headers() {
        let generator = KeyGenerator::new(KeyStrategy::PeerAddress);
        let key = generator.generate_key(&create_test_headers(), peer());
        assert_eq!(key, "172.16.0.9");
    }

    #[test]
    fn test_forwarded_strategy_prefers_first_hop() {
        let generator = KeyGenerator::new(KeyStrategy::ForwardedHeaders);
        let key = generator.generate_key(&create_test_headers(), peer());
        assert_eq!(key, "192.168.1.1");
    }

    #[test]
    fn test_forwarded_strategy_falls_back_to_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("203.0.113.1"));
        let generator = KeyGenerator::new(KeyStrategy::ForwardedHeaders);
        assert_eq!(generator.generate_key(&headers, peer()), "203.0.113.1");
    }

    #[test]
    fn test_forwarded_strategy_falls_back_to_peer() {
        let generator = KeyGenerator::new(KeyStrategy::ForwardedHeaders);
        assert_eq!(generator.generate_key(&HeaderMap::new(), peer()), "172.16.0.9");
    }

    #[test]
    fn test_unknown_without_any_address() {
        let generator = KeyGenerator::default();
        assert_eq!(generator.generate_key(&HeaderMap::new(), None), UNKNOWN_KEY);
    }
}
