//! Client configuration

use std::time::Duration;

/// Default server port
pub const DEFAULT_PORT: u16 = 5000;

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Seat-map lookups sit on the tap-to-open path, so they get a tighter
/// timeout than regular requests.
pub const SEAT_MAP_TIMEOUT_SECS: u64 = 3;

/// Opportunistic seat-map caching after a refresh is not latency
/// sensitive, so it tolerates a slower server.
pub const SEAT_CACHE_TIMEOUT_SECS: u64 = 10;

/// Client configuration for connecting to a POS server
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server IPv4 address (e.g., "192.168.1.10")
    pub server_ip: String,

    /// Server port
    pub port: u16,

    /// Default request timeout in seconds
    pub timeout: u64,

    /// Seat-map request timeout in seconds
    pub seat_map_timeout: u64,

    /// Background seat-map caching timeout in seconds
    pub seat_cache_timeout: u64,
}

impl ClientConfig {
    /// Create a new configuration for the given server address
    pub fn new(server_ip: impl Into<String>) -> Self {
        Self {
            server_ip: server_ip.into(),
            port: DEFAULT_PORT,
            timeout: DEFAULT_TIMEOUT_SECS,
            seat_map_timeout: SEAT_MAP_TIMEOUT_SECS,
            seat_cache_timeout: SEAT_CACHE_TIMEOUT_SECS,
        }
    }

    /// Set the server port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the default request timeout
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = seconds;
        self
    }

    /// REST API base URL
    pub fn base_url(&self) -> String {
        format!("http://{}:{}/api", self.server_ip, self.port)
    }

    /// Push channel URL
    pub fn ws_url(&self) -> String {
        format!("ws://{}:{}/ws", self.server_ip, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn seat_map_timeout(&self) -> Duration {
        Duration::from_secs(self.seat_map_timeout)
    }

    pub fn seat_cache_timeout(&self) -> Duration {
        Duration::from_secs(self.seat_cache_timeout)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("127.0.0.1")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_are_derived_from_address_and_port() {
        let config = ClientConfig::new("192.168.1.10").with_port(8080);
        assert_eq!(config.base_url(), "http://192.168.1.10:8080/api");
        assert_eq!(config.ws_url(), "ws://192.168.1.10:8080/ws");
    }

    #[test]
    fn defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.seat_map_timeout, SEAT_MAP_TIMEOUT_SECS);
    }
}
