//! WebSocket client with automatic reconnection
//!
//! Carries the exchange user channel: order events that let the fill
//! synchronizer react faster than its polling interval.

mod client;

pub use client::WsClient;

use std::time::Duration;

/// WebSocket client configuration
#[derive(Debug, Clone)]
pub struct WsConfig {
    /// WebSocket URL to connect to
    pub url: String,
    /// Maximum reconnection attempts before giving up (0 = infinite)
    pub max_reconnect_attempts: u32,
    /// Initial delay before the first reconnection attempt
    pub initial_reconnect_delay: Duration,
    /// Maximum delay between reconnection attempts
    pub max_reconnect_delay: Duration,
}

impl WsConfig {
    /// Create a new config with the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_reconnect_attempts: 0,
            initial_reconnect_delay: Duration::from_secs(1),
            max_reconnect_delay: Duration::from_secs(60),
        }
    }

    /// Set maximum reconnection attempts
    pub fn max_reconnects(mut self, n: u32) -> Self {
        self.max_reconnect_attempts = n;
        self
    }

    /// Set initial reconnection delay
    pub fn initial_delay(mut self, d: Duration) -> Self {
        self.initial_reconnect_delay = d;
        self
    }

    /// Set maximum reconnection delay
    pub fn max_delay(mut self, d: Duration) -> Self {
        self.max_reconnect_delay = d;
        self
    }
}

/// Messages surfaced to the consumer
#[derive(Debug, Clone)]
pub enum WsMessage {
    /// Text frame from the server
    Text(String),
    /// Connection established; resubscribe now
    Connected,
    /// Connection closed for good
    Disconnected,
    /// Reconnecting after a failure
    Reconnecting { attempt: u32 },
}

/// WebSocket errors
#[derive(Debug, thiserror::Error)]
pub enum WsError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("maximum reconnection attempts exceeded")]
    MaxReconnectsExceeded,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ws_config_defaults() {
        let config = WsConfig::new("wss://example.com");
        assert_eq!(config.url, "wss://example.com");
        assert_eq!(config.max_reconnect_attempts, 0);
        assert_eq!(config.initial_reconnect_delay, Duration::from_secs(1));
        assert_eq!(config.max_reconnect_delay, Duration::from_secs(60));
    }

    #[test]
    fn test_ws_config_builder() {
        let config = WsConfig::new("wss://example.com")
            .max_reconnects(5)
            .initial_delay(Duration::from_millis(500))
            .max_delay(Duration::from_secs(30));

        assert_eq!(config.max_reconnect_attempts, 5);
        assert_eq!(config.initial_reconnect_delay, Duration::from_millis(500));
        assert_eq!(config.max_reconnect_delay, Duration::from_secs(30));
    }

    #[test]
    fn test_ws_error_display() {
        let err = WsError::ConnectionFailed("timeout".to_string());
        assert_eq!(err.to_string(), "connection failed: timeout");
        assert_eq!(
            WsError::MaxReconnectsExceeded.to_string(),
            "maximum reconnection attempts exceeded"
        );
    }
}
