//! Error types surfaced by the engine. Component-local failures (unreadable neighbor
//! table, port timeouts, prefix misses) never appear here; they degrade to defaults.

use std::net::Ipv4Addr;

use thiserror::Error;

/// Failure of a full-network scan.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    /// No local IPv4 identity could be determined; the scan cannot start.
    #[error("Failed to resolve local network identity: {0}")]
    Resolution(String),

    /// A newer scan was started before this one finished.
    #[error("Scan superseded by a newer scan")]
    Superseded,

    #[error("Scan task aborted: {0}")]
    Aborted(String),
}

/// Failure of a single-device handshake or auto-connect.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandshakeError {
    #[error("Device {0} is not responding")]
    DeviceUnreachable(Ipv4Addr),

    #[error("Invalid IPv4 address: {0}")]
    InvalidAddress(String),
}

/// Failure to build the live probing stack.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = HandshakeError::DeviceUnreachable(Ipv4Addr::new(192, 168, 1, 9));
        assert_eq!(err.to_string(), "Device 192.168.1.9 is not responding");

        let err = ScanError::Resolution("no default route".to_string());
        assert!(err.to_string().contains("no default route"));
    }
}
