use thiserror::Error;

/// Error surface of the discovery engine.
///
/// Only CIDR parsing, a double `scan` call, and report-file creation ever
/// surface to the caller. Per-host socket failures and timeouts are expected
/// during discovery and are treated as negative probe results; `Protocol`
/// marks data a wire parser rejected.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("invalid CIDR range: {0}")]
    InvalidCidr(String),

    #[error("a scan is already in progress")]
    ScanInProgress,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(String),
}
