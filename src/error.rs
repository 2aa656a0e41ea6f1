use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// The current address could not be determined.
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("failed to reach IP resolver {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("IP resolver {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("{origin} returned an invalid IP address: {value:?}")]
    InvalidAddress { origin: String, value: String },

    #[error("failed to enumerate network interfaces: {reason}")]
    InterfaceLookup { reason: String },

    #[error("network interface {interface} not found")]
    InterfaceNotFound { interface: String },

    #[error("network interface {interface} has no IPv4 address")]
    NoIpv4Address { interface: String },
}

/// The change log could not be read or written for a reason other than
/// absence or corrupted content.
#[derive(Debug, Error)]
#[error("failed to {action} change log {}: {source}", .path.display())]
pub struct LogIoError {
    pub action: &'static str,
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

impl LogIoError {
    pub fn new(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self {
            action,
            path: path.into(),
            source,
        }
    }
}

/// A call to the DNS provider failed at the HTTP or envelope level.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{call}: request failed: {source}")]
    Transport {
        call: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{call}: HTTP {status} - {reason}")]
    Status {
        call: &'static str,
        status: u16,
        reason: &'static str,
    },

    #[error("{call}: provider error {code}: {message}")]
    Api {
        call: &'static str,
        code: String,
        message: String,
    },

    #[error("{call}: failed to decode response: {source}")]
    Decode {
        call: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{call}: success envelope without a response body")]
    MissingResponse { call: &'static str },
}

/// Fatal outcome of a reconciliation run.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    LogIo(#[from] LogIoError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("no DNS record found for hostname {hostname}")]
    RecordNotFound { hostname: String },
}
