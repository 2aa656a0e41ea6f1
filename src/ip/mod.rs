mod external;
mod internal;

pub use external::get_external_ip;
pub use internal::get_interface_ip;

use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

use crate::config::IpSource;
use crate::error::ResolutionError;

/// Where a [`ResolvedAddress`] was obtained from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressOrigin {
    Remote(String),
    Interface(String),
}

impl fmt::Display for AddressOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressOrigin::Remote(url) => write!(f, "resolver {}", url),
            AddressOrigin::Interface(name) => write!(f, "interface {}", name),
        }
    }
}

/// A validated address together with the source it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAddress {
    pub address: IpAddr,
    pub origin: AddressOrigin,
}

/// Parses `value` as an IPv4 or IPv6 address, ignoring surrounding whitespace.
pub fn parse_address(value: &str) -> Option<IpAddr> {
    value.trim().parse().ok()
}

pub async fn resolve(
    source: &IpSource,
    timeout: Duration,
) -> Result<ResolvedAddress, ResolutionError> {
    let resolved = match source {
        IpSource::Remote { resolver_url } => ResolvedAddress {
            address: get_external_ip(resolver_url, timeout).await?,
            origin: AddressOrigin::Remote(resolver_url.clone()),
        },
        IpSource::Interface { interface } => ResolvedAddress {
            address: get_interface_ip(interface)?,
            origin: AddressOrigin::Interface(interface.clone()),
        },
    };

    tracing::info!("Resolved address {} from {}", resolved.address, resolved.origin);
    Ok(resolved)
}
