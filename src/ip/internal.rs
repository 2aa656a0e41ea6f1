use std::net::IpAddr;

use crate::error::ResolutionError;

/// Returns the IPv4 address assigned to the named network interface.
pub fn get_interface_ip(interface: &str) -> Result<IpAddr, ResolutionError> {
    let interfaces = local_ip_address::list_afinet_netifas().map_err(|e| {
        ResolutionError::InterfaceLookup {
            reason: e.to_string(),
        }
    })?;

    select_ipv4(&interfaces, interface)
}

fn select_ipv4(
    interfaces: &[(String, IpAddr)],
    interface: &str,
) -> Result<IpAddr, ResolutionError> {
    let mut assigned = interfaces
        .iter()
        .filter(|(name, _)| name == interface)
        .map(|(_, ip)| *ip)
        .peekable();

    if assigned.peek().is_none() {
        return Err(ResolutionError::InterfaceNotFound {
            interface: interface.to_string(),
        });
    }

    assigned
        .find(IpAddr::is_ipv4)
        .ok_or_else(|| ResolutionError::NoIpv4Address {
            interface: interface.to_string(),
        })
}
