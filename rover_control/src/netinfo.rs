//! Network interface diagnostics.
//!
//! Lists IPv4 addresses at startup so an operator knows where to point the
//! UDP control stream. Informational only.

use nix::ifaddrs::getifaddrs;
use std::net::Ipv4Addr;
use tracing::{info, warn};

/// `(interface, address)` for every IPv4 address on the host.
pub fn ipv4_interfaces() -> nix::Result<Vec<(String, Ipv4Addr)>> {
    let interfaces = getifaddrs()?
        .filter_map(|ifaddr| {
            let ip = ifaddr.address.as_ref()?.as_sockaddr_in()?.ip();
            Some((ifaddr.interface_name, ip))
        })
        .collect();
    Ok(interfaces)
}

/// Log every IPv4 interface with the UDP port to target.
pub fn log_interfaces(udp_port: u16) {
    match ipv4_interfaces() {
        Ok(interfaces) if interfaces.is_empty() => warn!("No IPv4 interfaces found"),
        Ok(interfaces) => {
            for (name, ip) in interfaces {
                info!("Interface {name}: {ip} (control port {udp_port})");
            }
        }
        Err(e) => warn!("Cannot list network interfaces: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loopback_is_listed() {
        let interfaces = ipv4_interfaces().unwrap();
        assert!(interfaces.iter().any(|(_, ip)| ip.is_loopback()));
    }
}
