//! Local network identity: the host's IPv4 address, the interface carrying it, the default
//! gateway, and the /24 range assumed around it.

use std::net::{Ipv4Addr, SocketAddr};

use ipnetwork::Ipv4Network;
use serde::{Serialize, Serializer};
use tracing::{debug, warn};

use super::platform::{InterfaceInfo, NetworkPlatform};
use crate::error::ScanError;

pub const UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkIdentity {
    pub local_ip: Ipv4Addr,
    pub interface_name: String,
    #[serde(serialize_with = "serialize_gateway")]
    pub gateway_ip: Option<Ipv4Addr>,
    #[serde(serialize_with = "serialize_network")]
    pub cidr_range: Ipv4Network,
    /// MAC of the interface carrying `local_ip`, when known
    #[serde(skip)]
    pub local_mac: Option<String>,
}

fn serialize_gateway<S: Serializer>(gateway: &Option<Ipv4Addr>, s: S) -> Result<S::Ok, S::Error> {
    match gateway {
        Some(ip) => s.collect_str(ip),
        None => s.serialize_str(UNKNOWN),
    }
}

fn serialize_network<S: Serializer>(network: &Ipv4Network, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(network)
}

impl NetworkIdentity {
    /// Gateway distinct from the local host, if one was resolved
    pub fn distinct_gateway(&self) -> Option<Ipv4Addr> {
        self.gateway_ip.filter(|gw| *gw != self.local_ip)
    }
}

/// The /24 around `ip`: last octet zeroed.
///
/// This is a heuristic, not a read of the interface's real mask. A host on a /16 or a
/// /28 gets a range that is wrong but still usable for display.
pub fn network_range(ip: Ipv4Addr) -> Ipv4Network {
    let [a, b, c, _] = ip.octets();
    let base = Ipv4Addr::new(a, b, c, 0);
    Ipv4Network::new(base, 24).unwrap_or_else(|_| Ipv4Network::from(base))
}

fn is_usable(ip: &Ipv4Addr) -> bool {
    !ip.is_loopback() && !ip.is_unspecified()
}

fn first_interface_ip(interfaces: &[InterfaceInfo]) -> Option<Ipv4Addr> {
    interfaces
        .iter()
        .filter(|iface| iface.is_up && !iface.is_loopback)
        .flat_map(|iface| iface.ipv4.iter().copied())
        .find(is_usable)
}

/// Resolve the identity of the host. Only a missing local IP is fatal; interface and
/// gateway lookups fall back to "unknown".
pub fn resolve(
    platform: &dyn NetworkPlatform,
    route_probe: SocketAddr,
) -> Result<NetworkIdentity, ScanError> {
    let interfaces = platform.interfaces();

    let local_ip = platform
        .route_source_ip(route_probe)
        .filter(is_usable)
        .or_else(|| {
            debug!("No routed source address, falling back to interface addresses");
            first_interface_ip(&interfaces)
        })
        .ok_or_else(|| {
            ScanError::Resolution("no default route and no usable IPv4 interface".to_string())
        })?;

    let route = platform.default_route();
    let owner = interfaces.iter().find(|iface| iface.ipv4.contains(&local_ip));

    let interface_name = owner
        .map(|iface| iface.name.clone())
        .or_else(|| route.as_ref().map(|r| r.interface.clone()))
        .unwrap_or_else(|| {
            warn!(%local_ip, "Could not determine the active interface");
            UNKNOWN.to_string()
        });

    let gateway_ip = route.map(|r| r.gateway).filter(is_usable);
    if gateway_ip.is_none() {
        warn!("No default gateway found");
    }

    Ok(NetworkIdentity {
        local_ip,
        interface_name,
        gateway_ip,
        cidr_range: network_range(local_ip),
        local_mac: owner.and_then(|iface| iface.mac.clone()),
    })
}
