//! Neighbor enumeration from the host's address-resolution cache. Nothing is sent on the
//! wire: hosts that never talked to us are invisible here.

use std::net::Ipv4Addr;

use tracing::{debug, warn};

use super::classification::parse_mac;
use super::platform::{NeighborEntry, NeighborState, NetworkPlatform};

/// `ATF_COM`: entry has a completed link-layer address
const ATF_COM: u32 = 0x02;

/// A device candidate drawn from the neighbor cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Neighbor {
    pub ip: Ipv4Addr,
    pub mac: String,
}

/// Parse `/proc/net/arp` content. Malformed lines are skipped.
///
/// ```text
/// IP address       HW type     Flags       HW address            Mask     Device
/// 192.168.1.1      0x1         0x2         aa:bb:cc:dd:ee:ff     *        eth0
/// ```
pub fn parse_proc_arp(content: &str) -> impl Iterator<Item = NeighborEntry> + '_ {
    content.lines().skip(1).filter_map(parse_proc_arp_line)
}

fn parse_proc_arp_line(line: &str) -> Option<NeighborEntry> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 6 {
        return None;
    }

    let ip = parts[0].parse::<Ipv4Addr>().ok()?;
    let flags = u32::from_str_radix(parts[2].trim_start_matches("0x"), 16).ok()?;
    let mac = parse_mac(parts[3])?;

    let state = if flags & ATF_COM != 0 && !mac.is_zero() {
        NeighborState::Complete
    } else {
        NeighborState::Incomplete
    };

    Some(NeighborEntry {
        ip,
        mac: mac.to_string(),
        interface: parts[5].to_string(),
        state,
    })
}

/// One read of the neighbor cache, taken at the start of a scan.
#[derive(Debug, Default)]
pub struct NeighborTable {
    entries: Vec<NeighborEntry>,
}

impl NeighborTable {
    /// Read the table; an unreadable table is treated as empty.
    pub fn read(platform: &dyn NetworkPlatform) -> Self {
        match platform.neighbor_table() {
            Ok(entries) => {
                debug!(entries = entries.len(), "Read neighbor table");
                Self { entries }
            }
            Err(e) => {
                warn!(error = %e, "Neighbor table unreadable, continuing without neighbors");
                Self::default()
            }
        }
    }

    pub fn from_entries(entries: Vec<NeighborEntry>) -> Self {
        Self { entries }
    }

    /// Resolved link-layer address of `ip`, if the cache holds one
    pub fn mac_of(&self, ip: Ipv4Addr) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.ip == ip && e.state == NeighborState::Complete)
            .map(|e| e.mac.as_str())
    }

    /// Resolved neighbors other than the local host and the gateway.
    pub fn candidates(
        &self,
        local_ip: Ipv4Addr,
        gateway_ip: Option<Ipv4Addr>,
    ) -> impl Iterator<Item = Neighbor> + '_ {
        self.entries
            .iter()
            .filter(|e| e.state == NeighborState::Complete)
            .filter(move |e| e.ip != local_ip && Some(e.ip) != gateway_ip)
            .map(|e| Neighbor {
                ip: e.ip,
                mac: e.mac.clone(),
            })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
