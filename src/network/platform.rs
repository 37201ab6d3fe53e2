//! Host network data behind one seam. Linux reads the kernel's own tables
//! (`/proc/net/arp`, `/proc/net/route`) and enumerates interfaces through
//! `pnet::datalink`; other targets get empty tables and degrade to "unknown".

use std::fs;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use std::path::PathBuf;

use pnet::datalink;

use super::neighbors::parse_proc_arp;

/// Snapshot of one local interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceInfo {
    pub name: String,
    pub ipv4: Vec<Ipv4Addr>,
    pub mac: Option<String>,
    pub is_up: bool,
    pub is_loopback: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultRoute {
    pub interface: String,
    pub gateway: Ipv4Addr,
    pub metric: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NeighborState {
    Complete,
    /// Resolution pending or failed; no usable link-layer address
    Incomplete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborEntry {
    pub ip: Ipv4Addr,
    pub mac: String,
    pub interface: String,
    pub state: NeighborState,
}

/// Everything the engine needs to know about the host it runs on.
pub trait NetworkPlatform: Send + Sync {
    /// Source address the kernel would use to reach `probe`.
    fn route_source_ip(&self, probe: SocketAddr) -> Option<Ipv4Addr>;

    fn interfaces(&self) -> Vec<InterfaceInfo>;

    fn default_route(&self) -> Option<DefaultRoute>;

    fn neighbor_table(&self) -> io::Result<Vec<NeighborEntry>>;

    fn hostname(&self) -> Option<String>;

    /// Blocking reverse lookup; callers bound it with a timeout.
    fn reverse_lookup(&self, ip: Ipv4Addr) -> Option<String>;
}

/// The running host.
pub struct SystemPlatform {
    arp_table: Option<PathBuf>,
    route_table: Option<PathBuf>,
}

impl SystemPlatform {
    pub fn new() -> Self {
        if cfg!(target_os = "linux") {
            Self {
                arp_table: Some(PathBuf::from("/proc/net/arp")),
                route_table: Some(PathBuf::from("/proc/net/route")),
            }
        } else {
            Self {
                arp_table: None,
                route_table: None,
            }
        }
    }

    /// Read kernel tables from explicit files (same format as `/proc/net/*`)
    pub fn with_tables(arp_table: impl Into<PathBuf>, route_table: impl Into<PathBuf>) -> Self {
        Self {
            arp_table: Some(arp_table.into()),
            route_table: Some(route_table.into()),
        }
    }
}

impl Default for SystemPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkPlatform for SystemPlatform {
    fn route_source_ip(&self, probe: SocketAddr) -> Option<Ipv4Addr> {
        let socket = UdpSocket::bind(("0.0.0.0", 0)).ok()?;
        socket.connect(probe).ok()?;
        match socket.local_addr().ok()?.ip() {
            IpAddr::V4(ip) if !ip.is_unspecified() => Some(ip),
            _ => None,
        }
    }

    fn interfaces(&self) -> Vec<InterfaceInfo> {
        datalink::interfaces()
            .into_iter()
            .map(|iface| InterfaceInfo {
                ipv4: iface
                    .ips
                    .iter()
                    .filter_map(|ip| match ip.ip() {
                        IpAddr::V4(v4) => Some(v4),
                        IpAddr::V6(_) => None,
                    })
                    .collect(),
                mac: iface
                    .mac
                    .filter(|mac| !mac.is_zero())
                    .map(|mac| mac.to_string()),
                is_up: iface.is_up(),
                is_loopback: iface.is_loopback(),
                name: iface.name,
            })
            .collect()
    }

    fn default_route(&self) -> Option<DefaultRoute> {
        let path = self.route_table.as_ref()?;
        let content = fs::read_to_string(path).ok()?;
        parse_proc_route(&content)
    }

    fn neighbor_table(&self) -> io::Result<Vec<NeighborEntry>> {
        let path = self.arp_table.as_ref().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::Unsupported,
                "neighbor table not available on this platform",
            )
        })?;
        let content = fs::read_to_string(path)?;
        Ok(parse_proc_arp(&content).collect())
    }

    fn hostname(&self) -> Option<String> {
        dns_lookup::get_hostname()
            .ok()
            .filter(|name| !name.trim().is_empty())
    }

    fn reverse_lookup(&self, ip: Ipv4Addr) -> Option<String> {
        dns_lookup::lookup_addr(&IpAddr::V4(ip))
            .ok()
            .filter(|name| *name != ip.to_string())
    }
}

const RTF_UP: u32 = 0x0001;
const RTF_GATEWAY: u32 = 0x0002;

/// Pick the lowest-metric default route from `/proc/net/route` content.
///
/// Addresses in that table are hex in host (little-endian) byte order, so
/// `0101A8C0` is 192.168.1.1.
pub fn parse_proc_route(content: &str) -> Option<DefaultRoute> {
    content
        .lines()
        .skip(1)
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 8 {
                return None;
            }
            let destination = u32::from_str_radix(parts[1], 16).ok()?;
            let gateway = u32::from_str_radix(parts[2], 16).ok()?;
            let flags = u32::from_str_radix(parts[3], 16).ok()?;
            let metric = parts[6].parse::<u32>().ok()?;
            let mask = u32::from_str_radix(parts[7], 16).ok()?;

            let is_default = destination == 0 && mask == 0;
            let usable = flags & RTF_UP != 0 && flags & RTF_GATEWAY != 0;
            if !is_default || !usable || gateway == 0 {
                return None;
            }

            Some(DefaultRoute {
                interface: parts[0].to_string(),
                gateway: Ipv4Addr::from(gateway.to_le_bytes()),
                metric,
            })
        })
        .min_by_key(|route| route.metric)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const ROUTE_TABLE: &str = "\
Iface\tDestination\tGateway \tFlags\tRefCnt\tUse\tMetric\tMask\t\tMTU\tWindow\tIRTT
wlan0\t00000000\t0101A8C0\t0003\t0\t0\t600\t00000000\t0\t0\t0
eth0\t00000000\t0100000A\t0003\t0\t0\t100\t00000000\t0\t0\t0
eth0\t0000000A\t00000000\t0001\t0\t0\t100\t00FFFFFF\t0\t0\t0
";

    #[test]
    fn test_parse_proc_route_picks_lowest_metric() {
        let route = parse_proc_route(ROUTE_TABLE).unwrap();
        assert_eq!(route.interface, "eth0");
        assert_eq!(route.gateway, Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(route.metric, 100);
    }

    #[test]
    fn test_parse_proc_route_little_endian() {
        let table = "Iface\tDestination\tGateway\tFlags\tRefCnt\tUse\tMetric\tMask\n\
                     wlan0\t00000000\t0101A8C0\t0003\t0\t0\t600\t00000000\n";
        let route = parse_proc_route(table).unwrap();
        assert_eq!(route.gateway, Ipv4Addr::new(192, 168, 1, 1));
    }

    #[test]
    fn test_parse_proc_route_without_default() {
        let table = "Iface\tDestination\tGateway\tFlags\tRefCnt\tUse\tMetric\tMask\n\
                     eth0\t0001A8C0\t00000000\t0001\t0\t0\t100\t00FFFFFF\n\
                     garbage line\n";
        assert!(parse_proc_route(table).is_none());
        assert!(parse_proc_route("").is_none());
    }

    #[test]
    fn test_system_platform_reads_table_files() {
        let mut arp = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            arp,
            "IP address       HW type     Flags       HW address            Mask     Device"
        )
        .unwrap();
        writeln!(
            arp,
            "192.168.1.1      0x1         0x2         aa:bb:cc:dd:ee:ff     *        eth0"
        )
        .unwrap();
        let mut route = tempfile::NamedTempFile::new().unwrap();
        write!(route, "{}", ROUTE_TABLE).unwrap();

        let platform = SystemPlatform::with_tables(arp.path(), route.path());
        let neighbors = platform.neighbor_table().unwrap();
        assert_eq!(neighbors.len(), 1);
        assert_eq!(neighbors[0].ip, Ipv4Addr::new(192, 168, 1, 1));
        assert_eq!(
            platform.default_route().map(|r| r.gateway),
            Some(Ipv4Addr::new(10, 0, 0, 1))
        );
    }

    #[test]
    fn test_missing_table_is_an_error() {
        let platform = SystemPlatform::with_tables("/nonexistent/arp", "/nonexistent/route");
        assert!(platform.neighbor_table().is_err());
        assert!(platform.default_route().is_none());
    }
}
