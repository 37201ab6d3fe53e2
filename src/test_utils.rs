use std::collections::{HashMap, HashSet};
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::network::platform::{
    DefaultRoute, InterfaceInfo, NeighborEntry, NeighborState, NetworkPlatform,
};
use crate::scanner::{Credentials, NetworkProbe, Service};

/// Host with fixed, scripted network data
pub struct StaticPlatform {
    route_source: Option<Ipv4Addr>,
    interfaces: Vec<InterfaceInfo>,
    route: Option<DefaultRoute>,
    neighbors: Option<Vec<NeighborEntry>>,
    hostname: Option<String>,
    reverse_names: HashMap<Ipv4Addr, String>,
}

fn loopback() -> InterfaceInfo {
    InterfaceInfo {
        name: "lo".to_string(),
        ipv4: vec![Ipv4Addr::LOCALHOST],
        mac: None,
        is_up: true,
        is_loopback: true,
    }
}

impl StaticPlatform {
    /// `local_ip` on an up `eth0`, no gateway, empty neighbor table
    pub fn new(local_ip: Ipv4Addr) -> Self {
        Self {
            route_source: Some(local_ip),
            interfaces: vec![
                loopback(),
                InterfaceInfo {
                    name: "eth0".to_string(),
                    ipv4: vec![local_ip],
                    mac: Some("02:00:00:00:00:01".to_string()),
                    is_up: true,
                    is_loopback: false,
                },
            ],
            route: None,
            neighbors: Some(Vec::new()),
            hostname: None,
            reverse_names: HashMap::new(),
        }
    }

    /// No route and only a loopback interface
    pub fn unresolvable() -> Self {
        Self {
            route_source: None,
            interfaces: vec![loopback()],
            route: None,
            neighbors: Some(Vec::new()),
            hostname: None,
            reverse_names: HashMap::new(),
        }
    }

    pub fn with_gateway(self, gateway: Ipv4Addr) -> Self {
        self.with_route(DefaultRoute {
            interface: "eth0".to_string(),
            gateway,
            metric: 100,
        })
    }

    pub fn with_route(mut self, route: DefaultRoute) -> Self {
        self.route = Some(route);
        self
    }

    pub fn with_neighbor(mut self, ip: Ipv4Addr, mac: &str, state: NeighborState) -> Self {
        self.neighbors.get_or_insert_with(Vec::new).push(NeighborEntry {
            ip,
            mac: mac.to_string(),
            interface: "eth0".to_string(),
            state,
        });
        self
    }

    pub fn with_hostname(mut self, hostname: &str) -> Self {
        self.hostname = Some(hostname.to_string());
        self
    }

    pub fn with_reverse_name(mut self, ip: Ipv4Addr, name: &str) -> Self {
        self.reverse_names.insert(ip, name.to_string());
        self
    }

    pub fn without_route_source(mut self) -> Self {
        self.route_source = None;
        self
    }

    pub fn without_interfaces(mut self) -> Self {
        self.interfaces.clear();
        self
    }

    pub fn without_neighbor_table(mut self) -> Self {
        self.neighbors = None;
        self
    }
}

impl NetworkPlatform for StaticPlatform {
    fn route_source_ip(&self, _probe: SocketAddr) -> Option<Ipv4Addr> {
        self.route_source
    }

    fn interfaces(&self) -> Vec<InterfaceInfo> {
        self.interfaces.clone()
    }

    fn default_route(&self) -> Option<DefaultRoute> {
        self.route.clone()
    }

    fn neighbor_table(&self) -> io::Result<Vec<NeighborEntry>> {
        self.neighbors
            .clone()
            .ok_or_else(|| io::Error::new(io::ErrorKind::PermissionDenied, "table unreadable"))
    }

    fn hostname(&self) -> Option<String> {
        self.hostname.clone()
    }

    fn reverse_lookup(&self, ip: Ipv4Addr) -> Option<String> {
        self.reverse_names.get(&ip).cloned()
    }
}

/// Scripted [`NetworkProbe`] that counts every call
#[derive(Default)]
pub struct MockProbe {
    reachable: bool,
    unreachable_ips: HashSet<Ipv4Addr>,
    open_ports: HashSet<u16>,
    http_statuses: HashMap<Service, u16>,
    auth_statuses: HashMap<Service, u16>,
    body: Option<String>,
    delay: Duration,
    pub reachability_calls: AtomicUsize,
    pub tcp_calls: AtomicUsize,
    pub http_calls: AtomicUsize,
    pub auth_calls: AtomicUsize,
    pub body_calls: AtomicUsize,
}

impl MockProbe {
    /// Every device answers; no port is open
    pub fn reachable() -> Self {
        Self {
            reachable: true,
            ..Self::default()
        }
    }

    pub fn unreachable() -> Self {
        Self::default()
    }

    pub fn with_unreachable_ip(mut self, ip: Ipv4Addr) -> Self {
        self.unreachable_ips.insert(ip);
        self
    }

    /// TCP port that accepts connections
    pub fn with_open_port(mut self, port: u16) -> Self {
        self.open_ports.insert(port);
        self
    }

    /// Status of an unauthenticated GET
    pub fn with_http_status(mut self, service: Service, status: u16) -> Self {
        self.http_statuses.insert(service, status);
        self
    }

    /// Status of a GET carrying credentials
    pub fn with_auth_status(mut self, service: Service, status: u16) -> Self {
        self.auth_statuses.insert(service, status);
        self
    }

    pub fn with_body(mut self, body: &str) -> Self {
        self.body = Some(body.to_string());
        self
    }

    /// Delay every reachability check
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Port checks issued, TCP and unauthenticated HTTP together
    pub fn port_calls(&self) -> usize {
        self.tcp_calls.load(Ordering::SeqCst) + self.http_calls.load(Ordering::SeqCst)
    }

    fn service_of(url: &str) -> Service {
        if url.starts_with("https://") {
            Service::Https
        } else {
            Service::Http
        }
    }
}

#[async_trait]
impl NetworkProbe for MockProbe {
    async fn is_reachable(&self, ip: Ipv4Addr) -> bool {
        self.reachability_calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.reachable && !self.unreachable_ips.contains(&ip)
    }

    async fn tcp_open(&self, _ip: Ipv4Addr, port: u16) -> bool {
        self.tcp_calls.fetch_add(1, Ordering::SeqCst);
        self.open_ports.contains(&port)
    }

    async fn http_status(&self, url: &str, credentials: Option<&Credentials>) -> Option<u16> {
        let service = Self::service_of(url);
        match credentials {
            Some(_) => {
                self.auth_calls.fetch_add(1, Ordering::SeqCst);
                self.auth_statuses.get(&service).copied()
            }
            None => {
                self.http_calls.fetch_add(1, Ordering::SeqCst);
                self.http_statuses.get(&service).copied()
            }
        }
    }

    async fn http_body(&self, _url: &str) -> Option<String> {
        self.body_calls.fetch_add(1, Ordering::SeqCst);
        self.body.clone()
    }
}
