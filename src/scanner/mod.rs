pub mod http;
pub mod icmp;
pub mod live;
pub mod manager;
pub mod port;

use std::collections::HashSet;
use std::fmt;
use std::net::Ipv4Addr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::network::{Device, NetworkIdentity};

/// Management services probed on every device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    Http,
    Https,
    Telnet,
    Ssh,
}

impl Service {
    /// In access priority order
    pub const ALL: [Service; 4] = [Service::Http, Service::Https, Service::Telnet, Service::Ssh];

    pub fn port(self) -> u16 {
        match self {
            Service::Http => 80,
            Service::Https => 443,
            Service::Telnet => 23,
            Service::Ssh => 22,
        }
    }

    pub fn is_web(self) -> bool {
        matches!(self, Service::Http | Service::Https)
    }

    /// `http://ip` / `https://ip` for the web services
    pub fn base_url(self, ip: Ipv4Addr) -> Option<String> {
        match self {
            Service::Http => Some(format!("http://{}", ip)),
            Service::Https => Some(format!("https://{}", ip)),
            Service::Telnet | Service::Ssh => None,
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Service::Http => write!(f, "http"),
            Service::Https => write!(f, "https"),
            Service::Telnet => write!(f, "telnet"),
            Service::Ssh => write!(f, "ssh"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Outcome of probing the four management ports of one device
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortProbeResult {
    pub ip: Ipv4Addr,
    pub http: bool,
    pub https: bool,
    pub ssh: bool,
    pub telnet: bool,
    /// Status of the unauthenticated GET, when one came back
    pub http_status: Option<u16>,
    pub https_status: Option<u16>,
}

impl PortProbeResult {
    pub fn closed(ip: Ipv4Addr) -> Self {
        Self {
            ip,
            http: false,
            https: false,
            ssh: false,
            telnet: false,
            http_status: None,
            https_status: None,
        }
    }

    pub fn is_open(&self, service: Service) -> bool {
        match service {
            Service::Http => self.http,
            Service::Https => self.https,
            Service::Telnet => self.telnet,
            Service::Ssh => self.ssh,
        }
    }

    pub fn open_ports(&self) -> Vec<u16> {
        Service::ALL
            .iter()
            .filter(|s| self.is_open(**s))
            .map(|s| s.port())
            .collect()
    }

    /// Same result with web ports that answered 404 marked closed. A 404 at the root
    /// means there is no admin page to log into.
    pub fn authenticable(&self) -> Self {
        let mut result = self.clone();
        if result.http_status == Some(404) {
            result.http = false;
        }
        if result.https_status == Some(404) {
            result.https = false;
        }
        result
    }
}

/// Network I/O used by probing and auto-connect. Every call is bounded by a timeout and
/// reports failure as a negative answer, never as an error.
#[async_trait]
pub trait NetworkProbe: Send + Sync {
    async fn is_reachable(&self, ip: Ipv4Addr) -> bool;

    async fn tcp_open(&self, ip: Ipv4Addr, port: u16) -> bool;

    /// Status code of a GET to `url`, with HTTP Basic credentials when given.
    /// `None` means no response at all.
    async fn http_status(&self, url: &str, credentials: Option<&Credentials>) -> Option<u16>;

    async fn http_body(&self, url: &str) -> Option<String>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanSummary {
    pub total_devices: usize,
    pub router_found: bool,
    pub scanned_at: DateTime<Utc>,
}

/// Outcome of one full-network scan. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanResult {
    pub network_identity: NetworkIdentity,
    pub devices: Vec<Device>,
    pub summary: ScanSummary,
}

impl ScanResult {
    /// Assemble a result from devices in discovery order (local, gateway, neighbors).
    /// Later duplicates of an IP are dropped; the summary is derived from what remains.
    pub fn new(network_identity: NetworkIdentity, devices: Vec<Device>) -> Self {
        let mut seen = HashSet::new();
        let devices: Vec<Device> = devices
            .into_iter()
            .filter(|device| seen.insert(device.ip))
            .collect();

        let summary = ScanSummary {
            total_devices: devices.len(),
            router_found: devices.iter().any(|d| d.is_router),
            scanned_at: Utc::now(),
        };

        Self {
            network_identity,
            devices,
            summary,
        }
    }

    pub fn device(&self, ip: Ipv4Addr) -> Option<&Device> {
        self.devices.iter().find(|d| d.ip == ip)
    }
}
