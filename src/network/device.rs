use std::fmt;
use std::net::Ipv4Addr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::classification::{Classification, DeviceClassifier};

/// Placeholder MACs used when the real address is not known
pub const LOCAL_MAC_PLACEHOLDER: &str = "local-device";
pub const GATEWAY_MAC_PLACEHOLDER: &str = "gateway-device";

pub const LOCAL_HOSTNAME_FALLBACK: &str = "This computer";
pub const GATEWAY_HOSTNAME: &str = "Gateway";

/// Kind of device, as reported to operators and fed to the access policy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum DeviceType {
    Computer,
    RouterGateway,
    NetworkDevice,
    Unknown,
    /// A named appliance model or brand, e.g. `HLK-RM04`
    Appliance(String),
}

impl DeviceType {
    pub fn as_str(&self) -> &str {
        match self {
            DeviceType::Computer => "Computer",
            DeviceType::RouterGateway => "Router/Gateway",
            DeviceType::NetworkDevice => "NetworkDevice",
            DeviceType::Unknown => "Unknown",
            DeviceType::Appliance(name) => name,
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for DeviceType {
    fn from(value: &str) -> Self {
        match value.trim() {
            "Computer" => DeviceType::Computer,
            "Router/Gateway" => DeviceType::RouterGateway,
            "NetworkDevice" | "Network Device" => DeviceType::NetworkDevice,
            "" | "Unknown" | "unknown" => DeviceType::Unknown,
            other => DeviceType::Appliance(other.to_string()),
        }
    }
}

impl From<String> for DeviceType {
    fn from(value: String) -> Self {
        DeviceType::from(value.as_str())
    }
}

impl From<DeviceType> for String {
    fn from(value: DeviceType) -> Self {
        value.as_str().to_string()
    }
}

/// One device found during a scan. The IP is its identity for that scan only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Device {
    pub ip: Ipv4Addr,
    pub mac: String,
    pub hostname: String,
    pub device_type: DeviceType,
    pub vendor: String,
    pub is_local: bool,
    pub is_router: bool,
    pub discovered_at: DateTime<Utc>,
    /// Management ports found open; filled only when the scan probes devices
    pub open_ports: Vec<u16>,
}

impl Device {
    pub fn new(ip: Ipv4Addr, mac: String, hostname: String, class: Classification) -> Self {
        Self {
            ip,
            mac,
            hostname,
            device_type: class.device_type,
            vendor: class.vendor,
            is_local: false,
            is_router: class.is_router,
            discovered_at: Utc::now(),
            open_ports: Vec::new(),
        }
    }

    pub fn local(ip: Ipv4Addr, mac: Option<&str>, hostname: Option<String>) -> Self {
        let mut device = Self::new(
            ip,
            mac.unwrap_or(LOCAL_MAC_PLACEHOLDER).to_string(),
            hostname.unwrap_or_else(|| LOCAL_HOSTNAME_FALLBACK.to_string()),
            DeviceClassifier::local(),
        );
        device.is_local = true;
        device
    }

    pub fn gateway(ip: Ipv4Addr, mac: Option<&str>) -> Self {
        Self::new(
            ip,
            mac.unwrap_or(GATEWAY_MAC_PLACEHOLDER).to_string(),
            GATEWAY_HOSTNAME.to_string(),
            DeviceClassifier::gateway(),
        )
    }

    /// Default display name for a neighbor without a resolved hostname
    pub fn neighbor_hostname(ip: Ipv4Addr) -> String {
        format!("Device {}", ip)
    }
}
