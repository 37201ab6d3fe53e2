use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::scanner::{Credentials, PortProbeResult, Service};

/// How an operator should reach a device's management interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMethod {
    Http,
    Https,
    Telnet,
    Ssh,
    Unknown,
}

impl AccessMethod {
    pub fn service(self) -> Option<Service> {
        match self {
            AccessMethod::Http => Some(Service::Http),
            AccessMethod::Https => Some(Service::Https),
            AccessMethod::Telnet => Some(Service::Telnet),
            AccessMethod::Ssh => Some(Service::Ssh),
            AccessMethod::Unknown => None,
        }
    }

    /// Admin page URL for the web methods
    pub fn url(self, ip: Ipv4Addr) -> Option<String> {
        self.service().and_then(|service| service.base_url(ip))
    }
}

impl From<Service> for AccessMethod {
    fn from(service: Service) -> Self {
        match service {
            Service::Http => AccessMethod::Http,
            Service::Https => AccessMethod::Https,
            Service::Telnet => AccessMethod::Telnet,
            Service::Ssh => AccessMethod::Ssh,
        }
    }
}

impl fmt::Display for AccessMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.service() {
            Some(service) => fmt::Display::fmt(&service, f),
            None => write!(f, "unknown"),
        }
    }
}

impl FromStr for AccessMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(AccessMethod::Http),
            "https" => Ok(AccessMethod::Https),
            "telnet" => Ok(AccessMethod::Telnet),
            "ssh" => Ok(AccessMethod::Ssh),
            "unknown" => Ok(AccessMethod::Unknown),
            other => Err(format!("unknown access method: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessRecommendation {
    pub method: AccessMethod,
    pub url: Option<String>,
    /// Advisory only; never verified
    pub default_credentials: String,
}

/// Vendor-known access for a named appliance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplianceDefault {
    pub method: AccessMethod,
    pub username: String,
    pub password: String,
}

impl ApplianceDefault {
    pub fn new(method: AccessMethod, username: &str, password: &str) -> Self {
        Self {
            method,
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    pub fn credentials(&self) -> String {
        format!("{}:{}", self.username, self.password)
    }
}

/// Result of a single-device handshake
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandshakeReport {
    pub ip: Ipv4Addr,
    pub device_type: String,
    pub ports: PortProbeResult,
    pub access: AccessRecommendation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStatus {
    /// Basic auth answered 200 or 302
    Authenticated,
    /// Basic auth answered with any other status
    Rejected,
    /// No response to the authenticated request
    Inconclusive,
    /// Telnet/SSH: port is there, login is left to the operator
    ManualLogin,
    /// Nothing to connect to
    NoAccessMethod,
}

/// Outcome of one auto-connect attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionAttempt {
    pub ip: Ipv4Addr,
    pub method: AccessMethod,
    pub status: AuthStatus,
    pub success: bool,
    pub url: Option<String>,
    pub http_status: Option<u16>,
    pub login_form_detected: bool,
    /// Credentials to use by hand, for methods not logged into automatically
    pub manual_credentials: Option<Credentials>,
    pub open_ports: Vec<u16>,
    pub message: String,
}
