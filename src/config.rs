//! Engine configuration. Defaults are overridden by `NETACCESS_*` environment variables,
//! and the CLI applies its own flags on top.

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Address used to ask the kernel which source IP it would route through.
/// Connecting a UDP socket sends nothing on the wire.
pub const DEFAULT_ROUTE_PROBE: &str = "8.8.8.8:80";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Echo attempts before a device is declared unreachable
    pub ping_attempts: u32,
    pub ping_timeout_ms: u64,
    pub connect_timeout_ms: u64,
    pub http_timeout_ms: u64,
    /// Upper bound on devices probed at once during a scan
    pub max_concurrent_probes: usize,
    /// Probe every discovered device's management ports during a scan
    pub probe_devices: bool,
    pub resolve_hostnames: bool,
    pub hostname_timeout_ms: u64,
    pub route_probe_addr: SocketAddr,
    /// Additional router vendor prefixes, `("aa:bb:cc", "Brand")`
    #[serde(default)]
    pub extra_router_prefixes: Vec<(String, String)>,
    /// Additional appliance defaults, `("Name", "method", "user:pass")`
    #[serde(default)]
    pub extra_appliance_defaults: Vec<(String, String, String)>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ping_attempts: 3,
            ping_timeout_ms: 2000,
            connect_timeout_ms: 2000,
            http_timeout_ms: 5000,
            max_concurrent_probes: 32,
            probe_devices: false,
            resolve_hostnames: false,
            hostname_timeout_ms: 1000,
            route_probe_addr: DEFAULT_ROUTE_PROBE
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([8, 8, 8, 8], 80))),
            extra_router_prefixes: Vec::new(),
            extra_appliance_defaults: Vec::new(),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|val| val.parse::<T>().ok())
        .unwrap_or(default)
}

/// Parse `aa:bb:cc=Brand,00:11:22=Other`
fn parse_prefix_list(raw: &str) -> Vec<(String, String)> {
    raw.split(',')
        .filter_map(|item| {
            let (prefix, label) = item.split_once('=')?;
            let prefix = prefix.trim();
            if prefix.is_empty() {
                return None;
            }
            Some((prefix.to_string(), label.trim().to_string()))
        })
        .collect()
}

/// Parse `Name=method:user:pass;Other=https:admin:1234`
fn parse_appliance_list(raw: &str) -> Vec<(String, String, String)> {
    raw.split(';')
        .filter_map(|item| {
            let (name, rest) = item.split_once('=')?;
            let (method, credentials) = rest.split_once(':')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((
                name.to_string(),
                method.trim().to_string(),
                credentials.trim().to_string(),
            ))
        })
        .collect()
}

impl EngineConfig {
    /// Defaults overlaid with any `NETACCESS_*` environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            ping_attempts: env_or("NETACCESS_PING_ATTEMPTS", defaults.ping_attempts).max(1),
            ping_timeout_ms: env_or("NETACCESS_PING_TIMEOUT_MS", defaults.ping_timeout_ms),
            connect_timeout_ms: env_or("NETACCESS_CONNECT_TIMEOUT_MS", defaults.connect_timeout_ms),
            http_timeout_ms: env_or("NETACCESS_HTTP_TIMEOUT_MS", defaults.http_timeout_ms),
            max_concurrent_probes: env_or(
                "NETACCESS_MAX_CONCURRENT_PROBES",
                defaults.max_concurrent_probes,
            )
            .max(1),
            probe_devices: env_or("NETACCESS_PROBE_DEVICES", defaults.probe_devices),
            resolve_hostnames: env_or("NETACCESS_RESOLVE_HOSTNAMES", defaults.resolve_hostnames),
            hostname_timeout_ms: env_or(
                "NETACCESS_HOSTNAME_TIMEOUT_MS",
                defaults.hostname_timeout_ms,
            ),
            route_probe_addr: env_or("NETACCESS_ROUTE_PROBE", defaults.route_probe_addr),
            extra_router_prefixes: env::var("NETACCESS_ROUTER_PREFIXES")
                .map(|raw| parse_prefix_list(&raw))
                .unwrap_or_default(),
            extra_appliance_defaults: env::var("NETACCESS_APPLIANCE_DEFAULTS")
                .map(|raw| parse_appliance_list(&raw))
                .unwrap_or_default(),
        }
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_millis(self.ping_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    pub fn hostname_timeout(&self) -> Duration {
        Duration::from_millis(self.hostname_timeout_ms)
    }
}
