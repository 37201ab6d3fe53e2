//! Access recommendation: vendor defaults for named appliances, otherwise the first
//! open service in HTTP > HTTPS > Telnet > SSH order.

use std::collections::HashMap;

use tracing::warn;

use super::types::{AccessMethod, AccessRecommendation, ApplianceDefault};
use crate::config::EngineConfig;
use crate::network::DeviceType;
use crate::scanner::{PortProbeResult, Service};

pub const GENERIC_CREDENTIAL_HINT: &str = "Try: admin:admin, admin:password, admin:(blank)";
const ROUTER_WEB_HINT: &str = "admin:admin or admin:password";
const ROUTER_SHELL_HINT: &str = "admin:admin";

#[derive(Debug, Clone)]
pub struct AccessPolicy {
    /// Keyed by lowercased appliance name
    appliances: HashMap<String, ApplianceDefault>,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        let mut policy = Self::empty();
        for name in ["HLK-RM04", "TP-Link", "D-Link", "Linksys", "Huawei", "ZTE"] {
            policy.insert(name, ApplianceDefault::new(AccessMethod::Http, "admin", "admin"));
        }
        for name in ["Netgear", "Arris"] {
            policy.insert(name, ApplianceDefault::new(AccessMethod::Http, "admin", "password"));
        }
        policy.insert(
            "Motorola",
            ApplianceDefault::new(AccessMethod::Http, "admin", "motorola"),
        );
        policy
    }
}

impl AccessPolicy {
    pub fn empty() -> Self {
        Self {
            appliances: HashMap::new(),
        }
    }

    /// Default table plus any appliance defaults from configuration
    pub fn from_config(config: &EngineConfig) -> Self {
        let mut policy = Self::default();
        for (name, method, credentials) in &config.extra_appliance_defaults {
            let method = match method.parse::<AccessMethod>() {
                Ok(method) => method,
                Err(e) => {
                    warn!(appliance = %name, error = %e, "Ignoring appliance default");
                    continue;
                }
            };
            let (username, password) = credentials
                .split_once(':')
                .unwrap_or((credentials.as_str(), ""));
            policy.insert(name, ApplianceDefault::new(method, username, password));
        }
        policy
    }

    pub fn insert(&mut self, name: &str, default: ApplianceDefault) {
        self.appliances.insert(name.trim().to_lowercase(), default);
    }

    pub fn appliance(&self, name: &str) -> Option<&ApplianceDefault> {
        self.appliances.get(&name.trim().to_lowercase())
    }

    pub fn recommend(&self, device_type: &DeviceType, ports: &PortProbeResult) -> AccessRecommendation {
        if let DeviceType::Appliance(name) = device_type
            && let Some(default) = self.appliance(name)
        {
            return AccessRecommendation {
                method: default.method,
                url: default.method.url(ports.ip),
                default_credentials: default.credentials(),
            };
        }

        let Some(service) = Service::ALL.into_iter().find(|s| ports.is_open(*s)) else {
            return AccessRecommendation {
                method: AccessMethod::Unknown,
                url: None,
                default_credentials: GENERIC_CREDENTIAL_HINT.to_string(),
            };
        };

        let hint = match (device_type, service.is_web()) {
            (DeviceType::RouterGateway, true) => ROUTER_WEB_HINT,
            (DeviceType::RouterGateway, false) => ROUTER_SHELL_HINT,
            _ => GENERIC_CREDENTIAL_HINT,
        };

        AccessRecommendation {
            method: AccessMethod::from(service),
            url: service.base_url(ports.ip),
            default_credentials: hint.to_string(),
        }
    }
}
