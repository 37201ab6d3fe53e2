//! Device classification by MAC prefix. Router hardware is recognised from an ordered,
//! extensible table of vendor OUIs; everything else is a generic network device.

use pnet::util::MacAddr;

use super::device::DeviceType;

pub(crate) const VENDOR_LOCAL: &str = "Local";
pub(crate) const VENDOR_ROUTER: &str = "Router";
pub(crate) const VENDOR_UNKNOWN: &str = "Unknown";

/// Parse `aa:bb:cc:dd:ee:ff` or `AA-BB-CC-DD-EE-FF`
pub fn parse_mac(raw: &str) -> Option<MacAddr> {
    let mut octets = [0u8; 6];
    let mut count = 0;
    for part in raw.trim().split([':', '-']) {
        if count == 6 || part.len() != 2 {
            return None;
        }
        octets[count] = u8::from_str_radix(part, 16).ok()?;
        count += 1;
    }
    if count != 6 {
        return None;
    }
    let [a, b, c, d, e, f] = octets;
    Some(MacAddr::new(a, b, c, d, e, f))
}

/// Parse a three-octet OUI such as `00:14:a8`
fn parse_oui(raw: &str) -> Option<[u8; 3]> {
    let parts: Vec<&str> = raw.trim().split([':', '-']).collect();
    if parts.len() != 3 || parts.iter().any(|p| p.len() != 2) {
        return None;
    }
    Some([
        u8::from_str_radix(parts[0], 16).ok()?,
        u8::from_str_radix(parts[1], 16).ok()?,
        u8::from_str_radix(parts[2], 16).ok()?,
    ])
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorPrefix {
    pub oui: [u8; 3],
    pub brand: String,
}

/// Ordered table of OUIs known to belong to consumer router hardware
#[derive(Debug, Clone)]
pub struct RouterPrefixTable {
    entries: Vec<VendorPrefix>,
}

impl Default for RouterPrefixTable {
    fn default() -> Self {
        Self::empty()
            .with_prefix("00:14:a8", "TP-Link")
            .with_prefix("00:05:5d", "D-Link")
            .with_prefix("00:18:4d", "Netgear")
    }
}

impl RouterPrefixTable {
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn with_prefix(mut self, prefix: &str, brand: &str) -> Self {
        self.add(prefix, brand);
        self
    }

    /// Append a prefix; returns false if it does not parse.
    pub fn add(&mut self, prefix: &str, brand: &str) -> bool {
        match parse_oui(prefix) {
            Some(oui) => {
                self.entries.push(VendorPrefix {
                    oui,
                    brand: brand.to_string(),
                });
                true
            }
            None => false,
        }
    }

    /// First matching entry in table order
    pub fn lookup(&self, mac: &MacAddr) -> Option<&VendorPrefix> {
        let oui = [mac.0, mac.1, mac.2];
        self.entries.iter().find(|entry| entry.oui == oui)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub device_type: DeviceType,
    pub vendor: String,
    pub is_router: bool,
}

#[derive(Debug, Clone, Default)]
pub struct DeviceClassifier {
    routers: RouterPrefixTable,
}

impl DeviceClassifier {
    pub fn new(routers: RouterPrefixTable) -> Self {
        Self { routers }
    }

    /// Classify a neighbor by its link-layer address. Pure: same input, same output.
    pub fn classify(&self, mac: &str) -> Classification {
        let is_router = parse_mac(mac).is_some_and(|mac| self.routers.lookup(&mac).is_some());

        if is_router {
            Self::gateway()
        } else {
            Classification {
                device_type: DeviceType::NetworkDevice,
                vendor: VENDOR_UNKNOWN.to_string(),
                is_router: false,
            }
        }
    }

    /// Fixed classification for the host running the scan
    pub fn local() -> Classification {
        Classification {
            device_type: DeviceType::Computer,
            vendor: VENDOR_LOCAL.to_string(),
            is_router: false,
        }
    }

    /// Fixed classification for the resolved default gateway
    pub fn gateway() -> Classification {
        Classification {
            device_type: DeviceType::RouterGateway,
            vendor: VENDOR_ROUTER.to_string(),
            is_router: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mac_formats() {
        assert_eq!(
            parse_mac("AA-BB-CC-DD-EE-FF").map(|m| m.to_string()),
            Some("aa:bb:cc:dd:ee:ff".to_string())
        );
        assert!(parse_mac("aa:bb:cc:dd:ee").is_none());
        assert!(parse_mac("aa:bb:cc:dd:ee:ff:00").is_none());
        assert!(parse_mac("a:bb:cc:dd:ee:ff").is_none());
        assert!(parse_mac("gateway-device").is_none());
    }

    #[test]
    fn test_router_prefixes() {
        let classifier = DeviceClassifier::default();
        for mac in ["00:14:a8:11:22:33", "00-05-5D-00-00-01", "00:18:4d:ab:cd:ef"] {
            let class = classifier.classify(mac);
            assert!(class.is_router, "{mac} should be a router");
            assert_eq!(class.device_type, DeviceType::RouterGateway);
            assert_eq!(class.vendor, "Router");
        }
    }

    #[test]
    fn test_prefix_miss() {
        let classifier = DeviceClassifier::default();
        let class = classifier.classify("aa:bb:cc:dd:ee:ff");
        assert_eq!(class.device_type, DeviceType::NetworkDevice);
        assert_eq!(class.vendor, "Unknown");
        assert!(!class.is_router);

        // Malformed MACs never match, even if they start with a router prefix
        assert!(!classifier.classify("00:14:a8").is_router);
    }

    #[test]
    fn test_classify_is_deterministic() {
        let classifier = DeviceClassifier::default();
        for mac in ["00:14:a8:11:22:33", "de:ad:be:ef:00:01", ""] {
            assert_eq!(classifier.classify(mac), classifier.classify(mac));
        }
    }

    #[test]
    fn test_table_is_extensible() {
        let mut table = RouterPrefixTable::default();
        assert_eq!(table.len(), 3);
        assert!(table.add("DC:A6:32", "Acme"));
        assert!(!table.add("nonsense", "Broken"));

        let classifier = DeviceClassifier::new(table);
        assert!(classifier.classify("dc:a6:32:01:02:03").is_router);
    }

    #[test]
    fn test_fixed_classifications() {
        let local = DeviceClassifier::local();
        assert_eq!(local.device_type, DeviceType::Computer);
        assert!(!local.is_router);

        let gateway = DeviceClassifier::gateway();
        assert_eq!(gateway.device_type, DeviceType::RouterGateway);
        assert!(gateway.is_router);
    }
}
