pub mod classification;
pub mod device;
pub mod identity;
pub mod neighbors;
pub mod platform;

pub use classification::{Classification, DeviceClassifier, RouterPrefixTable};
pub use device::{Device, DeviceType};
pub use identity::NetworkIdentity;
pub use neighbors::{Neighbor, NeighborTable};
pub use platform::{NetworkPlatform, SystemPlatform};
