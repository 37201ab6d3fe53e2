pub mod connect;
pub mod policy;
pub mod types;

pub use connect::{attempt, has_login_form};
pub use policy::AccessPolicy;
pub use types::{
    AccessMethod, AccessRecommendation, ApplianceDefault, AuthStatus, ConnectionAttempt,
    HandshakeReport,
};
