//! Match service client module.

mod credentials;
mod match_client;
mod source;
mod throttle;
mod wire;

pub use credentials::*;
pub use match_client::*;
pub use source::*;
pub use throttle::*;
pub use wire::TestSummary;
