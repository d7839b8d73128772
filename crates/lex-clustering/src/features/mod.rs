//! Feature construction: encoding detected roles into numbers and scaling them.

mod encoder;
mod scaler;

pub use encoder::{CategoryEncoder, FeatureEncoder, UNKNOWN_CATEGORY};
pub use scaler::StandardScaler;
