mod ie_error;
pub use ie_error::*;
