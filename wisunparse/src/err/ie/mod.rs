mod list_error;
pub use list_error::*;
