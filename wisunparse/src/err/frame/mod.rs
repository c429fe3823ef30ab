mod header_error;
pub use header_error::*;

mod slice_error;
pub use slice_error::*;
