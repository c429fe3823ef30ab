pub mod frame;
pub mod ie;
pub mod ws;

mod error_class;
pub use error_class::*;

mod layer;
pub use layer::*;

mod len_error;
pub use len_error::*;
