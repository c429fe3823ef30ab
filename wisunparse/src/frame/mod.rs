mod address;
pub use address::*;

mod data_frame;
pub use data_frame::*;

mod frame_control;
pub use frame_control::*;

mod pan_id_compression;
pub use pan_id_compression::*;

mod security;
pub use security::*;
