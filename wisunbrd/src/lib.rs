//! Wi-SUN FAN 1.1 border router core.
//!
//! The crate is layered bottom-up; each layer depends only on the layers
//! below it:
//!
//! * [`bus`]: framed byte transport to the radio co-processor (RCP)
//! * [`hif`] & [`rcp`]: the host ↔ RCP command protocol & negotiated
//!   capabilities
//! * [`wisunparse`] (separate crate): the IEEE 802.15.4-2015 frame & IE
//!   codec
//! * [`ws`]: neighbor table, FHSS timing, regulatory database, PAN state
//!   & PAN management
//! * [`ctl`]: the local control API (methods, properties, change
//!   notifications)
//! * [`app`]: the orchestrator owning the poll loop and the root
//!   context
//!
//! The collaborators the core only talks contracts with (TUN device, RPL
//! root, IPv6 neighbor discovery, key storage) live under [`net`] and
//! [`storage`].

pub mod app;
pub mod bus;
pub mod ctl;
pub mod error;
pub mod hif;
pub mod net;
pub mod rcp;
pub mod storage;
pub mod wire;
pub mod ws;

pub use error::{Error, Result};
