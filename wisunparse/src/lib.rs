//! A library for parsing & writing IEEE 802.15.4-2015 data frames as used
//! by Wi-SUN FAN networks.
//!
//! Currently supported are:
//! * Frame Control & the 2015 PAN-ID compression rules
//! * Sequence number suppression
//! * Auxiliary security headers (ENC-MIC-64 with indexed keys)
//! * Header & payload Information Element lists with their termination
//!   markers (HT1, HT2, PT)
//! * The Wi-SUN header IEs (UTT, BT, LUTT, LBT, NR, LUS, LND, LTO, PAN-ID)
//! * The Wi-SUN payload IEs nested in the WP-IE (US, BS, PAN, NETNAME,
//!   PANVER, GTKHASH, LGTKHASH, POM)
//!
//! # Usage
//!
//! Add the following to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! wisunparse = "0.3"
//! ```
//!
//! # How to parse a data frame?
//!
//! [`DataFrame::parse_ind`] decodes a received frame down to its IE lists.
//! The IE byte ranges can then be walked with [`HeaderIeIter`] and
//! [`PayloadIeIter`], and the Wi-SUN specific contents decoded with the
//! `*Ie` types re-exported at the crate root:
//!
//! ```
//! use wisunparse::{Addr, DataFrame};
//!
//! let bytes = [
//!     0x61, 0xec, 0x10,
//!     0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01,
//!     0x10, 0x0f, 0x0e, 0x0d, 0x0c, 0x0b, 0x0a, 0x09,
//! ];
//! let frame = DataFrame::parse_ind(&bytes, 0xabcd).unwrap();
//! assert_eq!(frame.seq_number, Some(0x10));
//! assert_eq!(frame.dst_pan_id, 0xabcd);
//! assert_eq!(
//!     frame.src_addr,
//!     Addr::Ext([0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f, 0x10])
//! );
//! ```
//!
//! # How to build one?
//!
//! [`DataRequest`] is the inverse operation: the caller provides addressing,
//! security and prebuilt IE chunks, and [`DataRequest::write`] renders the
//! frame bytes with the frame counter and MIC regions reserved for the
//! radio:
//!
//! ```
//! use wisunparse::{Addr, DataRequest, SecurityLevel};
//!
//! let req = DataRequest {
//!     dst_addr: Addr::Ext([0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08]),
//!     ack_request: true,
//!     security: Some((SecurityLevel::EncMic64, 1)),
//!     ..Default::default()
//! };
//! let mut frame = Vec::new();
//! req.write(&mut frame, &[0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f, 0x10], 0xabcd);
//! ```

/// Errors of the parsing stages, grouped by layer.
pub mod err;

mod frame;
pub use frame::*;

mod ie;
pub use ie::*;

mod ws;
pub use ws::*;

#[cfg(test)]
pub(crate) mod test_gens;
