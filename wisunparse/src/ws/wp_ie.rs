use arrayvec::ArrayVec;

use crate::err::ws::IeError;
use crate::err::{Layer, LenError};
use crate::ws::{read_u24_le, write_u24_le};
use crate::GenericChannelInfo;

/// Sub-IDs of the long form nested IEs inside the Wi-SUN payload IE
/// (WP-IE, group ID 0x4).
pub mod wp_ie_sub_id_long {
    pub const US: u8 = 0x01;
    pub const BS: u8 = 0x02;
    pub const VP: u8 = 0x03;
    pub const LCP: u8 = 0x04;
}

/// Sub-IDs of the short form nested IEs inside the WP-IE.
pub mod wp_ie_sub_id_short {
    pub const PAN: u8 = 0x04;
    pub const NETNAME: u8 = 0x05;
    pub const PANVER: u8 = 0x06;
    pub const GTKHASH: u8 = 0x07;
    pub const POM: u8 = 0x08;
    pub const LFNVER: u8 = 0x40;
    pub const LGTKHASH: u8 = 0x41;
}

fn check_len(slice: &[u8], required: usize) -> Result<(), IeError> {
    if slice.len() < required {
        return Err(LenError {
            required_len: required,
            len: slice.len(),
            layer: Layer::WisunPayloadIe,
            layer_start_offset: 0,
        }
        .into());
    }
    Ok(())
}

/// Unicast Schedule IE: an FFN's unicast listening schedule.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UsIe {
    pub dwell_interval_ms: u8,
    pub clock_drift: u8,
    pub timing_accuracy: u8,
    pub chan_info: GenericChannelInfo,
}

impl UsIe {
    pub fn from_slice(slice: &[u8]) -> Result<UsIe, IeError> {
        check_len(slice, 3)?;
        Ok(UsIe {
            dwell_interval_ms: slice[0],
            clock_drift: slice[1],
            timing_accuracy: slice[2],
            chan_info: GenericChannelInfo::from_slice(&slice[3..])?,
        })
    }

    pub fn to_content(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.push(self.dwell_interval_ms);
        buf.push(self.clock_drift);
        buf.push(self.timing_accuracy);
        self.chan_info.write(&mut buf);
        buf
    }
}

/// Broadcast Schedule IE: the PAN broadcast schedule & its identifier.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BsIe {
    pub broadcast_interval_ms: u32,
    /// Broadcast Schedule Identifier (BSI).
    pub broadcast_schedule_id: u16,
    pub dwell_interval_ms: u8,
    pub clock_drift: u8,
    pub timing_accuracy: u8,
    pub chan_info: GenericChannelInfo,
}

impl BsIe {
    pub fn from_slice(slice: &[u8]) -> Result<BsIe, IeError> {
        check_len(slice, 9)?;
        Ok(BsIe {
            broadcast_interval_ms: u32::from_le_bytes([slice[0], slice[1], slice[2], slice[3]]),
            broadcast_schedule_id: u16::from_le_bytes([slice[4], slice[5]]),
            dwell_interval_ms: slice[6],
            clock_drift: slice[7],
            timing_accuracy: slice[8],
            chan_info: GenericChannelInfo::from_slice(&slice[9..])?,
        })
    }

    pub fn to_content(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&self.broadcast_interval_ms.to_le_bytes());
        buf.extend_from_slice(&self.broadcast_schedule_id.to_le_bytes());
        buf.push(self.dwell_interval_ms);
        buf.push(self.clock_drift);
        buf.push(self.timing_accuracy);
        self.chan_info.write(&mut buf);
        buf
    }
}

// PAN-IE flags byte
const PAN_USE_PARENT_BS_IE: u8 = 0b0000_0001;
const PAN_ROUTING_METHOD: u8 = 0b0000_0010;
const PAN_LFN_WINDOW_STYLE: u8 = 0b0000_0100;
const PAN_FAN_TPS_VERSION_MASK: u8 = 0b1110_0000;
const PAN_FAN_TPS_VERSION_SHIFT: u8 = 5;

/// PAN Information IE.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct PanIe {
    pub pan_size: u16,
    pub routing_cost: u16,
    pub use_parent_bs_ie: bool,
    pub routing_method: bool,
    pub lfn_window_style: bool,
    pub fan_tps_version: u8,
}

impl PanIe {
    pub const LEN: usize = 5;

    pub fn from_slice(slice: &[u8]) -> Result<PanIe, IeError> {
        check_len(slice, PanIe::LEN)?;
        Ok(PanIe {
            pan_size: u16::from_le_bytes([slice[0], slice[1]]),
            routing_cost: u16::from_le_bytes([slice[2], slice[3]]),
            use_parent_bs_ie: 0 != slice[4] & PAN_USE_PARENT_BS_IE,
            routing_method: 0 != slice[4] & PAN_ROUTING_METHOD,
            lfn_window_style: 0 != slice[4] & PAN_LFN_WINDOW_STYLE,
            fan_tps_version: (slice[4] & PAN_FAN_TPS_VERSION_MASK) >> PAN_FAN_TPS_VERSION_SHIFT,
        })
    }

    pub fn to_content(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(PanIe::LEN);
        buf.extend_from_slice(&self.pan_size.to_le_bytes());
        buf.extend_from_slice(&self.routing_cost.to_le_bytes());
        let mut flags = (self.fan_tps_version << PAN_FAN_TPS_VERSION_SHIFT)
            & PAN_FAN_TPS_VERSION_MASK;
        if self.use_parent_bs_ie {
            flags |= PAN_USE_PARENT_BS_IE;
        }
        if self.routing_method {
            flags |= PAN_ROUTING_METHOD;
        }
        if self.lfn_window_style {
            flags |= PAN_LFN_WINDOW_STYLE;
        }
        buf.push(flags);
        buf
    }
}

/// Network Name IE (≤ 32 bytes of UTF-8, no terminator on the wire).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NetNameIe {
    pub name: ArrayVec<u8, 32>,
}

impl NetNameIe {
    /// Builds the IE from a name, truncating to the 32-byte limit.
    pub fn new(name: &str) -> NetNameIe {
        let mut bytes = ArrayVec::new();
        let _ = bytes.try_extend_from_slice(&name.as_bytes()[..name.len().min(32)]);
        NetNameIe { name: bytes }
    }

    pub fn from_slice(slice: &[u8]) -> Result<NetNameIe, IeError> {
        let mut name = ArrayVec::new();
        let _ = name.try_extend_from_slice(&slice[..slice.len().min(32)]);
        Ok(NetNameIe { name })
    }

    pub fn to_content(&self) -> Vec<u8> {
        self.name.to_vec()
    }
}

/// PAN Version IE.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct PanVerIe {
    pub pan_version: u16,
}

impl PanVerIe {
    pub const LEN: usize = 2;

    pub fn from_slice(slice: &[u8]) -> Result<PanVerIe, IeError> {
        check_len(slice, PanVerIe::LEN)?;
        Ok(PanVerIe {
            pan_version: u16::from_le_bytes([slice[0], slice[1]]),
        })
    }

    pub fn to_content(&self) -> Vec<u8> {
        self.pan_version.to_le_bytes().to_vec()
    }
}

/// GTK Hash IE: truncated hashes of the four group keys.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct GtkHashIe {
    pub hashes: [[u8; 8]; 4],
}

impl GtkHashIe {
    pub const LEN: usize = 32;

    pub fn from_slice(slice: &[u8]) -> Result<GtkHashIe, IeError> {
        check_len(slice, GtkHashIe::LEN)?;
        let mut hashes = [[0; 8]; 4];
        for (i, hash) in hashes.iter_mut().enumerate() {
            hash.copy_from_slice(&slice[i * 8..i * 8 + 8]);
        }
        Ok(GtkHashIe { hashes })
    }

    pub fn to_content(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(GtkHashIe::LEN);
        for hash in &self.hashes {
            buf.extend_from_slice(hash);
        }
        buf
    }
}

// LGTKHASH-IE first byte
const LGTKHASH_INCLUDED_MASK: u8 = 0b0000_0111;
const LGTKHASH_ACTIVE_MASK: u8 = 0b0001_1000;
const LGTKHASH_ACTIVE_SHIFT: u8 = 3;

/// LFN GTK Hash IE: active key index plus truncated hashes of the
/// installed LFN group keys.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct LgtkHashIe {
    pub active_index: u8,
    pub hashes: [Option<[u8; 8]>; 3],
}

impl LgtkHashIe {
    pub fn from_slice(slice: &[u8]) -> Result<LgtkHashIe, IeError> {
        check_len(slice, 1)?;
        let included = slice[0] & LGTKHASH_INCLUDED_MASK;
        let active_index = (slice[0] & LGTKHASH_ACTIVE_MASK) >> LGTKHASH_ACTIVE_SHIFT;
        let mut hashes = [None; 3];
        let mut rest = &slice[1..];
        for (i, hash) in hashes.iter_mut().enumerate() {
            if 0 != included & (1 << i) {
                check_len(rest, 8)?;
                let mut value = [0; 8];
                value.copy_from_slice(&rest[..8]);
                *hash = Some(value);
                rest = &rest[8..];
            }
        }
        Ok(LgtkHashIe {
            active_index,
            hashes,
        })
    }

    pub fn to_content(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        let mut included = 0;
        for (i, hash) in self.hashes.iter().enumerate() {
            if hash.is_some() {
                included |= 1 << i;
            }
        }
        buf.push(included | (self.active_index << LGTKHASH_ACTIVE_SHIFT) & LGTKHASH_ACTIVE_MASK);
        for hash in self.hashes.iter().flatten() {
            buf.extend_from_slice(hash);
        }
        buf
    }
}

// POM-IE first byte
const POM_COUNT_MASK: u8 = 0b0000_1111;
const POM_MDR_CAPABLE: u8 = 0b0001_0000;

/// PHY Operating Modes IE: up to 15 PHY mode IDs & the MDR command
/// capability flag.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PomIe {
    pub phy_op_mode_ids: ArrayVec<u8, 15>,
    pub mdr_command_capable: bool,
}

impl PomIe {
    pub fn from_slice(slice: &[u8]) -> Result<PomIe, IeError> {
        check_len(slice, 1)?;
        let count = (slice[0] & POM_COUNT_MASK) as usize;
        check_len(slice, 1 + count)?;
        let mut phy_op_mode_ids = ArrayVec::new();
        let _ = phy_op_mode_ids.try_extend_from_slice(&slice[1..1 + count]);
        Ok(PomIe {
            phy_op_mode_ids,
            mdr_command_capable: 0 != slice[0] & POM_MDR_CAPABLE,
        })
    }

    pub fn to_content(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(1 + self.phy_op_mode_ids.len());
        let mut head = self.phy_op_mode_ids.len() as u8 & POM_COUNT_MASK;
        if self.mdr_command_capable {
            head |= POM_MDR_CAPABLE;
        }
        buf.push(head);
        buf.extend_from_slice(&self.phy_op_mode_ids);
        buf
    }
}
