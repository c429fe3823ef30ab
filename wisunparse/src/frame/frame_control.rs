use crate::err::frame::HeaderError;
use crate::AddrMode;

// IEEE 802.15.4-2020 Figure 7-2 Format of the Frame Control field
const FCF_FRAME_TYPE_SHIFT: u16 = 0;
const FCF_FRAME_TYPE_MASK: u16 = 0b0000_0000_0000_0111;
const FCF_SECURITY_ENABLED: u16 = 0b0000_0000_0000_1000;
const FCF_FRAME_PENDING: u16 = 0b0000_0000_0001_0000;
const FCF_ACK_REQ: u16 = 0b0000_0000_0010_0000;
const FCF_PAN_ID_COMPRESSION: u16 = 0b0000_0000_0100_0000;
const FCF_SEQ_NUM_SUPPR: u16 = 0b0000_0001_0000_0000;
const FCF_IE_PRESENT: u16 = 0b0000_0010_0000_0000;
const FCF_DST_ADDR_MODE_SHIFT: u16 = 10;
const FCF_DST_ADDR_MODE_MASK: u16 = 0b0000_1100_0000_0000;
const FCF_FRAME_VERSION_SHIFT: u16 = 12;
const FCF_FRAME_VERSION_MASK: u16 = 0b0011_0000_0000_0000;
const FCF_SRC_ADDR_MODE_SHIFT: u16 = 14;
const FCF_SRC_ADDR_MODE_MASK: u16 = 0b1100_0000_0000_0000;

/// Frame type values of the frame control field.
pub mod frame_type {
    pub const BEACON: u8 = 0;
    pub const DATA: u8 = 1;
    pub const ACK: u8 = 2;
    pub const COMMAND: u8 = 3;
}

/// Frame version value for IEEE 802.15.4-2015 frames.
pub const FRAME_VERSION_2015: u8 = 0b10;

/// Decoded frame control field of an IEEE 802.15.4 frame.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Default)]
pub struct FrameControl {
    /// 3-bit frame type (see [`frame_type`]).
    pub frame_type: u8,
    /// True when an auxiliary security header follows the addressing fields.
    pub security_enabled: bool,
    /// True when the sender holds more data for the recipient.
    pub frame_pending: bool,
    /// True when the sender requests an acknowledgment.
    pub ack_request: bool,
    /// PAN-ID compression bit, interpreted through the compression table.
    pub pan_id_compression: bool,
    /// True when no sequence number is present.
    pub seq_num_suppressed: bool,
    /// True when an information element list follows the header.
    pub ie_present: bool,
    /// Destination addressing mode.
    pub dst_addr_mode: u8,
    /// 2-bit frame version.
    pub frame_version: u8,
    /// Source addressing mode.
    pub src_addr_mode: u8,
}

impl FrameControl {
    /// Serialized size of the frame control field in bytes/octets.
    pub const LEN: usize = 2;

    /// Decodes a frame control value (as read little-endian off the wire).
    pub fn from_u16(fcf: u16) -> FrameControl {
        FrameControl {
            frame_type: ((fcf & FCF_FRAME_TYPE_MASK) >> FCF_FRAME_TYPE_SHIFT) as u8,
            security_enabled: 0 != fcf & FCF_SECURITY_ENABLED,
            frame_pending: 0 != fcf & FCF_FRAME_PENDING,
            ack_request: 0 != fcf & FCF_ACK_REQ,
            pan_id_compression: 0 != fcf & FCF_PAN_ID_COMPRESSION,
            seq_num_suppressed: 0 != fcf & FCF_SEQ_NUM_SUPPR,
            ie_present: 0 != fcf & FCF_IE_PRESENT,
            dst_addr_mode: ((fcf & FCF_DST_ADDR_MODE_MASK) >> FCF_DST_ADDR_MODE_SHIFT) as u8,
            frame_version: ((fcf & FCF_FRAME_VERSION_MASK) >> FCF_FRAME_VERSION_SHIFT) as u8,
            src_addr_mode: ((fcf & FCF_SRC_ADDR_MODE_MASK) >> FCF_SRC_ADDR_MODE_SHIFT) as u8,
        }
    }

    /// Encodes the frame control value (to be written little-endian).
    pub fn to_u16(&self) -> u16 {
        let mut fcf = 0u16;
        fcf |= (self.frame_type as u16) << FCF_FRAME_TYPE_SHIFT;
        if self.security_enabled {
            fcf |= FCF_SECURITY_ENABLED;
        }
        if self.frame_pending {
            fcf |= FCF_FRAME_PENDING;
        }
        if self.ack_request {
            fcf |= FCF_ACK_REQ;
        }
        if self.pan_id_compression {
            fcf |= FCF_PAN_ID_COMPRESSION;
        }
        if self.seq_num_suppressed {
            fcf |= FCF_SEQ_NUM_SUPPR;
        }
        if self.ie_present {
            fcf |= FCF_IE_PRESENT;
        }
        fcf |= (self.dst_addr_mode as u16) << FCF_DST_ADDR_MODE_SHIFT;
        fcf |= (self.frame_version as u16) << FCF_FRAME_VERSION_SHIFT;
        fcf |= (self.src_addr_mode as u16) << FCF_SRC_ADDR_MODE_SHIFT;
        fcf
    }

    /// Destination addressing mode, rejecting the reserved value.
    pub fn dst_mode(&self) -> Result<AddrMode, HeaderError> {
        AddrMode::from_fcf(self.dst_addr_mode).ok_or(HeaderError::UnsupportedAddrCombination {
            dst_addr_mode: self.dst_addr_mode,
            src_addr_mode: self.src_addr_mode,
            pan_id_compression: self.pan_id_compression,
        })
    }

    /// Source addressing mode, rejecting the reserved value.
    pub fn src_mode(&self) -> Result<AddrMode, HeaderError> {
        AddrMode::from_fcf(self.src_addr_mode).ok_or(HeaderError::UnsupportedAddrCombination {
            dst_addr_mode: self.dst_addr_mode,
            src_addr_mode: self.src_addr_mode,
            pan_id_compression: self.pan_id_compression,
        })
    }
}
