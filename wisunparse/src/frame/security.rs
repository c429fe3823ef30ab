use crate::err::frame::{HeaderError, SliceError};
use crate::err::{Layer, LenError};

// IEEE 802.15.4-2020 Figure 9-2 Security Control field
const SEC_LEVEL_MASK: u8 = 0b0000_0111;
const SEC_KEY_ID_MODE_MASK: u8 = 0b0001_1000;
const SEC_KEY_ID_MODE_SHIFT: u8 = 3;
const SEC_FRAME_COUNTER_SUPPR: u8 = 0b0010_0000;
const SEC_ASN_IN_NONCE: u8 = 0b0100_0000;

/// Security level of an IEEE 802.15.4 auxiliary security header.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SecurityLevel {
    None = 0,
    Mic32 = 1,
    Mic64 = 2,
    Mic128 = 3,
    Enc = 4,
    EncMic32 = 5,
    EncMic64 = 6,
    EncMic128 = 7,
}

impl SecurityLevel {
    /// Decodes the 3-bit security level field.
    pub fn from_scf(value: u8) -> SecurityLevel {
        use SecurityLevel::*;
        match value & SEC_LEVEL_MASK {
            0 => None,
            1 => Mic32,
            2 => Mic64,
            3 => Mic128,
            4 => Enc,
            5 => EncMic32,
            6 => EncMic64,
            _ => EncMic128,
        }
    }

    /// Length in bytes of the message integrity code of this level.
    pub fn mic_len(&self) -> usize {
        use SecurityLevel::*;
        match self {
            None | Enc => 0,
            Mic32 | EncMic32 => 4,
            Mic64 | EncMic64 => 8,
            Mic128 | EncMic128 => 16,
        }
    }
}

/// Key identifier mode with the key index form used by Wi-SUN.
pub const KEY_ID_MODE_IDX: u8 = 0x01;

/// Decoded auxiliary security header.
///
/// Only the combination used by Wi-SUN data frames is accepted on the
/// receive path: level ENC-MIC-64, indexed key, frame counter present.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct SecurityHeader {
    /// Security level of the frame.
    pub security_level: SecurityLevel,
    /// Frame counter as carried on the wire (little-endian u32).
    pub frame_counter: u32,
    /// Index of the group key that secured the frame (1..=7).
    pub key_index: u8,
}

impl SecurityHeader {
    /// Serialized size of the accepted security header form in bytes.
    pub const LEN: usize = 6;

    /// Reads an auxiliary security header from a slice and returns the
    /// header & unused parts of the slice.
    ///
    /// `layer_start_offset` positions length errors inside the overall
    /// frame.
    pub fn from_slice(
        slice: &[u8],
        layer_start_offset: usize,
    ) -> Result<(SecurityHeader, &[u8]), SliceError> {
        if slice.len() < SecurityHeader::LEN {
            return Err(LenError {
                required_len: SecurityHeader::LEN,
                len: slice.len(),
                layer: Layer::SecurityHeader,
                layer_start_offset,
            }
            .into());
        }
        let scf = slice[0];
        let security_level = SecurityLevel::from_scf(scf);
        if security_level != SecurityLevel::EncMic64 {
            return Err(HeaderError::UnsupportedSecurityLevel {
                level: scf & SEC_LEVEL_MASK,
            }
            .into());
        }
        let key_id_mode = (scf & SEC_KEY_ID_MODE_MASK) >> SEC_KEY_ID_MODE_SHIFT;
        if key_id_mode != KEY_ID_MODE_IDX {
            return Err(HeaderError::UnsupportedKeyIdMode { key_id_mode }.into());
        }
        if 0 != scf & SEC_FRAME_COUNTER_SUPPR {
            return Err(HeaderError::UnsupportedFrameCounterSuppression.into());
        }
        // ASN-in-nonce only matters in TSCH mode, tolerated here
        let _ = scf & SEC_ASN_IN_NONCE;
        Ok((
            SecurityHeader {
                security_level,
                frame_counter: u32::from_le_bytes([slice[1], slice[2], slice[3], slice[4]]),
                key_index: slice[5],
            },
            &slice[SecurityHeader::LEN..],
        ))
    }

    /// Writes the security header of an outgoing frame.
    ///
    /// The 4 frame-counter bytes are reserved as zero, the radio fills
    /// them right before transmission.
    pub fn write_request(frame: &mut Vec<u8>, security_level: SecurityLevel, key_index: u8) {
        frame.push((KEY_ID_MODE_IDX << SEC_KEY_ID_MODE_SHIFT) | security_level as u8);
        frame.extend_from_slice(&[0; 4]);
        frame.push(key_index);
    }
}
