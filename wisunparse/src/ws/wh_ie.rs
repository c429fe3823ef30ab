use crate::err::ws::IeError;
use crate::err::{Layer, LenError};
use crate::ws::{read_u24_le, write_u24_le};

/// Sub-IDs of the Wi-SUN header IE (WH-IE, element ID 0x23).
pub mod wh_ie_sub_id {
    pub const UTT: u8 = 0x01;
    pub const BT: u8 = 0x02;
    pub const FC: u8 = 0x03;
    pub const RSL: u8 = 0x04;
    pub const EA: u8 = 0x09;
    pub const LUTT: u8 = 0x0a;
    pub const LBT: u8 = 0x0b;
    pub const NR: u8 = 0x0c;
    pub const LUS: u8 = 0x0d;
    pub const FLUS: u8 = 0x0e;
    pub const LBS: u8 = 0x0f;
    pub const LND: u8 = 0x10;
    pub const LTO: u8 = 0x11;
    pub const PANID: u8 = 0x12;
}

/// Node roles advertised in the NR-IE.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NodeRole {
    /// Border router.
    Br = 0,
    /// Full function node (router).
    Ffn = 1,
    /// Limited function node (low power, intermittent listener).
    Lfn = 2,
}

impl NodeRole {
    /// Decodes the 3-bit node role field (other values are reserved).
    pub fn from_ie(value: u8) -> Option<NodeRole> {
        match value & 0x07 {
            0 => Some(NodeRole::Br),
            1 => Some(NodeRole::Ffn),
            2 => Some(NodeRole::Lfn),
            _ => None,
        }
    }
}

fn check_len(slice: &[u8], required: usize) -> Result<(), IeError> {
    if slice.len() < required {
        return Err(LenError {
            required_len: required,
            len: slice.len(),
            layer: Layer::WisunHeaderIe,
            layer_start_offset: 0,
        }
        .into());
    }
    Ok(())
}

/// Unicast Timing & Frame Type IE: the sender's position in its unicast
/// listening schedule.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct UttIe {
    /// Wi-SUN frame type the IE was attached to.
    pub frame_type_id: u8,
    /// 24-bit Unicast Fractional Sequence Interval.
    pub ufsi: u32,
}

impl UttIe {
    pub const LEN: usize = 4;

    pub fn from_slice(slice: &[u8]) -> Result<UttIe, IeError> {
        check_len(slice, UttIe::LEN)?;
        Ok(UttIe {
            frame_type_id: slice[0],
            ufsi: read_u24_le(&slice[1..]),
        })
    }

    pub fn to_content(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(UttIe::LEN);
        buf.push(self.frame_type_id);
        write_u24_le(&mut buf, self.ufsi);
        buf
    }
}

/// Broadcast Timing IE: the sender's position in the broadcast schedule.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct BtIe {
    pub broadcast_slot_number: u16,
    pub broadcast_interval_offset_ms: u32,
}

impl BtIe {
    pub const LEN: usize = 5;

    pub fn from_slice(slice: &[u8]) -> Result<BtIe, IeError> {
        check_len(slice, BtIe::LEN)?;
        Ok(BtIe {
            broadcast_slot_number: u16::from_le_bytes([slice[0], slice[1]]),
            broadcast_interval_offset_ms: read_u24_le(&slice[2..]),
        })
    }

    pub fn to_content(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(BtIe::LEN);
        buf.extend_from_slice(&self.broadcast_slot_number.to_le_bytes());
        write_u24_le(&mut buf, self.broadcast_interval_offset_ms);
        buf
    }
}

/// LFN Unicast Timing & Frame Type IE: an LFN's position in its unicast
/// listening schedule.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct LuttIe {
    /// Wi-SUN frame type the IE was attached to.
    pub frame_type_id: u8,
    pub slot_number: u16,
    pub interval_offset_ms: u32,
}

impl LuttIe {
    pub const LEN: usize = 6;

    pub fn from_slice(slice: &[u8]) -> Result<LuttIe, IeError> {
        check_len(slice, LuttIe::LEN)?;
        Ok(LuttIe {
            frame_type_id: slice[0],
            slot_number: u16::from_le_bytes([slice[1], slice[2]]),
            interval_offset_ms: read_u24_le(&slice[3..]),
        })
    }

    pub fn to_content(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(LuttIe::LEN);
        buf.push(self.frame_type_id);
        buf.extend_from_slice(&self.slot_number.to_le_bytes());
        write_u24_le(&mut buf, self.interval_offset_ms);
        buf
    }
}

/// LFN Broadcast Timing IE.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct LbtIe {
    pub slot_number: u16,
    pub interval_offset_ms: u32,
}

impl LbtIe {
    pub const LEN: usize = 5;

    pub fn from_slice(slice: &[u8]) -> Result<LbtIe, IeError> {
        check_len(slice, LbtIe::LEN)?;
        Ok(LbtIe {
            slot_number: u16::from_le_bytes([slice[0], slice[1]]),
            interval_offset_ms: read_u24_le(&slice[2..]),
        })
    }

    pub fn to_content(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(LbtIe::LEN);
        buf.extend_from_slice(&self.slot_number.to_le_bytes());
        write_u24_le(&mut buf, self.interval_offset_ms);
        buf
    }
}

/// Node Role IE; LFNs additionally advertise their unicast listening
/// interval bounds.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct NrIe {
    /// Raw 3-bit node role field; decode with [`NodeRole::from_ie`].
    pub node_role: u8,
    pub clock_drift: u8,
    pub timing_accuracy: u8,
    /// `(min, max)` unicast listening interval in ms, present for LFNs.
    pub listen_interval_ms: Option<(u32, u32)>,
}

impl NrIe {
    pub const MIN_LEN: usize = 3;
    pub const LFN_LEN: usize = 9;

    pub fn from_slice(slice: &[u8]) -> Result<NrIe, IeError> {
        check_len(slice, NrIe::MIN_LEN)?;
        let listen_interval_ms = if slice.len() >= NrIe::LFN_LEN {
            Some((read_u24_le(&slice[3..]), read_u24_le(&slice[6..])))
        } else {
            None
        };
        Ok(NrIe {
            node_role: slice[0] & 0x07,
            clock_drift: slice[1],
            timing_accuracy: slice[2],
            listen_interval_ms,
        })
    }

    pub fn to_content(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(NrIe::LFN_LEN);
        buf.push(self.node_role);
        buf.push(self.clock_drift);
        buf.push(self.timing_accuracy);
        if let Some((min, max)) = self.listen_interval_ms {
            write_u24_le(&mut buf, min);
            write_u24_le(&mut buf, max);
        }
        buf
    }
}

/// LFN Unicast Schedule IE: listening interval & channel plan tag.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct LusIe {
    pub listen_interval_ms: u32,
    /// 255 reuses the previously advertised channel schedule.
    pub channel_plan_tag: u8,
}

impl LusIe {
    pub const LEN: usize = 4;

    /// Channel plan tag announcing schedule reuse.
    pub const TAG_REUSE: u8 = 255;

    pub fn from_slice(slice: &[u8]) -> Result<LusIe, IeError> {
        check_len(slice, LusIe::LEN)?;
        Ok(LusIe {
            listen_interval_ms: read_u24_le(slice),
            channel_plan_tag: slice[3],
        })
    }

    pub fn to_content(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(LusIe::LEN);
        write_u24_le(&mut buf, self.listen_interval_ms);
        buf.push(self.channel_plan_tag);
        buf
    }
}

/// LFN Network Discovery IE.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct LndIe {
    pub response_threshold: u8,
    pub response_delay_ms: u32,
    pub discovery_slot_time_ms: u8,
    pub discovery_slots: u8,
    pub discovery_first_slot: u16,
}

impl LndIe {
    pub const LEN: usize = 8;

    pub fn from_slice(slice: &[u8]) -> Result<LndIe, IeError> {
        check_len(slice, LndIe::LEN)?;
        Ok(LndIe {
            response_threshold: slice[0],
            response_delay_ms: read_u24_le(&slice[1..]),
            discovery_slot_time_ms: slice[4],
            discovery_slots: slice[5],
            discovery_first_slot: u16::from_le_bytes([slice[6], slice[7]]),
        })
    }

    pub fn to_content(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(LndIe::LEN);
        buf.push(self.response_threshold);
        write_u24_le(&mut buf, self.response_delay_ms);
        buf.push(self.discovery_slot_time_ms);
        buf.push(self.discovery_slots);
        buf.extend_from_slice(&self.discovery_first_slot.to_le_bytes());
        buf
    }
}

/// LFN Timing Offset IE: the offset granted to an LFN inside the LFN
/// broadcast interval, with its adjusted listening interval.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct LtoIe {
    pub offset_ms: u32,
    pub adjusted_listening_interval_ms: u32,
}

impl LtoIe {
    pub const LEN: usize = 6;

    pub fn from_slice(slice: &[u8]) -> Result<LtoIe, IeError> {
        check_len(slice, LtoIe::LEN)?;
        Ok(LtoIe {
            offset_ms: read_u24_le(slice),
            adjusted_listening_interval_ms: read_u24_le(&slice[3..]),
        })
    }

    pub fn to_content(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(LtoIe::LEN);
        write_u24_le(&mut buf, self.offset_ms);
        write_u24_le(&mut buf, self.adjusted_listening_interval_ms);
        buf
    }
}

/// PAN Identifier IE.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct PanIdIe {
    pub pan_id: u16,
}

impl PanIdIe {
    pub const LEN: usize = 2;

    pub fn from_slice(slice: &[u8]) -> Result<PanIdIe, IeError> {
        check_len(slice, PanIdIe::LEN)?;
        Ok(PanIdIe {
            pan_id: u16::from_le_bytes([slice[0], slice[1]]),
        })
    }

    pub fn to_content(&self) -> Vec<u8> {
        self.pan_id.to_le_bytes().to_vec()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn utt_roundtrip() {
        let utt = UttIe {
            frame_type_id: 2,
            ufsi: 0x123456,
        };
        assert_eq!(utt, UttIe::from_slice(&utt.to_content()).unwrap());
        assert_eq!(vec![2, 0x56, 0x34, 0x12], utt.to_content());
    }

    #[test]
    fn utt_truncated() {
        assert!(UttIe::from_slice(&[1, 2]).is_err());
    }

    #[test]
    fn lutt_roundtrip() {
        let lutt = LuttIe {
            frame_type_id: 4,
            slot_number: 77,
            interval_offset_ms: 1234,
        };
        assert_eq!(lutt, LuttIe::from_slice(&lutt.to_content()).unwrap());
    }

    #[test]
    fn nr_roundtrip_ffn() {
        let nr = NrIe {
            node_role: NodeRole::Ffn as u8,
            clock_drift: 255,
            timing_accuracy: 10,
            listen_interval_ms: None,
        };
        let content = nr.to_content();
        assert_eq!(NrIe::MIN_LEN, content.len());
        assert_eq!(nr, NrIe::from_slice(&content).unwrap());
    }

    #[test]
    fn nr_roundtrip_lfn() {
        let nr = NrIe {
            node_role: NodeRole::Lfn as u8,
            clock_drift: 255,
            timing_accuracy: 10,
            listen_interval_ms: Some((300_000, 900_000)),
        };
        let content = nr.to_content();
        assert_eq!(NrIe::LFN_LEN, content.len());
        assert_eq!(nr, NrIe::from_slice(&content).unwrap());
    }

    #[test]
    fn lus_roundtrip() {
        let lus = LusIe {
            listen_interval_ms: 600_000,
            channel_plan_tag: LusIe::TAG_REUSE,
        };
        assert_eq!(lus, LusIe::from_slice(&lus.to_content()).unwrap());
    }

    #[test]
    fn lnd_roundtrip() {
        let lnd = LndIe {
            response_threshold: 40,
            response_delay_ms: 5000,
            discovery_slot_time_ms: 60,
            discovery_slots: 10,
            discovery_first_slot: 3,
        };
        assert_eq!(lnd, LndIe::from_slice(&lnd.to_content()).unwrap());
    }

    #[test]
    fn lto_roundtrip() {
        let lto = LtoIe {
            offset_ms: 300,
            adjusted_listening_interval_ms: 300_000,
        };
        assert_eq!(lto, LtoIe::from_slice(&lto.to_content()).unwrap());
    }

    #[test]
    fn node_role() {
        assert_eq!(Some(NodeRole::Br), NodeRole::from_ie(0));
        assert_eq!(Some(NodeRole::Lfn), NodeRole::from_ie(2));
        assert_eq!(None, NodeRole::from_ie(5));
    }
}
