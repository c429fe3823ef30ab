//! Operator-injected custom information elements, advertised in selected
//! Wi-SUN frame types.

use bitflags::bitflags;

use wisunparse::{write_header_ie, write_payload_ie};

use crate::error::{Error, Result};

/// Wi-SUN frame types a custom IE can be attached to.
pub mod ws_frame_type {
    pub const PA: u8 = 0;
    pub const PAS: u8 = 1;
    pub const PC: u8 = 2;
    pub const PCS: u8 = 3;
    pub const DATA: u8 = 4;
    pub const ACK: u8 = 5;
    pub const EAPOL: u8 = 6;
    pub const LPA: u8 = 9;
    pub const LPAS: u8 = 10;
    pub const LPC: u8 = 11;
}

bitflags! {
    /// Frame types selected by a custom IE.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct FrameTypeMask: u16 {
        const PA = 1 << ws_frame_type::PA;
        const PC = 1 << ws_frame_type::PC;
        const DATA = 1 << ws_frame_type::DATA;
        const EAPOL = 1 << ws_frame_type::EAPOL;
        const LPA = 1 << ws_frame_type::LPA;
        const LPC = 1 << ws_frame_type::LPC;
    }
}

impl FrameTypeMask {
    /// Folds a list of frame type values into a mask; types outside the
    /// allowed set are rejected.
    pub fn from_frame_types(frame_types: &[u8]) -> Result<FrameTypeMask> {
        let mut mask = FrameTypeMask::empty();
        for frame_type in frame_types {
            match *frame_type {
                ws_frame_type::PA => mask |= FrameTypeMask::PA,
                ws_frame_type::PC => mask |= FrameTypeMask::PC,
                ws_frame_type::DATA => mask |= FrameTypeMask::DATA,
                ws_frame_type::EAPOL => mask |= FrameTypeMask::EAPOL,
                ws_frame_type::LPA => mask |= FrameTypeMask::LPA,
                ws_frame_type::LPC => mask |= FrameTypeMask::LPC,
                other => {
                    return Err(Error::InvalidArgument(format!(
                        "frame type {} cannot carry custom IEs",
                        other
                    )))
                }
            }
        }
        Ok(mask)
    }
}

/// Where in the frame a custom IE goes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IeType {
    Header = 0,
    Payload = 1,
}

impl IeType {
    pub fn from_u8(value: u8) -> Result<IeType> {
        match value {
            0 => Ok(IeType::Header),
            1 => Ok(IeType::Payload),
            other => Err(Error::InvalidArgument(format!(
                "unknown IE type {}",
                other
            ))),
        }
    }
}

/// One injected IE.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IeCustom {
    pub ie_type: IeType,
    pub ie_id: u8,
    pub frame_type_mask: FrameTypeMask,
    /// Prebuilt IE bytes (descriptor included).
    pub buf: Vec<u8>,
}

/// The custom IE list, keyed by `(type, id)`.
#[derive(Clone, Debug, Default)]
pub struct IeCustomList {
    entries: Vec<IeCustom>,
}

impl IeCustomList {
    /// Inserts or replaces the entry with the same `(type, id)`.
    pub fn update(
        &mut self,
        ie_type: IeType,
        ie_id: u8,
        content: &[u8],
        frame_type_mask: FrameTypeMask,
    ) {
        let mut buf = Vec::new();
        match ie_type {
            IeType::Header => write_header_ie(&mut buf, ie_id, content),
            IeType::Payload => write_payload_ie(&mut buf, ie_id, content),
        }
        let entry = IeCustom {
            ie_type,
            ie_id,
            frame_type_mask,
            buf,
        };
        match self
            .entries
            .iter_mut()
            .find(|existing| existing.ie_type == ie_type && existing.ie_id == ie_id)
        {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends the header IEs selected for a frame type to a chunk.
    pub fn write_header_ies(&self, buf: &mut Vec<u8>, frame_type: FrameTypeMask) {
        for entry in &self.entries {
            if entry.ie_type == IeType::Header && entry.frame_type_mask.intersects(frame_type) {
                buf.extend_from_slice(&entry.buf);
            }
        }
    }

    /// Appends the payload IEs selected for a frame type to a chunk.
    pub fn write_payload_ies(&self, buf: &mut Vec<u8>, frame_type: FrameTypeMask) {
        for entry in &self.entries {
            if entry.ie_type == IeType::Payload && entry.frame_type_mask.intersects(frame_type) {
                buf.extend_from_slice(&entry.buf);
            }
        }
    }
}
