use crate::err::ie::ListError;
use crate::err::{Layer, LenError};

// IEEE 802.15.4-2020 Figure 7-21 Format of Header IEs
const HEADER_IE_LEN_MASK: u16 = 0b0000_0000_0111_1111;
const HEADER_IE_ID_MASK: u16 = 0b0111_1111_1000_0000;
const HEADER_IE_ID_SHIFT: u16 = 7;
const HEADER_IE_TYPE_MASK: u16 = 0b1000_0000_0000_0000;

/// Element IDs for header IEs (IEEE 802.15.4-2020 Table 7-7).
pub mod header_ie_id {
    /// Vendor specific header IE.
    pub const VENDOR: u8 = 0x00;
    /// Wi-SUN header IE (WH-IE); the first content byte is the sub-ID.
    pub const WH: u8 = 0x23;
    /// Header Termination 1: payload IEs follow.
    pub const HT1: u8 = 0x7e;
    /// Header Termination 2: frame payload follows, no payload IEs.
    pub const HT2: u8 = 0x7f;
}

/// A single header information element.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct HeaderIe<'a> {
    /// Element ID.
    pub id: u8,
    /// Content bytes (length taken from the descriptor).
    pub content: &'a [u8],
}

impl<'a> HeaderIe<'a> {
    /// Returns `(sub_id, sub_content)` when this is a Wi-SUN WH-IE.
    pub fn wisun_sub_ie(&self) -> Option<(u8, &'a [u8])> {
        if self.id == header_ie_id::WH && !self.content.is_empty() {
            Some((self.content[0], &self.content[1..]))
        } else {
            None
        }
    }
}

/// Encodes a header IE descriptor.
pub fn header_ie_descriptor(len: usize, id: u8) -> u16 {
    debug_assert!(len <= HEADER_IE_LEN_MASK as usize);
    (len as u16 & HEADER_IE_LEN_MASK) | ((id as u16) << HEADER_IE_ID_SHIFT) & HEADER_IE_ID_MASK
}

/// Appends a header IE (descriptor + content) to a buffer.
pub fn write_header_ie(buf: &mut Vec<u8>, id: u8, content: &[u8]) {
    buf.extend_from_slice(&header_ie_descriptor(content.len(), id).to_le_bytes());
    buf.extend_from_slice(content);
}

/// Appends a Wi-SUN WH-IE (element ID 0x23 + sub-ID byte) to a buffer.
pub fn write_wh_ie(buf: &mut Vec<u8>, sub_id: u8, sub_content: &[u8]) {
    buf.extend_from_slice(
        &header_ie_descriptor(sub_content.len() + 1, header_ie_id::WH).to_le_bytes(),
    );
    buf.push(sub_id);
    buf.extend_from_slice(sub_content);
}

/// Iterator over the header IEs of a header IE list.
///
/// The termination markers (HT1/HT2) are yielded like any other element;
/// [`crate::IeLists::from_slice`] strips them before handing out the list
/// ranges, so iterating a split list never sees them.
#[derive(Clone, Debug)]
pub struct HeaderIeIter<'a> {
    rest: &'a [u8],
    offset: usize,
}

impl<'a> HeaderIeIter<'a> {
    /// Creates an iterator over the given header IE bytes.
    pub fn new(list: &'a [u8]) -> HeaderIeIter<'a> {
        HeaderIeIter {
            rest: list,
            offset: 0,
        }
    }

    fn take(&mut self, len: usize, required: usize) -> Result<&'a [u8], ListError> {
        if self.rest.len() < len {
            return Err(LenError {
                required_len: required,
                len: self.rest.len(),
                layer: Layer::HeaderIe,
                layer_start_offset: self.offset,
            }
            .into());
        }
        let (taken, rest) = self.rest.split_at(len);
        self.rest = rest;
        self.offset += len;
        Ok(taken)
    }
}

impl<'a> Iterator for HeaderIeIter<'a> {
    type Item = Result<HeaderIe<'a>, ListError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }
        let descriptor = match self.take(2, 2) {
            Ok(bytes) => u16::from_le_bytes([bytes[0], bytes[1]]),
            Err(err) => {
                self.rest = &[];
                return Some(Err(err));
            }
        };
        // The type bit is constant 0 for header IEs, not checked: a
        // well-formed list was terminated before any payload IE.
        let _ = descriptor & HEADER_IE_TYPE_MASK;
        let len = (descriptor & HEADER_IE_LEN_MASK) as usize;
        let id = ((descriptor & HEADER_IE_ID_MASK) >> HEADER_IE_ID_SHIFT) as u8;
        let content = match self.take(len, len) {
            Ok(bytes) => bytes,
            Err(err) => {
                self.rest = &[];
                return Some(Err(err));
            }
        };
        Some(Ok(HeaderIe { id, content }))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn descriptor() {
        // HT1: length 0, id 0x7e, type 0
        assert_eq!(0x3f00, header_ie_descriptor(0, header_ie_id::HT1));
        // HT2: length 0, id 0x7f, type 0
        assert_eq!(0x3f80, header_ie_descriptor(0, header_ie_id::HT2));
    }

    #[test]
    fn write_and_iterate() {
        let mut buf = Vec::new();
        write_wh_ie(&mut buf, 0x01, &[0xaa, 0xbb, 0xcc, 0xdd]);
        write_header_ie(&mut buf, 0x2a, b"hello");

        let mut iter = HeaderIeIter::new(&buf);
        let ie = iter.next().unwrap().unwrap();
        assert_eq!(header_ie_id::WH, ie.id);
        assert_eq!((0x01, &[0xaa, 0xbb, 0xcc, 0xdd][..]), ie.wisun_sub_ie().unwrap());
        let ie = iter.next().unwrap().unwrap();
        assert_eq!(0x2a, ie.id);
        assert_eq!(b"hello", ie.content);
        assert_eq!(None, ie.wisun_sub_ie());
        assert!(iter.next().is_none());
    }

    #[test]
    fn truncated_descriptor() {
        let mut iter = HeaderIeIter::new(&[0x80]);
        assert_eq!(
            iter.next().unwrap().unwrap_err(),
            ListError::Len(LenError {
                required_len: 2,
                len: 1,
                layer: Layer::HeaderIe,
                layer_start_offset: 0,
            })
        );
        assert!(iter.next().is_none());
    }

    #[test]
    fn truncated_content() {
        // declares 5 content bytes, provides 2
        let mut buf = Vec::new();
        buf.extend_from_slice(&header_ie_descriptor(5, 0x2a).to_le_bytes());
        buf.extend_from_slice(&[1, 2]);
        let mut iter = HeaderIeIter::new(&buf);
        assert_eq!(
            iter.next().unwrap().unwrap_err(),
            ListError::Len(LenError {
                required_len: 5,
                len: 2,
                layer: Layer::HeaderIe,
                layer_start_offset: 2,
            })
        );
    }
}
