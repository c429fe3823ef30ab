use crate::err::ie::ListError;
use crate::err::{Layer, LenError};

// IEEE 802.15.4-2020 Figure 7-55 / 7-56 Format of nested IEs
const NESTED_SHORT_LEN_MASK: u16 = 0b0000_0000_1111_1111;
const NESTED_SHORT_ID_MASK: u16 = 0b0111_1111_0000_0000;
const NESTED_SHORT_ID_SHIFT: u16 = 8;
const NESTED_LONG_LEN_MASK: u16 = 0b0000_0111_1111_1111;
const NESTED_LONG_ID_MASK: u16 = 0b0111_1000_0000_0000;
const NESTED_LONG_ID_SHIFT: u16 = 11;
const NESTED_TYPE_MASK: u16 = 0b1000_0000_0000_0000;

/// A nested information element carried inside a WP-IE (or MLME) payload
/// IE.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct NestedIe<'a> {
    /// Sub-ID (4 bits in the long form, 7 bits in the short form).
    pub sub_id: u8,
    /// True when the element uses the long descriptor form.
    pub long: bool,
    /// Content bytes.
    pub content: &'a [u8],
}

/// Appends a short form nested IE to a buffer.
pub fn write_nested_short(buf: &mut Vec<u8>, sub_id: u8, content: &[u8]) {
    debug_assert!(content.len() <= NESTED_SHORT_LEN_MASK as usize);
    let descriptor = (content.len() as u16 & NESTED_SHORT_LEN_MASK)
        | ((sub_id as u16) << NESTED_SHORT_ID_SHIFT) & NESTED_SHORT_ID_MASK;
    buf.extend_from_slice(&descriptor.to_le_bytes());
    buf.extend_from_slice(content);
}

/// Appends a long form nested IE to a buffer.
pub fn write_nested_long(buf: &mut Vec<u8>, sub_id: u8, content: &[u8]) {
    debug_assert!(content.len() <= NESTED_LONG_LEN_MASK as usize);
    let descriptor = (content.len() as u16 & NESTED_LONG_LEN_MASK)
        | ((sub_id as u16) << NESTED_LONG_ID_SHIFT) & NESTED_LONG_ID_MASK
        | NESTED_TYPE_MASK;
    buf.extend_from_slice(&descriptor.to_le_bytes());
    buf.extend_from_slice(content);
}

/// Iterator over the nested IEs of a WP-IE content.
#[derive(Clone, Debug)]
pub struct NestedIeIter<'a> {
    rest: &'a [u8],
    offset: usize,
}

impl<'a> NestedIeIter<'a> {
    /// Creates an iterator over the given WP-IE content bytes.
    pub fn new(content: &'a [u8]) -> NestedIeIter<'a> {
        NestedIeIter {
            rest: content,
            offset: 0,
        }
    }

    fn take(&mut self, len: usize, required: usize) -> Result<&'a [u8], ListError> {
        if self.rest.len() < len {
            return Err(LenError {
                required_len: required,
                len: self.rest.len(),
                layer: Layer::WisunPayloadIe,
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

impl<'a> Iterator for NestedIeIter<'a> {
    type Item = Result<NestedIe<'a>, ListError>;

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
        let long = 0 != descriptor & NESTED_TYPE_MASK;
        let (len, sub_id) = if long {
            (
                (descriptor & NESTED_LONG_LEN_MASK) as usize,
                ((descriptor & NESTED_LONG_ID_MASK) >> NESTED_LONG_ID_SHIFT) as u8,
            )
        } else {
            (
                (descriptor & NESTED_SHORT_LEN_MASK) as usize,
                ((descriptor & NESTED_SHORT_ID_MASK) >> NESTED_SHORT_ID_SHIFT) as u8,
            )
        };
        let content = match self.take(len, len) {
            Ok(bytes) => bytes,
            Err(err) => {
                self.rest = &[];
                return Some(Err(err));
            }
        };
        Some(Ok(NestedIe {
            sub_id,
            long,
            content,
        }))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn write_and_iterate() {
        let mut buf = Vec::new();
        write_nested_long(&mut buf, 0x1, &[1, 2, 3, 4, 5]);
        write_nested_short(&mut buf, 0x6, &[0x34, 0x12]);

        let mut iter = NestedIeIter::new(&buf);
        let ie = iter.next().unwrap().unwrap();
        assert!(ie.long);
        assert_eq!(0x1, ie.sub_id);
        assert_eq!(&[1, 2, 3, 4, 5], ie.content);
        let ie = iter.next().unwrap().unwrap();
        assert!(!ie.long);
        assert_eq!(0x6, ie.sub_id);
        assert_eq!(&[0x34, 0x12], ie.content);
        assert!(iter.next().is_none());
    }

    #[test]
    fn truncated() {
        let mut buf = Vec::new();
        write_nested_short(&mut buf, 0x6, &[0x34, 0x12]);
        buf.truncate(3);
        let mut iter = NestedIeIter::new(&buf);
        assert!(iter.next().unwrap().is_err());
        assert!(iter.next().is_none());
    }
}
