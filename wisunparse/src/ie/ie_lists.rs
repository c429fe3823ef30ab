use crate::err::ie::ListError;
use crate::{header_ie_id, payload_ie_id, HeaderIeIter, PayloadIeIter};

/// The header & payload IE lists of a frame, with the termination markers
/// stripped.
///
/// Splitting follows IEEE 802.15.4-2020 7.4.2.18/7.4.2.19/7.4.3.4:
/// * a Header Termination 1 IE ends the header list and announces payload
///   IEs,
/// * a Header Termination 2 IE ends the header list with no payload IEs,
/// * a Payload Termination IE ends the payload list; remaining bytes are
///   frame payload,
/// * without HT1/HT2 the whole remainder is header IEs, and without PT the
///   remainder after HT1 is payload IEs.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct IeLists<'a> {
    /// Header IE bytes (no terminator).
    pub header: &'a [u8],
    /// Payload IE bytes (no terminator).
    pub payload: &'a [u8],
    /// Frame payload bytes after a Payload Termination IE.
    pub msdu: &'a [u8],
}

/// Scans a header IE list for the first termination marker (HT1 or HT2),
/// returning its byte offset & element ID. The scan must stop at either
/// marker: the bytes following one are no longer header IEs.
fn find_header_terminator(list: &[u8]) -> Result<Option<(usize, u8)>, ListError> {
    let mut offset = 0;
    for ie in HeaderIeIter::new(list) {
        let ie = ie?;
        if ie.id == header_ie_id::HT1 || ie.id == header_ie_id::HT2 {
            return Ok(Some((offset, ie.id)));
        }
        offset += 2 + ie.content.len();
    }
    Ok(None)
}

/// Scans a payload IE list for the Payload Termination IE, returning the
/// byte offset of its descriptor.
fn find_payload_terminator(list: &[u8]) -> Result<Option<usize>, ListError> {
    let mut offset = 0;
    for ie in PayloadIeIter::new(list) {
        let ie = ie?;
        if ie.id == payload_ie_id::PT {
            return Ok(Some(offset));
        }
        offset += 2 + ie.content.len();
    }
    Ok(None)
}

impl<'a> IeLists<'a> {
    /// Splits the IE field of a frame into its header & payload lists.
    pub fn from_slice(slice: &'a [u8]) -> Result<IeLists<'a>, ListError> {
        let (header, rest, has_payload_ies) = match find_header_terminator(slice)? {
            Some((offset, id)) => (
                &slice[..offset],
                &slice[offset + 2..],
                id == header_ie_id::HT1,
            ),
            None => (slice, &[][..], false),
        };
        if !has_payload_ies {
            return Ok(IeLists {
                header,
                payload: &[],
                msdu: rest,
            });
        }
        match find_payload_terminator(rest)? {
            Some(offset) => Ok(IeLists {
                header,
                payload: &rest[..offset],
                msdu: &rest[offset + 2..],
            }),
            None => Ok(IeLists {
                header,
                payload: rest,
                msdu: &[],
            }),
        }
    }
}

/// Appends a Header Termination 1 IE to a buffer.
pub fn write_ht1(buf: &mut Vec<u8>) {
    crate::write_header_ie(buf, header_ie_id::HT1, &[]);
}

/// Appends a Header Termination 2 IE to a buffer.
pub fn write_ht2(buf: &mut Vec<u8>) {
    crate::write_header_ie(buf, header_ie_id::HT2, &[]);
}

/// Appends a Payload Termination IE to a buffer.
pub fn write_pt(buf: &mut Vec<u8>) {
    crate::write_payload_ie(buf, payload_ie_id::PT, &[]);
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{write_header_ie, write_payload_ie, write_wh_ie};

    #[test]
    fn no_terminator() {
        let mut buf = Vec::new();
        write_wh_ie(&mut buf, 0x01, &[1, 2, 3, 4]);
        let lists = IeLists::from_slice(&buf).unwrap();
        assert_eq!(&buf[..], lists.header);
        assert!(lists.payload.is_empty());
        assert!(lists.msdu.is_empty());
    }

    #[test]
    fn ht1_then_payload() {
        let mut buf = Vec::new();
        write_wh_ie(&mut buf, 0x01, &[1, 2, 3, 4]);
        let header_len = buf.len();
        write_ht1(&mut buf);
        write_payload_ie(&mut buf, payload_ie_id::WP, &[9, 8, 7]);

        let lists = IeLists::from_slice(&buf).unwrap();
        assert_eq!(&buf[..header_len], lists.header);
        assert_eq!(&buf[header_len + 2..], lists.payload);
        assert!(lists.msdu.is_empty());
    }

    #[test]
    fn ht1_payload_pt_msdu() {
        let mut buf = Vec::new();
        write_header_ie(&mut buf, 0x2a, &[0xaa]);
        let header_len = buf.len();
        write_ht1(&mut buf);
        write_payload_ie(&mut buf, payload_ie_id::WP, &[9, 8]);
        let payload_end = buf.len();
        write_pt(&mut buf);
        buf.extend_from_slice(b"msdu");

        let lists = IeLists::from_slice(&buf).unwrap();
        assert_eq!(&buf[..header_len], lists.header);
        assert_eq!(&buf[header_len + 2..payload_end], lists.payload);
        assert_eq!(b"msdu", lists.msdu);
    }

    #[test]
    fn ht2_no_payload_ies() {
        let mut buf = Vec::new();
        write_wh_ie(&mut buf, 0x01, &[1, 2, 3, 4]);
        let header_len = buf.len();
        write_ht2(&mut buf);
        buf.extend_from_slice(b"data");

        let lists = IeLists::from_slice(&buf).unwrap();
        assert_eq!(&buf[..header_len], lists.header);
        assert!(lists.payload.is_empty());
        assert_eq!(b"data", lists.msdu);
    }

    #[test]
    fn empty() {
        let lists = IeLists::from_slice(&[]).unwrap();
        assert!(lists.header.is_empty());
        assert!(lists.payload.is_empty());
        assert!(lists.msdu.is_empty());
    }

    #[test]
    fn malformed_header_list() {
        // descriptor declaring content beyond the end of the slice
        let buf = [0x05, 0x15, 0x01];
        assert!(IeLists::from_slice(&buf).is_err());
    }
}
