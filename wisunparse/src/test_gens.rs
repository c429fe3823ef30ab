use crate::*;
use proptest::prelude::*;

pub fn eui64_any() -> impl Strategy<Value = [u8; 8]> {
    any::<[u8; 8]>()
}

/// A header IE chunk made of Wi-SUN WH-IEs (never a termination marker).
pub fn header_ie_chunk_any() -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(
        (1u8..=0x12, proptest::collection::vec(any::<u8>(), 0..8)),
        0..3,
    )
    .prop_map(|ies| {
        let mut chunk = Vec::new();
        for (sub_id, content) in ies {
            write_wh_ie(&mut chunk, sub_id, &content);
        }
        chunk
    })
}

/// A payload IE chunk (never a Payload Termination IE).
pub fn payload_ie_chunk_any() -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(
        (1u8..=0xe, proptest::collection::vec(any::<u8>(), 0..16)),
        0..3,
    )
    .prop_map(|ies| {
        let mut chunk = Vec::new();
        for (id, content) in ies {
            write_payload_ie(&mut chunk, id, &content);
        }
        chunk
    })
}
