use crate::AddrMode;

/// One row of the IEEE 802.15.4-2020 Table 7-2 "PAN ID Compression field
/// value" table for frame version 0b10.
///
/// The row selected by the `(dst_addr_mode, src_addr_mode,
/// pan_id_compression)` triple determines which PAN-ID fields are present
/// in the frame.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct PanIdCompressionRow {
    /// Destination addressing mode of the row.
    pub dst_addr_mode: AddrMode,
    /// Source addressing mode of the row.
    pub src_addr_mode: AddrMode,
    /// True when the destination PAN-ID field is present.
    pub dst_pan_id: bool,
    /// True when the source PAN-ID field is present.
    pub src_pan_id: bool,
    /// PAN-ID compression bit value of the row.
    pub pan_id_compression: bool,
}

/// IEEE 802.15.4-2020 Table 7-2 for frame version 0b10.
pub const PAN_ID_COMPRESSION_TABLE: [PanIdCompressionRow; 18] = {
    use AddrMode::*;
    macro_rules! row {
        ($dst:expr, $src:expr, $dst_pan:expr, $src_pan:expr, $comp:expr) => {
            PanIdCompressionRow {
                dst_addr_mode: $dst,
                src_addr_mode: $src,
                dst_pan_id: $dst_pan,
                src_pan_id: $src_pan,
                pan_id_compression: $comp,
            }
        };
    }
    [
        row!(None, None, false, false, false),
        row!(None, None, true, false, true),
        row!(Short, None, true, false, false),
        row!(Ext, None, true, false, false),
        row!(Short, None, false, false, true),
        row!(Ext, None, false, false, true),
        row!(None, Short, false, true, false),
        row!(None, Ext, false, true, false),
        row!(None, Short, false, false, true),
        row!(None, Ext, false, false, true),
        row!(Ext, Ext, true, false, false),
        row!(Ext, Ext, false, false, true),
        row!(Short, Short, true, true, false),
        row!(Short, Ext, true, true, false),
        row!(Ext, Short, true, true, false),
        row!(Short, Ext, true, false, true),
        row!(Ext, Short, true, false, true),
        row!(Short, Short, true, false, true),
    ]
};

/// Looks up the table row matching a `(dst_addr_mode, src_addr_mode,
/// pan_id_compression)` triple.
///
/// The table is injective on the triple: at most one row matches.
pub fn pan_id_compression_lookup(
    dst_addr_mode: AddrMode,
    src_addr_mode: AddrMode,
    pan_id_compression: bool,
) -> Option<&'static PanIdCompressionRow> {
    PAN_ID_COMPRESSION_TABLE.iter().find(|row| {
        row.dst_addr_mode == dst_addr_mode
            && row.src_addr_mode == src_addr_mode
            && row.pan_id_compression == pan_id_compression
    })
}
