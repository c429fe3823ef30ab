use crate::err::ErrorClass;

/// Error when decoding the MAC header of an IEEE 802.15.4 data frame.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum HeaderError {
    /// Error when the frame type is not a data (or, on the confirmation
    /// path, acknowledgment) frame.
    UnsupportedFrameType {
        /// The frame type value found in the frame control field.
        frame_type: u8,
    },

    /// Error when the frame version is not 0b10 (IEEE 802.15.4-2015).
    UnsupportedFrameVersion {
        /// The frame version value found in the frame control field.
        version: u8,
    },

    /// Error when the `(dst_addr_mode, src_addr_mode, pan_id_compression)`
    /// triple matches no row of the IEEE 802.15.4-2020 Table 7-2 PAN-ID
    /// compression table for frame version 0b10.
    UnsupportedAddrCombination {
        /// Destination addressing mode from the frame control field.
        dst_addr_mode: u8,
        /// Source addressing mode from the frame control field.
        src_addr_mode: u8,
        /// PAN-ID compression bit from the frame control field.
        pan_id_compression: bool,
    },

    /// Error when an address field uses the 16-bit short form (only 64-bit
    /// addresses are supported on the receive path).
    UnsupportedShortAddr {
        /// True when the short address was found in the destination field.
        is_dst: bool,
    },

    /// Error when the security level is not ENC-MIC-64.
    UnsupportedSecurityLevel {
        /// The security level value found in the security control field.
        level: u8,
    },

    /// Error when the key identifier mode is not the 1-byte key index form.
    UnsupportedKeyIdMode {
        /// The key identifier mode found in the security control field.
        key_id_mode: u8,
    },

    /// Error when the frame counter suppression bit is set (the counter
    /// must be carried in every secured frame).
    UnsupportedFrameCounterSuppression,
}

impl HeaderError {
    /// Classification of the failure for drop accounting.
    pub fn class(&self) -> ErrorClass {
        // All content errors of the MAC header are fields outside the
        // supported set; byte-level inconsistencies surface as LenError.
        ErrorClass::Unsupported
    }
}

impl core::fmt::Display for HeaderError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        use HeaderError::*;
        match self {
            UnsupportedFrameType { frame_type } => write!(f, "Frame Header Error: Encountered '{}' as frame type (only data frames are supported).", frame_type),
            UnsupportedFrameVersion { version } => write!(f, "Frame Header Error: Encountered '{}' as frame version (only version 0b10 / IEEE 802.15.4-2015 is supported).", version),
            UnsupportedAddrCombination { dst_addr_mode, src_addr_mode, pan_id_compression } => write!(f, "Frame Header Error: The address mode combination (dst: {}, src: {}, pan id compression: {}) matches no row of the PAN-ID compression table.", dst_addr_mode, src_addr_mode, pan_id_compression),
            UnsupportedShortAddr { is_dst } => write!(f, "Frame Header Error: 16-bit short {} addresses are not supported.", if *is_dst { "destination" } else { "source" }),
            UnsupportedSecurityLevel { level } => write!(f, "Security Header Error: Encountered '{}' as security level (only ENC-MIC-64 is supported).", level),
            UnsupportedKeyIdMode { key_id_mode } => write!(f, "Security Header Error: Encountered '{}' as key identifier mode (only the key index mode is supported).", key_id_mode),
            UnsupportedFrameCounterSuppression => write!(f, "Security Header Error: Frame counter suppression is not supported."),
        }
    }
}

impl std::error::Error for HeaderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}
