//! Host interface constants: the command identifiers, statuses and
//! enumerations shared with the radio co-processor, and the API version
//! gates.

/// Host → RCP requests & configuration, RCP → host indications and
/// confirmations.
pub mod cmd {
    pub const REQ_RESET: u8 = 0x01;
    pub const IND_RESET: u8 = 0x02;
    pub const IND_FATAL: u8 = 0x03;
    pub const SET_HOST_API: u8 = 0x04;

    pub const REQ_DATA_TX: u8 = 0x10;
    pub const REQ_DATA_TX_ABORT: u8 = 0x11;
    pub const CNF_DATA_TX: u8 = 0x12;
    pub const IND_DATA_RX: u8 = 0x13;

    pub const REQ_RADIO_ENABLE: u8 = 0x20;
    pub const REQ_RADIO_LIST: u8 = 0x21;
    pub const CNF_RADIO_LIST: u8 = 0x22;
    pub const SET_RADIO: u8 = 0x23;
    pub const SET_RADIO_REGULATION: u8 = 0x24;
    pub const SET_RADIO_TX_POWER: u8 = 0x25;

    pub const SET_FHSS_UC: u8 = 0x30;
    pub const SET_FHSS_FFN_BC: u8 = 0x31;
    pub const SET_FHSS_LFN_BC: u8 = 0x32;
    pub const SET_FHSS_ASYNC: u8 = 0x33;

    pub const SET_SEC_KEY: u8 = 0x40;

    pub const SET_FILTER_PANID: u8 = 0x58;
    pub const SET_FILTER_SRC64: u8 = 0x59;
    pub const SET_FILTER_DST64: u8 = 0x5a;
}

/// Status of a TX confirmation.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum HifStatus {
    Success,
    NoAck,
    CcaFailure,
    Timedout,
    Aborted,
    Nomem,
    Unknown(u8),
}

impl HifStatus {
    pub fn from_u8(value: u8) -> HifStatus {
        use HifStatus::*;
        match value {
            0 => Success,
            1 => NoAck,
            2 => CcaFailure,
            3 => Timedout,
            4 => Aborted,
            5 => Nomem,
            other => Unknown(other),
        }
    }

    pub fn to_u8(self) -> u8 {
        use HifStatus::*;
        match self {
            Success => 0,
            NoAck => 1,
            CcaFailure => 2,
            Timedout => 3,
            Aborted => 4,
            Nomem => 5,
            Unknown(other) => other,
        }
    }

    /// True when the caller may re-queue the frame.
    pub fn retry_eligible(self) -> bool {
        matches!(
            self,
            HifStatus::NoAck | HifStatus::CcaFailure | HifStatus::Nomem
        )
    }
}

/// Channel hopping sequence a TX request is scheduled against.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum FhssType {
    FfnUc = 0x00,
    FfnBc = 0x01,
    LfnUc = 0x02,
    LfnBc = 0x03,
    Async = 0x04,
    LfnPa = 0x06,
}

/// Mode switch flavor carried in a TX request.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum ModeSwitchType {
    Phy = 0,
    Mac = 1,
}

/// Regional regulation enforced by the radio.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum Regulation {
    None = 0,
    Etsi = 1,
    Fcc = 2,
    Arib = 3,
    Wpc = 4,
}

/// Negotiated host / RCP API version as a `(major, minor, patch)` triple
/// packed into a `u32`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct ApiVersion(pub u32);

impl ApiVersion {
    pub const fn new(major: u8, minor: u8, patch: u16) -> ApiVersion {
        ApiVersion(((major as u32) << 24) | ((minor as u32) << 16) | patch as u32)
    }

    pub fn major(self) -> u8 {
        (self.0 >> 24) as u8
    }

    pub fn minor(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub fn patch(self) -> u16 {
        self.0 as u16
    }

    /// Lexicographic comparison against a `(major, minor, patch)` gate.
    pub fn older_than(self, major: u8, minor: u8, patch: u16) -> bool {
        self < ApiVersion::new(major, minor, patch)
    }
}

impl core::fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{}.{}", self.major(), self.minor(), self.patch())
    }
}

/// API version implemented by this host.
pub const HOST_API_VERSION: ApiVersion = ApiVersion::new(2, 2, 0);

/// Oldest RCP API this host can drive.
pub const RCP_API_MIN_VERSION: ApiVersion = ApiVersion::new(2, 0, 0);

/// Gate for the per-link mode switch API.
pub const API_MODE_SWITCH: (u8, u8, u16) = (2, 0, 1);

/// Gate for enabling EDFE exchanges.
pub const API_EDFE: (u8, u8, u16) = (2, 2, 0);

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn version_ordering() {
        let version = ApiVersion::new(2, 0, 1);
        assert!(!version.older_than(2, 0, 1));
        assert!(!version.older_than(2, 0, 0));
        assert!(version.older_than(2, 0, 2));
        assert!(version.older_than(2, 1, 0));
        assert!(version.older_than(3, 0, 0));
        assert!(!version.older_than(1, 255, 65535));
    }

    #[test]
    fn version_fields() {
        let version = ApiVersion::new(2, 3, 260);
        assert_eq!(2, version.major());
        assert_eq!(3, version.minor());
        assert_eq!(260, version.patch());
        assert_eq!("2.3.260", format!("{}", version));
    }

    #[test]
    fn status_roundtrip() {
        for raw in 0..=10u8 {
            assert_eq!(raw, HifStatus::from_u8(raw).to_u8());
        }
        assert!(HifStatus::NoAck.retry_eligible());
        assert!(!HifStatus::Timedout.retry_eligible());
        assert!(!HifStatus::Aborted.retry_eligible());
    }
}
