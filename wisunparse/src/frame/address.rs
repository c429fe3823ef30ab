/// Addressing mode of a destination or source address field, with the
/// values used by the frame control field.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AddrMode {
    /// No address present.
    None = 0,
    /// 16-bit short address.
    Short = 2,
    /// 64-bit extended address (EUI-64).
    Ext = 3,
}

impl AddrMode {
    /// Decodes a 2-bit addressing mode field (value 1 is reserved).
    pub fn from_fcf(value: u8) -> Option<AddrMode> {
        match value {
            0 => Some(AddrMode::None),
            2 => Some(AddrMode::Short),
            3 => Some(AddrMode::Ext),
            _ => None,
        }
    }

    /// Serialized length of an address of this mode in bytes.
    pub fn addr_len(&self) -> usize {
        match self {
            AddrMode::None => 0,
            AddrMode::Short => 2,
            AddrMode::Ext => 8,
        }
    }
}

/// A destination or source address of an IEEE 802.15.4 frame.
///
/// Extended addresses are held in canonical big-endian (network display)
/// order; the wire carries them little-endian, the codec reverses the
/// bytes at the boundary.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Addr {
    /// No address present.
    None,
    /// 16-bit short address.
    Short(u16),
    /// 64-bit extended address (EUI-64) in big-endian byte order.
    Ext([u8; 8]),
}

impl Addr {
    /// The all-ones broadcast EUI-64.
    pub const BROADCAST_EUI64: [u8; 8] = [0xff; 8];

    /// Addressing mode matching this address.
    pub fn mode(&self) -> AddrMode {
        match self {
            Addr::None => AddrMode::None,
            Addr::Short(_) => AddrMode::Short,
            Addr::Ext(_) => AddrMode::Ext,
        }
    }

    /// Returns the EUI-64 when this is an extended address.
    pub fn ext(&self) -> Option<&[u8; 8]> {
        match self {
            Addr::Ext(eui64) => Some(eui64),
            _ => None,
        }
    }
}

impl Default for Addr {
    fn default() -> Addr {
        Addr::None
    }
}

/// Formats an EUI-64 in the usual colon separated form.
pub fn fmt_eui64(eui64: &[u8; 8]) -> String {
    let mut out = String::with_capacity(23);
    for (i, b) in eui64.iter().enumerate() {
        if i > 0 {
            out.push(':');
        }
        out.push_str(&format!("{:02x}", b));
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn from_fcf() {
        assert_eq!(Some(AddrMode::None), AddrMode::from_fcf(0));
        assert_eq!(None, AddrMode::from_fcf(1));
        assert_eq!(Some(AddrMode::Short), AddrMode::from_fcf(2));
        assert_eq!(Some(AddrMode::Ext), AddrMode::from_fcf(3));
    }

    #[test]
    fn addr_len() {
        assert_eq!(0, AddrMode::None.addr_len());
        assert_eq!(2, AddrMode::Short.addr_len());
        assert_eq!(8, AddrMode::Ext.addr_len());
    }

    #[test]
    fn mode() {
        assert_eq!(AddrMode::None, Addr::None.mode());
        assert_eq!(AddrMode::Short, Addr::Short(0x1234).mode());
        assert_eq!(AddrMode::Ext, Addr::Ext([0; 8]).mode());
    }

    #[test]
    fn ext() {
        assert_eq!(None, Addr::None.ext());
        assert_eq!(None, Addr::Short(1).ext());
        assert_eq!(Some(&[1u8; 8]), Addr::Ext([1; 8]).ext());
    }

    #[test]
    fn fmt() {
        assert_eq!(
            "01:02:03:04:05:06:07:08",
            fmt_eui64(&[1, 2, 3, 4, 5, 6, 7, 8])
        );
        assert_eq!(
            "ff:ff:ff:ff:ff:ff:ff:ff",
            fmt_eui64(&Addr::BROADCAST_EUI64)
        );
    }
}
