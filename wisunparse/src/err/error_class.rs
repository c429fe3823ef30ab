/// Coarse classification of a parse failure, used for drop accounting at
/// the link layer.
///
/// Every error type of this crate can be folded into one of these classes
/// via its `class()` method. The receiving side logs the class together
/// with a short reason and drops the frame; there is no retry (the radio
/// already acknowledged the frame).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ErrorClass {
    /// A protocol field is outside the supported set (e.g. a 16-bit
    /// destination address or a non ENC-MIC-64 security level).
    Unsupported,

    /// The bytes on the wire cannot be decoded under the current rules.
    Malformed,

    /// Expected trailing bytes are missing (e.g. the MIC-64 footer).
    Truncated,
}

impl core::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ErrorClass::Unsupported => write!(f, "unsupported"),
            ErrorClass::Malformed => write!(f, "malformed"),
            ErrorClass::Truncated => write!(f, "truncated"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fmt() {
        assert_eq!("unsupported", format!("{}", ErrorClass::Unsupported));
        assert_eq!("malformed", format!("{}", ErrorClass::Malformed));
        assert_eq!("truncated", format!("{}", ErrorClass::Truncated));
    }

    #[test]
    fn clone_eq() {
        let class = ErrorClass::Malformed;
        assert_eq!(class, class.clone());
    }
}
