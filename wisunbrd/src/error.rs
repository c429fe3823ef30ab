use wisunparse::err::ErrorClass;

/// Error kinds surfaced across the border router core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Feature gated by the RCP API version, or a protocol field outside
    /// the supported set.
    #[error("not supported: {0}")]
    Unsupported(String),

    /// Bytes on the wire cannot be parsed under the current rules.
    #[error("malformed: {0}")]
    Malformed(String),

    /// Expected trailing bytes are missing.
    #[error("truncated: {0}")]
    Truncated(String),

    /// Caller-side validation of a control API input failed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A neighbor or key-storage lookup missed.
    #[error("not found: {0}")]
    NotFound(String),

    /// The RCP acknowledged but reported a retry-eligible condition.
    #[error("transient: {0}")]
    Transient(String),

    /// Unrecoverable; the orchestrator exits nonzero.
    #[error("fatal: {0}")]
    Fatal(String),
}

impl Error {
    /// Stable numeric code used on the control wire.
    pub fn code(&self) -> u8 {
        match self {
            Error::Unsupported(_) => 1,
            Error::Malformed(_) => 2,
            Error::Truncated(_) => 3,
            Error::InvalidArgument(_) => 4,
            Error::NotFound(_) => 5,
            Error::Transient(_) => 6,
            Error::Fatal(_) => 7,
        }
    }
}

impl From<wisunparse::err::frame::SliceError> for Error {
    fn from(err: wisunparse::err::frame::SliceError) -> Error {
        match err.class() {
            ErrorClass::Unsupported => Error::Unsupported(err.to_string()),
            ErrorClass::Malformed => Error::Malformed(err.to_string()),
            ErrorClass::Truncated => Error::Truncated(err.to_string()),
        }
    }
}

impl From<wisunparse::err::ws::IeError> for Error {
    fn from(err: wisunparse::err::ws::IeError) -> Error {
        match err.class() {
            ErrorClass::Unsupported => Error::Unsupported(err.to_string()),
            ErrorClass::Malformed => Error::Malformed(err.to_string()),
            ErrorClass::Truncated => Error::Truncated(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
