use super::HeaderError;
use crate::err::ie::ListError;
use crate::err::{ErrorClass, LenError};

/// Error when decoding an IEEE 802.15.4 data frame from a slice.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum SliceError {
    /// Error when a length error is encountered (e.g. unexpected end of
    /// slice).
    Len(LenError),

    /// Error caused by the contents of the header.
    Content(HeaderError),

    /// Error caused by the information element lists.
    Ie(ListError),
}

impl SliceError {
    /// Classification of the failure for drop accounting.
    pub fn class(&self) -> ErrorClass {
        use SliceError::*;
        match self {
            Len(err) => err.class(),
            Content(err) => err.class(),
            Ie(err) => err.class(),
        }
    }
}

impl core::fmt::Display for SliceError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        use SliceError::*;
        match self {
            Len(err) => err.fmt(f),
            Content(err) => err.fmt(f),
            Ie(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for SliceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        use SliceError::*;
        match self {
            Len(err) => Some(err),
            Content(err) => Some(err),
            Ie(err) => Some(err),
        }
    }
}

impl From<LenError> for SliceError {
    fn from(err: LenError) -> SliceError {
        SliceError::Len(err)
    }
}

impl From<HeaderError> for SliceError {
    fn from(err: HeaderError) -> SliceError {
        SliceError::Content(err)
    }
}

impl From<ListError> for SliceError {
    fn from(err: ListError) -> SliceError {
        SliceError::Ie(err)
    }
}
