/// Layers on which an error can occur while parsing a frame.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Layer {
    /// Error while parsing the frame control field.
    FrameControl,
    /// Error while parsing the sequence number.
    SequenceNumber,
    /// Error while parsing the addressing fields (PAN IDs & addresses).
    Addressing,
    /// Error while parsing the auxiliary security header.
    SecurityHeader,
    /// Error while parsing the message integrity code footer.
    Mic,
    /// Error while parsing a header information element.
    HeaderIe,
    /// Error while parsing a payload information element.
    PayloadIe,
    /// Error while parsing a Wi-SUN header IE sub content.
    WisunHeaderIe,
    /// Error while parsing a Wi-SUN payload IE nested content.
    WisunPayloadIe,
    /// Error while parsing a Wi-SUN channel information block.
    ChannelInfo,
}

impl Layer {
    /// String referencing the error in an error message.
    pub fn error_title(&self) -> &'static str {
        use Layer::*;
        match self {
            FrameControl => "Frame Control Error",
            SequenceNumber => "Sequence Number Error",
            Addressing => "Addressing Error",
            SecurityHeader => "Security Header Error",
            Mic => "MIC Error",
            HeaderIe => "Header IE Error",
            PayloadIe => "Payload IE Error",
            WisunHeaderIe => "Wi-SUN Header IE Error",
            WisunPayloadIe => "Wi-SUN Payload IE Error",
            ChannelInfo => "Channel Info Error",
        }
    }
}

impl core::fmt::Display for Layer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        use Layer::*;
        match self {
            FrameControl => write!(f, "frame control"),
            SequenceNumber => write!(f, "sequence number"),
            Addressing => write!(f, "addressing fields"),
            SecurityHeader => write!(f, "auxiliary security header"),
            Mic => write!(f, "message integrity code"),
            HeaderIe => write!(f, "header IE"),
            PayloadIe => write!(f, "payload IE"),
            WisunHeaderIe => write!(f, "Wi-SUN header IE"),
            WisunPayloadIe => write!(f, "Wi-SUN payload IE"),
            ChannelInfo => write!(f, "channel information"),
        }
    }
}
