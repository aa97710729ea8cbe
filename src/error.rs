use std::fmt;

/// Error taxonomy for the whole crate.
///
/// Every fallible operation returns one of these four kinds. None of them
/// carry a boxed source: callers that need to report an inner cause fold its
/// `Display` text into the message instead, which keeps the type small and
/// matches how this crate's sibling binary codec reports failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Textual input was syntactically malformed, or named an unknown
    /// format/device.
    Parse(String),
    /// Structured input violated an invariant (missing `format`, unknown
    /// parameter key, out-of-range payload byte, inconsistent packet shape).
    Data(String),
    /// A well-formed typed code could not be lowered to pulses for its wire
    /// format.
    Encode(String),
    /// Raw pulses could not be recognized as an instance of a named format.
    Decode(String),
}

impl Error {
    pub fn parse(msg: impl Into<String>) -> Self {
        Error::Parse(msg.into())
    }

    pub fn data(msg: impl Into<String>) -> Self {
        Error::Data(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Error::Encode(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Error::Decode(msg.into())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Parse(msg) => write!(f, "parse error: {msg}"),
            Error::Data(msg) => write!(f, "data error: {msg}"),
            Error::Encode(msg) => write!(f, "encode error: {msg}"),
            Error::Decode(msg) => write!(f, "decode error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
