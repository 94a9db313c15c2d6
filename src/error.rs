use thiserror::Error;

/// Result type for SAV export decoding operations
pub(crate) type Result<T> = std::result::Result<T, DecodeError>;

/// Errors that can occur while decoding an exported SAV capture
#[derive(Error, Debug)]
pub(crate) enum DecodeError {
    /// The external dump utility is missing or reported failure
    #[error("dump tool failure: {message}")]
    ExternalTool { message: String },

    /// A line of the machine-generated object export could not be parsed
    #[error("malformed line {line}: {message}")]
    MalformedLine { line: usize, message: String },

    /// An enterprise element payload did not decode to exactly one byte
    #[error("unsupported element payload length: {len} (expected 1 byte)")]
    UnsupportedPayloadLength { len: usize },
}
