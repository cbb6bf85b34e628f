use std::io;
use thiserror::Error;

/// Main error type for the codec.
///
/// Stream exhaustion on the decode side is deliberately absent: the coder
/// substitutes deterministic zero padding past end of data and keeps going,
/// so running out of input is not an error condition.
#[derive(Error, Debug)]
pub enum CodecError {
    /// The scan configuration cannot describe a codeable scan.
    #[error("invalid scan configuration: {0}")]
    Configuration(String),

    /// Write failure from the byte sink on encode. Fatal to the scan.
    #[error("byte sink failure: {0}")]
    Sink(#[source] io::Error),

    /// Read failure (other than end of data) from the byte source on decode.
    #[error("byte source failure: {0}")]
    Source(#[source] io::Error),

    /// A marker was found where a different one was required.
    #[error("expected marker 0x{expected:04X}, found 0x{found:04X}")]
    UnexpectedMarker { expected: u16, found: u16 },

    /// The stream ended before the restart marker the scan was due to see.
    #[error("restart marker missing before end of data")]
    MissingMarker,

    /// The entropy-coded data decoded to an impossible symbol.
    #[error("corrupt entropy-coded data: {0}")]
    Corrupt(&'static str),

    /// A driver operation was invoked out of sequence.
    #[error("invalid scan state: {0}")]
    InvalidState(&'static str),
}

/// A specialized `Result` type for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_context() {
        let err = CodecError::Configuration("component count 5 out of range".into());
        assert_eq!(
            err.to_string(),
            "invalid scan configuration: component count 5 out of range"
        );

        let err = CodecError::UnexpectedMarker {
            expected: 0xFFD0,
            found: 0xFFD3,
        };
        assert_eq!(err.to_string(), "expected marker 0xFFD0, found 0xFFD3");
    }

    #[test]
    fn io_errors_keep_their_source() {
        use std::error::Error;
        let io_err = io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed");
        let err = CodecError::Sink(io_err);
        assert!(err.source().is_some());
    }
}
