//! Error types for the client library
//!
//! Codec-level failures are reported as [`ProtocolError`], a small `Copy` enum
//! that the varint, protobuf and frame modules return directly. Everything above
//! the codec (XML parsing, transports, server replies) uses [`Error`].

use std::fmt;

use thiserror::Error;

use crate::response::ReplyError;

/// Errors raised while encoding or decoding wire data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Buffer too small for the operation
    #[error("buffer too small for operation")]
    ShortBuffer,
    /// Frame header does not start with the expected magic bytes
    #[error("invalid magic bytes in frame header")]
    InvalidMagic,
    /// Reserved header bytes are not zero
    #[error("reserved frame header bytes are not zero")]
    ReservedBytes,
    /// Input ended before a complete value could be read
    #[error("unexpected end of data")]
    UnexpectedEof,
    /// Varint does not fit in 32 bits
    #[error("varint exceeds 32 bits")]
    Overflow,
    /// Wire type the codec cannot decode
    #[error("unsupported protocol buffer wire type {0}")]
    UnsupportedWireType(u8),
    /// Field number is zero or needs more than a single tag byte
    #[error("field number {0} is outside 1..=15")]
    FieldNumberOutOfRange(u32),
    /// Payload length exceeds the configured limit
    #[error("frame payload of {0} bytes exceeds the size limit")]
    FrameTooLarge(usize),
    /// Required envelope field is missing
    #[error("envelope is missing field {0}")]
    MissingField(u32),
    /// Envelope field does not hold UTF-8 text
    #[error("envelope field {0} is not valid utf-8")]
    InvalidUtf8(u32),
    /// HTTP reply has no header/body separator
    #[error("malformed http reply")]
    MalformedHttpReply,
}

/// Result type alias for codec operations
pub type CodecResult<T> = core::result::Result<T, ProtocolError>;

/// Network operation that can time out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Establishing the connection
    Connect,
    /// Writing the request
    Send,
    /// Reading the reply
    Receive,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Connect => "connect",
            Operation::Send => "send",
            Operation::Receive => "receive",
        };
        f.write_str(name)
    }
}

/// Failed reply from the server
///
/// The first error entry of severity `REJECTED`, `FAILED`, `ERROR` or `FATAL`
/// provides `code` and `message`; `entries` holds every error the reply carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerError {
    /// Server error code
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Severity level string as sent by the server
    pub level: String,
    /// Documents the error refers to
    pub document_ids: Vec<String>,
    /// All error entries of the reply
    pub entries: Vec<ReplyError>,
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "server error {} ({}): {}", self.code, self.level, self.message)?;
        if !self.document_ids.is_empty() {
            write!(f, " [documents: {}]", self.document_ids.join(", "))?;
        }
        Ok(())
    }
}

impl std::error::Error for ServerError {}

/// Errors returned by the client library
#[derive(Debug, Error)]
pub enum Error {
    /// Connection could not be established
    #[error("connection error: {0}")]
    Connect(String),

    /// Operation exceeded its deadline
    #[error("{0} timed out")]
    Timeout(Operation),

    /// Socket-level failure
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed wire data
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Malformed XML
    #[error("xml parse error: {0}")]
    Parse(String),

    /// Server reported a failure
    #[error(transparent)]
    Server(#[from] ServerError),

    /// API misuse or invalid configuration
    #[error("usage error: {0}")]
    Usage(String),
}

/// Result type alias for client operations
pub type Result<T> = core::result::Result<T, Error>;
