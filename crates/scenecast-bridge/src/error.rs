//! Error types for the bridge

use thiserror::Error;

/// Malformed control-channel traffic. Rendered back to the producer as an
/// `error: ...` reply.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("expected {expected} frames for {command}, got {got}")]
    FrameCount {
        command: String,
        expected: usize,
        got: usize,
    },

    #[error("unrecognized command: {0}")]
    UnknownCommand(String),

    #[error("empty message")]
    EmptyMessage,

    #[error("frame is not valid UTF-8")]
    InvalidUtf8,

    #[error("frame of {len} bytes exceeds limit of {limit}")]
    FrameTooLarge { len: usize, limit: usize },

    #[error("message has {0} frames")]
    TooManyFrames(usize),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProtocolError {
    /// Whether the stream is still aligned on a message boundary after this
    /// error. Framing errors leave the reader mid-message.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            ProtocolError::FrameTooLarge { .. }
                | ProtocolError::TooManyFrames(_)
                | ProtocolError::Io(_)
        )
    }
}

/// Server startup and runtime failures.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("no available port on {host} in [{first}, {last})")]
    AddressInUse { host: String, first: u16, last: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),
}
