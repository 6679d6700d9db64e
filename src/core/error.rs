//! Error types for scenecast

use thiserror::Error;

/// Main error type for the producer side
#[derive(Debug, Error)]
pub enum Error {
    #[error("unsupported element type: {0}")]
    UnsupportedDtype(&'static str),

    #[error("can only pack 1- or 2-dimensional arrays, got {0} dimensions")]
    InvalidRank(usize),

    #[error("shape {shape:?} needs {expected} elements, got {got}")]
    ShapeMismatch {
        shape: Vec<usize>,
        expected: usize,
        got: usize,
    },

    #[error("usage error: {0}")]
    Usage(String),

    #[error("encode error: {0}")]
    Encode(#[from] rmpv::encode::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("protocol error: {0}")]
    Protocol(#[from] scenecast_bridge::ProtocolError),

    #[error("server replied: {0}")]
    Server(String),

    #[error("handshake failed: {0}")]
    Handshake(String),
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;
