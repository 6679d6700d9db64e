//! Control protocol - request/reply definitions
//!
//! Mutating commands are three frames `(tag, path, msgpack document)`.
//! Queries are a single frame. Every request gets exactly one reply frame.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::path::Path;

/// Mutating command tags understood by the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    SetObject,
    SetTransform,
    SetProperty,
    SetAnimation,
    Delete,
}

impl CommandKind {
    pub const ALL: [CommandKind; 5] = [
        CommandKind::SetObject,
        CommandKind::SetTransform,
        CommandKind::SetProperty,
        CommandKind::SetAnimation,
        CommandKind::Delete,
    ];

    /// Wire tag
    pub fn tag(self) -> &'static str {
        match self {
            CommandKind::SetObject => "set_object",
            CommandKind::SetTransform => "set_transform",
            CommandKind::SetProperty => "set_property",
            CommandKind::SetAnimation => "set_animation",
            CommandKind::Delete => "delete",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.tag() == tag)
    }
}

/// Query tags
pub const QUERY_URL: &str = "url";
pub const QUERY_WAIT: &str = "wait";
pub const QUERY_GET_SCENE: &str = "get_scene";
pub const QUERY_READY: &str = "ready";

/// A parsed control-channel request
#[derive(Debug, Clone)]
pub enum ControlRequest {
    /// Scene mutation, forwarded verbatim to consumers
    Command {
        kind: CommandKind,
        path: Path,
        data: Arc<[u8]>,
    },
    /// Static asset URL for viewers
    Url,
    /// Block until a viewer is attached
    Wait,
    /// Self-contained snapshot page
    GetScene,
    /// Handshake carrying both URLs
    Ready,
}

fn utf8(frame: &[u8]) -> Result<&str, ProtocolError> {
    std::str::from_utf8(frame).map_err(|_| ProtocolError::InvalidUtf8)
}

impl ControlRequest {
    /// Parse a received message.
    pub fn parse(mut frames: Vec<Vec<u8>>) -> Result<Self, ProtocolError> {
        let tag = utf8(frames.first().ok_or(ProtocolError::EmptyMessage)?)?.to_owned();

        if let Some(kind) = CommandKind::from_tag(&tag) {
            if frames.len() != 3 {
                return Err(ProtocolError::FrameCount {
                    command: tag,
                    expected: 3,
                    got: frames.len(),
                });
            }
            let data: Arc<[u8]> = frames.pop().unwrap_or_default().into();
            let path = Path::parse(utf8(&frames[1])?);
            return Ok(ControlRequest::Command { kind, path, data });
        }

        let request = match tag.as_str() {
            QUERY_URL => ControlRequest::Url,
            QUERY_WAIT => ControlRequest::Wait,
            QUERY_GET_SCENE => ControlRequest::GetScene,
            QUERY_READY => ControlRequest::Ready,
            _ => return Err(ProtocolError::UnknownCommand(tag)),
        };
        if frames.len() != 1 {
            return Err(ProtocolError::FrameCount {
                command: tag,
                expected: 1,
                got: frames.len(),
            });
        }
        Ok(request)
    }

    /// Encode back into frames.
    pub fn to_frames(&self) -> Vec<Vec<u8>> {
        match self {
            ControlRequest::Command { kind, path, data } => vec![
                kind.tag().as_bytes().to_vec(),
                path.lower().into_bytes(),
                data.to_vec(),
            ],
            ControlRequest::Url => vec![QUERY_URL.as_bytes().to_vec()],
            ControlRequest::Wait => vec![QUERY_WAIT.as_bytes().to_vec()],
            ControlRequest::GetScene => vec![QUERY_GET_SCENE.as_bytes().to_vec()],
            ControlRequest::Ready => vec![QUERY_READY.as_bytes().to_vec()],
        }
    }
}

/// Reply to a control request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlReply {
    Ok,
    Payload(String),
    Error(String),
}

const OK: &str = "ok";
const ERROR_PREFIX: &str = "error: ";

impl ControlReply {
    pub fn error(msg: impl Into<String>) -> Self {
        Self::Error(msg.into())
    }

    pub fn payload(text: impl Into<String>) -> Self {
        Self::Payload(text.into())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            ControlReply::Ok => OK.as_bytes().to_vec(),
            ControlReply::Payload(text) => text.as_bytes().to_vec(),
            ControlReply::Error(msg) => format!("{}{}", ERROR_PREFIX, msg).into_bytes(),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        let text = String::from_utf8_lossy(bytes);
        if text == OK {
            ControlReply::Ok
        } else if let Some(msg) = text.strip_prefix(ERROR_PREFIX) {
            ControlReply::Error(msg.to_owned())
        } else {
            ControlReply::Payload(text.into_owned())
        }
    }

    /// `Ok` and payloads become `Ok(text)`, errors become `Err(reason)`.
    pub fn into_result(self) -> Result<String, String> {
        match self {
            ControlReply::Ok => Ok(OK.to_owned()),
            ControlReply::Payload(text) => Ok(text),
            ControlReply::Error(msg) => Err(msg),
        }
    }
}

impl From<&ProtocolError> for ControlReply {
    fn from(e: &ProtocolError) -> Self {
        ControlReply::Error(e.to_string())
    }
}

/// Body of the reply to `ready`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handshake {
    pub control_url: String,
    pub web_url: String,
}
