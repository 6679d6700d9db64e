//! Producer client
//!
//! [`ViewerWindow`] is a blocking connection to a running bridge.
//! [`Visualizer`] is a cheap handle onto a window at one scene path; child
//! handles share the connection.
//!
//! ```ignore
//! let vis = Visualizer::connect("127.0.0.1:6000")?;
//! println!("open {}", vis.url()?);
//! vis.at("box").set_object(Geometry::box_geometry([0.5, 0.5, 0.5]), None)?;
//! vis.at("box").set_transform(DMat4::from_translation(DVec3::X))?;
//! ```

use std::io;
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::{Arc, Mutex, MutexGuard};

use glam::DMat4;
use rmpv::Value;
use scenecast_bridge::frame::{DEFAULT_MAX_FRAME_BYTES, read_message, write_message};
use scenecast_bridge::{ControlReply, ControlRequest, Handshake, Path, ProtocolError};

use crate::animation::Animation;
use crate::commands::{
    Command, Delete, ObjectSource, SetAnimation, SetObject, SetProperty, SetText, SetTransform,
};
use crate::core::{Error, Result};
use crate::geometry::{Material, Texture};

/// Scheme prefix of the control URL the server announces.
pub const CONTROL_SCHEME: &str = "tcp://";

/// Path every visualizer starts at.
pub const DEFAULT_ROOT: &str = "/meshcat";

/// Blocking request/reply connection to the bridge's control channel.
pub struct ViewerWindow {
    stream: TcpStream,
    handshake: Handshake,
    max_frame_bytes: usize,
}

impl ViewerWindow {
    /// Connect and perform the `ready` handshake.
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        let mut window = Self {
            stream,
            handshake: Handshake {
                control_url: String::new(),
                web_url: String::new(),
            },
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        };

        let json = window.query(ControlRequest::Ready)?;
        window.handshake =
            serde_json::from_str(&json).map_err(|e| Error::Handshake(format!("bad ready reply: {}", e)))?;
        log::debug!(
            "Connected to bridge: control {}, web {}",
            window.handshake.control_url,
            window.handshake.web_url
        );
        Ok(window)
    }

    /// Connect using a `tcp://host:port` control URL.
    pub fn connect_url(url: &str) -> Result<Self> {
        let addr = url
            .strip_prefix(CONTROL_SCHEME)
            .ok_or_else(|| Error::Handshake(format!("not a control URL: {}", url)))?;
        Self::connect(addr)
    }

    pub fn handshake(&self) -> &Handshake {
        &self.handshake
    }

    pub fn web_url(&self) -> &str {
        &self.handshake.web_url
    }

    fn request(&mut self, frames: &[Vec<u8>]) -> Result<ControlReply> {
        write_message(&mut self.stream, frames)?;
        let mut reply = read_message(&mut self.stream, self.max_frame_bytes)?;
        if reply.len() != 1 {
            return Err(ProtocolError::FrameCount {
                command: "reply".to_string(),
                expected: 1,
                got: reply.len(),
            }
            .into());
        }
        Ok(ControlReply::from_bytes(&reply.remove(0)))
    }

    fn query(&mut self, request: ControlRequest) -> Result<String> {
        self.request(&request.to_frames())?
            .into_result()
            .map_err(Error::Server)
    }

    /// Ask the server for the viewer URL.
    pub fn request_web_url(&mut self) -> Result<String> {
        self.query(ControlRequest::Url)
    }

    /// Block until at least one viewer is attached.
    pub fn wait(&mut self) -> Result<()> {
        self.query(ControlRequest::Wait).map(|_| ())
    }

    pub fn send(&mut self, command: &Command) -> Result<()> {
        let request = command.to_request()?;
        log::debug!("Sending {} to {}", command.kind().tag(), command.path());
        self.query(request).map(|_| ())
    }

    /// Self-contained HTML page of the current scene.
    pub fn static_html(&mut self) -> Result<String> {
        self.query(ControlRequest::GetScene)
    }
}

/// Handle onto a window at one scene path.
#[derive(Clone)]
pub struct Visualizer {
    window: Arc<Mutex<ViewerWindow>>,
    path: Path,
}

impl Visualizer {
    pub fn new(window: ViewerWindow) -> Self {
        Self {
            window: Arc::new(Mutex::new(window)),
            path: Path::parse(DEFAULT_ROOT),
        }
    }

    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        Ok(Self::new(ViewerWindow::connect(addr)?))
    }

    /// A handle at `path` sharing this handle's connection.
    pub fn view_into(&self, path: Path) -> Self {
        Self {
            window: Arc::clone(&self.window),
            path,
        }
    }

    /// Child handle; `name` may contain `/`.
    pub fn at(&self, name: &str) -> Self {
        self.view_into(self.path.append(name))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn window(&self) -> Result<MutexGuard<'_, ViewerWindow>> {
        self.window
            .lock()
            .map_err(|_| Error::Io(io::Error::other("viewer connection lock poisoned")))
    }

    fn send(&self, command: impl Into<Command>) -> Result<()> {
        self.window()?.send(&command.into())
    }

    pub fn url(&self) -> Result<String> {
        self.window()?.request_web_url()
    }

    pub fn wait(&self) -> Result<()> {
        self.window()?.wait()
    }

    pub fn static_html(&self) -> Result<String> {
        self.window()?.static_html()
    }

    pub fn set_object(&self, source: impl Into<ObjectSource>, material: Option<Material>) -> Result<()> {
        self.send(SetObject::new(source, material, self.path.clone())?)
    }

    /// Write `text` on a transparent plane at this path.
    pub fn set_text(&self, text: &str) -> Result<()> {
        self.set_text_on(Texture::text(text), None, None)
    }

    pub fn set_text_on(
        &self,
        texture: Texture,
        target: Option<ObjectSource>,
        material: Option<Material>,
    ) -> Result<()> {
        self.send(SetText::new(texture, target, material, self.path.clone())?)
    }

    pub fn set_transform(&self, matrix: DMat4) -> Result<()> {
        self.send(SetTransform::new(matrix, self.path.clone()))
    }

    pub fn set_property(&self, property: &str, value: impl Into<Value>) -> Result<()> {
        self.send(SetProperty::new(property, value, self.path.clone()))
    }

    pub fn set_animation(&self, animation: &Animation, play: bool, repetitions: u32) -> Result<()> {
        self.send(SetAnimation::new(animation.clone(), play, repetitions))
    }

    pub fn delete(&self) -> Result<()> {
        self.send(Delete::new(self.path.clone()))
    }
}

impl std::fmt::Debug for Visualizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Visualizer").field("path", &self.path).finish()
    }
}
