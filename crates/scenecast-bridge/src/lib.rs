//! Scene-state bridge - relays scene commands from one producer to many viewers
//!
//! Start the server and hand the control URL to a producer:
//! ```ignore
//! let server = BridgeServer::start(BridgeConfig::default()).await?;
//! println!("{}", server.handshake().control_url);
//! ```

pub mod bridge;
pub mod config;
pub mod error;
pub mod frame;
pub mod path;
pub mod protocol;
pub mod server;
pub mod snapshot;
pub mod tree;

pub use bridge::{Bridge, ConsumerId, Subscription};
pub use config::BridgeConfig;
pub use error::{BridgeError, ProtocolError};
pub use path::Path;
pub use protocol::{CommandKind, ControlReply, ControlRequest, Handshake};
pub use server::BridgeServer;
pub use tree::{Blob, SceneTree};
