//! Relay server
//!
//! Two listeners share one [`Bridge`]: a TCP control channel for the producer
//! and an HTTP server that upgrades `/` to a WebSocket for consumers and
//! serves viewer assets under `/static/`.

use std::io;
use std::net::SocketAddr;
use std::path::Path as FsPath;
use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::http::{HeaderValue, header};
use axum::response::Response;
use axum::routing::get;
use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeader;

use crate::bridge::{Bridge, Subscription};
use crate::config::{BridgeConfig, DEFAULT_CONTROL_PORT, DEFAULT_WEB_PORT};
use crate::error::BridgeError;
use crate::frame::{read_message_async, write_message_async};
use crate::protocol::{ControlReply, Handshake};

/// Bind `host:port`, or search upward from `default_port` when no port is
/// configured. An explicit port is tried exactly once.
pub async fn find_available_port(
    host: &str,
    port: Option<u16>,
    default_port: u16,
    max_attempts: u16,
) -> Result<TcpListener, BridgeError> {
    if let Some(port) = port {
        return Ok(TcpListener::bind((host, port)).await?);
    }

    for i in 0..max_attempts {
        let Some(port) = default_port.checked_add(i) else {
            break;
        };
        match TcpListener::bind((host, port)).await {
            Ok(listener) => return Ok(listener),
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                log::warn!("Port {} in use, trying another...", port);
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(BridgeError::AddressInUse {
        host: host.to_owned(),
        first: default_port,
        last: default_port as u32 + max_attempts as u32,
    })
}

/// Running server - keep this alive to keep serving.
pub struct BridgeServer {
    bridge: Arc<Bridge>,
    control_addr: SocketAddr,
    web_addr: SocketAddr,
    tasks: Vec<tokio::task::JoinHandle<()>>,
}

impl BridgeServer {
    /// Bind both listeners and start serving in the background.
    pub async fn start(config: BridgeConfig) -> Result<Self, BridgeError> {
        let control = find_available_port(
            &config.host,
            config.control_port,
            DEFAULT_CONTROL_PORT,
            config.max_port_attempts,
        )
        .await?;
        let web = find_available_port(
            &config.host,
            config.web_port,
            DEFAULT_WEB_PORT,
            config.max_port_attempts,
        )
        .await?;

        let control_addr = control.local_addr()?;
        let web_addr = web.local_addr()?;
        let handshake = Handshake {
            control_url: format!("tcp://{}:{}", config.host, control_addr.port()),
            web_url: format!("http://{}:{}/static/", config.host, web_addr.port()),
        };
        log::info!("Control channel listening on {}", handshake.control_url);
        log::info!("Viewer available at {}", handshake.web_url);

        let bridge = Arc::new(Bridge::new(
            handshake,
            config.static_root.clone(),
            config.consumer_buffer,
        ));

        let control_task = tokio::spawn(run_control(control, bridge.clone(), config.max_frame_bytes));

        let app = router(bridge.clone(), &config.static_root);
        let web_bridge = bridge.clone();
        let web_task = tokio::spawn(async move {
            let shutdown = web_bridge.clone();
            let served = axum::serve(web, app)
                .with_graceful_shutdown(async move { shutdown.shutdown_signal().await })
                .await;
            if let Err(e) = served {
                log::error!("Web server error: {}", e);
            }
        });

        Ok(Self {
            bridge,
            control_addr,
            web_addr,
            tasks: vec![control_task, web_task],
        })
    }

    pub fn bridge(&self) -> &Arc<Bridge> {
        &self.bridge
    }

    pub fn control_addr(&self) -> SocketAddr {
        self.control_addr
    }

    pub fn web_addr(&self) -> SocketAddr {
        self.web_addr
    }

    pub fn handshake(&self) -> &Handshake {
        self.bridge.handshake()
    }

    /// Stop accepting, cancel pending `wait`s and close consumers.
    pub fn shutdown(&self) {
        self.bridge.shutdown();
    }

    /// Wait for the background tasks to finish.
    pub async fn join(self) {
        for task in self.tasks {
            if let Err(e) = task.await {
                log::error!("Server task failed: {}", e);
            }
        }
    }
}

async fn run_control(listener: TcpListener, bridge: Arc<Bridge>, max_frame_bytes: usize) {
    loop {
        let accepted = tokio::select! {
            accepted = listener.accept() => accepted,
            _ = bridge.shutdown_signal() => break,
        };
        match accepted {
            Ok((stream, peer)) => {
                log::info!("Producer connected from {}", peer);
                let bridge = bridge.clone();
                tokio::spawn(async move {
                    handle_connection(stream, bridge, max_frame_bytes).await;
                    log::info!("Producer disconnected: {}", peer);
                });
            }
            Err(e) => {
                log::error!("Control accept error: {}", e);
            }
        }
    }
    log::debug!("Control listener stopped");
}

async fn handle_connection(stream: TcpStream, bridge: Arc<Bridge>, max_frame_bytes: usize) {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    loop {
        let received = tokio::select! {
            received = read_message_async(&mut reader, max_frame_bytes) => received,
            _ = bridge.shutdown_signal() => break,
        };

        let (reply, keep_open) = match received {
            Ok(Some(frames)) => (bridge.handle_frames(frames).await, true),
            Ok(None) => break, // Connection closed
            Err(e) => {
                log::warn!("Control read error: {}", e);
                (ControlReply::from(&e), e.is_recoverable())
            }
        };

        if let Err(e) = write_message_async(&mut writer, &[reply.to_bytes()]).await {
            log::error!("Control write error: {}", e);
            break;
        }
        if !keep_open {
            break;
        }
    }
}

fn router(bridge: Arc<Bridge>, static_root: &FsPath) -> Router {
    let assets = SetResponseHeader::overriding(
        ServeDir::new(static_root),
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store, no-cache, must-revalidate, max-age=0"),
    );

    Router::new()
        .route("/", get(consumer_upgrade))
        .nest_service("/static", assets)
        .with_state(bridge)
}

async fn consumer_upgrade(ws: WebSocketUpgrade, State(bridge): State<Arc<Bridge>>) -> Response {
    ws.on_upgrade(move |socket| serve_consumer(socket, bridge))
}

async fn serve_consumer(mut socket: WebSocket, bridge: Arc<Bridge>) {
    let Subscription { id, replay, mut live } = bridge.attach().await;

    let mut open = true;
    for blob in replay {
        if let Err(e) = socket.send(Message::Binary(blob.to_vec())).await {
            log::info!("Consumer {} closed during replay: {}", id, e);
            open = false;
            break;
        }
    }

    while open {
        tokio::select! {
            next = live.recv() => match next {
                Some(blob) => {
                    if let Err(e) = socket.send(Message::Binary(blob.to_vec())).await {
                        log::info!("Consumer {} write failed: {}", id, e);
                        open = false;
                    }
                }
                // Dropped from the fan-out set
                None => open = false,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => open = false,
                Some(Ok(_)) => {}
            },
            _ = bridge.shutdown_signal() => open = false,
        }
    }

    let _ = socket.send(Message::Close(None)).await;
    bridge.detach(id).await;
}
