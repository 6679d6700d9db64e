//! Bridge state - the scene tree plus the consumer fan-out set.
//!
//! Both live behind one mutex so that "apply + broadcast" and
//! "attach + replay" never interleave: a consumer either sees a command in
//! its replay or receives it live, never both and never neither.

use std::path::PathBuf;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Mutex, mpsc, watch};

use crate::path::Path;
use crate::protocol::{CommandKind, ControlReply, ControlRequest, Handshake};
use crate::snapshot;
use crate::tree::{Blob, SceneTree};

/// Identifier of an attached consumer.
pub type ConsumerId = u64;

struct SceneState {
    tree: SceneTree,
    consumers: Vec<(ConsumerId, mpsc::Sender<Blob>)>,
    next_consumer: ConsumerId,
}

/// What a newly attached consumer gets: the current state, then a queue of
/// everything committed after it.
pub struct Subscription {
    pub id: ConsumerId,
    pub replay: Vec<Blob>,
    pub live: mpsc::Receiver<Blob>,
}

/// Shared bridge state. One instance per server.
pub struct Bridge {
    state: Mutex<SceneState>,
    consumer_count: watch::Sender<usize>,
    shutdown: watch::Sender<bool>,
    handshake: Handshake,
    static_root: PathBuf,
    consumer_buffer: usize,
}

impl Bridge {
    pub fn new(handshake: Handshake, static_root: PathBuf, consumer_buffer: usize) -> Self {
        Self {
            state: Mutex::new(SceneState {
                tree: SceneTree::new(),
                consumers: Vec::new(),
                next_consumer: 0,
            }),
            consumer_count: watch::Sender::new(0),
            shutdown: watch::Sender::new(false),
            handshake,
            static_root,
            consumer_buffer: consumer_buffer.max(1),
        }
    }

    pub fn handshake(&self) -> &Handshake {
        &self.handshake
    }

    /// Number of attached consumers.
    pub fn consumer_count(&self) -> usize {
        *self.consumer_count.borrow()
    }

    /// Attach a consumer and snapshot its replay atomically.
    pub async fn attach(&self) -> Subscription {
        let mut state = self.state.lock().await;
        let (tx, live) = mpsc::channel(self.consumer_buffer);
        let id = state.next_consumer;
        state.next_consumer += 1;
        let replay = state.tree.replay();
        state.consumers.push((id, tx));
        self.consumer_count.send_replace(state.consumers.len());
        log::info!("Consumer {} attached, replaying {} messages", id, replay.len());
        Subscription { id, replay, live }
    }

    /// Remove a consumer. Unknown ids are ignored.
    pub async fn detach(&self, id: ConsumerId) {
        let mut state = self.state.lock().await;
        let before = state.consumers.len();
        state.consumers.retain(|(cid, _)| *cid != id);
        if state.consumers.len() != before {
            log::info!("Consumer {} detached", id);
        }
        self.consumer_count.send_replace(state.consumers.len());
    }

    /// Apply a command to the tree and forward it to every consumer.
    /// Returns how many consumers it was queued for.
    pub async fn apply(&self, kind: CommandKind, path: &Path, data: Blob) -> usize {
        let mut state = self.state.lock().await;
        state.tree.apply(kind, path, data.clone());

        state.consumers.retain(|(id, tx)| match tx.try_send(data.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                log::warn!("Consumer {} is not keeping up, disconnecting", id);
                false
            }
            Err(TrySendError::Closed(_)) => {
                log::debug!("Consumer {} already gone", id);
                false
            }
        });
        let delivered = state.consumers.len();
        self.consumer_count.send_replace(delivered);
        delivered
    }

    /// Current replay sequence.
    pub async fn replay(&self) -> Vec<Blob> {
        self.state.lock().await.tree.replay()
    }

    /// Run `f` against the tree under the bridge lock.
    pub async fn with_tree<R>(&self, f: impl FnOnce(&SceneTree) -> R) -> R {
        f(&self.state.lock().await.tree)
    }

    /// Resolve once a consumer is attached. Returns `false` if shut down first.
    pub async fn wait_for_consumer(&self) -> bool {
        let mut count = self.consumer_count.subscribe();
        tokio::select! {
            res = count.wait_for(|n| *n > 0) => res.is_ok(),
            _ = self.shutdown_signal() => false,
        }
    }

    /// Standalone HTML rendering of the current scene.
    pub async fn static_html(&self) -> String {
        let replay = self.replay().await;
        let runtime = snapshot::load_runtime(&self.static_root).await;
        snapshot::render_static_html(&runtime, &replay)
    }

    /// Ask every task tied to this bridge to stop.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Resolves once [`Bridge::shutdown`] has been called.
    pub async fn shutdown_signal(&self) {
        let mut rx = self.shutdown.subscribe();
        // The sender lives in `self`, so this only errors if it is dropped.
        let _ = rx.wait_for(|stop| *stop).await;
    }

    /// Handle one parsed control request.
    pub async fn handle(&self, request: ControlRequest) -> ControlReply {
        match request {
            ControlRequest::Command { kind, path, data } => {
                log::debug!("{} {} ({} bytes)", kind.tag(), path, data.len());
                self.apply(kind, &path, data).await;
                ControlReply::Ok
            }
            ControlRequest::Url => ControlReply::payload(self.handshake.web_url.clone()),
            ControlRequest::Wait => {
                if self.wait_for_consumer().await {
                    ControlReply::Ok
                } else {
                    ControlReply::error("shutting down")
                }
            }
            ControlRequest::GetScene => ControlReply::Payload(self.static_html().await),
            ControlRequest::Ready => match serde_json::to_string(&self.handshake) {
                Ok(json) => ControlReply::Payload(json),
                Err(e) => ControlReply::error(format!("handshake encoding failed: {}", e)),
            },
        }
    }

    /// Parse and handle a raw message. Malformed messages are rejected
    /// without touching the tree.
    pub async fn handle_frames(&self, frames: Vec<Vec<u8>>) -> ControlReply {
        match ControlRequest::parse(frames) {
            Ok(request) => self.handle(request).await,
            Err(e) => {
                log::warn!("Rejected control message: {}", e);
                ControlReply::from(&e)
            }
        }
    }
}
