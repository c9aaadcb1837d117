//! The hub front and its serialized event loop.
//!
//! [`Hub`] is the cheap, clone-able handle that receive loops and HTTP
//! handlers hold. Observer registration, fan-out to observers, and
//! chat/speech requests are enqueued on one bounded channel and handled
//! by the single [`EventLoop`] task, strictly in arrival order and one
//! at a time. Robot registration and the query surface go straight to
//! the shared [`ConnectionRegistry`].
//!
//! # Shutdown
//!
//! [`EventLoop::run`] stops when its [`CancellationToken`] fires or every
//! [`Hub`] clone is dropped. It then refuses new events, handles what is
//! already queued, and closes every registered connection.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::adapter::Adapters;
use crate::connection::ConnectionHandle;
use crate::error::HubError;
use crate::event::HubEvent;
use crate::protocol::{ObserverFrame, ObserverReply};
use crate::registry::ConnectionRegistry;

/// Default capacity of the event queue.
///
/// Producers wait when the queue is full, which back-pressures receive
/// loops instead of growing memory without bound.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Tuning for the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubConfig {
    /// Maximum number of queued events before producers wait.
    pub event_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

/// Entry points into the hub.
#[derive(Debug, Clone)]
pub struct Hub {
    events: mpsc::Sender<HubEvent>,
    registry: Arc<ConnectionRegistry>,
}

/// The single task that owns observer-set mutation and fan-out.
#[derive(Debug)]
pub struct EventLoop {
    events: mpsc::Receiver<HubEvent>,
    registry: Arc<ConnectionRegistry>,
    adapters: Adapters,
}

impl Hub {
    /// Build a hub and the event loop that must be run for it.
    pub fn new(config: HubConfig, adapters: Adapters) -> (Self, EventLoop) {
        let (tx, rx) = mpsc::channel(config.event_capacity.max(1));
        let registry = Arc::new(ConnectionRegistry::new());

        let hub = Self {
            events: tx,
            registry: Arc::clone(&registry),
        };
        let event_loop = EventLoop {
            events: rx,
            registry,
            adapters,
        };
        (hub, event_loop)
    }

    /// Build a hub and spawn its event loop on the current runtime.
    pub fn spawn(
        config: HubConfig,
        adapters: Adapters,
        shutdown: CancellationToken,
    ) -> (Self, JoinHandle<()>) {
        let (hub, event_loop) = Self::new(config, adapters);
        let handle = tokio::spawn(event_loop.run(shutdown));
        (hub, handle)
    }

    /// The shared registry behind this hub.
    pub const fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    async fn enqueue(&self, event: HubEvent) -> Result<(), HubError> {
        let kind = event.kind();
        self.events.send(event).await.map_err(|_rejected| {
            debug!(event = kind, "Hub event loop stopped, event dropped");
            HubError::Stopped
        })
    }

    // -----------------------------------------------------------------------
    // Serialized entry points
    // -----------------------------------------------------------------------

    /// Queue registration of a browser connection.
    pub async fn register_observer(&self, handle: ConnectionHandle) -> Result<(), HubError> {
        self.enqueue(HubEvent::RegisterObserver(handle)).await
    }

    /// Queue removal of a browser connection.
    pub async fn unregister_observer(&self, handle: ConnectionHandle) -> Result<(), HubError> {
        self.enqueue(HubEvent::UnregisterObserver(handle)).await
    }

    /// Queue a raw payload for every observer.
    ///
    /// `actor_id` records which robot produced it; observers receive
    /// the payload bytes only.
    pub async fn broadcast_to_observers(
        &self,
        actor_id: Option<String>,
        payload: Bytes,
    ) -> Result<(), HubError> {
        self.enqueue(HubEvent::BroadcastToObservers { actor_id, payload })
            .await
    }

    /// Queue a chat request whose reply goes to `origin`.
    pub async fn request_chat(&self, text: String, origin: ConnectionHandle) -> Result<(), HubError> {
        self.enqueue(HubEvent::ChatRequest { text, origin }).await
    }

    /// Queue a speech request whose reply goes to `origin`.
    pub async fn request_speech(
        &self,
        text: String,
        origin: ConnectionHandle,
    ) -> Result<(), HubError> {
        self.enqueue(HubEvent::SpeechRequest { text, origin }).await
    }

    // -----------------------------------------------------------------------
    // Robot lifecycle
    // -----------------------------------------------------------------------

    /// Bind `handle` to robot `id`, closing any connection it replaces.
    pub async fn register_actor(&self, id: &str, handle: ConnectionHandle) -> Result<(), HubError> {
        if id.is_empty() {
            return Err(HubError::EmptyActorId);
        }
        self.registry.set_actor(id, handle).await;
        Ok(())
    }

    /// Tear down robot `id` if it is still bound to `handle`.
    pub async fn release_actor(&self, id: &str, handle: &ConnectionHandle) -> bool {
        self.registry.release_actor(id, handle).await
    }

    // -----------------------------------------------------------------------
    // Query surface (shared-lock snapshots)
    // -----------------------------------------------------------------------

    /// Identities of the connected robots.
    pub async fn connected_actors(&self) -> Vec<String> {
        self.registry.list_actor_ids().await
    }

    /// Write a raw payload to one robot.
    pub async fn send_to_actor(&self, id: &str, payload: Bytes) -> Result<(), HubError> {
        self.registry.send_to_actor(id, payload).await
    }

    /// Write a raw payload to every robot. Returns successful writes.
    pub async fn broadcast_to_actors(&self, payload: &Bytes) -> usize {
        self.registry.broadcast_to_actors(payload).await
    }

    /// Number of registered observers.
    pub async fn observer_count(&self) -> usize {
        self.registry.observer_count().await
    }

    // -----------------------------------------------------------------------
    // Inbound frame routing
    // -----------------------------------------------------------------------

    /// Route one inbound frame from a browser connection.
    ///
    /// Malformed frames and unknown tags are logged and dropped; the only
    /// error is [`HubError::Stopped`].
    pub async fn dispatch_observer_frame(
        &self,
        frame: Bytes,
        origin: &ConnectionHandle,
    ) -> Result<(), HubError> {
        let decoded = match ObserverFrame::decode(&frame) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!(connection = %origin.id(), error = %e, "Dropping malformed observer frame");
                return Ok(());
            }
        };
        trace!(connection = %origin.id(), kind = decoded.label(), "Observer frame");

        match decoded {
            ObserverFrame::Chat(text) => self.request_chat(text, origin.clone()).await,
            ObserverFrame::Speech(text) => self.request_speech(text, origin.clone()).await,
            ObserverFrame::RobotCommand => {
                let delivered = self.broadcast_to_actors(&frame).await;
                debug!(connection = %origin.id(), delivered, "Robot command forwarded");
                Ok(())
            }
            ObserverFrame::Unknown(kind) => {
                warn!(connection = %origin.id(), kind = %kind, "Dropping observer frame with unknown type");
                Ok(())
            }
        }
    }

    /// Route one inbound frame from robot `actor_id` to every observer.
    pub async fn dispatch_actor_frame(&self, actor_id: &str, frame: Bytes) -> Result<(), HubError> {
        self.broadcast_to_observers(Some(actor_id.to_owned()), frame)
            .await
    }
}

impl EventLoop {
    /// Drain events until shutdown, then close every connection.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!("Hub event loop started");

        loop {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => {
                    info!("Hub shutdown requested");
                    break;
                }
                event = self.events.recv() => match event {
                    Some(event) => self.handle(event).await,
                    None => {
                        debug!("All hub handles dropped");
                        break;
                    }
                },
            }
        }

        self.events.close();
        let mut drained: usize = 0;
        while let Some(event) = self.events.recv().await {
            self.handle(event).await;
            drained = drained.saturating_add(1);
        }
        self.registry.close_all().await;

        info!(drained, "Hub event loop stopped");
    }

    async fn handle(&self, event: HubEvent) {
        trace!(event = event.kind(), "Handling hub event");

        match event {
            HubEvent::RegisterObserver(handle) => {
                self.registry.add_observer(handle).await;
            }
            HubEvent::UnregisterObserver(handle) => {
                self.registry.remove_observer(&handle).await;
            }
            HubEvent::BroadcastToObservers { actor_id, payload } => {
                let failed = self.registry.fan_out_to_observers(&payload).await;
                if !failed.is_empty() {
                    let evicted = self.registry.evict_observers(&failed).await;
                    debug!(actor_id = actor_id.as_deref(), evicted, "Broadcast evicted observers");
                }
            }
            HubEvent::ChatRequest { text, origin } => {
                debug!(connection = %origin.id(), chars = text.chars().count(), "Chat request");
                let reply = self.adapters.answer_chat(&text).await;
                self.reply(&origin, &ObserverReply::ChatResponse(reply)).await;
            }
            HubEvent::SpeechRequest { text, origin } => {
                debug!(connection = %origin.id(), chars = text.chars().count(), "Speech request");
                let audio_path = self.adapters.answer_speech(&text).await;
                self.reply(&origin, &ObserverReply::TtsResponse { audio_path })
                    .await;
            }
        }
    }

    async fn reply(&self, origin: &ConnectionHandle, reply: &ObserverReply) {
        if let Err(e) = origin.send_json(reply) {
            warn!(connection = %origin.id(), error = %e, "Failed to deliver reply");
            self.registry
                .evict_observers(std::slice::from_ref(origin))
                .await;
        }
    }
}
