//! The authoritative record of who is connected.
//!
//! [`ConnectionRegistry`] holds the observer set and the actor table.
//! Observer mutations come only from the event loop, which serializes
//! them. Robot registration and teardown mutate the actor table
//! directly from the owning receive loop. Queries and direct sends take
//! a shared lock and see a consistent snapshot; no lock is held across
//! an await point other than the lock acquisition itself.

use std::collections::{BTreeMap, HashSet};

use bytes::Bytes;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::connection::ConnectionHandle;
use crate::error::HubError;

/// Live observer and actor connections.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    observers: RwLock<HashSet<ConnectionHandle>>,
    actors: RwLock<BTreeMap<String, ConnectionHandle>>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Observers
    // -----------------------------------------------------------------------

    /// Add an observer. Returns `false` if it was already present.
    pub async fn add_observer(&self, handle: ConnectionHandle) -> bool {
        let id = handle.id();
        let inserted = self.observers.write().await.insert(handle);
        if inserted {
            info!(connection = %id, "Observer registered");
        }
        inserted
    }

    /// Remove and close an observer. No-op if absent.
    pub async fn remove_observer(&self, handle: &ConnectionHandle) -> bool {
        let removed = self.observers.write().await.remove(handle);
        if removed {
            handle.close();
            info!(connection = %handle.id(), "Observer unregistered");
        }
        removed
    }

    /// Whether `handle` is currently in the observer set.
    pub async fn contains_observer(&self, handle: &ConnectionHandle) -> bool {
        self.observers.read().await.contains(handle)
    }

    /// Number of registered observers.
    pub async fn observer_count(&self) -> usize {
        self.observers.read().await.len()
    }

    /// Write `payload` to every observer under the shared lock.
    ///
    /// Delivery continues past failures; the handles whose write failed
    /// are returned so the caller can evict them.
    pub async fn fan_out_to_observers(&self, payload: &Bytes) -> Vec<ConnectionHandle> {
        let observers = self.observers.read().await;
        observers
            .iter()
            .filter(|observer| {
                observer.send(payload.clone()).map_or_else(
                    |e| {
                        warn!(error = %e, "Write to observer failed");
                        true
                    },
                    |()| false,
                )
            })
            .cloned()
            .collect()
    }

    /// Remove and close each of `handles`. Returns how many were present.
    pub async fn evict_observers(&self, handles: &[ConnectionHandle]) -> usize {
        let mut observers = self.observers.write().await;
        let mut evicted: usize = 0;
        for handle in handles {
            if observers.remove(handle) {
                evicted = evicted.saturating_add(1);
            }
            handle.close();
        }
        drop(observers);

        if evicted > 0 {
            info!(evicted, "Evicted unreachable observers");
        }
        evicted
    }

    // -----------------------------------------------------------------------
    // Actors
    // -----------------------------------------------------------------------

    /// Store `handle` as the connection for robot `id`.
    ///
    /// A different connection already stored under `id` is closed first
    /// and returned.
    pub async fn set_actor(&self, id: &str, handle: ConnectionHandle) -> Option<ConnectionHandle> {
        let connection = handle.id();
        let mut actors = self.actors.write().await;
        let previous = actors.remove(id).filter(|prev| *prev != handle);
        if let Some(prev) = &previous {
            prev.close();
            info!(actor_id = id, previous = %prev.id(), connection = %connection, "Robot connection replaced");
        }
        actors.insert(id.to_owned(), handle);
        drop(actors);

        info!(actor_id = id, connection = %connection, "Robot connected");
        previous
    }

    /// Close and remove robot `id`. No-op if absent.
    pub async fn remove_actor(&self, id: &str) -> bool {
        let removed = self.actors.write().await.remove(id);
        removed.is_some_and(|handle| {
            handle.close();
            info!(actor_id = id, connection = %handle.id(), "Robot disconnected");
            true
        })
    }

    /// Close and remove robot `id` only if it is still bound to `handle`.
    ///
    /// Used by a receive loop's teardown so a replaced connection never
    /// evicts the one that replaced it.
    pub async fn release_actor(&self, id: &str, handle: &ConnectionHandle) -> bool {
        let mut actors = self.actors.write().await;
        if actors.get(id) != Some(handle) {
            debug!(actor_id = id, connection = %handle.id(), "Robot already replaced, nothing to release");
            return false;
        }
        actors.remove(id);
        drop(actors);

        handle.close();
        info!(actor_id = id, connection = %handle.id(), "Robot disconnected");
        true
    }

    /// Snapshot of the connected robot identities, sorted.
    pub async fn list_actor_ids(&self) -> Vec<String> {
        self.actors.read().await.keys().cloned().collect()
    }

    /// Number of connected robots.
    pub async fn actor_count(&self) -> usize {
        self.actors.read().await.len()
    }

    /// Write `payload` directly to robot `id`.
    ///
    /// Never mutates the registry: an unknown id is
    /// [`HubError::ActorNotFound`], a dead connection [`HubError::Closed`].
    pub async fn send_to_actor(&self, id: &str, payload: Bytes) -> Result<(), HubError> {
        let actors = self.actors.read().await;
        let handle = actors
            .get(id)
            .ok_or_else(|| HubError::ActorNotFound(id.to_owned()))?;
        handle.send(payload)?;
        Ok(())
    }

    /// Write `payload` to every robot. Returns the number of successful writes.
    ///
    /// A failed write closes that robot's connection; its receive loop
    /// then releases the mapping.
    pub async fn broadcast_to_actors(&self, payload: &Bytes) -> usize {
        let actors = self.actors.read().await;
        let mut delivered: usize = 0;
        for (id, handle) in actors.iter() {
            match handle.send(payload.clone()) {
                Ok(()) => delivered = delivered.saturating_add(1),
                Err(e) => {
                    warn!(actor_id = %id, error = %e, "Write to robot failed, closing");
                    handle.close();
                }
            }
        }
        delivered
    }

    // -----------------------------------------------------------------------
    // Shutdown
    // -----------------------------------------------------------------------

    /// Close and forget every connection.
    pub async fn close_all(&self) {
        let observers: Vec<ConnectionHandle> = self.observers.write().await.drain().collect();
        let actors = std::mem::take(&mut *self.actors.write().await);

        for handle in observers.iter().chain(actors.values()) {
            handle.close();
        }
        info!(
            observers = observers.len(),
            robots = actors.len(),
            "Closed all connections"
        );
    }
}
