//! Live fleet-state projection with change notification.
//!
//! [`LiveStateStore`] is the only writer-side owner of driver positions:
//! entries are created and overwritten exclusively by [`apply`] and
//! removed exclusively by [`clear`]. It wraps the state behind
//! `Arc<RwLock<_>>` with a watch-based notification mechanism so the
//! view layer can react to updates without polling.
//!
//! [`apply`]: LiveStateStore::apply
//! [`clear`]: LiveStateStore::clear

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use odc_sdk::objects::{DriverLocation, StreamEvent};
use time::OffsetDateTime;
use tokio::sync::{RwLock, watch};

use crate::stream::ConnectionState;

/// The projected fleet state at one point in time.
///
/// [`LiveStateStore::snapshot`] hands this out by value, so readers can
/// never alias the store's interior.
#[derive(Debug, Clone, Default)]
pub struct FleetSnapshot {
    /// Latest known position per driver. No history is kept.
    pub drivers: HashMap<i64, DriverLocation>,
    /// When the store last applied a location event. Stamped at
    /// application time, not from the event's own `recorded_at`.
    pub last_update: Option<OffsetDateTime>,
    /// Connection state mirrored from the stream client, for display.
    pub connection: ConnectionState,
}

/// A shared, versioned projection of the live driver map.
///
/// Cloning shares the underlying store. Writes are serialized through
/// the lock, so a reader never observes a partially-applied entry.
pub struct LiveStateStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    state: RwLock<FleetSnapshot>,
    version: AtomicU64,
    version_tx: watch::Sender<u64>,
}

/// Receives notifications when a [`LiveStateStore`] changes.
///
/// Call [`changed()`](StoreWatcher::changed) to wait for the next update.
pub struct StoreWatcher {
    version_rx: watch::Receiver<u64>,
}

// -- LiveStateStore -----------------------------------------------------

impl LiveStateStore {
    /// Create an empty store.
    pub fn new() -> Self {
        let (version_tx, _) = watch::channel(0u64);
        Self {
            inner: Arc::new(StoreInner {
                state: RwLock::new(FleetSnapshot::default()),
                version: AtomicU64::new(0),
                version_tx,
            }),
        }
    }

    /// Apply one decoded stream event.
    ///
    /// A location event unconditionally overwrites that driver's entry:
    /// last received wins, in transport-arrival order. The event's own
    /// `recorded_at` is stored but never compared, so arrival order and
    /// generation order may disagree. Unrecognized events change
    /// nothing.
    pub async fn apply(&self, event: StreamEvent) {
        match event {
            StreamEvent::DriverLocationUpdated { data } => {
                let mut guard = self.inner.state.write().await;
                guard.drivers.insert(data.driver_id, data);
                guard.last_update = Some(OffsetDateTime::now_utc());
                drop(guard);
                self.notify();
            }
            StreamEvent::Unknown => {}
        }
    }

    /// Mirror the stream client's connection state for display.
    pub async fn set_connection_state(&self, connection: ConnectionState) {
        let mut guard = self.inner.state.write().await;
        if guard.connection == connection {
            return;
        }
        guard.connection = connection;
        drop(guard);
        self.notify();
    }

    /// Empty the driver map, e.g. on logout or view teardown, so stale
    /// positions never leak into a new session.
    pub async fn clear(&self) {
        let mut guard = self.inner.state.write().await;
        guard.drivers.clear();
        guard.last_update = None;
        drop(guard);
        self.notify();
    }

    /// An owned, immutable view of the current state.
    pub async fn snapshot(&self) -> FleetSnapshot {
        self.inner.state.read().await.clone()
    }

    /// Subscribe to change notifications.
    pub fn subscribe(&self) -> StoreWatcher {
        StoreWatcher {
            version_rx: self.inner.version_tx.subscribe(),
        }
    }

    fn notify(&self) {
        let new_version = self.inner.version.fetch_add(1, Ordering::Relaxed) + 1;
        let _ = self.inner.version_tx.send(new_version);
    }
}

impl Clone for LiveStateStore {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Default for LiveStateStore {
    fn default() -> Self {
        Self::new()
    }
}

// -- StoreWatcher -------------------------------------------------------

impl StoreWatcher {
    /// Wait until the store is updated.
    ///
    /// Returns `Ok(())` when a change happened, or `Err` if the store
    /// has been dropped.
    pub async fn changed(&mut self) -> Result<(), watch::error::RecvError> {
        self.version_rx.changed().await
    }
}
