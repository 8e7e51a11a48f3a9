//! Wiring between one stream connection and one store.
//!
//! A [`LiveSession`] is the explicitly-owned unit the view layer holds:
//! created when the map view mounts, disposed when it unmounts. Nothing
//! here is global; dropping the session tears the connection down.

use std::sync::Arc;

use odc_sdk::objects::{Channel, StreamEvent};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::store::LiveStateStore;
use crate::stream::{ConnectionState, StreamClient, StreamConfig, TokenProvider};

/// One live channel subscription projected into one store.
pub struct LiveSession {
    store: LiveStateStore,
    client: StreamClient,
    pump: Option<JoinHandle<()>>,
}

impl LiveSession {
    /// Create the store, open the stream and start projecting events.
    pub async fn start(
        channel: Channel,
        config: StreamConfig,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        let store = LiveStateStore::new();
        let mut client = StreamClient::new(channel, config, tokens);

        let events = client.connect().await;
        let state_rx = client.state();
        let pump = tokio::spawn(pump_events(store.clone(), events, state_rx));

        Self {
            store,
            client,
            pump: Some(pump),
        }
    }

    /// The store this session projects into. Clone it to hand read
    /// access to the view layer.
    pub fn store(&self) -> &LiveStateStore {
        &self.store
    }

    /// Tear the session down: close the connection, cancel any pending
    /// reconnect and clear the store so stale positions never leak into
    /// a new session.
    pub async fn shutdown(mut self) {
        self.client.disconnect().await;
        if let Some(pump) = self.pump.take() {
            let _ = pump.await;
        }
        self.store.clear().await;
    }
}

/// Apply events and mirror connection state until the stream ends.
async fn pump_events(
    store: LiveStateStore,
    mut events: mpsc::Receiver<StreamEvent>,
    mut state_rx: watch::Receiver<ConnectionState>,
) {
    loop {
        tokio::select! {
            maybe_event = events.recv() => match maybe_event {
                Some(event) => store.apply(event).await,
                // Channel closed: the connection ended for good.
                None => break,
            },
            changed = state_rx.changed() => match changed {
                Ok(()) => {
                    let connection = state_rx.borrow_and_update().clone();
                    store.set_connection_state(connection).await;
                }
                Err(_) => break,
            },
        }
    }

    // Mirror the final state so the view shows why the stream ended.
    let connection = state_rx.borrow().clone();
    store.set_connection_state(connection).await;
}
