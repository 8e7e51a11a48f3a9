//! End-to-end tests for the live event/state subsystem, driven against a
//! scripted in-process stream server.

use std::collections::{HashMap, VecDeque};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use odc_core::live::LiveSession;
use odc_core::store::{FleetSnapshot, LiveStateStore};
use odc_core::stream::{
    ConnectionState, SharedToken, StaticToken, StreamClient, StreamConfig, StreamError,
};
use odc_sdk::objects::{Channel, StreamEvent};
use time::macros::datetime;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use url::Url;

const WAIT: Duration = Duration::from_secs(5);
const RECONNECT: Duration = Duration::from_millis(250);

type Feed = mpsc::Sender<Result<Event, Infallible>>;
type FeedQueue = Arc<Mutex<VecDeque<mpsc::Receiver<Result<Event, Infallible>>>>>;

#[derive(Clone)]
struct StreamServerState {
    token: String,
    hits: Arc<AtomicUsize>,
    connected_tx: mpsc::Sender<()>,
    feeds: FeedQueue,
}

/// `GET /v1/events/{channel}?token=...`: serves the next scripted feed,
/// or an immediately-closed stream when the script has run out.
async fn events(
    State(state): State<StreamServerState>,
    Path(_channel): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);

    if params.get("token") != Some(&state.token) {
        return (
            StatusCode::UNAUTHORIZED,
            axum::Json(serde_json::json!({"error": "invalid token"})),
        )
            .into_response();
    }

    let _ = state.connected_tx.send(()).await;

    let feed = state.feeds.lock().unwrap().pop_front();
    match feed {
        Some(rx) => Sse::new(ReceiverStream::new(rx)).into_response(),
        None => {
            let (_tx, rx) = mpsc::channel(1);
            Sse::new(ReceiverStream::new(rx)).into_response()
        }
    }
}

struct StreamServer {
    addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    connected_rx: mpsc::Receiver<()>,
    feeds: FeedQueue,
}

impl StreamServer {
    async fn spawn(token: &str) -> Self {
        let hits = Arc::new(AtomicUsize::new(0));
        let feeds: FeedQueue = Arc::new(Mutex::new(VecDeque::new()));
        let (connected_tx, connected_rx) = mpsc::channel(16);

        let state = StreamServerState {
            token: token.to_string(),
            hits: Arc::clone(&hits),
            connected_tx,
            feeds: Arc::clone(&feeds),
        };
        let app = Router::new()
            .route("/v1/events/{channel}", get(events))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            hits,
            connected_rx,
            feeds,
        }
    }

    fn config(&self) -> StreamConfig {
        let base_url = Url::parse(&format!("http://{}/", self.addr)).unwrap();
        let mut config = StreamConfig::new(base_url);
        config.reconnect_delay = RECONNECT;
        config
    }

    /// Script the feed served to the next accepted connection.
    fn queue_feed(&self) -> Feed {
        let (tx, rx) = mpsc::channel(16);
        self.feeds.lock().unwrap().push_back(rx);
        tx
    }

    /// Wait until the server accepts a connection.
    async fn wait_connected(&mut self) {
        tokio::time::timeout(WAIT, self.connected_rx.recv())
            .await
            .expect("timed out waiting for a connection")
            .expect("server task gone");
    }

    /// Total stream requests received, accepted or not.
    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

fn location_json(driver_id: i64, lat: f64, lng: f64, recorded_at: &str) -> String {
    serde_json::json!({
        "type": "driver_location_updated",
        "data": {
            "driver_id": driver_id,
            "lat": lat,
            "lng": lng,
            "recorded_at": recorded_at,
        },
    })
    .to_string()
}

async fn wait_for_snapshot(
    store: &LiveStateStore,
    mut pred: impl FnMut(&FleetSnapshot) -> bool,
) -> FleetSnapshot {
    let deadline = Instant::now() + WAIT;
    loop {
        let snapshot = store.snapshot().await;
        if pred(&snapshot) {
            return snapshot;
        }
        assert!(
            Instant::now() < deadline,
            "condition not met in time; last snapshot: {snapshot:?}"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn location_events_project_into_store() {
    let mut server = StreamServer::spawn("staff-token").await;
    let feed = server.queue_feed();

    let session = LiveSession::start(
        Channel::Admin,
        server.config(),
        Arc::new(StaticToken::new("staff-token")),
    )
    .await;
    server.wait_connected().await;

    feed.send(Ok(Event::default().data(location_json(
        7,
        -37.81,
        144.96,
        "2025-01-01T00:00:00Z",
    ))))
    .await
    .unwrap();

    let snapshot = wait_for_snapshot(session.store(), |s| s.drivers.contains_key(&7)).await;
    let entry = &snapshot.drivers[&7];
    assert_eq!(entry.lat, -37.81);
    assert_eq!(entry.lng, 144.96);
    assert_eq!(entry.recorded_at, datetime!(2025-01-01 00:00:00 UTC));
    assert!(snapshot.connection.is_connected());
    assert!(snapshot.last_update.is_some());

    session.shutdown().await;
}

#[tokio::test]
async fn malformed_payloads_are_dropped_without_closing_the_stream() {
    let mut server = StreamServer::spawn("t").await;
    let feed = server.queue_feed();

    let session = LiveSession::start(
        Channel::Admin,
        server.config(),
        Arc::new(StaticToken::new("t")),
    )
    .await;
    server.wait_connected().await;

    // Not JSON, JSON of the wrong shape, and an unknown event type: all
    // dropped, none may disturb the connection or the map.
    feed.send(Ok(Event::default().data("not json"))).await.unwrap();
    feed.send(Ok(Event::default().data(r#"{"lat": 1.0}"#)))
        .await
        .unwrap();
    feed.send(Ok(Event::default().data(
        r#"{"type":"fleet_rebalanced","data":{"region":3}}"#,
    )))
    .await
    .unwrap();
    feed.send(Ok(Event::default().data(location_json(
        3,
        1.5,
        2.5,
        "2025-01-01T00:00:00Z",
    ))))
    .await
    .unwrap();

    let snapshot = wait_for_snapshot(session.store(), |s| s.drivers.contains_key(&3)).await;
    assert_eq!(snapshot.drivers.len(), 1);
    assert!(snapshot.connection.is_connected());
    assert_eq!(server.hits(), 1, "a bad payload must not trigger a reconnect");

    session.shutdown().await;
}

#[tokio::test]
async fn lost_stream_reconnects_after_the_fixed_delay() {
    let mut server = StreamServer::spawn("t").await;
    let feed = server.queue_feed();
    let _second_feed = server.queue_feed();

    let mut client = StreamClient::new(
        Channel::Admin,
        server.config(),
        Arc::new(StaticToken::new("t")),
    );
    let mut state_rx = client.state();
    let _events = client.connect().await;
    server.wait_connected().await;

    let dropped_at = Instant::now();
    drop(feed);

    // The loss surfaces as an error state first...
    tokio::time::timeout(
        WAIT,
        state_rx.wait_for(|s| matches!(s, ConnectionState::Error(_))),
    )
    .await
    .unwrap()
    .unwrap();

    // ...then exactly one delayed reconnect brings the stream back.
    server.wait_connected().await;
    let elapsed = dropped_at.elapsed();
    assert!(elapsed >= RECONNECT, "reconnected too early: {elapsed:?}");
    assert!(
        elapsed < Duration::from_secs(4),
        "reconnected too late: {elapsed:?}"
    );
    assert_eq!(server.hits(), 2);

    tokio::time::timeout(WAIT, state_rx.wait_for(ConnectionState::is_connected))
        .await
        .unwrap()
        .unwrap();

    client.disconnect().await;
}

#[tokio::test]
async fn disconnect_cancels_a_pending_reconnect() {
    let mut server = StreamServer::spawn("t").await;
    let feed = server.queue_feed();

    let mut client = StreamClient::new(
        Channel::Admin,
        server.config(),
        Arc::new(StaticToken::new("t")),
    );
    let mut state_rx = client.state();
    let _events = client.connect().await;
    server.wait_connected().await;

    drop(feed);
    tokio::time::timeout(
        WAIT,
        state_rx.wait_for(|s| matches!(s, ConnectionState::Error(_))),
    )
    .await
    .unwrap()
    .unwrap();

    // Disconnect while the reconnect timer is pending.
    client.disconnect().await;
    assert_eq!(*state_rx.borrow(), ConnectionState::Disconnected);

    tokio::time::sleep(RECONNECT * 3).await;
    assert_eq!(server.hits(), 1, "no reconnect may fire after disconnect");
    assert_eq!(*state_rx.borrow(), ConnectionState::Disconnected);

    // Repeated disconnects are fine.
    client.disconnect().await;
}

#[tokio::test]
async fn reconnect_aborts_when_the_credential_disappears() {
    let mut server = StreamServer::spawn("t").await;
    let feed = server.queue_feed();

    let tokens = SharedToken::new("t");
    let mut client = StreamClient::new(Channel::Admin, server.config(), Arc::new(tokens.clone()));
    let mut state_rx = client.state();
    let mut events = client.connect().await;
    server.wait_connected().await;

    // Log out, then lose the connection: the retry must not spin.
    tokens.clear();
    drop(feed);

    tokio::time::timeout(
        WAIT,
        state_rx.wait_for(|s| *s == ConnectionState::Error(StreamError::MissingCredential)),
    )
    .await
    .unwrap()
    .unwrap();

    tokio::time::sleep(RECONNECT * 3).await;
    assert_eq!(server.hits(), 1, "no reconnect without a credential");

    // The event sequence ends with the connection.
    assert!(events.recv().await.is_none());
}

#[tokio::test]
async fn rejected_credential_is_terminal() {
    let server = StreamServer::spawn("right").await;

    let mut client = StreamClient::new(
        Channel::Admin,
        server.config(),
        Arc::new(StaticToken::new("wrong")),
    );
    let mut state_rx = client.state();
    let _events = client.connect().await;

    tokio::time::timeout(
        WAIT,
        state_rx.wait_for(|s| *s == ConnectionState::Error(StreamError::Unauthorized)),
    )
    .await
    .unwrap()
    .unwrap();

    tokio::time::sleep(RECONNECT * 3).await;
    assert_eq!(server.hits(), 1, "a rejected credential must not be retried");
}

#[tokio::test]
async fn connect_replaces_the_existing_connection() {
    let mut server = StreamServer::spawn("t").await;
    let _first_feed = server.queue_feed();
    let second_feed = server.queue_feed();

    let mut client = StreamClient::new(
        Channel::Admin,
        server.config(),
        Arc::new(StaticToken::new("t")),
    );
    let mut first_events = client.connect().await;
    server.wait_connected().await;

    let mut second_events = client.connect().await;
    server.wait_connected().await;
    assert_eq!(server.hits(), 2);

    // The replaced connection's sequence is closed; the new one is live.
    assert!(first_events.recv().await.is_none());

    second_feed
        .send(Ok(Event::default().data(location_json(
            1,
            0.5,
            0.5,
            "2025-01-01T00:00:00Z",
        ))))
        .await
        .unwrap();
    let event = tokio::time::timeout(WAIT, second_events.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(event, StreamEvent::DriverLocationUpdated { .. }));

    client.disconnect().await;
}

#[tokio::test]
async fn session_shutdown_clears_the_store() {
    let mut server = StreamServer::spawn("t").await;
    let feed = server.queue_feed();

    let session = LiveSession::start(
        Channel::Admin,
        server.config(),
        Arc::new(StaticToken::new("t")),
    )
    .await;
    server.wait_connected().await;

    feed.send(Ok(Event::default().data(location_json(
        9,
        -37.80,
        144.95,
        "2025-01-01T00:00:00Z",
    ))))
    .await
    .unwrap();
    wait_for_snapshot(session.store(), |s| s.drivers.contains_key(&9)).await;

    let store = session.store().clone();
    session.shutdown().await;

    let snapshot = store.snapshot().await;
    assert!(snapshot.drivers.is_empty());
    assert_eq!(snapshot.connection, ConnectionState::Disconnected);
}
