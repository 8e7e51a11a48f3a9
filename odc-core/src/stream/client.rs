//! Connection ownership, decoding and reconnect policy.

use std::sync::Arc;
use std::time::Duration;

use odc_sdk::objects::{Channel, StreamEvent};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use url::Url;

use super::sse::SseDecoder;
use super::token::TokenProvider;

/// Fixed delay before the single reconnect attempt after a failure.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Default buffer for the decoded-event channel. Enough to absorb
/// bursts while keeping memory bounded.
const EVENT_CHANNEL_BUFFER: usize = 256;

/// Errors surfaced through [`ConnectionState::Error`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    /// No credential was available at (re)connect time.
    #[error("missing credential")]
    MissingCredential,

    /// The server rejected the credential.
    #[error("credential rejected")]
    Unauthorized,

    /// The stream request could not be established.
    #[error("connect failed: {0}")]
    ConnectFailed(String),

    /// An established stream dropped.
    #[error("connection lost: {0}")]
    ConnectionLost(String),
}

impl StreamError {
    /// Terminal errors stop the retry loop; recovery needs a fresh
    /// credential and a new `connect` call.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StreamError::MissingCredential | StreamError::Unauthorized
        )
    }
}

/// Observable state of the one connection a [`StreamClient`] owns.
///
/// Transitions are driven by transport outcomes inside the connection
/// task, never by application logic.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error(StreamError),
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Error(err) => write!(f, "error: {err}"),
        }
    }
}

/// Stream client configuration.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Root URL of the dispatch server.
    pub base_url: Url,
    /// Delay before the scheduled reconnect attempt.
    pub reconnect_delay: Duration,
    /// Buffer size of the decoded-event channel.
    pub event_buffer: usize,
}

impl StreamConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            reconnect_delay: RECONNECT_DELAY,
            event_buffer: EVENT_CHANNEL_BUFFER,
        }
    }
}

/// Owns the one push connection for a single channel.
///
/// [`connect`](Self::connect) returns the decoded-event receiver; the
/// channel closes when the connection ends for good (disconnect or a
/// terminal credential error). Connection state is observable through
/// [`state`](Self::state).
pub struct StreamClient {
    channel: Channel,
    config: StreamConfig,
    tokens: Arc<dyn TokenProvider>,
    http: reqwest::Client,
    state_tx: watch::Sender<ConnectionState>,
    conn: Option<Connection>,
}

struct Connection {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl StreamClient {
    pub fn new(channel: Channel, config: StreamConfig, tokens: Arc<dyn TokenProvider>) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            channel,
            config,
            tokens,
            http: reqwest::Client::new(),
            state_tx,
            conn: None,
        }
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Subscribe to connection-state changes.
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Open the stream and return the decoded-event receiver.
    ///
    /// The token is re-read from the provider now and again before every
    /// reconnect attempt. If a connection is already live it is closed
    /// first; there is never a second connection for the channel.
    pub async fn connect(&mut self) -> mpsc::Receiver<StreamEvent> {
        self.stop_current().await;

        let (event_tx, event_rx) = mpsc::channel(self.config.event_buffer);
        let (stop_tx, stop_rx) = watch::channel(false);

        self.state_tx.send_replace(ConnectionState::Connecting);

        let task = tokio::spawn(run_connection(
            ConnectionShared {
                channel: self.channel,
                config: self.config.clone(),
                tokens: Arc::clone(&self.tokens),
                http: self.http.clone(),
                state_tx: self.state_tx.clone(),
            },
            event_tx,
            stop_rx,
        ));

        self.conn = Some(Connection { stop_tx, task });
        event_rx
    }

    /// Close the connection if any and cancel any pending reconnect.
    /// Safe to call repeatedly.
    pub async fn disconnect(&mut self) {
        self.stop_current().await;
        self.state_tx.send_replace(ConnectionState::Disconnected);
    }

    async fn stop_current(&mut self) {
        if let Some(conn) = self.conn.take() {
            let _ = conn.stop_tx.send(true);
            let _ = conn.task.await;
        }
    }
}

impl Drop for StreamClient {
    fn drop(&mut self) {
        // No reconnect may outlive its owner.
        if let Some(conn) = &self.conn {
            conn.task.abort();
        }
    }
}

/// Everything the connection task needs, cloned out of the client so the
/// task has no borrow back into it.
struct ConnectionShared {
    channel: Channel,
    config: StreamConfig,
    tokens: Arc<dyn TokenProvider>,
    http: reqwest::Client,
    state_tx: watch::Sender<ConnectionState>,
}

enum ReadOutcome {
    /// Stop was requested through the client.
    Stopped,
    /// The event receiver was dropped; nobody is listening anymore.
    SubscriberGone,
    /// The transport dropped.
    Lost(StreamError),
}

/// Connect / read / reconnect loop for one channel.
///
/// Runs until a stop request, a terminal credential error, or the
/// subscriber going away.
async fn run_connection(
    shared: ConnectionShared,
    event_tx: mpsc::Sender<StreamEvent>,
    mut stop_rx: watch::Receiver<bool>,
) {
    loop {
        // Re-read the credential on every attempt; rotation and logout
        // must take effect here, not at the next process restart.
        let Some(token) = shared.tokens.token() else {
            tracing::warn!(channel = %shared.channel, "no credential available, stopping stream");
            shared
                .state_tx
                .send_replace(ConnectionState::Error(StreamError::MissingCredential));
            return;
        };

        shared.state_tx.send_replace(ConnectionState::Connecting);

        match open_stream(&shared, &token).await {
            Ok(resp) => {
                tracing::info!(channel = %shared.channel, "event stream connected");
                shared.state_tx.send_replace(ConnectionState::Connected);

                match read_events(resp, &event_tx, &mut stop_rx).await {
                    ReadOutcome::Stopped => {
                        shared.state_tx.send_replace(ConnectionState::Disconnected);
                        return;
                    }
                    ReadOutcome::SubscriberGone => {
                        tracing::debug!(
                            channel = %shared.channel,
                            "event receiver dropped, closing stream"
                        );
                        shared.state_tx.send_replace(ConnectionState::Disconnected);
                        return;
                    }
                    ReadOutcome::Lost(err) => {
                        tracing::warn!(channel = %shared.channel, error = %err, "event stream lost");
                        shared.state_tx.send_replace(ConnectionState::Error(err));
                    }
                }
            }
            Err(err) => {
                tracing::warn!(channel = %shared.channel, error = %err, "event stream connect failed");
                let terminal = err.is_terminal();
                shared.state_tx.send_replace(ConnectionState::Error(err));
                if terminal {
                    return;
                }
            }
        }

        // The failed response is dropped by now, so the transport is fully
        // closed before any reconnect is scheduled. Exactly one attempt
        // per failure, after a fixed delay; a stop request cancels it.
        tokio::select! {
            biased;
            _ = stopped(&mut stop_rx) => {
                shared.state_tx.send_replace(ConnectionState::Disconnected);
                return;
            }
            _ = tokio::time::sleep(shared.config.reconnect_delay) => {}
        }
    }
}

/// Resolves once a stop has been requested, or the client is gone.
async fn stopped(stop_rx: &mut watch::Receiver<bool>) {
    loop {
        if *stop_rx.borrow_and_update() {
            return;
        }
        if stop_rx.changed().await.is_err() {
            return;
        }
    }
}

async fn open_stream(
    shared: &ConnectionShared,
    token: &str,
) -> Result<reqwest::Response, StreamError> {
    let url = stream_url(&shared.config.base_url, shared.channel, token)?;

    let resp = shared
        .http
        .get(url)
        .header(reqwest::header::ACCEPT, "text/event-stream")
        .send()
        .await
        .map_err(|e| StreamError::ConnectFailed(e.to_string()))?;

    let status = resp.status();
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(StreamError::Unauthorized);
    }
    if !status.is_success() {
        return Err(StreamError::ConnectFailed(format!(
            "unexpected status {status}"
        )));
    }
    Ok(resp)
}

/// Builds `GET /v1/events/{channel}?token={bearer}`. The transport cannot
/// carry custom headers, so the bearer token rides in the query string.
fn stream_url(base: &Url, channel: Channel, token: &str) -> Result<Url, StreamError> {
    let mut url = base
        .join(&format!("/v1/events/{channel}"))
        .map_err(|e| StreamError::ConnectFailed(e.to_string()))?;
    url.query_pairs_mut().append_pair("token", token);
    Ok(url)
}

/// Pump one established stream: decode messages, forward recognized
/// events, drop the rest.
async fn read_events(
    mut resp: reqwest::Response,
    event_tx: &mpsc::Sender<StreamEvent>,
    stop_rx: &mut watch::Receiver<bool>,
) -> ReadOutcome {
    let mut decoder = SseDecoder::new();

    loop {
        let chunk = tokio::select! {
            biased;
            _ = stopped(stop_rx) => return ReadOutcome::Stopped,
            chunk = resp.chunk() => chunk,
        };

        match chunk {
            Ok(Some(bytes)) => {
                for payload in decoder.feed(&bytes) {
                    match serde_json::from_str::<StreamEvent>(&payload) {
                        // A single malformed payload is dropped; the
                        // stream and the connection state stay as they are.
                        Err(err) => {
                            tracing::warn!(
                                payload = %payload,
                                error = %err,
                                "dropping malformed stream payload"
                            );
                        }
                        Ok(StreamEvent::Unknown) => {
                            tracing::debug!("ignoring unrecognized stream event type");
                        }
                        Ok(event) => {
                            if event_tx.send(event).await.is_err() {
                                return ReadOutcome::SubscriberGone;
                            }
                        }
                    }
                }
            }
            Ok(None) => {
                return ReadOutcome::Lost(StreamError::ConnectionLost(
                    "stream closed by server".into(),
                ));
            }
            Err(err) => return ReadOutcome::Lost(StreamError::ConnectionLost(err.to_string())),
        }
    }
}
