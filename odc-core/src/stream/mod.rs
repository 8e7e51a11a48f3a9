//! Live event-stream client.
//!
//! Owns at most one push connection per channel and turns the raw
//! `text/event-stream` wire into a channel of typed
//! [`StreamEvent`](odc_sdk::objects::StreamEvent)s plus an observable
//! [`ConnectionState`].
//!
//! # Connection lifecycle
//!
//! ```text
//! Disconnected -> Connecting -> Connected -> Error -> Connecting -> ...
//! ```
//!
//! - `Connecting` is entered on every (re)connect attempt, `Connected`
//!   once the server accepts the stream request.
//! - Any transport failure degrades to `Error` and schedules exactly one
//!   reconnect after a fixed delay, once the failed transport is fully
//!   closed.
//! - A missing or rejected credential is terminal: the retry loop stops
//!   until the caller connects again with a fresh token.
//! - `disconnect` returns the client to `Disconnected` and cancels any
//!   pending reconnect.
//!
//! One [`StreamClient`] owns one channel; calling
//! [`connect`](StreamClient::connect) again replaces the live connection
//! rather than adding a second one.

mod client;
mod sse;
mod token;

pub use client::{
    ConnectionState, RECONNECT_DELAY, StreamClient, StreamConfig, StreamError,
};
pub use token::{EnvToken, SharedToken, StaticToken, TokenProvider};
