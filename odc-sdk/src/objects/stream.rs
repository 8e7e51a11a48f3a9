//! Message types for the live event stream.
//!
//! The `GET /v1/events/{channel}?token={bearer}` endpoint serves a
//! `text/event-stream` response and pushes one [`StreamEvent`] JSON
//! object per message.
//!
//! # Protocol
//!
//! 1. The bearer token travels in the query string because the
//!    transport does not support custom request headers.
//! 2. Each message's `data` payload is a UTF-8 JSON object dispatched
//!    on its `"type"` field.
//! 3. Event types the client does not recognize must be ignored, never
//!    rejected, so the server can add types without breaking deployed
//!    clients.

use serde::{Deserialize, Serialize};

use super::driver::DriverLocation;

/// One decoded message delivered over the event stream.
///
/// Serialized as an internally-tagged JSON object:
///
/// ```json
/// {"type":"driver_location_updated","data":{"driver_id":7,"lat":-37.81,"lng":144.96,"recorded_at":"2025-01-01T00:00:00Z"}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A driver's position changed.
    DriverLocationUpdated {
        /// The driver's new last-known position.
        data: DriverLocation,
    },

    /// An event type this build does not know. Carried so decoding
    /// never fails on newer servers; consumers drop it.
    #[serde(other)]
    Unknown,
}

/// Identifies which event stream a caller is authorized to see.
///
/// Rendered into the stream URL path: the admin console subscribes to
/// `admin`, a driver app to its own `driver-{id}` stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// The fleet-wide stream consumed by the admin console.
    Admin,
    /// A single driver's stream.
    Driver(i64),
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::Admin => write!(f, "admin"),
            Channel::Driver(id) => write!(f, "driver-{id}"),
        }
    }
}
