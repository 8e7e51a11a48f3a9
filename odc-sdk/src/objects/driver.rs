//! Driver DTOs.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A driver's last reported position.
///
/// `recorded_at` is stamped by the server when the position report is
/// accepted; clients never generate it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverLocation {
    pub driver_id: i64,
    pub lat: f64,
    pub lng: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub recorded_at: OffsetDateTime,
}
