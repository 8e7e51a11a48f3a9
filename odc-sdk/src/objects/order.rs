//! Order DTOs shared by the admin console and the driver app.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Raw order-status code as it appears on the wire.
///
/// Deliberately a plain integer rather than an enum: codes this build
/// does not know must survive deserialization so a newer server never
/// breaks an older client. Classification into a known lifecycle status
/// happens in `odc-core`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusCode(pub i64);

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A trip order as returned by the order endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Internal order ID.
    pub id: Uuid,
    /// Current lifecycle status code.
    pub status: StatusCode,
    /// Requested pickup time.
    #[serde(with = "time::serde::rfc3339")]
    pub service_time: OffsetDateTime,
    pub pickup_address: String,
    pub dropoff_address: String,
    /// Fare amount.
    pub amount: Decimal,
    /// Driver currently assigned, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_driver_id: Option<i64>,
}

/// Request payload for creating a new order (`POST /orders`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrder {
    #[serde(with = "time::serde::rfc3339")]
    pub service_time: OffsetDateTime,
    pub pickup_address: String,
    pub dropoff_address: String,
    pub amount: Decimal,
}

/// Request payload for editing an order (`PUT /orders/{id}`).
///
/// Only the provided fields are changed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateOrder {
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub service_time: Option<OffsetDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dropoff_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
}

/// Request payload for assigning a driver (`POST /orders/{id}/assign`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AssignRequest {
    pub driver_id: i64,
}

/// One entry of the ranked driver-suggestion list
/// (`GET /orders/{id}/suggestions`).
///
/// The ranking is computed server-side; clients treat the list as opaque
/// and display it in the order received.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    pub driver_id: i64,
    pub score: f64,
}

/// A driver's pending claim on a pooled order (`GET /grab-requests`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrabRequest {
    pub id: Uuid,
    pub order_id: Uuid,
    pub driver_id: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub requested_at: OffsetDateTime,
}

/// Request payload for a driver-side status change
/// (`POST /drivers/me/orders/{id}/status`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: StatusCode,
}

/// Error body carried by every non-2xx API response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_decodes_unknown_status_code() {
        let json = r#"{
            "id": "7c9e6679-7425-40de-944b-e07fc1f90ae7",
            "status": 42,
            "service_time": "2025-01-01T09:30:00Z",
            "pickup_address": "1 Spring St",
            "dropoff_address": "200 Collins St",
            "amount": "24.50"
        }"#;

        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.status, StatusCode(42));
        assert_eq!(order.assigned_driver_id, None);
    }

    #[test]
    fn test_update_order_skips_absent_fields() {
        let update = UpdateOrder {
            pickup_address: Some("1 Spring St".into()),
            ..UpdateOrder::default()
        };

        let json = serde_json::to_string(&update).unwrap();
        assert_eq!(json, r#"{"pickup_address":"1 Spring St"}"#);
    }
}
