//! Driver API client (driver app → dispatch server).
//!
//! All requests carry the driver's bearer token in the `Authorization`
//! header. The `/drivers/me/...` routes are scoped server-side to the
//! driver the token belongs to.

use reqwest::Client;
use url::Url;
use uuid::Uuid;

use super::{ClientError, parse_response};
use crate::objects::order::{GrabRequest, Order, StatusCode, StatusUpdate};

/// Typed HTTP client for the driver-facing order APIs.
#[derive(Debug, Clone)]
pub struct DriverClient {
    http: Client,
    base_url: Url,
    token: String,
}

impl DriverClient {
    /// Create a new `DriverClient`.
    ///
    /// * `base_url` – root URL of the dispatch server.
    /// * `token` – the driver's bearer token.
    pub fn new(base_url: Url, token: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url,
            token: token.into(),
        }
    }

    /// Replace the default `reqwest::Client` with a custom one.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// `GET /drivers/me/order-pool` – list unassigned orders this driver
    /// may claim.
    pub async fn order_pool(&self) -> Result<Vec<Order>, ClientError> {
        let url = self.base_url.join("drivers/me/order-pool")?;
        let resp = self.http.get(url).bearer_auth(&self.token).send().await?;
        parse_response(resp).await
    }

    /// `POST /drivers/me/order-pool/{id}/request-grab` – ask to claim a
    /// pooled order. Concurrent claims are arbitrated server-side; the
    /// returned request is pending until staff confirm it.
    pub async fn request_grab(&self, order_id: Uuid) -> Result<GrabRequest, ClientError> {
        let url = self
            .base_url
            .join(&format!("drivers/me/order-pool/{order_id}/request-grab"))?;
        let resp = self.http.post(url).bearer_auth(&self.token).send().await?;
        parse_response(resp).await
    }

    /// `POST /drivers/me/orders/{id}/status` – report a status change for
    /// an order this driver holds.
    ///
    /// The caller derives the legal next status from the lifecycle model
    /// and re-fetches the order afterwards; the server remains the
    /// authority on whether the transition is accepted.
    pub async fn update_order_status(
        &self,
        order_id: Uuid,
        status: StatusCode,
    ) -> Result<Order, ClientError> {
        let url = self
            .base_url
            .join(&format!("drivers/me/orders/{order_id}/status"))?;
        let resp = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .json(&StatusUpdate { status })
            .send()
            .await?;
        parse_response(resp).await
    }
}
