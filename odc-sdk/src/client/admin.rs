//! Admin API client (dispatch console → dispatch server).
//!
//! All requests carry the staff bearer token in the `Authorization`
//! header.

use reqwest::Client;
use url::Url;
use uuid::Uuid;

use super::{ClientError, parse_response};
use crate::objects::order::{
    AssignRequest, CreateOrder, GrabRequest, Order, Suggestion, UpdateOrder,
};

/// Typed HTTP client for the staff-facing order APIs.
#[derive(Debug, Clone)]
pub struct AdminClient {
    http: Client,
    base_url: Url,
    token: String,
}

impl AdminClient {
    /// Create a new `AdminClient`.
    ///
    /// * `base_url` – root URL of the dispatch server.
    /// * `token` – the staff bearer token.
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

    /// `GET /orders` – list all orders.
    pub async fn list_orders(&self) -> Result<Vec<Order>, ClientError> {
        let url = self.base_url.join("orders")?;
        let resp = self.http.get(url).bearer_auth(&self.token).send().await?;
        parse_response(resp).await
    }

    /// `GET /orders/{id}` – fetch a single order.
    pub async fn get_order(&self, order_id: Uuid) -> Result<Order, ClientError> {
        let url = self.base_url.join(&format!("orders/{order_id}"))?;
        let resp = self.http.get(url).bearer_auth(&self.token).send().await?;
        parse_response(resp).await
    }

    /// `POST /orders` – create a new order.
    pub async fn create_order(&self, order: &CreateOrder) -> Result<Order, ClientError> {
        let url = self.base_url.join("orders")?;
        let resp = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .json(order)
            .send()
            .await?;
        parse_response(resp).await
    }

    /// `PUT /orders/{id}` – edit an existing order.
    pub async fn update_order(
        &self,
        order_id: Uuid,
        update: &UpdateOrder,
    ) -> Result<Order, ClientError> {
        let url = self.base_url.join(&format!("orders/{order_id}"))?;
        let resp = self
            .http
            .put(url)
            .bearer_auth(&self.token)
            .json(update)
            .send()
            .await?;
        parse_response(resp).await
    }

    /// `POST /orders/{id}/assign` – assign a driver to an order.
    pub async fn assign_order(
        &self,
        order_id: Uuid,
        driver_id: i64,
    ) -> Result<Order, ClientError> {
        let url = self.base_url.join(&format!("orders/{order_id}/assign"))?;
        let resp = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .json(&AssignRequest { driver_id })
            .send()
            .await?;
        parse_response(resp).await
    }

    /// `GET /orders/{id}/suggestions` – fetch the server-ranked driver
    /// suggestion list for an order.
    pub async fn suggestions(&self, order_id: Uuid) -> Result<Vec<Suggestion>, ClientError> {
        let url = self
            .base_url
            .join(&format!("orders/{order_id}/suggestions"))?;
        let resp = self.http.get(url).bearer_auth(&self.token).send().await?;
        parse_response(resp).await
    }

    /// `GET /grab-requests` – list drivers' pending claims on pooled
    /// orders.
    pub async fn list_grab_requests(&self) -> Result<Vec<GrabRequest>, ClientError> {
        let url = self.base_url.join("grab-requests")?;
        let resp = self.http.get(url).bearer_auth(&self.token).send().await?;
        parse_response(resp).await
    }

    /// `POST /grab-requests/{id}/confirm` – confirm a grab request. The
    /// winner among racing claims is arbitrated server-side.
    pub async fn confirm_grab_request(&self, request_id: Uuid) -> Result<Order, ClientError> {
        let url = self
            .base_url
            .join(&format!("grab-requests/{request_id}/confirm"))?;
        let resp = self.http.post(url).bearer_auth(&self.token).send().await?;
        parse_response(resp).await
    }
}
