//! # HTTP Gateway
//!
//! [`OrderGateway`] over the storefront's REST API:
//!
//! | Operation      | Request                                   |
//! |----------------|-------------------------------------------|
//! | `create_order` | `POST /order/place` `{userId, items}`      |
//! | `get_order`    | `GET /order/{orderId}`                    |
//! | `list_orders`  | `GET /order/user/{userId}`                |
//! | `cancel_order` | `POST /order/cancel/{orderId}?userId=...` |
//!
//! Every response goes through [`Envelope`] so wrapped and bare payloads are handled alike.

use crate::config::GatewayConfig;
use crate::gateway::envelope::Envelope;
use crate::gateway::{GatewayError, OrderGateway};
use crate::model::{CreateOrder, CreateOrderReceipt, Order, OrderId, OrderSummary, UserId};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// Gateway backed by `reqwest`.
#[derive(Clone)]
pub struct HttpGateway {
    base_url: String,
    auth_token: Option<String>,
    http: reqwest::Client,
}

impl std::fmt::Debug for HttpGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGateway")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.auth_token.is_some())
            .finish()
    }
}

impl HttpGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Sends the request and turns any non-2xx HTTP status into `Rejected`, carrying the
    /// backend's `message` when the error body has one.
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Envelope, GatewayError> {
        let resp = self.authorize(request).send().await?;
        let status = resp.status();
        let body = resp.bytes().await?;
        debug!(status = status.as_u16(), bytes = body.len(), "Response");

        if !status.is_success() {
            let message = Envelope::parse(&body)
                .ok()
                .and_then(|e| e.message().map(str::to_string))
                .unwrap_or_else(|| status.to_string());
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        Envelope::parse(&body)
    }
}

#[async_trait]
impl OrderGateway for HttpGateway {
    #[instrument(skip(self, request), fields(user_id = %request.user_id))]
    async fn create_order(&self, request: CreateOrder) -> Result<CreateOrderReceipt, GatewayError> {
        debug!(?request, "Sending request");
        let envelope = self
            .send(self.http.post(self.url("/order/place")).json(&request))
            .await?;
        if envelope.is_empty() {
            return Ok(CreateOrderReceipt::default());
        }
        // A refusal arrives as an envelope without data; its message becomes the receipt's.
        envelope.into_payload()
    }

    #[instrument(skip(self))]
    async fn get_order(&self, order_id: &OrderId) -> Result<Order, GatewayError> {
        debug!("Sending request");
        let envelope = self
            .send(self.http.get(self.url(&format!("/order/{order_id}"))))
            .await?;
        envelope.ensure_success()?;
        if envelope.is_empty() {
            return Err(GatewayError::MissingPayload(format!("order {order_id}")));
        }
        envelope.into_payload()
    }

    #[instrument(skip(self))]
    async fn list_orders(&self, user_id: &UserId) -> Result<Vec<OrderSummary>, GatewayError> {
        debug!("Sending request");
        let envelope = self
            .send(self.http.get(self.url(&format!("/order/user/{user_id}"))))
            .await?;
        envelope.ensure_success()?;
        envelope.into_payload_or_default()
    }

    #[instrument(skip(self))]
    async fn cancel_order(&self, order_id: &OrderId, user_id: &UserId) -> Result<(), GatewayError> {
        debug!("Sending request");
        let envelope = self
            .send(
                self.http
                    .post(self.url(&format!("/order/cancel/{order_id}")))
                    .query(&[("userId", user_id.as_str())]),
            )
            .await?;
        envelope.ensure_success()
    }
}
