//! Typed access to the order backend.
//!
//! The session engine depends only on the [`OrderGateway`] trait. [`HttpGateway`] talks to the real
//! backend over HTTP; [`mock::MockGateway`] scripts responses for tests.

pub mod envelope;
pub mod error;
pub mod http;
pub mod mock;

pub use error::*;
pub use http::HttpGateway;

use crate::model::{CreateOrder, CreateOrderReceipt, Order, OrderId, OrderSummary, UserId};
use async_trait::async_trait;

/// The four backend operations the tracking engine consumes.
///
/// All business logic and authoritative order state live behind this trait.
#[async_trait]
pub trait OrderGateway: Send + Sync + 'static {
    /// Submits a new order. The receipt may or may not carry the new order's id.
    async fn create_order(&self, request: CreateOrder) -> Result<CreateOrderReceipt, GatewayError>;

    /// Fetches full detail for one order.
    async fn get_order(&self, order_id: &OrderId) -> Result<Order, GatewayError>;

    /// Lists the user's orders, newest first.
    async fn list_orders(&self, user_id: &UserId) -> Result<Vec<OrderSummary>, GatewayError>;

    /// Asks the backend to cancel an order on the user's behalf.
    async fn cancel_order(&self, order_id: &OrderId, user_id: &UserId) -> Result<(), GatewayError>;
}
