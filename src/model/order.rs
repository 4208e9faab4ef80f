//! Order payloads exchanged with the backend.
//!
//! The backend owns every order. The engine only keeps read-only copies of what it last fetched.

use crate::model::{OrderId, OrderStatus, ProductId, UserId};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Full order detail, as returned by `getOrder`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub order_id: OrderId,
    pub status: OrderStatus,
    #[serde(default)]
    pub total_amount: f64,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub create_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub reservation_id: Option<String>,
    #[serde(default)]
    pub transaction_id: Option<String>,
}

/// One line of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: ProductId,
    #[serde(default)]
    pub product_name: Option<String>,
    pub quantity: u32,
    #[serde(rename = "price")]
    pub unit_price: f64,
    #[serde(rename = "subTotal")]
    pub subtotal: f64,
}

/// Order as it appears in the user's order list (newest first).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub order_id: OrderId,
    pub status: OrderStatus,
    #[serde(default)]
    pub total_amount: f64,
    #[serde(default)]
    pub create_time: Option<NaiveDateTime>,
}

/// Product and quantity requested at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Payload for `createOrder`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrder {
    pub user_id: UserId,
    pub items: Vec<OrderLine>,
}

impl CreateOrder {
    /// Single-product checkout, the only shape the storefront submits.
    pub fn single(user_id: UserId, product_id: ProductId, quantity: u32) -> Self {
        Self {
            user_id,
            items: vec![OrderLine {
                product_id,
                quantity,
            }],
        }
    }
}

/// Response to `createOrder`.
///
/// A missing `order_id` together with a `message` means the order was refused before it existed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderReceipt {
    #[serde(default)]
    pub order_id: Option<OrderId>,
    #[serde(default)]
    pub message: Option<String>,
}

impl CreateOrderReceipt {
    /// Returns the refusal message when the backend declined to create the order.
    pub fn refusal(&self) -> Option<&str> {
        match (&self.order_id, &self.message) {
            (None, Some(message)) => Some(message.as_str()),
            _ => None,
        }
    }
}
