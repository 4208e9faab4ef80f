#![allow(dead_code)]

use order_tracker::config::TrackerConfig;
use order_tracker::gateway::mock::MockGateway;
use order_tracker::lifecycle::TrackerSystem;
use order_tracker::model::{
    CreateOrderReceipt, Order, OrderId, OrderStatus, OrderSummary, ProductId, UserId,
};
use order_tracker::session::{SessionClient, SessionEvent, SessionSnapshot};
use std::sync::Arc;
use tokio::sync::broadcast;

pub fn user() -> UserId {
    UserId::from("u1")
}

pub fn product() -> ProductId {
    ProductId::from("p7")
}

pub fn summary(id: &str, status: OrderStatus) -> OrderSummary {
    OrderSummary {
        order_id: OrderId::from(id),
        status,
        total_amount: 51.0,
        create_time: None,
    }
}

/// `count` older orders, all delivered.
pub fn history_of(count: usize) -> Vec<OrderSummary> {
    (0..count)
        .map(|i| summary(&format!("old-{i}"), OrderStatus::Delivered))
        .collect()
}

/// A new order on top of `older` prior ones, newest first.
pub fn with_new(id: &str, status: OrderStatus, older: usize) -> Vec<OrderSummary> {
    let mut orders = vec![summary(id, status)];
    orders.extend(history_of(older));
    orders
}

pub fn order(id: &str, status: OrderStatus) -> Order {
    Order {
        order_id: OrderId::from(id),
        status,
        total_amount: 51.0,
        items: vec![],
        create_time: None,
        reservation_id: None,
        transaction_id: None,
    }
}

pub fn accepted() -> CreateOrderReceipt {
    CreateOrderReceipt::default()
}

pub fn refused(message: &str) -> CreateOrderReceipt {
    CreateOrderReceipt {
        order_id: None,
        message: Some(message.to_string()),
    }
}

pub fn tracker(mock: &MockGateway) -> TrackerSystem {
    TrackerSystem::new(Arc::new(mock.clone()), TrackerConfig::default())
}

/// History rendered the way a user sees it.
pub fn labels(snapshot: &SessionSnapshot) -> Vec<String> {
    snapshot.history.iter().map(|e| e.label.to_string()).collect()
}

pub fn statuses(snapshot: &SessionSnapshot) -> Vec<OrderStatus> {
    snapshot.history.iter().filter_map(|e| e.as_status()).collect()
}

pub async fn wait_until(
    session: &SessionClient,
    condition: impl FnMut(&SessionSnapshot) -> bool,
) -> SessionSnapshot {
    let mut snapshots = session.watch();
    let snapshot = snapshots
        .wait_for(condition)
        .await
        .expect("session closed while waiting");
    (*snapshot).clone()
}

/// Everything published so far on `events`.
pub fn drain(events: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    seen
}
