mod common;

use common::*;
use order_tracker::gateway::mock::{GatewayCall, MockGateway};
use order_tracker::gateway::GatewayError;
use order_tracker::model::{OrderId, OrderStatus};
use order_tracker::session::{CancelOutcome, CANCEL_REQUESTED_NOTE};
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Cancel before the order exists; discovery two ticks later resolves it and cancels exactly once.
#[tokio::test(start_paused = true)]
async fn deferred_cancel_is_issued_once_on_discovery() {
    let start = Instant::now();
    let mock = MockGateway::new();
    mock.expect_list(user()).return_ok(vec![]);
    mock.expect_list(user()).return_ok(vec![]);
    mock.expect_list(user())
        .return_ok(with_new("O123", OrderStatus::PendingValidation, 0));
    mock.expect_create()
        .after(Duration::from_secs(10))
        .return_ok(refused("insufficient stock"));
    mock.expect_cancel(OrderId::from("O123")).return_ok(());

    let system = tracker(&mock);
    let session = system.checkout(user(), product(), 1).await;

    assert_eq!(session.request_cancel().await.unwrap(), CancelOutcome::Deferred);
    let pending = session.latest();
    assert_eq!(pending.status, Some(OrderStatus::Cancelled));
    assert_eq!(labels(&pending), vec![CANCEL_REQUESTED_NOTE]);
    assert!(pending.polling);
    assert!(pending.cancel_requested);
    assert!(!pending.can_cancel());

    // Asking again changes nothing.
    assert_eq!(
        session.request_cancel().await.unwrap(),
        CancelOutcome::AlreadyRequested
    );

    let settled = session.wait_settled().await.unwrap();
    assert_eq!(start.elapsed(), Duration::from_secs(4));
    assert_eq!(
        labels(&settled),
        vec![CANCEL_REQUESTED_NOTE, "Validating Order", "Cancelled"]
    );
    assert_eq!(mock.cancel_calls(), 1);
    assert!(mock.calls().contains(&GatewayCall::Cancel {
        order_id: OrderId::from("O123"),
        user_id: user(),
    }));

    // The late refusal from the create call is ignored.
    sleep(Duration::from_secs(15)).await;
    let later = session.snapshot().await.unwrap();
    assert_eq!(later.status, Some(OrderStatus::Cancelled));
    assert_eq!(later.history.len(), 3);
    assert_eq!(later.message, None);
    assert_eq!(mock.cancel_calls(), 1);

    mock.verify();
    system.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn cancel_with_known_order_stops_polling() {
    let mock = MockGateway::new();
    mock.expect_list(user()).return_ok(vec![]);
    mock.expect_list(user())
        .return_ok(with_new("O1", OrderStatus::PendingPayment, 0));
    mock.expect_create().return_ok(accepted());
    mock.expect_cancel(OrderId::from("O1")).return_ok(());

    let system = tracker(&mock);
    let session = system.checkout(user(), product(), 1).await;
    wait_until(&session, |s| s.order_id.is_some()).await;

    assert_eq!(session.request_cancel().await.unwrap(), CancelOutcome::Cancelled);
    let cancelled = session.latest();
    assert_eq!(cancelled.status, Some(OrderStatus::Cancelled));
    assert_eq!(
        statuses(&cancelled),
        vec![OrderStatus::PendingPayment, OrderStatus::Cancelled]
    );
    assert!(cancelled.is_settled());

    // No status poll ever runs after the cancellation.
    sleep(Duration::from_secs(10)).await;
    assert_eq!(mock.get_calls(), 0);
    assert_eq!(mock.cancel_calls(), 1);
    mock.verify();
    system.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn rejected_cancel_surfaces_message_and_stops() {
    let mock = MockGateway::new();
    mock.expect_list(user()).return_ok(vec![]);
    mock.expect_list(user())
        .return_ok(with_new("O1", OrderStatus::PendingPayment, 0));
    mock.expect_create().return_ok(accepted());
    mock.expect_cancel(OrderId::from("O1"))
        .return_err(GatewayError::Rejected {
            status: 409,
            message: "Order already paid".into(),
        });

    let system = tracker(&mock);
    let session = system.checkout(user(), product(), 1).await;
    wait_until(&session, |s| s.order_id.is_some()).await;

    let outcome = session.request_cancel().await.unwrap();
    assert_eq!(
        outcome,
        CancelOutcome::Rejected("Failed to cancel order: Order already paid".into())
    );

    let snapshot = session.latest();
    assert_eq!(snapshot.status, Some(OrderStatus::PendingPayment));
    assert_eq!(
        snapshot.message.as_deref(),
        Some("Failed to cancel order: Order already paid")
    );
    assert!(!snapshot.polling);

    // No retry, no further polling.
    assert_eq!(
        session.request_cancel().await.unwrap(),
        CancelOutcome::AlreadyRequested
    );
    sleep(Duration::from_secs(10)).await;
    assert_eq!(mock.cancel_calls(), 1);
    assert_eq!(mock.get_calls(), 0);
    mock.verify();
    system.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn deferred_cancel_failure_still_stops_polling() {
    let mock = MockGateway::new();
    mock.expect_list(user()).return_ok(vec![]);
    mock.expect_list(user())
        .return_ok(with_new("O9", OrderStatus::PendingValidation, 0));
    mock.expect_create().return_ok(accepted());
    mock.expect_cancel(OrderId::from("O9"))
        .return_err(GatewayError::Transport("connection reset".into()));

    let system = tracker(&mock);
    let session = system.checkout(user(), product(), 1).await;
    assert_eq!(session.request_cancel().await.unwrap(), CancelOutcome::Deferred);

    let settled = session.wait_settled().await.unwrap();
    assert_eq!(
        settled.message.as_deref(),
        Some("Failed to cancel order: Transport error: connection reset")
    );
    assert_eq!(
        labels(&settled),
        vec![CANCEL_REQUESTED_NOTE, "Validating Order"]
    );
    assert_eq!(mock.cancel_calls(), 1);
    mock.verify();
    system.shutdown().await.unwrap();
}

/// Two hosts press cancel at the same moment: one call reaches the backend.
#[tokio::test(start_paused = true)]
async fn concurrent_cancels_issue_one_call() {
    let mock = MockGateway::new();
    mock.expect_list(user()).return_ok(vec![]);
    mock.expect_list(user())
        .return_ok(with_new("O2", OrderStatus::PaymentSuccessful, 0));
    mock.expect_create().return_ok(accepted());
    mock.expect_cancel(OrderId::from("O2"))
        .after(Duration::from_secs(1))
        .return_ok(());

    let system = tracker(&mock);
    let session = system.checkout(user(), product(), 1).await;
    wait_until(&session, |s| s.order_id.is_some()).await;

    let other = session.clone();
    let (first, second) = tokio::join!(session.request_cancel(), other.request_cancel());
    let mut outcomes = vec![first.unwrap(), second.unwrap()];
    outcomes.sort_by_key(|o| matches!(o, CancelOutcome::AlreadyRequested));
    assert_eq!(
        outcomes,
        vec![CancelOutcome::Cancelled, CancelOutcome::AlreadyRequested]
    );
    assert_eq!(mock.cancel_calls(), 1);
    mock.verify();
    system.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn cancel_is_refused_after_the_session_stops() {
    let mock = MockGateway::new();
    mock.expect_list(user()).return_ok(vec![]);
    mock.expect_create().return_ok(refused("insufficient stock"));

    let system = tracker(&mock);
    let session = system.checkout(user(), product(), 1).await;
    session.wait_settled().await.unwrap();

    assert_eq!(
        session.request_cancel().await.unwrap(),
        CancelOutcome::NotCancellable(Some(OrderStatus::Failed))
    );
    assert_eq!(mock.cancel_calls(), 0);
    mock.verify();
    system.shutdown().await.unwrap();
}

/// The create call fails before discovery while a cancel waits: no order exists, so the session ends.
#[tokio::test(start_paused = true)]
async fn failed_create_settles_a_deferred_cancel() {
    let start = Instant::now();
    let mock = MockGateway::new();
    mock.expect_list(user()).return_ok(history_of(2));
    mock.expect_list(user()).return_ok(history_of(2));
    mock.expect_create()
        .after(Duration::from_millis(3500))
        .return_ok(refused("insufficient stock"));

    let system = tracker(&mock);
    let session = system.checkout(user(), product(), 1).await;
    assert_eq!(session.request_cancel().await.unwrap(), CancelOutcome::Deferred);

    let settled = session.wait_settled().await.unwrap();
    assert_eq!(start.elapsed(), Duration::from_millis(3500));
    assert_eq!(settled.status, Some(OrderStatus::Cancelled));
    assert_eq!(labels(&settled), vec![CANCEL_REQUESTED_NOTE]);
    assert_eq!(settled.order_id, None);
    assert_eq!(settled.message, None);

    // Discovery is over; nothing is cancelled remotely.
    let listed = mock.list_calls();
    sleep(Duration::from_secs(20)).await;
    assert_eq!(mock.list_calls(), listed);
    assert_eq!(mock.cancel_calls(), 0);
    mock.verify();
    system.shutdown().await.unwrap();
}
