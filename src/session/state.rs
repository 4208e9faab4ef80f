//! # Reconciliation State Machine
//!
//! [`TrackingSession`] is the explicit state of one tracking attempt. It performs no I/O: the session
//! actor feeds it gateway results and publishes the [`SessionEvent`]s it queues.
//!
//! ## Invariants
//!
//! - Once bound, `order_id` never changes.
//! - `cancel_requested` only goes from false to true, and at most one cancel call is ever issued.
//! - `history` only grows. A status entry is appended only when the observed status differs from the
//!   current one; user actions (deferred cancellation, confirmed cancellation) always append.
//! - Polling stops at most once, and never restarts.

use crate::model::{
    Order, OrderId, OrderStatus, OrderSummary, ProgressStage, StatusHistoryEntry, UserId,
};
use crate::session::{SessionEvent, StopReason};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Display;

/// History label recorded when the user cancels before the order has been discovered.
pub const CANCEL_REQUESTED_NOTE: &str = "User requested cancellation";

const CANCEL_FAILED_PREFIX: &str = "Failed to cancel order: ";
const FAILED_NOTICE: &str = "Your refund will be returned to your bank account.";
const CANCELLED_NOTICE: &str = "Any charges will be refunded to your bank account.";

/// Identifies one session within a [`TrackerSystem`](crate::lifecycle::TrackerSystem).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session_{}", self.0)
    }
}

/// What a session is tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingMode {
    /// A fresh placement: the order must first be discovered.
    Checkout,
    /// An order whose id is already known.
    Existing,
}

impl TrackingMode {
    /// Whether observing `status` stops polling in this mode.
    ///
    /// A checkout hands off at `DELIVERY_REQUESTED`; the order view keeps watching the delivery.
    pub fn stops_on(self, status: OrderStatus) -> bool {
        match self {
            Self::Checkout => status.is_terminal(),
            Self::Existing => status.is_final(),
        }
    }

    /// Whether reaching `DELIVERY_REQUESTED` schedules a redirect to the order view.
    pub fn redirects(self) -> bool {
        matches!(self, Self::Checkout)
    }
}

/// Result of feeding an observation through the transition rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    Unchanged,
    Changed(OrderStatus),
    /// The status was terminal for this mode and polling has stopped.
    Stopped(OrderStatus),
}

/// What the cancellation coordinator should do with a cancel request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelPlan {
    /// The order is known: cancel it now.
    Issue(OrderId),
    /// The order is not discovered yet: record the intent and cancel on discovery.
    Defer,
}

/// Response to a cancel request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelOutcome {
    /// The backend confirmed the cancellation.
    Cancelled,
    /// Recorded; the cancel call will be issued once the order is discovered.
    Deferred,
    /// A cancel was already requested for this session. Nothing new happened.
    AlreadyRequested,
    /// The session has stopped polling or the order has moved past the cancellable stages.
    NotCancellable(Option<OrderStatus>),
    /// The backend refused; the message is what the user sees.
    Rejected(String),
}

#[derive(Debug)]
pub struct TrackingSession {
    id: SessionId,
    mode: TrackingMode,
    user_id: UserId,
    order_id: Option<OrderId>,
    status: Option<OrderStatus>,
    history: Vec<StatusHistoryEntry>,
    cancel_requested: bool,
    cancel_issued: bool,
    order_count: usize,
    message: Option<String>,
    order: Option<Order>,
    polling: bool,
    redirect_pending: bool,
    outbox: Vec<SessionEvent>,
}

impl TrackingSession {
    /// A fresh checkout. Status starts at `CREATING_ORDER` with an empty history.
    pub fn checkout(id: SessionId, user_id: UserId, baseline_order_count: usize) -> Self {
        let mut session = Self::new(id, TrackingMode::Checkout, user_id, None);
        session.status = Some(OrderStatus::CreatingOrder);
        session.order_count = baseline_order_count;
        session
    }

    /// An order view for `order_id`. Status stays unknown until the first fetch.
    pub fn existing(id: SessionId, user_id: UserId, order_id: OrderId) -> Self {
        Self::new(id, TrackingMode::Existing, user_id, Some(order_id))
    }

    fn new(id: SessionId, mode: TrackingMode, user_id: UserId, order_id: Option<OrderId>) -> Self {
        Self {
            id,
            mode,
            user_id,
            order_id,
            status: None,
            history: Vec::new(),
            cancel_requested: false,
            cancel_issued: false,
            order_count: 0,
            message: None,
            order: None,
            polling: true,
            redirect_pending: false,
            outbox: Vec::new(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn mode(&self) -> TrackingMode {
        self.mode
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn order_id(&self) -> Option<&OrderId> {
        self.order_id.as_ref()
    }

    pub fn status(&self) -> Option<OrderStatus> {
        self.status
    }

    pub fn history(&self) -> &[StatusHistoryEntry] {
        &self.history
    }

    /// Order count the next discovery tick compares against.
    pub fn order_count(&self) -> usize {
        self.order_count
    }

    pub fn is_polling(&self) -> bool {
        self.polling
    }

    pub fn cancel_requested(&self) -> bool {
        self.cancel_requested
    }

    /// True when cancellation was requested before discovery and has not been issued yet.
    pub fn cancel_pending(&self) -> bool {
        self.cancel_requested && !self.cancel_issued
    }

    /// Takes the events queued since the last call.
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.outbox)
    }

    fn push_status(&mut self, status: OrderStatus, at: DateTime<Utc>) {
        self.status = Some(status);
        self.history.push(StatusHistoryEntry::status(status, at));
        self.outbox.push(SessionEvent::StatusChanged { status });
    }

    /// Appends a history entry only if `status` differs from the current one.
    fn record_status(&mut self, status: OrderStatus, at: DateTime<Utc>) -> bool {
        if self.status == Some(status) {
            return false;
        }
        self.push_status(status, at);
        true
    }

    fn settle(&mut self, status: OrderStatus, changed: bool) -> Reconciled {
        if self.polling && self.mode.stops_on(status) {
            self.stop_polling(StopReason::Terminal(status));
            Reconciled::Stopped(status)
        } else if changed {
            Reconciled::Changed(status)
        } else {
            Reconciled::Unchanged
        }
    }

    /// Binds the session to the newest order found by discovery.
    ///
    /// The discovered status is always recorded, even when it matches a locally-set one. Terminal
    /// handling is left to the cancellation coordinator while a cancel is pending. Returns `None`
    /// if the session is already bound.
    pub fn bind(
        &mut self,
        newest: &OrderSummary,
        order_count: usize,
        at: DateTime<Utc>,
    ) -> Option<Reconciled> {
        if self.order_id.is_some() {
            return None;
        }
        self.order_id = Some(newest.order_id.clone());
        self.order_count = order_count;
        self.outbox.push(SessionEvent::OrderDiscovered {
            order_id: newest.order_id.clone(),
            status: newest.status,
        });
        self.push_status(newest.status, at);

        if self.cancel_pending() {
            return Some(Reconciled::Changed(newest.status));
        }
        Some(self.settle(newest.status, true))
    }

    /// Feeds a fetched order through the transition rule.
    pub fn observe(&mut self, order: Order, at: DateTime<Utc>) -> Reconciled {
        let status = order.status;
        self.order = Some(order);
        let changed = self.record_status(status, at);
        self.settle(status, changed)
    }

    /// Records a failed create call: `FAILED`, the message surfaced, polling stopped.
    ///
    /// Applies whether or not discovery has already bound the order. Ignored once polling has
    /// stopped. With a cancel requested the session keeps its `CANCELLED` label: before discovery
    /// there is nothing left to find, so polling stops; after discovery the coordinator owns the order.
    pub fn record_submission_failure(&mut self, message: impl Into<String>, at: DateTime<Utc>) -> bool {
        if !self.polling {
            return false;
        }
        if self.cancel_requested {
            if self.order_id.is_some() {
                return false;
            }
            return self.stop_polling(StopReason::SubmissionFailed);
        }
        let message = message.into();
        self.record_status(OrderStatus::Failed, at);
        self.outbox.push(SessionEvent::Notice {
            message: message.clone(),
        });
        self.message = Some(message);
        self.stop_polling(StopReason::SubmissionFailed);
        true
    }

    /// Decides how to handle a cancel request, without changing state.
    pub fn plan_cancel(&self) -> Result<CancelPlan, CancelOutcome> {
        if self.cancel_requested {
            return Err(CancelOutcome::AlreadyRequested);
        }
        if !self.polling {
            return Err(CancelOutcome::NotCancellable(self.status));
        }
        if let Some(status) = self.status {
            if !status.is_cancellable() {
                return Err(CancelOutcome::NotCancellable(Some(status)));
            }
        }
        Ok(match &self.order_id {
            Some(order_id) => CancelPlan::Issue(order_id.clone()),
            None => CancelPlan::Defer,
        })
    }

    /// Records a cancellation requested before discovery: local `CANCELLED`, polling continues.
    pub fn defer_cancel(&mut self, at: DateTime<Utc>) {
        self.cancel_requested = true;
        self.status = Some(OrderStatus::Cancelled);
        self.history.push(StatusHistoryEntry::note(CANCEL_REQUESTED_NOTE, at));
        self.outbox.push(SessionEvent::StatusChanged {
            status: OrderStatus::Cancelled,
        });
    }

    /// Marks the single cancel call as issued. Returns the order to cancel, or `None` if a call was
    /// already issued or no order is bound.
    pub fn begin_cancel(&mut self) -> Option<OrderId> {
        if self.cancel_issued {
            return None;
        }
        let order_id = self.order_id.clone()?;
        self.cancel_requested = true;
        self.cancel_issued = true;
        self.outbox.push(SessionEvent::CancelIssued {
            order_id: order_id.clone(),
        });
        Some(order_id)
    }

    pub fn record_cancelled(&mut self, at: DateTime<Utc>) {
        self.push_status(OrderStatus::Cancelled, at);
        self.stop_polling(StopReason::Cancelled);
    }

    /// Returns the message surfaced to the user.
    pub fn record_cancel_failure(&mut self, reason: &str) -> String {
        let message = format!("{CANCEL_FAILED_PREFIX}{reason}");
        self.outbox.push(SessionEvent::Notice {
            message: message.clone(),
        });
        self.message = Some(message.clone());
        self.stop_polling(StopReason::CancelFailed);
        message
    }

    /// Stops polling. Returns false if it had already stopped.
    pub fn stop_polling(&mut self, reason: StopReason) -> bool {
        if !self.polling {
            return false;
        }
        self.polling = false;
        self.outbox.push(SessionEvent::PollingStopped { reason });
        true
    }

    pub fn schedule_redirect(&mut self) {
        self.redirect_pending = true;
    }

    /// Emits the redirect notification for the bound order.
    pub fn complete_redirect(&mut self) {
        if !std::mem::take(&mut self.redirect_pending) {
            return;
        }
        if let Some(order_id) = self.order_id.clone() {
            self.outbox.push(SessionEvent::RedirectToOrder { order_id });
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id,
            mode: self.mode,
            user_id: self.user_id.clone(),
            order_id: self.order_id.clone(),
            status: self.status,
            history: self.history.clone(),
            cancel_requested: self.cancel_requested,
            polling: self.polling,
            redirect_pending: self.redirect_pending,
            message: self.message.clone(),
            order: self.order.clone(),
        }
    }
}

/// Read-only view of a session, published after every change.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub mode: TrackingMode,
    pub user_id: UserId,
    pub order_id: Option<OrderId>,
    pub status: Option<OrderStatus>,
    pub history: Vec<StatusHistoryEntry>,
    pub cancel_requested: bool,
    pub polling: bool,
    pub redirect_pending: bool,
    /// Last user-facing error message (failed placement or failed cancellation).
    pub message: Option<String>,
    /// Last order detail fetched by the status poller.
    pub order: Option<Order>,
}

impl SessionSnapshot {
    /// Whether a cancel button should be offered.
    pub fn can_cancel(&self) -> bool {
        self.polling
            && !self.cancel_requested
            && self.status.map_or(true, OrderStatus::is_cancellable)
    }

    /// Nothing further will happen without user action: polling is over and no redirect is due.
    pub fn is_settled(&self) -> bool {
        !self.polling && !self.redirect_pending
    }

    /// Refund notice for failed or cancelled orders.
    pub fn notice(&self) -> Option<&'static str> {
        match self.status? {
            OrderStatus::Failed => Some(FAILED_NOTICE),
            OrderStatus::Cancelled => Some(CANCELLED_NOTICE),
            _ => None,
        }
    }

    pub fn progress(&self) -> Option<Vec<ProgressStage>> {
        self.status.map(OrderStatus::progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::HistoryLabel;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    fn summary(id: &str, status: OrderStatus) -> OrderSummary {
        OrderSummary {
            order_id: OrderId::from(id),
            status,
            total_amount: 25.0,
            create_time: None,
        }
    }

    fn order(id: &str, status: OrderStatus) -> Order {
        Order {
            order_id: OrderId::from(id),
            status,
            total_amount: 25.0,
            items: vec![],
            create_time: None,
            reservation_id: None,
            transaction_id: None,
        }
    }

    fn checkout() -> TrackingSession {
        TrackingSession::checkout(SessionId(1), UserId::from("u1"), 2)
    }

    fn labels(session: &TrackingSession) -> Vec<String> {
        session.history().iter().map(|e| e.label.to_string()).collect()
    }

    #[test]
    fn checkout_starts_creating_with_empty_history() {
        let session = checkout();
        assert_eq!(session.status(), Some(OrderStatus::CreatingOrder));
        assert!(session.history().is_empty());
        assert!(session.is_polling());
        assert_eq!(session.order_count(), 2);
        assert!(session.snapshot().can_cancel());
    }

    #[test]
    fn bind_records_discovered_status() {
        let mut session = checkout();
        let reconciled = session.bind(&summary("O1", OrderStatus::PendingValidation), 3, at(2));
        assert_eq!(reconciled, Some(Reconciled::Changed(OrderStatus::PendingValidation)));
        assert_eq!(session.order_id(), Some(&OrderId::from("O1")));
        assert_eq!(session.order_count(), 3);
        assert_eq!(
            session.history(),
            &[StatusHistoryEntry::status(OrderStatus::PendingValidation, at(2))]
        );
        assert_eq!(
            session.drain_events(),
            vec![
                SessionEvent::OrderDiscovered {
                    order_id: OrderId::from("O1"),
                    status: OrderStatus::PendingValidation,
                },
                SessionEvent::StatusChanged {
                    status: OrderStatus::PendingValidation,
                },
            ]
        );
    }

    #[test]
    fn identifier_never_rebinds() {
        let mut session = checkout();
        session.bind(&summary("O1", OrderStatus::PendingValidation), 3, at(2));
        assert_eq!(session.bind(&summary("O2", OrderStatus::PendingPayment), 4, at(4)), None);
        assert_eq!(session.order_id(), Some(&OrderId::from("O1")));
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn repeated_status_is_not_logged() {
        let mut session = checkout();
        session.bind(&summary("O1", OrderStatus::PendingValidation), 3, at(2));
        assert_eq!(
            session.observe(order("O1", OrderStatus::PendingValidation), at(4)),
            Reconciled::Unchanged
        );
        assert_eq!(
            session.observe(order("O1", OrderStatus::PendingPayment), at(6)),
            Reconciled::Changed(OrderStatus::PendingPayment)
        );
        assert_eq!(session.history().len(), 2);
        assert!(session.is_polling());
    }

    #[test]
    fn checkout_stops_at_delivery_requested() {
        let mut session = checkout();
        session.bind(&summary("O1", OrderStatus::PaymentSuccessful), 3, at(2));
        session.drain_events();
        assert_eq!(
            session.observe(order("O1", OrderStatus::DeliveryRequested), at(4)),
            Reconciled::Stopped(OrderStatus::DeliveryRequested)
        );
        assert!(!session.is_polling());
        assert_eq!(
            session.drain_events().last(),
            Some(&SessionEvent::PollingStopped {
                reason: StopReason::Terminal(OrderStatus::DeliveryRequested)
            })
        );
    }

    #[test]
    fn existing_view_watches_through_delivery() {
        let mut session = TrackingSession::existing(SessionId(2), UserId::from("u1"), OrderId::from("O9"));
        assert_eq!(session.status(), None);
        assert_eq!(
            session.observe(order("O9", OrderStatus::DeliveryRequested), at(0)),
            Reconciled::Changed(OrderStatus::DeliveryRequested)
        );
        assert_eq!(
            session.observe(order("O9", OrderStatus::InTransit), at(3)),
            Reconciled::Changed(OrderStatus::InTransit)
        );
        assert_eq!(
            session.observe(order("O9", OrderStatus::Delivered), at(6)),
            Reconciled::Stopped(OrderStatus::Delivered)
        );
        assert_eq!(session.history().len(), 3);
        assert!(session.snapshot().order.is_some());
    }

    #[test]
    fn submission_failure_fails_the_session() {
        let mut session = checkout();
        assert!(session.record_submission_failure("insufficient stock", at(0)));
        assert_eq!(session.status(), Some(OrderStatus::Failed));
        assert_eq!(session.history(), &[StatusHistoryEntry::status(OrderStatus::Failed, at(0))]);
        assert!(!session.is_polling());

        let snapshot = session.snapshot();
        assert_eq!(snapshot.message.as_deref(), Some("insufficient stock"));
        assert_eq!(snapshot.notice(), Some(FAILED_NOTICE));
        assert!(snapshot.is_settled());
        assert!(!snapshot.can_cancel());

        // A second failure changes nothing.
        assert!(!session.record_submission_failure("again", at(1)));
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn deferred_cancel_keeps_polling() {
        let mut session = checkout();
        assert_eq!(session.plan_cancel(), Ok(CancelPlan::Defer));
        session.defer_cancel(at(1));

        assert_eq!(session.status(), Some(OrderStatus::Cancelled));
        assert!(session.is_polling());
        assert!(session.cancel_pending());
        assert_eq!(
            session.history()[0].label,
            HistoryLabel::Note(CANCEL_REQUESTED_NOTE.to_string())
        );
        assert_eq!(session.plan_cancel(), Err(CancelOutcome::AlreadyRequested));
        assert!(!session.snapshot().can_cancel());

        // Discovery leaves terminal handling to the coordinator while the cancel is pending.
        let reconciled = session.bind(&summary("O123", OrderStatus::Failed), 3, at(4));
        assert_eq!(reconciled, Some(Reconciled::Changed(OrderStatus::Failed)));
        assert!(session.is_polling());

        assert_eq!(session.begin_cancel(), Some(OrderId::from("O123")));
        assert_eq!(session.begin_cancel(), None);
        session.record_cancelled(at(4));
        assert_eq!(
            labels(&session),
            vec![CANCEL_REQUESTED_NOTE, "Payment Failed", "Cancelled"]
        );
        assert!(!session.is_polling());
        assert!(!session.cancel_pending());
    }

    #[test]
    fn submission_failure_before_discovery_ends_a_deferred_cancel() {
        let mut session = checkout();
        session.defer_cancel(at(1));
        assert!(session.record_submission_failure("insufficient stock", at(2)));
        assert_eq!(session.status(), Some(OrderStatus::Cancelled));
        assert_eq!(labels(&session), vec![CANCEL_REQUESTED_NOTE]);
        assert_eq!(session.snapshot().message, None);
        assert!(!session.is_polling());
        assert!(session.snapshot().is_settled());
    }

    #[test]
    fn submission_failure_after_discovery_fails_the_bound_order() {
        let mut session = checkout();
        session.bind(&summary("O1", OrderStatus::PendingValidation), 3, at(2));
        session.observe(order("O1", OrderStatus::PendingPayment), at(4));

        assert!(session.record_submission_failure("Payment failed: insufficient balance", at(5)));
        assert_eq!(session.order_id(), Some(&OrderId::from("O1")));
        assert_eq!(
            labels(&session),
            vec!["Validating Order", "Processing Payment", "Payment Failed"]
        );
        assert_eq!(
            session.snapshot().message.as_deref(),
            Some("Payment failed: insufficient balance")
        );
        assert!(!session.is_polling());
    }

    #[test]
    fn submission_failure_leaves_a_bound_cancel_to_the_coordinator() {
        let mut session = checkout();
        session.defer_cancel(at(1));
        session.bind(&summary("O1", OrderStatus::PendingValidation), 3, at(2));
        assert!(!session.record_submission_failure("insufficient stock", at(3)));
        assert!(session.is_polling());
        assert!(session.cancel_pending());
    }

    #[test]
    fn cancel_needs_a_cancellable_status() {
        let mut session = checkout();
        session.bind(&summary("O1", OrderStatus::PickedUp), 3, at(2));
        assert_eq!(
            session.plan_cancel(),
            Err(CancelOutcome::NotCancellable(Some(OrderStatus::PickedUp)))
        );

        let mut session = checkout();
        session.bind(&summary("O1", OrderStatus::PendingPayment), 3, at(2));
        assert_eq!(session.plan_cancel(), Ok(CancelPlan::Issue(OrderId::from("O1"))));
    }

    #[test]
    fn cancel_failure_stops_polling_with_message() {
        let mut session = checkout();
        session.bind(&summary("O1", OrderStatus::PendingPayment), 3, at(2));
        session.begin_cancel();
        let message = session.record_cancel_failure("Order already paid");
        assert_eq!(message, "Failed to cancel order: Order already paid");
        assert!(!session.is_polling());
        assert_eq!(session.status(), Some(OrderStatus::PendingPayment));
        assert_eq!(session.plan_cancel(), Err(CancelOutcome::AlreadyRequested));
    }

    #[test]
    fn polling_stops_exactly_once() {
        let mut session = checkout();
        assert!(session.stop_polling(StopReason::Cancelled));
        assert!(!session.stop_polling(StopReason::Cancelled));
        let stops = session
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, SessionEvent::PollingStopped { .. }))
            .count();
        assert_eq!(stops, 1);
    }

    #[test]
    fn redirect_fires_once_for_the_bound_order() {
        let mut session = checkout();
        session.bind(&summary("O1", OrderStatus::DeliveryRequested), 3, at(2));
        session.schedule_redirect();
        assert!(!session.snapshot().is_settled());
        session.drain_events();

        session.complete_redirect();
        session.complete_redirect();
        assert_eq!(
            session.drain_events(),
            vec![SessionEvent::RedirectToOrder {
                order_id: OrderId::from("O1")
            }]
        );
        assert!(session.snapshot().is_settled());
    }
}
