//! Notifications a session publishes to its host.

use crate::model::{OrderId, OrderStatus};
use serde::Serialize;

/// Why a session stopped polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// A status in the session's terminal set was observed.
    Terminal(OrderStatus),
    /// The backend accepted the cancel call.
    Cancelled,
    /// The backend refused the cancel call. Polling does not resume.
    CancelFailed,
    /// The create call failed before any order existed.
    SubmissionFailed,
}

/// Session activity, broadcast as it happens.
///
/// Hosts that only render current state should watch [`SessionSnapshot`](crate::session::SessionSnapshot)s
/// instead; events are for side effects such as navigation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    OrderDiscovered {
        order_id: OrderId,
        status: OrderStatus,
    },
    StatusChanged {
        status: OrderStatus,
    },
    CancelIssued {
        order_id: OrderId,
    },
    Notice {
        message: String,
    },
    PollingStopped {
        reason: StopReason,
    },
    /// The host should navigate to the order-detail view.
    RedirectToOrder {
        order_id: OrderId,
    },
}
