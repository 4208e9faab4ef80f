//! # Cancellation Coordinator
//!
//! A cancel request is accepted at any point before the order leaves the cancellable stages:
//!
//! - With a known order id the cancel call is issued at once. Success records `CANCELLED`; failure
//!   surfaces the backend's message. Either way polling stops and is not retried.
//! - Before discovery the request is recorded (local `CANCELLED`, a history note) and polling keeps
//!   going. The discovery tick that binds the order issues the call.
//!
//! At most one cancel call is issued per session, however requests and ticks interleave.

use crate::session::{CancelOutcome, CancelPlan, SessionActor};
use chrono::Utc;
use tracing::{info, warn};

impl SessionActor {
    pub(super) async fn request_cancel(&mut self) -> CancelOutcome {
        let session_id = self.state.id();
        match self.state.plan_cancel() {
            Ok(CancelPlan::Issue(order_id)) => {
                info!(%session_id, %order_id, "Cancelling order");
                self.issue_cancel().await
            }
            Ok(CancelPlan::Defer) => {
                info!(%session_id, "Order not discovered yet, cancellation deferred");
                self.state.defer_cancel(Utc::now());
                CancelOutcome::Deferred
            }
            Err(outcome) => {
                info!(%session_id, ?outcome, "Cancel request refused");
                outcome
            }
        }
    }

    /// Issues the session's single cancel call against the bound order.
    pub(super) async fn issue_cancel(&mut self) -> CancelOutcome {
        let session_id = self.state.id();
        let Some(order_id) = self.state.begin_cancel() else {
            return CancelOutcome::AlreadyRequested;
        };
        let user_id = self.state.user_id().clone();

        match self.gateway.cancel_order(&order_id, &user_id).await {
            Ok(()) => {
                info!(%session_id, %order_id, "Order cancelled");
                self.state.record_cancelled(Utc::now());
                CancelOutcome::Cancelled
            }
            Err(e) => {
                warn!(%session_id, %order_id, error = %e, "Cancel failed");
                let message = self.state.record_cancel_failure(&e.user_message());
                CancelOutcome::Rejected(message)
            }
        }
    }
}
