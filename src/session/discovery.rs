//! # Discovery Poller
//!
//! Finds the order a checkout created when the create call did not hand back its id. Each tick lists
//! the user's orders; once the list is longer than the count recorded before submission, its first
//! (newest) entry is taken to be the new order.
//!
//! Count-based discovery misattributes orders when the same user places several concurrently.

use crate::session::SessionActor;
use chrono::Utc;
use tracing::{debug, info, warn};

impl SessionActor {
    pub(super) async fn discovery_tick(&mut self) {
        let session_id = self.state.id();
        let user_id = self.state.user_id().clone();

        let orders = match self.gateway.list_orders(&user_id).await {
            Ok(orders) => orders,
            Err(e) => {
                warn!(%session_id, %user_id, error = %e, "Discovery poll failed");
                return;
            }
        };

        let count = orders.len();
        let baseline = self.state.order_count();
        let Some(newest) = orders.first().filter(|_| count > baseline) else {
            debug!(%session_id, count, baseline, "No new order yet");
            return;
        };

        let Some(reconciled) = self.state.bind(newest, count, Utc::now()) else {
            return;
        };
        info!(
            %session_id,
            order_id = %newest.order_id,
            status = %newest.status,
            "Order discovered"
        );

        if self.state.cancel_pending() {
            info!(%session_id, order_id = %newest.order_id, "Issuing deferred cancellation");
            self.issue_cancel().await;
        } else {
            self.after_reconcile(reconciled);
        }
    }
}
