use crate::model::OrderId;
use crate::session::{Reconciled, SessionActor};
use chrono::Utc;
use tracing::{debug, info, warn};

impl SessionActor {
    /// Fetches the bound order and feeds it through the transition rule. Failures leave the session
    /// untouched; the next tick tries again.
    pub(super) async fn status_tick(&mut self, order_id: OrderId) {
        let session_id = self.state.id();

        let order = match self.gateway.get_order(&order_id).await {
            Ok(order) => order,
            Err(e) => {
                warn!(%session_id, %order_id, error = %e, "Status poll failed");
                return;
            }
        };

        let reconciled = self.state.observe(order, Utc::now());
        match reconciled {
            Reconciled::Unchanged => debug!(%session_id, %order_id, "Status unchanged"),
            Reconciled::Changed(status) | Reconciled::Stopped(status) => {
                info!(%session_id, %order_id, %status, "Status changed")
            }
        }
        self.after_reconcile(reconciled);
    }
}
