//! # Baseline Snapshot & Submission
//!
//! Opening a checkout records how many orders the user already has, fires the create call on its own
//! task and starts the session straight away in discovery mode. The create outcome only matters if it
//! is a failure; discovery is what binds the order, and a failure may arrive after it has.

use crate::config::TrackerConfig;
use crate::gateway::{GatewayError, OrderGateway};
use crate::model::{CreateOrder, CreateOrderReceipt, OrderId, UserId};
use crate::session::actor::Submission;
use crate::session::{SessionActor, SessionHandle, SessionId, TrackingSession};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, info, instrument, warn};

/// Counts the user's existing orders. A failed fetch counts as zero and never blocks submission.
#[instrument(skip(gateway))]
pub async fn fetch_baseline(gateway: &dyn OrderGateway, user_id: &UserId) -> usize {
    match gateway.list_orders(user_id).await {
        Ok(orders) => orders.len(),
        Err(e) => {
            warn!(error = %e, "Baseline fetch failed, assuming no prior orders");
            0
        }
    }
}

/// Fires the create call. The returned receiver yields its outcome; the call runs to completion even
/// if the session is torn down first.
fn submit(gateway: Arc<dyn OrderGateway>, request: CreateOrder) -> Submission {
    let (respond_to, outcome) = oneshot::channel();
    tokio::spawn(async move {
        let result = gateway.create_order(request).await;
        let _ = respond_to.send(result);
    });
    outcome
}

/// Starts a checkout session for `request`.
pub async fn open_checkout(
    id: SessionId,
    gateway: Arc<dyn OrderGateway>,
    config: &TrackerConfig,
    request: CreateOrder,
) -> SessionHandle {
    let user_id = request.user_id.clone();
    let baseline = fetch_baseline(gateway.as_ref(), &user_id).await;
    info!(session_id = %id, %user_id, baseline, "Placing order");

    let state = TrackingSession::checkout(id, user_id, baseline);
    let submission = submit(gateway.clone(), request);
    let (actor, client) = SessionActor::new(state, gateway, config);
    let events = client.subscribe();
    let task = tokio::spawn(actor.with_submission(submission).run());
    SessionHandle::new(client, task, events)
}

/// Starts an order view for an order that already exists.
pub fn open_tracking(
    id: SessionId,
    gateway: Arc<dyn OrderGateway>,
    config: &TrackerConfig,
    user_id: UserId,
    order_id: OrderId,
) -> SessionHandle {
    info!(session_id = %id, %user_id, %order_id, "Tracking order");
    let state = TrackingSession::existing(id, user_id, order_id);
    let (actor, client) = SessionActor::new(state, gateway, config);
    let events = client.subscribe();
    let task = tokio::spawn(actor.run());
    SessionHandle::new(client, task, events)
}

impl SessionActor {
    pub(super) fn on_submission(
        &mut self,
        outcome: Result<Result<CreateOrderReceipt, GatewayError>, oneshot::error::RecvError>,
    ) {
        let session_id = self.state.id();
        let failure = match outcome {
            Ok(Ok(receipt)) => match receipt.refusal() {
                Some(message) => message.to_string(),
                None => {
                    debug!(%session_id, order_id = ?receipt.order_id, "Order accepted, awaiting discovery");
                    return;
                }
            },
            Ok(Err(e)) => e.user_message(),
            // No answer from the backend; a bound order speaks for itself.
            Err(_) if self.state.order_id().is_some() => {
                debug!(%session_id, "Create task ended without an outcome");
                return;
            }
            Err(_) => "Order submission was interrupted".to_string(),
        };

        let cancel_requested = self.state.cancel_requested();
        match self.state.record_submission_failure(failure.as_str(), Utc::now()) {
            true if cancel_requested => {
                info!(%session_id, message = %failure, "Order never created, cancellation complete")
            }
            true => warn!(
                %session_id,
                order_id = ?self.state.order_id(),
                message = %failure,
                "Order placement failed"
            ),
            false => debug!(%session_id, message = %failure, "Create failure ignored"),
        }
    }
}
