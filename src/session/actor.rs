//! # Session Actor
//!
//! One Tokio task per tracking session. The task owns the [`TrackingSession`] state, the poll timer,
//! the pending create outcome and the redirect timer, and serializes every mutation:
//!
//! ```text
//!   SessionClient ──SessionRequest──┐
//!   create task ──receipt (oneshot)─┤
//!   PollTicker ──tick───────────────┼──► SessionActor ──► watch<SessionSnapshot>
//!   redirect timer ──fire───────────┘                  └─► broadcast<SessionEvent>
//! ```
//!
//! A tick binds to discovery while no order is known and to status polling afterwards. Each network
//! call is awaited inside the loop, so ticks never overlap.

use crate::config::TrackerConfig;
use crate::gateway::{GatewayError, OrderGateway};
use crate::model::{CreateOrderReceipt, OrderStatus};
use crate::session::ticker::{next_tick, PollTicker};
use crate::session::{
    Reconciled, SessionClient, SessionEvent, SessionRequest, SessionSnapshot, TrackingMode,
    TrackingSession,
};
use std::future::pending;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::{sleep, Sleep};
use tracing::{debug, info};

pub(crate) type Submission = oneshot::Receiver<Result<CreateOrderReceipt, GatewayError>>;

pub struct SessionActor {
    pub(super) state: TrackingSession,
    pub(super) gateway: Arc<dyn OrderGateway>,
    receiver: mpsc::Receiver<SessionRequest>,
    snapshots: watch::Sender<SessionSnapshot>,
    events: broadcast::Sender<SessionEvent>,
    ticker: Option<PollTicker>,
    submission: Option<Submission>,
    redirect: Option<Pin<Box<Sleep>>>,
    redirect_delay: Duration,
}

impl SessionActor {
    /// Creates the actor and its client. Polling starts with the first tick of the returned actor's
    /// timer: one period from now for a checkout, immediately for an order view.
    pub fn new(
        state: TrackingSession,
        gateway: Arc<dyn OrderGateway>,
        config: &TrackerConfig,
    ) -> (Self, SessionClient) {
        let (sender, receiver) = mpsc::channel(config.session.command_buffer);
        let (snapshots, snapshot_rx) = watch::channel(state.snapshot());
        let (events, _) = broadcast::channel(config.session.event_buffer);

        let ticker = match state.mode() {
            TrackingMode::Checkout => PollTicker::start(config.polling.checkout_period(), false),
            TrackingMode::Existing => PollTicker::start(config.polling.tracking_period(), true),
        };

        let client = SessionClient::new(state.id(), sender, snapshot_rx, events.clone());
        let actor = Self {
            state,
            gateway,
            receiver,
            snapshots,
            events,
            ticker: Some(ticker),
            submission: None,
            redirect: None,
            redirect_delay: config.polling.redirect_delay(),
        };
        (actor, client)
    }

    /// Attaches the outcome of an in-flight create call.
    pub(crate) fn with_submission(mut self, submission: Submission) -> Self {
        self.submission = Some(submission);
        self
    }

    /// Runs the session's event loop until every client is dropped or the task is aborted.
    pub async fn run(mut self) {
        let session_id = self.state.id();
        let mode = self.state.mode();
        info!(%session_id, ?mode, user_id = %self.state.user_id(), "Session started");

        loop {
            tokio::select! {
                biased;
                request = self.receiver.recv() => match request {
                    Some(request) => self.handle_request(request).await,
                    None => break,
                },
                outcome = settle(&mut self.submission) => self.on_submission(outcome),
                _ = fire(&mut self.redirect) => self.on_redirect(),
                _ = next_tick(&mut self.ticker) => self.on_tick().await,
            }

            if !self.state.is_polling() && self.ticker.take().is_some() {
                debug!(%session_id, "Poll timer released");
            }
            self.publish();
        }

        info!(
            %session_id,
            status = ?self.state.status(),
            history = self.state.history().len(),
            "Shutdown"
        );
    }

    async fn handle_request(&mut self, request: SessionRequest) {
        match request {
            SessionRequest::Cancel { respond_to } => {
                let outcome = self.request_cancel().await;
                // Publish before answering so the caller observes the new snapshot.
                self.publish();
                let _ = respond_to.send(outcome);
            }
            SessionRequest::Snapshot { respond_to } => {
                let _ = respond_to.send(self.state.snapshot());
            }
        }
    }

    async fn on_tick(&mut self) {
        match self.state.order_id().cloned() {
            Some(order_id) => self.status_tick(order_id).await,
            None => self.discovery_tick().await,
        }
    }

    /// Applies mode-specific side effects of a reconciled observation.
    pub(super) fn after_reconcile(&mut self, reconciled: Reconciled) {
        if let Reconciled::Stopped(status) = reconciled {
            info!(
                session_id = %self.state.id(),
                order_id = ?self.state.order_id(),
                %status,
                "Terminal status, polling stopped"
            );
            if status == OrderStatus::DeliveryRequested && self.state.mode().redirects() {
                self.redirect = Some(Box::pin(sleep(self.redirect_delay)));
                self.state.schedule_redirect();
            }
        }
    }

    fn on_redirect(&mut self) {
        self.redirect = None;
        self.state.complete_redirect();
        info!(session_id = %self.state.id(), order_id = ?self.state.order_id(), "Redirecting to order view");
    }

    fn publish(&mut self) {
        for event in self.state.drain_events() {
            debug!(session_id = %self.state.id(), ?event, "Event");
            // No subscribers is fine.
            let _ = self.events.send(event);
        }
        let snapshot = self.state.snapshot();
        self.snapshots.send_if_modified(|current| {
            if *current == snapshot {
                return false;
            }
            *current = snapshot;
            true
        });
    }
}

/// Waits for the create outcome, or forever once it has been consumed.
async fn settle(
    submission: &mut Option<Submission>,
) -> Result<Result<CreateOrderReceipt, GatewayError>, oneshot::error::RecvError> {
    let Some(receiver) = submission.as_mut() else {
        return pending().await;
    };
    let outcome = receiver.await;
    *submission = None;
    outcome
}

async fn fire(redirect: &mut Option<Pin<Box<Sleep>>>) {
    match redirect {
        Some(timer) => timer.as_mut().await,
        None => pending().await,
    }
}
