use crate::session::{CancelOutcome, SessionSnapshot};
use tokio::sync::oneshot;

/// Type alias for the one-shot response channel used by the session actor.
pub type Response<T> = oneshot::Sender<T>;

/// Requests a host can send to a running session.
#[derive(Debug)]
pub enum SessionRequest {
    Cancel { respond_to: Response<CancelOutcome> },
    Snapshot { respond_to: Response<SessionSnapshot> },
}
