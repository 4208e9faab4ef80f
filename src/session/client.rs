use crate::session::{
    CancelOutcome, SessionError, SessionEvent, SessionId, SessionRequest, SessionSnapshot,
};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, instrument};

/// A cheap, cloneable handle for talking to one session actor.
#[derive(Clone)]
pub struct SessionClient {
    id: SessionId,
    sender: mpsc::Sender<SessionRequest>,
    snapshots: watch::Receiver<SessionSnapshot>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionClient {
    pub(crate) fn new(
        id: SessionId,
        sender: mpsc::Sender<SessionRequest>,
        snapshots: watch::Receiver<SessionSnapshot>,
        events: broadcast::Sender<SessionEvent>,
    ) -> Self {
        Self {
            id,
            sender,
            snapshots,
            events,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Asks the session to cancel its order. Safe to call repeatedly; only the first accepted request
    /// has any effect.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub async fn request_cancel(&self) -> Result<CancelOutcome, SessionError> {
        debug!("Sending cancel to session");
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(SessionRequest::Cancel { respond_to })
            .await
            .map_err(|_| SessionError::ActorClosed)?;
        response.await.map_err(|_| SessionError::ActorDropped)
    }

    /// Reads the session's current state through the actor.
    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(SessionRequest::Snapshot { respond_to })
            .await
            .map_err(|_| SessionError::ActorClosed)?;
        response.await.map_err(|_| SessionError::ActorDropped)
    }

    /// The last published snapshot, without a round trip to the actor.
    pub fn latest(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// A receiver that is notified whenever the snapshot changes.
    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    /// Subscribes to events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Waits until polling has stopped and no redirect is pending.
    pub async fn wait_settled(&self) -> Result<SessionSnapshot, SessionError> {
        let mut snapshots = self.snapshots.clone();
        let settled = snapshots
            .wait_for(SessionSnapshot::is_settled)
            .await
            .map_err(|_| SessionError::ActorClosed)?;
        Ok((*settled).clone())
    }
}

/// Owns a running session task. Dropping the handle tears the session down.
pub struct SessionHandle {
    client: SessionClient,
    task: Option<JoinHandle<()>>,
    events: Option<broadcast::Receiver<SessionEvent>>,
}

impl SessionHandle {
    /// `events` must be subscribed before the task was spawned.
    pub(crate) fn new(
        client: SessionClient,
        task: JoinHandle<()>,
        events: broadcast::Receiver<SessionEvent>,
    ) -> Self {
        Self {
            client,
            task: Some(task),
            events: Some(events),
        }
    }

    /// Every event since the session started, including those published before this call.
    /// Available once.
    pub fn take_events(&mut self) -> Option<broadcast::Receiver<SessionEvent>> {
        self.events.take()
    }

    pub fn id(&self) -> SessionId {
        self.client.id
    }

    pub fn client(&self) -> &SessionClient {
        &self.client
    }

    /// Stops the session task and waits for it to exit. No tick fires once this returns.
    pub async fn teardown(mut self) -> Result<(), SessionError> {
        let Some(task) = self.task.take() else {
            return Ok(());
        };
        task.abort();
        match task.await {
            Ok(()) => Ok(()),
            Err(e) if e.is_cancelled() => Ok(()),
            Err(e) => Err(SessionError::TaskFailed(e.to_string())),
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }
}
