use crate::session::SessionId;
use thiserror::Error;

/// Errors raised while talking to a session actor.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SessionError {
    /// The session's request channel is closed; the actor has stopped.
    #[error("Session closed")]
    ActorClosed,

    /// The actor dropped the response channel before answering.
    #[error("Session dropped response channel")]
    ActorDropped,

    /// The actor task panicked or could not be joined.
    #[error("Session task failed: {0}")]
    TaskFailed(String),

    #[error("Unknown session: {0}")]
    UnknownSession(SessionId),
}
