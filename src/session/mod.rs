//! # Tracking Sessions
//!
//! A session follows one order from placement (or from opening its view) to a terminal status.
//!
//! - [`TrackingSession`]: the reconciliation state machine, pure and synchronous.
//! - [`SessionActor`]: the task that owns a session and drives discovery, status polling and
//!   cancellation against an [`OrderGateway`](crate::gateway::OrderGateway).
//! - [`SessionClient`] / [`SessionHandle`]: how hosts talk to, observe and tear down a session.
//!
//! Sessions share nothing with each other; everything a session mutates lives inside its actor.

mod actor;
mod cancel;
mod client;
mod discovery;
mod error;
mod events;
mod message;
mod poller;
mod state;
mod submit;
mod ticker;

pub use actor::SessionActor;
pub use client::{SessionClient, SessionHandle};
pub use error::SessionError;
pub use events::{SessionEvent, StopReason};
pub use message::{Response, SessionRequest};
pub use state::*;
pub use submit::{fetch_baseline, open_checkout, open_tracking};
pub use ticker::PollTicker;
