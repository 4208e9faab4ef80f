//! # Order Tracker
//!
//! > **Asynchronous order tracking for a storefront client.**
//!
//! Placing an order with the storefront backend does not hand back the new order's identity or its
//! final status. The backend validates, charges and dispatches in the background, so the client has
//! to find the order and watch it. This crate is that client-side engine:
//!
//! 1. **Discover** the order a checkout created, by comparing the user's order count before and
//!    after submission.
//! 2. **Poll** its status until a terminal outcome.
//! 3. **Reconcile** a cancellation the user may issue before the order has even been discovered.
//! 4. **Record** an append-only history of every observed transition.
//!
//! ## Module Tour
//!
//! ### 1. The Data ([`model`])
//! Identifiers, the [`OrderStatus`](model::OrderStatus) vocabulary with its terminal and
//! cancellable sets, order payloads and history entries.
//!
//! ### 2. The Backend ([`gateway`])
//! The [`OrderGateway`](gateway::OrderGateway) trait, an HTTP implementation and a scripted
//! [`MockGateway`](gateway::mock::MockGateway) for tests.
//!
//! ### 3. The Engine ([`session`])
//! One actor per tracking session. The actor owns the
//! [`TrackingSession`](session::TrackingSession) state machine and its poll timer, and serializes
//! ticks, cancel requests and the create outcome.
//!
//! ### 4. The Orchestrator ([`lifecycle`])
//! [`TrackerSystem`](lifecycle::TrackerSystem) opens and tears down sessions;
//! [`setup_tracing`](lifecycle::setup_tracing) configures logging.
//!
//! ## Quick Start
//!
//! ```ignore
//! let system = TrackerSystem::connect(load_config()?)?;
//! let session = system.checkout("1".into(), "7".into(), 2).await;
//!
//! // The user changes their mind before the order shows up.
//! session.request_cancel().await?;
//!
//! let settled = session.wait_settled().await?;
//! for entry in &settled.history {
//!     println!("{} {}", entry.at, entry.label);
//! }
//! system.shutdown().await?;
//! ```

pub mod config;
pub mod gateway;
pub mod lifecycle;
pub mod model;
pub mod session;
