//! Runtime orchestration and lifecycle management.
//!
//! - [`TrackerSystem`] opens, tracks and tears down sessions against one gateway.
//! - [`setup_tracing`] initializes logging.

pub mod tracker_system;
pub mod tracing;

pub use tracker_system::*;
pub use self::tracing::*;
