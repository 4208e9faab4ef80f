//! # Observability & Tracing
//!
//! [`setup_tracing`] installs a compact `tracing` subscriber filtered by `RUST_LOG`.
//!
//! ## What Gets Traced
//!
//! - **Session lifecycle**: `Session started` / `Shutdown`, with `session_id`
//! - **Transitions**: discovery, status changes, terminal stops and redirects at `info`
//! - **Failures**: poll and cancel failures at `warn`; they never stop the host
//! - **Gateway calls**: one span per backend request, payloads at `debug`
//!
//! ## Usage Examples
//!
//! ```bash
//! # Transitions only
//! RUST_LOG=info order-tracker checkout --user 1 --product 7
//!
//! # Every tick and request payload
//! RUST_LOG=debug order-tracker track --user 1 42
//!
//! # Gateway detail only
//! RUST_LOG=info,order_tracker::gateway=debug order-tracker track --user 1 42
//! ```
//!
//! With `RUST_LOG=info` a checkout that is cancelled before discovery reads:
//!
//! ```text
//! INFO Placing order session_id=session_1 user_id=1 baseline=2
//! INFO Session started session_id=session_1 mode=Checkout user_id=1
//! INFO Order not discovered yet, cancellation deferred session_id=session_1
//! INFO Order discovered session_id=session_1 order_id=123 status=PENDING_VALIDATION
//! INFO Issuing deferred cancellation session_id=session_1 order_id=123
//! INFO Order cancelled session_id=session_1 order_id=123
//! ```

use tracing_subscriber::EnvFilter;

/// Initializes the global subscriber. Falls back to `info` when `RUST_LOG` is unset or invalid.
pub fn setup_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false) // session_id and order_id fields carry the context
        .compact()
        .init();
}
