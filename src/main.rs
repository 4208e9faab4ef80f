//! # order-tracker
//!
//! Places or follows one order against the storefront backend and logs every transition until the
//! session settles.
//!
//! ```bash
//! RUST_LOG=info order-tracker checkout --user 1 --product 7 --quantity 2
//! RUST_LOG=info order-tracker track --user 1 42
//! ```
//!
//! Ctrl-C tears the session down.

use anyhow::Context;
use clap::{Parser, Subcommand};
use order_tracker::config::load_config;
use order_tracker::lifecycle::{setup_tracing, TrackerSystem};
use order_tracker::session::{SessionEvent, SessionId, SessionSnapshot};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn, Instrument};

#[derive(Debug, Parser)]
#[command(name = "order-tracker", about = "Place and track storefront orders")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Place a single-product order and follow it until it settles.
    Checkout {
        #[arg(long)]
        user: String,
        #[arg(long)]
        product: String,
        #[arg(long, default_value_t = 1)]
        quantity: u32,
    },
    /// Follow an existing order until it is delivered, cancelled, failed or lost.
    Track {
        #[arg(long)]
        user: String,
        order_id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_tracing();
    let cli = Cli::parse();

    let config = load_config().context("loading configuration")?;
    info!(base_url = %config.gateway.base_url, "Starting order tracker");
    let system = TrackerSystem::connect(config).context("building gateway")?;

    let session = match cli.command {
        Command::Checkout {
            user,
            product,
            quantity,
        } => {
            let span = tracing::info_span!("checkout");
            system
                .checkout(user.into(), product.into(), quantity)
                .instrument(span)
                .await
        }
        Command::Track { user, order_id } => system.track(user.into(), order_id.into()),
    };

    let events = system
        .take_events(session.id())
        .context("session event stream already taken")?;
    let events = tokio::spawn(log_events(session.id(), events));

    tokio::select! {
        settled = session.wait_settled() => {
            let snapshot = settled.context("session ended before settling")?;
            print_summary(&snapshot);
        }
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, tearing session down");
            print_summary(&session.latest());
        }
    }

    events.abort();
    system.shutdown().await.context("shutting down")?;
    Ok(())
}

async fn log_events(session_id: SessionId, mut events: broadcast::Receiver<SessionEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => info!(%session_id, ?event, "Session event"),
            Err(RecvError::Lagged(missed)) => warn!(missed, "Event stream lagged"),
            Err(RecvError::Closed) => break,
        }
    }
}

fn print_summary(snapshot: &SessionSnapshot) {
    match (&snapshot.order_id, snapshot.status) {
        (Some(order_id), Some(status)) => println!("Order {order_id}: {}", status.label()),
        (None, Some(status)) => println!("Order not yet identified: {}", status.label()),
        (_, None) => println!("Order status unknown"),
    }
    for entry in &snapshot.history {
        println!("  {}  {}", entry.at.format("%H:%M:%S"), entry.label);
    }
    if let Some(message) = &snapshot.message {
        println!("{message}");
    }
    if let Some(notice) = snapshot.notice() {
        println!("{notice}");
    }
}
