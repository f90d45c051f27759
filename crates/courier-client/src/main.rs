//! courier CLI entry point.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::mpsc;
use tracing::{Level, warn};
use tracing_subscriber::EnvFilter;

use courier_protocol::LogicalClock;

use courier_client::cli::Cli;
use courier_client::command::CommandChannel;
use courier_client::config::ClientConfig;
use courier_client::error::{ClientError, ClientResult};
use courier_client::menu;
use courier_client::notify::NotificationChannel;
use courier_client::registry::SubscriptionRegistry;
use courier_client::session::Session;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.debug {
        EnvFilter::new(Level::DEBUG.to_string())
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(Level::WARN.to_string()))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    // Load configuration
    let config = if let Some(ref path) = cli.config {
        ClientConfig::load_from(path).map_err(ClientError::Config)?
    } else {
        ClientConfig::load().unwrap_or_default()
    };

    let server = cli.server.unwrap_or(config.connection.server);
    let broker = cli.broker.unwrap_or(config.connection.broker);

    let clock = Arc::new(LogicalClock::new());
    let registry = SubscriptionRegistry::new();
    let (deliveries_tx, mut deliveries_rx) = mpsc::channel(64);

    let commands = CommandChannel::connect(&server, Arc::clone(&clock)).await?;
    let (notifications, receive_task) = NotificationChannel::connect(
        &broker,
        registry.clone(),
        Arc::clone(&clock),
        deliveries_tx,
    )
    .await?;

    // Matched notifications print as they arrive, interleaved with the menu.
    let printer = tokio::spawn(async move {
        while let Some(delivery) = deliveries_rx.recv().await {
            menu::print_delivery(&delivery);
        }
    });

    let session = Session::new(commands, Arc::clone(&notifications), registry, clock);
    let outcome = menu::run(&session).await;

    // Cooperative shutdown: stop the receive loop, then drain the printer.
    notifications.shutdown();
    match receive_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "notification loop ended with an error"),
        Err(e) => warn!(error = %e, "notification task panicked"),
    }
    printer.await.ok();

    outcome
}
