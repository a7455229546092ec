//! wirehook — webhook relay tunnel CLI.
//!
//! `wirehook broker` runs the always-reachable relay; `wirehook listen`
//! connects out to it and streams forwarded webhook events to stdout.

use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};

use wirehook_broker::BrokerConfig;
use wirehook_client::config::ListenConfig;
use wirehook_client::controller::ReconnectController;
use wirehook_client::output::{OutputMode, StdoutSink};
use wirehook_client::HttpPlatformClient;
use wirehook_core::events::{parse_event_list, EventFilter};
use wirehook_logging::LoggingConfig;
use wirehook_settings::WirehookSettings;

#[derive(Parser)]
#[command(
    name = "wirehook",
    version,
    about = "Receive webhook events anywhere through a relay tunnel"
)]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the relay broker.
    Broker(BrokerArgs),
    /// Connect to the broker and stream webhook events to stdout.
    Listen(ListenArgs),
}

#[derive(Args)]
struct BrokerArgs {
    /// Host to bind.
    #[arg(long)]
    host: Option<String>,

    /// Port to bind.
    #[arg(long, short = 'p')]
    port: Option<u16>,
}

#[derive(Args)]
struct ListenArgs {
    /// Comma-separated event types to emit (default: everything).
    #[arg(long)]
    events: Option<String>,

    /// Print raw JSON lines instead of formatted log lines.
    #[arg(long)]
    json: bool,

    /// API token (overrides the stored token).
    #[arg(long, short = 't')]
    token: Option<String>,

    /// Broker HTTP base URL.
    #[arg(long)]
    relay_url: Option<String>,

    /// Broker gateway URL.
    #[arg(long)]
    gateway_url: Option<String>,

    /// Update an existing webhook subscription instead of creating one.
    #[arg(long, short = 's')]
    subscription: Option<String>,

    /// Keep the webhook subscription on exit.
    #[arg(long)]
    no_cleanup: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    wirehook_logging::init_logging(&LoggingConfig {
        json: cli.log_json,
        ..LoggingConfig::default()
    });

    let settings = wirehook_settings::load_settings().context("failed to load settings")?;

    match cli.command {
        Command::Broker(args) => run_broker(args, settings).await,
        Command::Listen(args) => run_listen(args, settings).await,
    }
}

async fn run_broker(args: BrokerArgs, settings: WirehookSettings) -> anyhow::Result<()> {
    let config = BrokerConfig {
        host: args.host.unwrap_or(settings.broker.host),
        port: args.port.unwrap_or(settings.broker.port),
        ..BrokerConfig::default()
    };

    let handle = wirehook_broker::start(config)
        .await
        .context("failed to start relay broker")?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    tracing::info!("shutting down");
    handle.shutdown().await;
    Ok(())
}

async fn run_listen(args: ListenArgs, settings: WirehookSettings) -> anyhow::Result<()> {
    let token = args
        .token
        .or(settings.token)
        .filter(|t| !t.is_empty());
    let Some(token) = token else {
        bail!("no API token configured; pass --token or set WIREHOOK_TOKEN");
    };

    let mut config = ListenConfig::new(
        args.relay_url.unwrap_or(settings.relay_url),
        args.gateway_url.unwrap_or(settings.gateway_url),
        token.clone(),
    );
    if let Some(list) = &args.events {
        let events = parse_event_list(list)?;
        if events.is_empty() {
            bail!("--events must name at least one event type");
        }
        config.filter = EventFilter::only(events.clone());
        config.subscribed_events = events;
    }
    config.subscription = args.subscription.map(Into::into);
    config.no_cleanup = args.no_cleanup;

    let mode = if args.json {
        OutputMode::Json
    } else {
        OutputMode::Text
    };

    let client = HttpPlatformClient::new(settings.api_url, token);
    let mut controller = ReconnectController::new(config, client, Arc::new(StdoutSink::new(mode)));

    let shutdown = controller.shutdown_token();
    let _ = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutting down");
            shutdown.cancel();
        }
    });

    controller.run().await?;
    Ok(())
}
