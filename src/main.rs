use ampdeck::app::cli::{normalize_args, Args};
use ampdeck::app::config::AppConfig;
use ampdeck::app::App;
use ampdeck::app::events::AppEvent;
use ampdeck::logging;
use ampdeck::player;
use ampdeck::transport::{Endpoint, WsDialer};
use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{info, warn};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    human_panic::setup_panic!();

    let args = Args::parse_from(normalize_args(std::env::args()));

    if args.generate_config {
        println!("{}", AppConfig::generate());
        return Ok(());
    }

    let port = args.port.context("--port is required")?;
    let uuid = args.plugin_uuid.context("--plugin-uuid is required")?;

    let log = logging::init(&AppConfig::get_log_dir())?;
    info!("ampdeck {} starting", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load(args.config.as_deref());

    // One HTTP client for every request.
    let client = reqwest::Client::builder()
        .user_agent(concat!("ampdeck/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_default();
    let remote = player::get_remote(client, &config.player_url);

    let (tx, rx) = mpsc::unbounded_channel();
    let mut app = App::new(remote, Box::new(WsDialer), tx.clone(), &config).with_logging(log);
    app.connect(Endpoint {
        port,
        uuid,
        register_event: args.register_event,
    });

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Cannot listen for Ctrl-C: {}", e);
            return;
        }
        let _ = tx.send(AppEvent::Shutdown);
    });

    app.run(rx).await;
    Ok(())
}
