use std::sync::Arc;

use anyhow::Result;
use market::{CandleChart, PriceClient};
use monke_bot::{
    command::quote::QuoteCommand, config::Secrets, gateway::DiscordOutbound, handler::Handler,
};
use serenity::all::{Client, GatewayIntents, Http};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let secrets = Secrets::load()?;

    let price_client = Arc::new(PriceClient::new(
        &secrets.alpaca_key_id,
        &secrets.alpaca_secret_key,
    )?);
    let chart = Arc::new(CandleChart::default());
    let outbound = Arc::new(DiscordOutbound::new(Arc::new(Http::new(
        &secrets.discord_token,
    ))));

    let handler = Handler::new(QuoteCommand::new(price_client, chart, outbound));

    let intents = GatewayIntents::non_privileged();
    let mut client = Client::builder(&secrets.discord_token, intents)
        .event_handler(handler)
        .await?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if let Err(why) = client.start().await {
            error!(error = ?why, "client error");
        }
    });

    shutdown_signal().await;
    shard_manager.shutdown_all().await;

    info!("Shutdown complete.");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::{
            select,
            signal::unix::{SignalKind, signal},
        };
        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
        select! {
            _ = sigterm.recv() => {},
            _ = sigint.recv()  => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
