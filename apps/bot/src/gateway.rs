use std::sync::Arc;

use anyhow::Result;
use market::{Bar, CandleChart, PriceClient};
use serenity::all::{ChannelId, CreateAttachment, CreateMessage, Http};
use serenity::async_trait;
use tracing::debug;

use crate::command::quote::{ChartRenderer, MarketData, Outbound};

/// Outbound messaging over the platform HTTP API.
pub struct DiscordOutbound {
    http: Arc<Http>,
}

impl DiscordOutbound {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Outbound for DiscordOutbound {
    async fn post_text(&self, channel: ChannelId, text: &str) -> Result<()> {
        channel
            .send_message(&self.http, CreateMessage::new().content(text))
            .await?;
        Ok(())
    }

    async fn upload_png(
        &self,
        channel: ChannelId,
        filename: &str,
        png: Vec<u8>,
        caption: &str,
    ) -> Result<()> {
        debug!(filename, bytes = png.len(), "uploading chart");

        let msg = CreateMessage::new()
            .content(caption)
            .add_file(CreateAttachment::bytes(png, filename.to_string()));
        channel.send_message(&self.http, msg).await?;
        Ok(())
    }
}

#[async_trait]
impl MarketData for PriceClient {
    async fn daily_bars(&self, ticker: &str, duration: &str) -> Result<Vec<Bar>> {
        self.fetch_daily(ticker, duration).await
    }
}

impl ChartRenderer for CandleChart {
    fn render(&self, ticker: &str, bars: &[Bar]) -> Result<Vec<u8>> {
        self.render_png(ticker, bars)
    }
}
