use std::sync::Arc;

use anyhow::Result;
use market::Bar;
use serenity::all::ChannelId;
use serenity::async_trait;
use tokio::task;
use tracing::{debug, info, instrument};

pub const QUOTE_COMMAND: &str = "monke-quote";
pub const USAGE_MSG: &str = "Usage: /monke-quote ticker [duration=30d]";

const DEFAULT_DURATION: &str = "30d";

/// One inbound slash-command event, reduced to the fields the handler
/// consumes. The envelope acknowledgment stays with the platform adapter.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Command name without the leading slash.
    pub command: String,
    /// Raw argument string, exactly as typed.
    pub text: String,
    pub user_name: String,
    pub channel: ChannelId,
}

/// Daily price history for a ticker over a lookback window like `"30d"`.
/// An unrecognized ticker yields an empty vector.
#[async_trait]
pub trait MarketData: Send + Sync {
    async fn daily_bars(&self, ticker: &str, duration: &str) -> Result<Vec<Bar>>;
}

/// Turns a bar sequence into PNG bytes.
pub trait ChartRenderer: Send + Sync {
    fn render(&self, ticker: &str, bars: &[Bar]) -> Result<Vec<u8>>;
}

/// Outbound messaging capability bound to the live platform connection.
#[async_trait]
pub trait Outbound: Send + Sync {
    async fn post_text(&self, channel: ChannelId, text: &str) -> Result<()>;

    async fn upload_png(
        &self,
        channel: ChannelId,
        filename: &str,
        png: Vec<u8>,
        caption: &str,
    ) -> Result<()>;
}

enum ParsedArgs {
    Usage,
    Quote { ticker: String, duration: String },
    TooMany(usize),
}

fn parse_args(raw: &str) -> ParsedArgs {
    let tokens: Vec<&str> = raw.split_whitespace().collect();

    match tokens.as_slice() {
        [] => ParsedArgs::Usage,
        [ticker] => ParsedArgs::Quote {
            ticker: ticker.to_uppercase(),
            duration: DEFAULT_DURATION.to_string(),
        },
        [ticker, duration] => ParsedArgs::Quote {
            ticker: ticker.to_uppercase(),
            duration: duration.to_lowercase(),
        },
        more => ParsedArgs::TooMany(more.len()),
    }
}

/// OHLC line for the most recent bar, with percent change vs. the previous
/// bar and vs. the window start once there are at least two bars. `None`
/// when the fetch came back empty.
fn build_summary(ticker: &str, bars: &[Bar]) -> Option<String> {
    let last = bars.last()?;

    let pct_change = if bars.len() > 1 {
        let first = &bars[0];
        let prev = &bars[bars.len() - 2];
        let vs_prev = (last.close - prev.close) / prev.close * 100.0;
        let vs_window = (last.close - first.close) / first.close * 100.0;
        format!("\n%Chg Prev. Day={vs_prev:.2}% | %Chg Time Frame={vs_window:.2}%\n")
    } else {
        String::new()
    };

    Some(format!(
        "[{ticker} Quote {date}] Open={open:.2} High={high:.2} Low={low:.2} Close={close:.2}{pct_change}",
        date = last.timestamp.format("%Y-%m-%d"),
        open = last.open,
        high = last.high,
        low = last.low,
        close = last.close,
    ))
}

/// The command handler. Holds explicit references to its three external
/// collaborators; every invocation ends in exactly one outbound call.
pub struct QuoteCommand {
    market: Arc<dyn MarketData>,
    chart: Arc<dyn ChartRenderer>,
    outbound: Arc<dyn Outbound>,
}

impl QuoteCommand {
    pub fn new(
        market: Arc<dyn MarketData>,
        chart: Arc<dyn ChartRenderer>,
        outbound: Arc<dyn Outbound>,
    ) -> Self {
        Self {
            market,
            chart,
            outbound,
        }
    }

    #[instrument(skip(self, inv), fields(command = %inv.command, user = %inv.user_name))]
    pub async fn handle(&self, inv: &Invocation) -> Result<()> {
        info!(text = %inv.text, "received slash command");

        if inv.command != QUOTE_COMMAND {
            return self
                .outbound
                .post_text(inv.channel, &format!("Invalid command /{}", inv.command))
                .await;
        }

        let blame = format!(
            "Requested by {} with the command `/{} {}`",
            inv.user_name, QUOTE_COMMAND, inv.text
        );

        let msg = match parse_args(&inv.text) {
            ParsedArgs::Usage => USAGE_MSG.to_string(),
            ParsedArgs::TooMany(count) => {
                format!("Error: {count}>2 arguments received. {USAGE_MSG}")
            }
            ParsedArgs::Quote { ticker, duration } => {
                let bars = self.market.daily_bars(&ticker, &duration).await?;

                match build_summary(&ticker, &bars) {
                    Some(summary) => {
                        info!(%ticker, %duration, bars = bars.len(), "got history");

                        let chart = Arc::clone(&self.chart);
                        let render_ticker = ticker.clone();
                        let render_bars = bars.clone();
                        debug!("rendering chart");
                        let png = task::spawn_blocking(move || {
                            chart.render(&render_ticker, &render_bars)
                        })
                        .await??;

                        let filename = format!("monke_quote_{ticker}_{duration}.png");
                        let caption = format!("{summary}\n{blame}");

                        return self
                            .outbound
                            .upload_png(inv.channel, &filename, png, &caption)
                            .await;
                    }
                    None => format!("Invalid ticker \"{ticker}\""),
                }
            }
        };

        self.outbound
            .post_text(inv.channel, &format!("{msg}\n{blame}"))
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::{TimeZone, Utc};

    use super::*;

    fn bar(day: u32, open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar {
            timestamp: Utc.with_ymd_and_hms(2026, 8, day, 4, 0, 0).unwrap(),
            open,
            high,
            low,
            close,
            volume: 1_000,
        }
    }

    fn invocation(text: &str) -> Invocation {
        Invocation {
            command: QUOTE_COMMAND.to_string(),
            text: text.to_string(),
            user_name: "monke".to_string(),
            channel: ChannelId::new(42),
        }
    }

    struct FakeMarket {
        bars: Vec<Bar>,
        calls: Mutex<Vec<(String, String)>>,
    }

    impl FakeMarket {
        fn with_bars(bars: Vec<Bar>) -> Self {
            Self {
                bars,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl MarketData for FakeMarket {
        async fn daily_bars(&self, ticker: &str, duration: &str) -> Result<Vec<Bar>> {
            self.calls
                .lock()
                .unwrap()
                .push((ticker.to_string(), duration.to_string()));
            Ok(self.bars.clone())
        }
    }

    struct FailingMarket;

    #[async_trait]
    impl MarketData for FailingMarket {
        async fn daily_bars(&self, _ticker: &str, _duration: &str) -> Result<Vec<Bar>> {
            Err(anyhow::anyhow!("data api unreachable"))
        }
    }

    struct FakeChart;

    impl ChartRenderer for FakeChart {
        fn render(&self, _ticker: &str, bars: &[Bar]) -> Result<Vec<u8>> {
            assert!(!bars.is_empty(), "renderer called without bars");
            Ok(vec![0x89, b'P', b'N', b'G'])
        }
    }

    #[derive(Default)]
    struct RecordingOutbound {
        texts: Mutex<Vec<String>>,
        uploads: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl Outbound for RecordingOutbound {
        async fn post_text(&self, _channel: ChannelId, text: &str) -> Result<()> {
            self.texts.lock().unwrap().push(text.to_string());
            Ok(())
        }

        async fn upload_png(
            &self,
            _channel: ChannelId,
            filename: &str,
            png: Vec<u8>,
            caption: &str,
        ) -> Result<()> {
            assert!(!png.is_empty());
            self.uploads
                .lock()
                .unwrap()
                .push((filename.to_string(), caption.to_string()));
            Ok(())
        }
    }

    fn command(bars: Vec<Bar>) -> (QuoteCommand, Arc<FakeMarket>, Arc<RecordingOutbound>) {
        let market = Arc::new(FakeMarket::with_bars(bars));
        let outbound = Arc::new(RecordingOutbound::default());
        let cmd = QuoteCommand::new(market.clone(), Arc::new(FakeChart), outbound.clone());
        (cmd, market, outbound)
    }

    #[tokio::test]
    async fn empty_args_post_usage_without_fetching() {
        let (cmd, market, outbound) = command(vec![bar(21, 10.0, 12.0, 9.0, 11.0)]);

        cmd.handle(&invocation("")).await.unwrap();

        assert!(market.calls.lock().unwrap().is_empty());
        assert!(outbound.uploads.lock().unwrap().is_empty());

        let texts = outbound.texts.lock().unwrap();
        assert_eq!(
            texts.as_slice(),
            [format!(
                "{USAGE_MSG}\nRequested by monke with the command `/monke-quote `"
            )]
        );
    }

    #[tokio::test]
    async fn too_many_args_report_the_exact_count() {
        let (cmd, market, outbound) = command(Vec::new());

        cmd.handle(&invocation("A B C")).await.unwrap();

        assert!(market.calls.lock().unwrap().is_empty());

        let texts = outbound.texts.lock().unwrap();
        assert_eq!(
            texts.as_slice(),
            [
                "Error: 3>2 arguments received. Usage: /monke-quote ticker [duration=30d]\n\
                 Requested by monke with the command `/monke-quote A B C`"
                    .to_string()
            ]
        );
    }

    #[tokio::test]
    async fn single_token_uppercases_ticker_and_defaults_duration() {
        let bars = vec![bar(20, 10.0, 12.0, 9.0, 11.0), bar(21, 11.0, 13.0, 10.0, 12.0)];
        let (cmd, market, outbound) = command(bars);

        cmd.handle(&invocation("soxl")).await.unwrap();

        assert_eq!(
            market.calls.lock().unwrap().as_slice(),
            [("SOXL".to_string(), "30d".to_string())]
        );

        let uploads = outbound.uploads.lock().unwrap();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].0, "monke_quote_SOXL_30d.png");
        assert!(outbound.texts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn second_token_becomes_lowercased_duration() {
        let (cmd, market, _outbound) = command(vec![bar(21, 10.0, 12.0, 9.0, 11.0)]);

        cmd.handle(&invocation("soxl 5D")).await.unwrap();

        assert_eq!(
            market.calls.lock().unwrap().as_slice(),
            [("SOXL".to_string(), "5d".to_string())]
        );
    }

    #[tokio::test]
    async fn empty_history_posts_invalid_ticker_notice() {
        let (cmd, _market, outbound) = command(Vec::new());

        cmd.handle(&invocation("zzzz")).await.unwrap();

        assert!(outbound.uploads.lock().unwrap().is_empty());

        let texts = outbound.texts.lock().unwrap();
        assert_eq!(
            texts.as_slice(),
            ["Invalid ticker \"ZZZZ\"\nRequested by monke with the command `/monke-quote zzzz`"
                .to_string()]
        );
    }

    #[tokio::test]
    async fn single_bar_uploads_with_ohlc_only_caption() {
        let (cmd, _market, outbound) = command(vec![bar(21, 10.0, 12.0, 9.0, 11.0)]);

        cmd.handle(&invocation("SOXL")).await.unwrap();

        assert!(outbound.texts.lock().unwrap().is_empty());

        let uploads = outbound.uploads.lock().unwrap();
        assert_eq!(uploads.len(), 1);
        assert_eq!(
            uploads[0].1,
            "[SOXL Quote 2026-08-21] Open=10.00 High=12.00 Low=9.00 Close=11.00\n\
             Requested by monke with the command `/monke-quote SOXL`"
        );
    }

    #[tokio::test]
    async fn multi_bar_caption_carries_both_percent_changes() {
        // last close 99 vs. prev 110 = -10.00%, vs. window start 100 = -1.00%
        let bars = vec![
            bar(19, 99.0, 101.0, 98.0, 100.0),
            bar(20, 100.0, 111.0, 99.0, 110.0),
            bar(21, 110.0, 112.0, 98.0, 99.0),
        ];
        let (cmd, _market, outbound) = command(bars);

        cmd.handle(&invocation("SOXL")).await.unwrap();

        let uploads = outbound.uploads.lock().unwrap();
        assert_eq!(uploads.len(), 1);
        assert!(
            uploads[0]
                .1
                .contains("%Chg Prev. Day=-10.00% | %Chg Time Frame=-1.00%"),
            "caption was {:?}",
            uploads[0].1
        );
    }

    #[tokio::test]
    async fn market_failure_propagates_without_any_outbound() {
        let outbound = Arc::new(RecordingOutbound::default());
        let cmd = QuoteCommand::new(
            Arc::new(FailingMarket),
            Arc::new(FakeChart),
            outbound.clone(),
        );

        let err = cmd.handle(&invocation("SOXL")).await.unwrap_err();
        assert!(err.to_string().contains("data api unreachable"));

        assert!(outbound.texts.lock().unwrap().is_empty());
        assert!(outbound.uploads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unrecognized_command_posts_fixed_reply() {
        let (cmd, market, outbound) = command(Vec::new());

        let mut inv = invocation("SOXL");
        inv.command = "monke-price".to_string();
        cmd.handle(&inv).await.unwrap();

        assert!(market.calls.lock().unwrap().is_empty());
        assert_eq!(
            outbound.texts.lock().unwrap().as_slice(),
            ["Invalid command /monke-price".to_string()]
        );
    }

    #[tokio::test]
    async fn identical_invocations_produce_identical_text() {
        let (cmd, _market, outbound) = command(Vec::new());

        cmd.handle(&invocation("zzzz")).await.unwrap();
        cmd.handle(&invocation("zzzz")).await.unwrap();

        let texts = outbound.texts.lock().unwrap();
        assert_eq!(texts.len(), 2);
        assert_eq!(texts[0], texts[1]);
    }
}
