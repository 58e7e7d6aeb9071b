use anyhow::{Error, Result};
use chrono::{DateTime, Utc};
use reqwest::{
    Client, StatusCode,
    header::{HeaderMap, HeaderValue},
};
use serde::Deserialize;
use tracing::debug;

use crate::Lookback;

const DATA_API_BASE: &str = "https://data.alpaca.markets";
const BAR_LIMIT: usize = 10_000;

#[derive(Clone)]
pub struct PriceClient {
    client: Client,
    base_api: String,
}

impl PriceClient {
    pub fn new(key_id: &str, secret: &str) -> Result<Self> {
        Self::with_base_api(DATA_API_BASE, key_id, secret)
    }

    pub fn with_base_api(base_api: &str, key_id: &str, secret: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert("APCA-API-KEY-ID", HeaderValue::from_str(key_id)?);
        headers.insert("APCA-API-SECRET-KEY", HeaderValue::from_str(secret)?);

        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            base_api: base_api.to_string(),
        })
    }

    /// Fetch daily bars for `symbol` over the trailing window named by
    /// `duration` (e.g. `"30d"`). An unrecognized symbol yields an empty
    /// vector rather than an error.
    pub async fn fetch_daily(&self, symbol: &str, duration: &str) -> Result<Vec<Bar>, Error> {
        let lookback: Lookback = duration.parse()?;

        let end = Utc::now();
        let start = end - lookback.duration();

        let url = format!(
            "{}/v2/stocks/{}/bars",
            self.base_api.trim_end_matches('/'),
            symbol
        );

        let res = self
            .client
            .get(url)
            .query(&[
                ("feed", "iex"),
                ("timeframe", "1Day"),
                ("start", &start.to_rfc3339()),
                ("end", &end.to_rfc3339()),
                ("limit", &BAR_LIMIT.to_string()),
            ])
            .send()
            .await?;

        // The data API answers an unknown symbol with a client error, not
        // an empty series. Fold those into the no-bars case.
        if matches!(
            res.status(),
            StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY
        ) {
            debug!(symbol, status = %res.status(), "symbol lookup rejected");
            return Ok(Vec::new());
        }

        let res: BarsResponse = res.error_for_status()?.json().await?;
        Ok(res.bars.unwrap_or_default())
    }
}

//
// Match Alpaca API JSON
// https://docs.alpaca.markets/reference/stockbars
//
#[derive(Debug, Deserialize, Clone)]
pub struct BarsResponse {
    // null, not [], when the window holds no trading days
    #[serde(default)]
    pub bars: Option<Vec<Bar>>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Bar {
    #[serde(rename = "t")]
    pub timestamp: DateTime<Utc>,

    #[serde(rename = "o")]
    pub open: f64,

    #[serde(rename = "h")]
    pub high: f64,

    #[serde(rename = "l")]
    pub low: f64,

    #[serde(rename = "c")]
    pub close: f64,

    #[serde(rename = "v")]
    pub volume: i64,
}
