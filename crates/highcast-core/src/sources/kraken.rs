use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;

use crate::http_client::{HttpClient, HttpRequest};
use crate::sources::{DailyCandle, OhlcvSource, SourceError, SourceId, FETCH_TIMEOUT_MS};
use crate::UtcDateTime;

const OHLC_ENDPOINT: &str = "https://api.kraken.com/0/public/OHLC";
const PAIR: &str = "XXBTZUSD";
const DAILY_INTERVAL_MINUTES: u32 = 1440;

/// Kraken public OHLC adapter for the BTC/USD daily candle.
pub struct KrakenSource {
    http_client: Arc<dyn HttpClient>,
}

/// Kraken OHLC row: `[time, open, high, low, close, vwap, volume, count]`
/// with prices encoded as strings.
#[derive(Debug, Deserialize)]
struct KrakenRow(
    i64,
    String,
    String,
    String,
    String,
    String,
    String,
    #[allow(dead_code)] i64,
);

#[derive(Debug, Deserialize)]
struct KrakenEnvelope {
    #[serde(default)]
    error: Vec<String>,
    #[serde(default)]
    result: Option<KrakenResult>,
}

#[derive(Debug, Deserialize)]
struct KrakenResult {
    #[serde(rename = "XXBTZUSD", default)]
    rows: Vec<KrakenRow>,
}

impl KrakenSource {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self { http_client }
    }

    fn parse_price(&self, field: &'static str, value: &str) -> Result<f64, SourceError> {
        value.parse::<f64>().map_err(|_| {
            SourceError::malformed(
                SourceId::Kraken,
                format!("candle field '{field}' is not numeric: '{value}'"),
            )
        })
    }

    fn parse_body(&self, body: &str) -> Result<Vec<DailyCandle>, SourceError> {
        let envelope: KrakenEnvelope = serde_json::from_str(body).map_err(|e| {
            SourceError::malformed(SourceId::Kraken, format!("invalid OHLC payload: {e}"))
        })?;

        if !envelope.error.is_empty() {
            return Err(SourceError::unavailable(
                SourceId::Kraken,
                format!("API error: {}", envelope.error.join("; ")),
            ));
        }

        let rows = envelope
            .result
            .ok_or_else(|| {
                SourceError::malformed(SourceId::Kraken, "OHLC payload has no result")
            })?
            .rows;

        rows.iter()
            .map(|row| {
                let ts = UtcDateTime::from_unix(row.0).map_err(|_| {
                    SourceError::malformed(
                        SourceId::Kraken,
                        format!("candle timestamp {} out of range", row.0),
                    )
                })?;

                Ok(DailyCandle {
                    ts,
                    open: self.parse_price("open", &row.1)?,
                    high: self.parse_price("high", &row.2)?,
                    low: self.parse_price("low", &row.3)?,
                    close: self.parse_price("close", &row.4)?,
                    vwap: self.parse_price("vwap", &row.5)?,
                    volume: self.parse_price("volume", &row.6)?,
                })
            })
            .collect()
    }
}

impl OhlcvSource for KrakenSource {
    fn id(&self) -> SourceId {
        SourceId::Kraken
    }

    fn daily_candles<'a>(
        &'a self,
        since: UtcDateTime,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<DailyCandle>, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            let url = format!(
                "{OHLC_ENDPOINT}?pair={PAIR}&interval={DAILY_INTERVAL_MINUTES}&since={}",
                since.unix_timestamp()
            );
            let request = HttpRequest::get(url).with_timeout_ms(FETCH_TIMEOUT_MS);

            let response = self.http_client.execute(request).await.map_err(|e| {
                SourceError::unavailable(
                    SourceId::Kraken,
                    format!("transport error: {}", e.message()),
                )
            })?;

            if !response.is_success() {
                return Err(SourceError::unavailable(
                    SourceId::Kraken,
                    format!("upstream returned status {}", response.status),
                ));
            }

            self.parse_body(&response.body)
        })
    }
}
