use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::Date;

use crate::http_client::{HttpClient, HttpRequest};
use crate::sources::{MarketCapSource, SourceError, SourceId, FETCH_TIMEOUT_MS};

const HISTORY_ENDPOINT: &str = "https://api.coingecko.com/api/v3/coins/bitcoin/history";

// CoinGecko's history endpoint takes day-month-year, unlike the
// year-month-day convention everywhere else in this crate.
const HISTORY_DATE: &[BorrowedFormatItem<'static>] = format_description!("[day]-[month]-[year]");

/// CoinGecko adapter for historical USD market capitalization.
pub struct CoinGeckoSource {
    http_client: Arc<dyn HttpClient>,
}

#[derive(Debug, Deserialize)]
struct HistoryEnvelope {
    #[serde(default)]
    market_data: Option<MarketData>,
}

#[derive(Debug, Deserialize)]
struct MarketData {
    #[serde(default)]
    market_cap: Option<QuoteCurrencies>,
}

#[derive(Debug, Deserialize)]
struct QuoteCurrencies {
    #[serde(default)]
    usd: Option<f64>,
}

impl CoinGeckoSource {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self { http_client }
    }

    fn parse_body(&self, body: &str) -> Result<f64, SourceError> {
        let envelope: HistoryEnvelope = serde_json::from_str(body).map_err(|e| {
            SourceError::malformed(SourceId::CoinGecko, format!("invalid history payload: {e}"))
        })?;

        envelope
            .market_data
            .and_then(|data| data.market_cap)
            .and_then(|cap| cap.usd)
            .ok_or_else(|| {
                SourceError::malformed(
                    SourceId::CoinGecko,
                    "market_data.market_cap.usd missing from history payload",
                )
            })
    }
}

impl MarketCapSource for CoinGeckoSource {
    fn id(&self) -> SourceId {
        SourceId::CoinGecko
    }

    fn market_cap<'a>(
        &'a self,
        date: Date,
    ) -> Pin<Box<dyn Future<Output = Result<f64, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            let formatted = date.format(HISTORY_DATE).map_err(|e| {
                SourceError::malformed(SourceId::CoinGecko, format!("unformattable date: {e}"))
            })?;
            let request = HttpRequest::get(format!("{HISTORY_ENDPOINT}?date={formatted}"))
                .with_timeout_ms(FETCH_TIMEOUT_MS);

            let response = self.http_client.execute(request).await.map_err(|e| {
                SourceError::unavailable(
                    SourceId::CoinGecko,
                    format!("transport error: {}", e.message()),
                )
            })?;

            if response.status == 429 {
                return Err(SourceError::rate_limited(
                    SourceId::CoinGecko,
                    "history endpoint throttled the request",
                ));
            }

            if !response.is_success() {
                return Err(SourceError::unavailable(
                    SourceId::CoinGecko,
                    format!("upstream returned status {}", response.status),
                ));
            }

            self.parse_body(&response.body)
        })
    }
}
