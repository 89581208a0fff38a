//! Upstream data source contracts and adapters.
//!
//! Two independent feeds supply one day's observation: a daily OHLCV
//! candle (Kraken) and a USD market capitalization (CoinGecko). Each
//! adapter owns its transport, parses its provider payload into the
//! canonical types here, and maps every failure into a [`SourceError`]
//! the fetcher can degrade on.

mod coingecko;
mod kraken;

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use time::Date;

use crate::UtcDateTime;

pub use coingecko::CoinGeckoSource;
pub use kraken::KrakenSource;

/// Fixed upstream request timeout. A timeout degrades exactly like any
/// other fetch failure.
pub const FETCH_TIMEOUT_MS: u64 = 15_000;

/// Identifies which upstream a value or error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceId {
    Kraken,
    CoinGecko,
}

impl SourceId {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Kraken => "kraken",
            Self::CoinGecko => "coingecko",
        }
    }
}

impl Display for SourceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upstream error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    /// Transport failure, timeout, or non-success status.
    Unavailable,
    /// Provider throttled the request; treated as no data.
    RateLimited,
    /// Response arrived but did not carry the expected payload.
    Malformed,
}

/// Structured upstream error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    source_id: SourceId,
    kind: SourceErrorKind,
    message: String,
}

impl SourceError {
    pub fn unavailable(source_id: SourceId, message: impl Into<String>) -> Self {
        Self {
            source_id,
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
        }
    }

    pub fn rate_limited(source_id: SourceId, message: impl Into<String>) -> Self {
        Self {
            source_id,
            kind: SourceErrorKind::RateLimited,
            message: message.into(),
        }
    }

    pub fn malformed(source_id: SourceId, message: impl Into<String>) -> Self {
        Self {
            source_id,
            kind: SourceErrorKind::Malformed,
            message: message.into(),
        }
    }

    pub const fn source_id(&self) -> SourceId {
        self.source_id
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.source_id, self.message)
    }
}

impl std::error::Error for SourceError {}

/// One completed daily candle as reported by the OHLCV feed.
///
/// The candle timestamp may differ slightly from the requested date;
/// it is authoritative for the observation's day-open time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyCandle {
    pub ts: UtcDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub vwap: f64,
    pub volume: f64,
}

/// Daily OHLCV candle feed.
pub trait OhlcvSource: Send + Sync {
    fn id(&self) -> SourceId;

    /// Completed daily candles at or after `since`, most recent last.
    /// An empty vector means the provider had no data for the window.
    fn daily_candles<'a>(
        &'a self,
        since: UtcDateTime,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<DailyCandle>, SourceError>> + Send + 'a>>;
}

/// USD market capitalization feed, keyed by calendar date.
pub trait MarketCapSource: Send + Sync {
    fn id(&self) -> SourceId;

    fn market_cap<'a>(
        &'a self,
        date: Date,
    ) -> Pin<Box<dyn Future<Output = Result<f64, SourceError>> + Send + 'a>>;
}
