//! Observation resolution: merge caller overrides, upstream fetches,
//! and synthetic estimates into one complete [`Observation`].
//!
//! The substitution policy is held as data (an ordered chain of named
//! candidates per field) rather than nested conditionals, so each
//! field's precedence can be tested on its own.

use std::sync::Arc;

use log::{debug, warn};
use time::Date;

use crate::domain::{format_calendar_date, today_utc, Observation, ObservationOverrides, UtcDateTime};
use crate::sources::{DailyCandle, MarketCapSource, OhlcvSource};
use crate::ValidationError;

/// Synthetic close used when the OHLCV feed yields nothing.
pub const SYNTHETIC_CLOSE_USD: f64 = 67_000.0;
/// Synthetic volume used when the OHLCV feed yields nothing.
pub const SYNTHETIC_VOLUME: f64 = 25_000.0;
/// Supply estimate used when the market-cap feed yields nothing:
/// `market_cap ≈ close × supply`.
pub const SYNTHETIC_CIRCULATING_SUPPLY: f64 = 19_700_000.0;
/// Protocol-defined hard cap on units, reported by the current snapshot.
pub const MAX_SUPPLY: f64 = 21_000_000.0;

/// Fixed offsets applied to [`SYNTHETIC_CLOSE_USD`] for the remaining
/// synthetic prices.
pub const SYNTHETIC_OPEN_RATIO: f64 = 0.999;
pub const SYNTHETIC_HIGH_RATIO: f64 = 1.015;
pub const SYNTHETIC_LOW_RATIO: f64 = 0.985;

/// Where a resolved field value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOrigin {
    Caller,
    Fetched,
    Synthetic,
}

impl FieldOrigin {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Caller => "caller",
            Self::Fetched => "fetched",
            Self::Synthetic => "synthetic",
        }
    }
}

/// Ordered fallback chain for a single observation field.
///
/// Candidates are tried front to back; the chain always terminates in
/// a synthetic value, so resolution cannot fail.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFallback {
    field: &'static str,
    candidates: Vec<(FieldOrigin, Option<f64>)>,
    synthetic: f64,
}

impl FieldFallback {
    pub fn new(
        field: &'static str,
        caller: Option<f64>,
        fetched: Option<f64>,
        synthetic: f64,
    ) -> Self {
        Self {
            field,
            candidates: vec![(FieldOrigin::Caller, caller), (FieldOrigin::Fetched, fetched)],
            synthetic,
        }
    }

    pub fn resolve(&self) -> (f64, FieldOrigin) {
        for (origin, candidate) in &self.candidates {
            if let Some(value) = candidate {
                debug!("field '{}' resolved from {}", self.field, origin.as_str());
                return (*value, *origin);
            }
        }

        warn!(
            "field '{}' unavailable from caller and upstream, substituting synthetic value {}",
            self.field, self.synthetic
        );
        (self.synthetic, FieldOrigin::Synthetic)
    }
}

/// Resolves one day's complete observation from caller overrides and
/// the two upstream feeds.
pub struct ObservationFetcher {
    ohlcv: Arc<dyn OhlcvSource>,
    market_cap: Arc<dyn MarketCapSource>,
}

impl ObservationFetcher {
    pub fn new(ohlcv: Arc<dyn OhlcvSource>, market_cap: Arc<dyn MarketCapSource>) -> Self {
        Self { ohlcv, market_cap }
    }

    /// Resolve a complete observation for `target_date`.
    ///
    /// Upstream feeds are consulted only when the date is today or in
    /// the future, or when any override is missing. Caller values win
    /// over fetched values per field; fetched win over synthetic.
    pub async fn resolve(
        &self,
        target_date: Date,
        overrides: &ObservationOverrides,
    ) -> Result<Observation, ValidationError> {
        let needs_fetch = target_date >= today_utc() || !overrides.is_complete();

        let (candle, fetched_cap) = if needs_fetch {
            (
                self.fetch_candle(target_date).await,
                self.fetch_market_cap(target_date).await,
            )
        } else {
            (None, None)
        };

        // A fetched candle's own timestamp is authoritative for the
        // day-open time; otherwise the requested date's midnight is used.
        let time_open = candle
            .as_ref()
            .map(|c| c.ts)
            .unwrap_or_else(|| UtcDateTime::start_of_day(target_date));

        let (close, _) = FieldFallback::new(
            "close",
            overrides.close,
            candle.as_ref().map(|c| c.close),
            SYNTHETIC_CLOSE_USD,
        )
        .resolve();
        let (open, _) = FieldFallback::new(
            "open",
            overrides.open,
            candle.as_ref().map(|c| c.open),
            SYNTHETIC_CLOSE_USD * SYNTHETIC_OPEN_RATIO,
        )
        .resolve();
        let (high, _) = FieldFallback::new(
            "high",
            overrides.high,
            candle.as_ref().map(|c| c.high),
            SYNTHETIC_CLOSE_USD * SYNTHETIC_HIGH_RATIO,
        )
        .resolve();
        let (low, _) = FieldFallback::new(
            "low",
            overrides.low,
            candle.as_ref().map(|c| c.low),
            SYNTHETIC_CLOSE_USD * SYNTHETIC_LOW_RATIO,
        )
        .resolve();
        let (volume, _) = FieldFallback::new(
            "volume",
            overrides.volume,
            candle.as_ref().map(|c| c.volume),
            SYNTHETIC_VOLUME,
        )
        .resolve();

        // The market-cap estimate leans on the already-resolved close.
        let (market_cap, _) = FieldFallback::new(
            "market_cap",
            overrides.market_cap,
            fetched_cap,
            close * SYNTHETIC_CIRCULATING_SUPPLY,
        )
        .resolve();

        Observation::new(time_open, open, high, low, close, volume, market_cap)
    }

    /// Most recent completed daily candle as of `target_date`, or
    /// `None` when the feed fails or has no data. Failures degrade,
    /// never propagate.
    async fn fetch_candle(&self, target_date: Date) -> Option<DailyCandle> {
        let since = UtcDateTime::start_of_day(target_date);
        match self.ohlcv.daily_candles(since).await {
            Ok(candles) => {
                let latest = candles.last().copied();
                if latest.is_none() {
                    warn!(
                        "{} returned no candles for {}",
                        self.ohlcv.id(),
                        format_calendar_date(target_date)
                    );
                }
                latest
            }
            Err(error) => {
                warn!(
                    "{} candle fetch failed for {}: {}",
                    self.ohlcv.id(),
                    format_calendar_date(target_date),
                    error.message()
                );
                None
            }
        }
    }

    async fn fetch_market_cap(&self, target_date: Date) -> Option<f64> {
        match self.market_cap.market_cap(target_date).await {
            Ok(cap) => Some(cap),
            Err(error) => {
                warn!(
                    "{} market cap fetch failed for {}: {}",
                    self.market_cap.id(),
                    format_calendar_date(target_date),
                    error.message()
                );
                None
            }
        }
    }

    /// Latest candles for the current-snapshot endpoint. Unlike
    /// [`resolve`](Self::resolve), upstream failure here surfaces to
    /// the caller.
    pub async fn latest_candles(&self) -> Result<Vec<DailyCandle>, crate::sources::SourceError> {
        let since = UtcDateTime::now().minus(time::Duration::days(1));
        self.ohlcv.daily_candles(since).await
    }
}
