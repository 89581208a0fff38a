//! Request-level facade: date handling, observation resolution,
//! enrichment, dispatch, and response shaping.

use serde::Serialize;
use thiserror::Error;
use time::Date;

use crate::domain::{
    format_calendar_date, parse_calendar_date, today_utc, ObservationOverrides,
};
use crate::estimator::PredictionDispatcher;
use crate::features::{enrich, FeatureFrame, PipelineError};
use crate::fetch::{
    ObservationFetcher, MAX_SUPPLY, SYNTHETIC_CIRCULATING_SUPPLY,
};
use crate::sources::SourceError;
use crate::ValidationError;

/// Request-level error taxonomy.
///
/// `InvalidInput` is the caller's fault and never reaches the
/// pipeline. `Prediction` means the fallback transformation chain
/// itself broke, which is an internal bug. `Upstream` is only produced
/// by the snapshot path, where a dead feed has no fallback.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] ValidationError),

    #[error("prediction failed: {0}")]
    Prediction(#[from] PipelineError),

    #[error("upstream data unavailable: {0}")]
    Upstream(#[from] SourceError),
}

impl ServiceError {
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}

/// Response body for a prediction request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PredictionReport {
    pub input_date: String,
    pub prediction: PredictionBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PredictionBody {
    pub prediction_day_date: String,
    /// Two-decimal presentation of the predicted high.
    pub predicted_high: String,
}

/// Response body for the current-market endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentSnapshot {
    pub current_price: f64,
    pub open_24h: f64,
    pub high_24h: f64,
    pub low_24h: f64,
    pub vwap_24h: f64,
    pub price_change_24h: f64,
    pub price_change_percentage_24h: f64,
    pub market_cap: f64,
    pub total_volume: f64,
    pub circulating_supply: f64,
    pub max_supply: f64,
    pub last_updated: String,
    pub data_source: &'static str,
}

/// One constructed-at-startup service instance per process. Holds no
/// request-mutable state; concurrent requests share it freely.
pub struct PredictionService {
    fetcher: ObservationFetcher,
    dispatcher: PredictionDispatcher,
}

impl PredictionService {
    pub fn new(fetcher: ObservationFetcher, dispatcher: PredictionDispatcher) -> Self {
        Self { fetcher, dispatcher }
    }

    /// Predict the next day's high for `date` (default: today, UTC).
    pub async fn predict(
        &self,
        date: Option<&str>,
        overrides: &ObservationOverrides,
    ) -> Result<PredictionReport, ServiceError> {
        let target_date = match date {
            Some(raw) => parse_calendar_date(raw)?,
            None => today_utc(),
        };
        let prediction_day = next_day(target_date)?;

        let observation = self.fetcher.resolve(target_date, overrides).await?;
        let mut frame = FeatureFrame::from_observations(&[observation]);
        enrich(&mut frame)?;

        let predicted_high = self.dispatcher.dispatch(&frame)?;

        Ok(PredictionReport {
            input_date: format_calendar_date(target_date),
            prediction: PredictionBody {
                prediction_day_date: format_calendar_date(prediction_day),
                predicted_high: format!("{predicted_high:.2}"),
            },
        })
    }

    /// Latest market snapshot straight from the OHLCV feed. Upstream
    /// failure surfaces here; this path has no synthetic fallback.
    pub async fn current_snapshot(&self) -> Result<CurrentSnapshot, ServiceError> {
        let candles = self.fetcher.latest_candles().await?;
        let latest = candles.last().ok_or_else(|| {
            SourceError::malformed(
                crate::sources::SourceId::Kraken,
                "no candles in the last 24h window",
            )
        })?;

        let (change, change_pct) = match candles.len() {
            0 | 1 => (0.0, 0.0),
            n => {
                let previous_close = candles[n - 2].close;
                let change = latest.close - previous_close;
                (change, change / previous_close * 100.0)
            }
        };

        Ok(CurrentSnapshot {
            current_price: latest.close,
            open_24h: latest.open,
            high_24h: latest.high,
            low_24h: latest.low,
            vwap_24h: latest.vwap,
            price_change_24h: change,
            price_change_percentage_24h: change_pct,
            market_cap: latest.close * SYNTHETIC_CIRCULATING_SUPPLY,
            total_volume: latest.volume,
            circulating_supply: SYNTHETIC_CIRCULATING_SUPPLY,
            max_supply: MAX_SUPPLY,
            last_updated: latest.ts.format_rfc3339(),
            data_source: "kraken",
        })
    }
}

fn next_day(date: Date) -> Result<Date, ValidationError> {
    date.next_day().ok_or_else(|| ValidationError::DateOutOfRange {
        value: format_calendar_date(date),
    })
}
