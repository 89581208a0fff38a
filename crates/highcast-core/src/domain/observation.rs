use serde::{Deserialize, Serialize};
use time::Duration;

use crate::{UtcDateTime, ValidationError};

/// One calendar day's market snapshot for the asset.
///
/// The usual candle ordering (`high >= max(open, close, low)`,
/// `low <= min(open, close, high)`) is expected but deliberately not
/// enforced: upstream feeds occasionally violate it and the pipeline
/// must keep working on such rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub time_open: UtcDateTime,
    pub time_close: UtcDateTime,
    pub time_high: UtcDateTime,
    pub time_low: UtcDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub market_cap: f64,
}

impl Observation {
    /// Build an observation from a day-open timestamp and raw fields.
    ///
    /// The close/high/low timestamps are derived at fixed offsets from
    /// `time_open`: +23h59m, +12h, and +4h respectively.
    pub fn new(
        time_open: UtcDateTime,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
        market_cap: f64,
    ) -> Result<Self, ValidationError> {
        validate_non_negative("open", open)?;
        validate_non_negative("high", high)?;
        validate_non_negative("low", low)?;
        validate_non_negative("close", close)?;
        validate_non_negative("volume", volume)?;
        validate_non_negative("market_cap", market_cap)?;

        Ok(Self {
            time_open,
            time_close: time_open.plus(Duration::hours(23) + Duration::minutes(59)),
            time_high: time_open.plus(Duration::hours(12)),
            time_low: time_open.plus(Duration::hours(4)),
            open,
            high,
            low,
            close,
            volume,
            market_cap,
        })
    }
}

/// Caller-supplied field overrides attached to a prediction request.
///
/// A `Some` value always wins over fetched and synthetic values for
/// that field.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ObservationOverrides {
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
    pub market_cap: Option<f64>,
}

impl ObservationOverrides {
    /// True when every field is supplied and no external fetch is needed
    /// for field completion.
    pub fn is_complete(&self) -> bool {
        self.open.is_some()
            && self.high.is_some()
            && self.low.is_some()
            && self.close.is_some()
            && self.volume.is_some()
            && self.market_cap.is_some()
    }
}

fn validate_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    if value < 0.0 {
        return Err(ValidationError::NegativeValue { field });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day_open() -> UtcDateTime {
        UtcDateTime::parse("2023-01-01T00:00:00Z").expect("timestamp")
    }

    #[test]
    fn derives_intraday_timestamps() {
        let obs = Observation::new(day_open(), 100.0, 110.0, 95.0, 105.0, 1_000.0, 2_000.0)
            .expect("observation");

        assert_eq!(obs.time_close.format_rfc3339(), "2023-01-01T23:59:00Z");
        assert_eq!(obs.time_high.format_rfc3339(), "2023-01-01T12:00:00Z");
        assert_eq!(obs.time_low.format_rfc3339(), "2023-01-01T04:00:00Z");
    }

    #[test]
    fn tolerates_inconsistent_candle_ordering() {
        // high < low comes straight from a degraded upstream; it must
        // still construct.
        let obs = Observation::new(day_open(), 100.0, 90.0, 95.0, 105.0, 1_000.0, 2_000.0);
        assert!(obs.is_ok());
    }

    #[test]
    fn rejects_negative_fields() {
        let err = Observation::new(day_open(), -1.0, 110.0, 95.0, 105.0, 1_000.0, 2_000.0)
            .expect_err("must fail");
        assert!(matches!(err, ValidationError::NegativeValue { field: "open" }));
    }

    #[test]
    fn overrides_completeness() {
        let mut overrides = ObservationOverrides {
            open: Some(1.0),
            high: Some(2.0),
            low: Some(3.0),
            close: Some(4.0),
            volume: Some(5.0),
            market_cap: Some(6.0),
        };
        assert!(overrides.is_complete());

        overrides.volume = None;
        assert!(!overrides.is_complete());
    }
}
