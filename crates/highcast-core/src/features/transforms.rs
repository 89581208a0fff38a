//! The fitted transformation steps, the additive enrichment pass, and
//! the registry the artifact loader resolves step ids against.
//!
//! Step order is part of the trained artifact's contract. The two
//! documented quirks are intentional and must not be "fixed":
//! `high_log` is selected but never standard-scored, and a single-row
//! batch standardizes to all zeros because the scaler is fitted per
//! call.

use std::collections::BTreeMap;
use std::f64::consts::PI;

use crate::features::frame::{FeatureFrame, PipelineError};

/// Exact ordered input schema of the trained estimator.
pub const FINAL_FEATURES: [&str; 11] = [
    "circulating_supply",
    "open_log",
    "high_log",
    "low_log",
    "close_log",
    "volume_log",
    "market_cap_log",
    "velocity_log",
    "ema_12d_log",
    "day_of_week_sin",
    "day_of_week_cos",
];

/// Training-time label column, preserved by final selection if present.
pub const TARGET_COLUMN: &str = "target_next_day_high";

/// EMA smoothing span in days; α = 2/(span+1).
pub const EMA_SPAN_DAYS: f64 = 12.0;

const LOG_FIELDS: [&str; 8] = [
    "open",
    "high",
    "low",
    "close",
    "volume",
    "market_cap",
    "velocity",
    "ema_12d",
];

// high_log is deliberately absent here.
const SCALED_FEATURES: [&str; 8] = [
    "open_log",
    "low_log",
    "close_log",
    "volume_log",
    "market_cap_log",
    "circulating_supply",
    "velocity_log",
    "ema_12d_log",
];

pub type Transform = fn(&mut FeatureFrame) -> Result<(), PipelineError>;

/// `circulating_supply = market_cap / close`.
pub fn circulating_supply(frame: &mut FeatureFrame) -> Result<(), PipelineError> {
    let market_cap = frame.require_column("market_cap")?;
    let close = frame.require_column("close")?;
    let values: Vec<f64> = market_cap
        .iter()
        .zip(close)
        .map(|(cap, close)| cap / close)
        .collect();
    frame.set_column("circulating_supply", values)
}

/// `velocity = close × circulating_supply`, degrading to `close` alone
/// when the supply column is absent.
pub fn velocity(frame: &mut FeatureFrame) -> Result<(), PipelineError> {
    let close = frame.require_column("close")?;
    let values: Vec<f64> = match frame.column("circulating_supply") {
        Some(supply) => close.iter().zip(supply).map(|(c, s)| c * s).collect(),
        None => close.to_vec(),
    };
    frame.set_column("velocity", values)
}

/// Span-12 exponential moving average of close, no bias adjustment.
/// For a single-row frame this equals the close itself.
pub fn ema_12d(frame: &mut FeatureFrame) -> Result<(), PipelineError> {
    let close = frame.require_column("close")?;
    if close.is_empty() {
        return Err(PipelineError::EmptyFrame);
    }

    let alpha = 2.0 / (EMA_SPAN_DAYS + 1.0);
    let mut values = Vec::with_capacity(close.len());
    let mut ema = close[0];
    values.push(ema);
    for &price in &close[1..] {
        ema = alpha * price + (1.0 - alpha) * ema;
        values.push(ema);
    }
    frame.set_column("ema_12d", values)
}

/// Append `<field>_log = ln(1 + field)` for each present log field.
/// Source columns are kept untouched.
pub fn log_transform(frame: &mut FeatureFrame) -> Result<(), PipelineError> {
    for field in LOG_FIELDS {
        if let Some(values) = frame.column(field) {
            let logged: Vec<f64> = values.iter().map(|v| v.ln_1p()).collect();
            frame.set_column(&format!("{field}_log"), logged)?;
        }
    }
    Ok(())
}

/// Cyclical day-of-week encoding from the day-open timestamp
/// (Monday = 0). The intermediate integer is never materialized as a
/// column.
pub fn cyclical_day_of_week(frame: &mut FeatureFrame) -> Result<(), PipelineError> {
    let days: Vec<f64> = frame
        .time_open()
        .iter()
        .map(|ts| f64::from(ts.date().weekday().number_days_from_monday()))
        .collect();

    let sin: Vec<f64> = days.iter().map(|d| (2.0 * PI * d / 7.0).sin()).collect();
    let cos: Vec<f64> = days.iter().map(|d| (2.0 * PI * d / 7.0).cos()).collect();
    frame.set_column("day_of_week_sin", sin)?;
    frame.set_column("day_of_week_cos", cos)
}

/// Standard-score each scaled feature over the current batch.
///
/// The scaler is fitted per call; a zero-variance column divides by
/// one instead of zero, so a single-row batch comes out all zeros.
pub fn normalize(frame: &mut FeatureFrame) -> Result<(), PipelineError> {
    for feature in SCALED_FEATURES {
        let Some(values) = frame.column(feature) else {
            continue;
        };
        if values.is_empty() {
            return Err(PipelineError::EmptyFrame);
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std = variance.sqrt();
        let scale = if std == 0.0 { 1.0 } else { std };

        let scaled: Vec<f64> = values.iter().map(|v| (v - mean) / scale).collect();
        frame.set_column(feature, scaled)?;
    }
    Ok(())
}

/// Project down to the estimator's input schema, keeping the training
/// label if it is present.
pub fn select_final(frame: &mut FeatureFrame) -> Result<(), PipelineError> {
    let mut keep: Vec<&str> = FINAL_FEATURES.to_vec();
    if frame.has_column(TARGET_COLUMN) {
        keep.push(TARGET_COLUMN);
    }
    frame.select(&keep);
    Ok(())
}

/// The fitted chain in artifact order. The fallback path runs exactly
/// this sequence.
pub const MANUAL_CHAIN: [&str; 7] = [
    "circulating_supply",
    "velocity",
    "ema_12d",
    "log_transform",
    "cyclical_day_of_week",
    "normalize",
    "select_final",
];

/// Additive pre-dispatch pass, always applied regardless of which
/// estimator path runs. Keeps every original column.
pub fn enrich(frame: &mut FeatureFrame) -> Result<(), PipelineError> {
    circulating_supply(frame)?;
    velocity(frame)?;

    let volume = frame.require_column("volume")?;
    let market_cap = frame.require_column("market_cap")?;
    let ratio: Vec<f64> = volume
        .iter()
        .zip(market_cap)
        .map(|(v, cap)| v / cap)
        .collect();
    frame.set_column("volume_to_market_cap_ratio", ratio)?;

    let high = frame.require_column("high")?;
    let low = frame.require_column("low")?;
    let range: Vec<f64> = high.iter().zip(low).map(|(h, l)| h - l).collect();
    frame.set_column("price_range", range)?;

    let high = frame.require_column("high")?;
    let low = frame.require_column("low")?;
    let open = frame.require_column("open")?;
    let volatility: Vec<f64> = high
        .iter()
        .zip(low)
        .zip(open)
        .map(|((h, l), o)| (h - l) / o)
        .collect();
    frame.set_column("volatility", volatility)
}

/// Explicit mapping from stable step ids to implementations.
///
/// The artifact loader resolves the serialized pipeline's step names
/// here instead of relying on ambient symbol lookup; an id it cannot
/// resolve fails the load.
pub struct TransformRegistry {
    transforms: BTreeMap<&'static str, Transform>,
}

impl TransformRegistry {
    /// Registry holding every step the fitted chain can reference.
    pub fn with_builtins() -> Self {
        let mut transforms: BTreeMap<&'static str, Transform> = BTreeMap::new();
        transforms.insert("circulating_supply", circulating_supply);
        transforms.insert("velocity", velocity);
        transforms.insert("ema_12d", ema_12d);
        transforms.insert("log_transform", log_transform);
        transforms.insert("cyclical_day_of_week", cyclical_day_of_week);
        transforms.insert("normalize", normalize);
        transforms.insert("select_final", select_final);
        Self { transforms }
    }

    pub fn get(&self, id: &str) -> Option<Transform> {
        self.transforms.get(id).copied()
    }

    pub fn run(&self, id: &str, frame: &mut FeatureFrame) -> Result<(), PipelineError> {
        let transform = self
            .get(id)
            .ok_or_else(|| PipelineError::UnknownTransform { id: id.to_owned() })?;
        transform(frame)
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.transforms.keys().copied().collect()
    }
}

impl Default for TransformRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
