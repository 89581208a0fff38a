//! Deterministic feature derivation: the ordered transform steps that
//! turn raw observations into the estimator's input schema.

mod frame;
mod transforms;

pub use frame::{FeatureFrame, PipelineError};
pub use transforms::{
    circulating_supply, cyclical_day_of_week, ema_12d, enrich, log_transform, normalize,
    select_final, velocity, Transform, TransformRegistry, EMA_SPAN_DAYS, FINAL_FEATURES,
    MANUAL_CHAIN, TARGET_COLUMN,
};
