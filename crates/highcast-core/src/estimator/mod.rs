//! Trained estimator artifact: format, startup loading, and the
//! trained pipeline that runs it.
//!
//! The artifact is a JSON file naming its transform steps by the ids
//! in [`TransformRegistry`] and carrying a linear head over the final
//! feature schema. Loading happens once at startup and never fails the
//! process: any unusable artifact just leaves the trained slot empty
//! and every request takes the fallback path.

mod dispatcher;

use std::path::Path;
use std::sync::Arc;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::features::{FeatureFrame, PipelineError, Transform, TransformRegistry, FINAL_FEATURES};

pub use dispatcher::{PredictionDispatcher, FALLBACK_BAND_MAX, FALLBACK_BAND_MIN};

/// Fixed relative path the loader reads at startup.
pub const ARTIFACT_PATH: &str = "models/btc_high_pipeline.json";

/// Prediction-time errors from an estimator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PredictError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("feature row has {got} values, model expects {expected}")]
    ArityMismatch { expected: usize, got: usize },
}

/// A black-box callable over the final feature schema, yielding one
/// scalar prediction.
pub trait Estimator: Send + Sync {
    fn predict(&self, frame: &FeatureFrame) -> Result<f64, PredictError>;
}

/// Serialized pipeline artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineArtifact {
    pub schema_version: String,
    /// Transform step ids, applied in order before the model head.
    pub steps: Vec<String>,
    pub model: LinearModel,
}

/// Linear head over the final feature schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub weights: Vec<f64>,
    pub intercept: f64,
}

/// Artifact load failures. All of them degrade to fallback mode; none
/// are fatal to startup.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact not found at '{path}'")]
    NotFound { path: String },

    #[error("failed to read artifact: {0}")]
    Io(#[from] std::io::Error),

    #[error("artifact is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("artifact references unknown transform '{id}'")]
    UnknownTransform { id: String },

    #[error("model carries {got} weights, final feature schema has {expected}")]
    WeightArity { expected: usize, got: usize },
}

/// The loaded artifact: resolved transform steps plus the linear head.
#[derive(Debug)]
pub struct TrainedPipeline {
    steps: Vec<(String, Transform)>,
    model: LinearModel,
}

impl TrainedPipeline {
    /// Resolve an artifact's step ids against the registry and
    /// validate the model head against the final feature schema.
    pub fn from_artifact(
        artifact: PipelineArtifact,
        registry: &TransformRegistry,
    ) -> Result<Self, ArtifactError> {
        let mut steps = Vec::with_capacity(artifact.steps.len());
        for id in artifact.steps {
            let transform = registry
                .get(&id)
                .ok_or_else(|| ArtifactError::UnknownTransform { id: id.clone() })?;
            steps.push((id, transform));
        }

        if artifact.model.weights.len() != FINAL_FEATURES.len() {
            return Err(ArtifactError::WeightArity {
                expected: FINAL_FEATURES.len(),
                got: artifact.model.weights.len(),
            });
        }

        Ok(Self {
            steps,
            model: artifact.model,
        })
    }
}

impl Estimator for TrainedPipeline {
    fn predict(&self, frame: &FeatureFrame) -> Result<f64, PredictError> {
        let mut frame = frame.clone();
        for (_, step) in &self.steps {
            step(&mut frame)?;
        }

        // First scalar of the batch is the prediction.
        let row = frame.row(0)?;
        if row.len() != self.model.weights.len() {
            return Err(PredictError::ArityMismatch {
                expected: self.model.weights.len(),
                got: row.len(),
            });
        }

        let dot: f64 = row
            .iter()
            .zip(&self.model.weights)
            .map(|(x, w)| x * w)
            .sum();
        Ok(dot + self.model.intercept)
    }
}

/// Load and validate the artifact at `path`.
pub fn load_artifact(
    path: &Path,
    registry: &TransformRegistry,
) -> Result<TrainedPipeline, ArtifactError> {
    if !path.exists() {
        return Err(ArtifactError::NotFound {
            path: path.display().to_string(),
        });
    }

    let raw = std::fs::read_to_string(path)?;
    let artifact: PipelineArtifact = serde_json::from_str(&raw)?;
    TrainedPipeline::from_artifact(artifact, registry)
}

/// Startup entry point: loads the artifact, logging the outcome, and
/// hands back the trained slot. `None` means every prediction will use
/// the fallback path.
pub fn load_startup_estimator(
    path: &Path,
    registry: &TransformRegistry,
) -> Option<Arc<dyn Estimator>> {
    match load_artifact(path, registry) {
        Ok(pipeline) => {
            info!("loaded trained pipeline from {}", path.display());
            Some(Arc::new(pipeline))
        }
        Err(error) => {
            warn!(
                "trained pipeline unusable ({error}); serving fallback predictions"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Observation, UtcDateTime};
    use crate::features::{enrich, MANUAL_CHAIN};
    use std::io::Write;

    fn artifact_json(weights: usize, steps: &[&str]) -> String {
        let artifact = PipelineArtifact {
            schema_version: "v1.0.0".to_owned(),
            steps: steps.iter().map(|s| (*s).to_owned()).collect(),
            model: LinearModel {
                weights: vec![0.0; weights],
                intercept: 34_500.0,
            },
        };
        serde_json::to_string(&artifact).expect("serializable artifact")
    }

    fn write_artifact(dir: &tempfile::TempDir, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join("pipeline.json");
        let mut file = std::fs::File::create(&path).expect("create artifact");
        file.write_all(contents.as_bytes()).expect("write artifact");
        path
    }

    fn enriched_single_row_frame() -> FeatureFrame {
        let observation = Observation::new(
            UtcDateTime::parse("2023-01-01T00:00:00Z").expect("timestamp"),
            30_000.0,
            32_000.0,
            29_000.0,
            31_000.0,
            20_000_000.0,
            600_000_000_000.0,
        )
        .expect("observation");
        let mut frame = FeatureFrame::from_observations(&[observation]);
        enrich(&mut frame).expect("enrichment");
        frame
    }

    #[test]
    fn valid_artifact_loads_and_predicts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_artifact(&dir, &artifact_json(11, &MANUAL_CHAIN));

        let registry = TransformRegistry::with_builtins();
        let pipeline = load_artifact(&path, &registry).expect("artifact loads");

        // All-zero weights leave only the intercept.
        let prediction = pipeline
            .predict(&enriched_single_row_frame())
            .expect("prediction");
        assert_eq!(prediction, 34_500.0);
    }

    #[test]
    fn missing_artifact_reports_not_found() {
        let registry = TransformRegistry::with_builtins();
        let err = load_artifact(Path::new("models/does_not_exist.json"), &registry)
            .expect_err("must fail");
        assert!(matches!(err, ArtifactError::NotFound { .. }));
    }

    #[test]
    fn unknown_step_id_fails_the_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_artifact(&dir, &artifact_json(11, &["circulating_supply", "pca_reduce"]));

        let registry = TransformRegistry::with_builtins();
        let err = load_artifact(&path, &registry).expect_err("must fail");
        assert!(
            matches!(err, ArtifactError::UnknownTransform { ref id } if id == "pca_reduce")
        );
    }

    #[test]
    fn wrong_weight_arity_fails_the_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_artifact(&dir, &artifact_json(3, &MANUAL_CHAIN));

        let registry = TransformRegistry::with_builtins();
        let err = load_artifact(&path, &registry).expect_err("must fail");
        assert!(matches!(
            err,
            ArtifactError::WeightArity { expected: 11, got: 3 }
        ));
    }

    #[test]
    fn malformed_json_fails_the_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_artifact(&dir, "{not json");

        let registry = TransformRegistry::with_builtins();
        let err = load_artifact(&path, &registry).expect_err("must fail");
        assert!(matches!(err, ArtifactError::Parse(_)));
    }

    #[test]
    fn startup_loader_degrades_instead_of_failing() {
        let registry = TransformRegistry::with_builtins();
        let loaded = load_startup_estimator(Path::new("models/does_not_exist.json"), &registry);
        assert!(loaded.is_none());
    }
}
