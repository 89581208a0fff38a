//! # Highcast Core
//!
//! Domain types, data fusion, and prediction dispatch for the highcast
//! next-day-high prediction service.
//!
//! ## Overview
//!
//! A prediction request carries a target date and optionally a full
//! day's OHLCV + market-cap observation. The pieces here take it the
//! rest of the way:
//!
//! - **Observation fetcher** merges caller overrides, a daily candle
//!   feed (Kraken), and a market-cap feed (CoinGecko), degrading per
//!   field to documented synthetic values.
//! - **Feature pipeline** applies a fixed, ordered set of pure
//!   transforms producing the exact column schema the trained
//!   estimator was fitted on.
//! - **Prediction dispatcher** runs the trained pipeline when one
//!   loaded at startup and otherwise (or on any estimator failure)
//!   takes a deterministic-shape fallback path.
//! - **Estimator loader** reads the serialized pipeline artifact once
//!   at startup, resolving its step ids against an explicit transform
//!   registry; an unusable artifact degrades the process to fallback
//!   mode instead of failing it.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`domain`] | Observation, overrides, and UTC timestamps |
//! | [`error`] | Input validation errors |
//! | [`estimator`] | Artifact format, loader, trained pipeline, dispatcher |
//! | [`features`] | Feature frame, transform steps, registry |
//! | [`fetch`] | Observation fetcher and per-field fallback chains |
//! | [`http_client`] | HTTP transport abstraction (reqwest + scripted test client) |
//! | [`service`] | Request facade and response shaping |
//! | [`sources`] | Upstream source traits and adapters |
//!
//! ## Error handling
//!
//! External-source failures never surface from a prediction request:
//! they degrade field by field onto synthetic values. The only server
//! faults a request can produce are an unparseable input date (the
//! caller's error) and a failure inside the manual transformation
//! chain (a bug, surfaced loudly).

pub mod domain;
pub mod error;
pub mod estimator;
pub mod features;
pub mod fetch;
pub mod http_client;
pub mod service;
pub mod sources;

pub use domain::{
    format_calendar_date, parse_calendar_date, today_utc, Observation, ObservationOverrides,
    UtcDateTime,
};
pub use error::ValidationError;
pub use estimator::{
    load_artifact, load_startup_estimator, ArtifactError, Estimator, LinearModel,
    PipelineArtifact, PredictError, PredictionDispatcher, TrainedPipeline, ARTIFACT_PATH,
    FALLBACK_BAND_MAX, FALLBACK_BAND_MIN,
};
pub use features::{
    enrich, FeatureFrame, PipelineError, TransformRegistry, FINAL_FEATURES, MANUAL_CHAIN,
    TARGET_COLUMN,
};
pub use fetch::{
    FieldFallback, FieldOrigin, ObservationFetcher, SYNTHETIC_CIRCULATING_SUPPLY,
    SYNTHETIC_CLOSE_USD, SYNTHETIC_HIGH_RATIO, SYNTHETIC_LOW_RATIO, SYNTHETIC_OPEN_RATIO,
    SYNTHETIC_VOLUME,
};
pub use http_client::{
    HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient, ScriptedHttpClient,
};
pub use service::{
    CurrentSnapshot, PredictionBody, PredictionReport, PredictionService, ServiceError,
};
pub use sources::{
    CoinGeckoSource, DailyCandle, KrakenSource, MarketCapSource, OhlcvSource, SourceError,
    SourceErrorKind, SourceId, FETCH_TIMEOUT_MS,
};
