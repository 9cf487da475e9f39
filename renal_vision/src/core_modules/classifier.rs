// THEORY:
// The classifier turns an image, its region mask and a model identifier into a
// label and a confidence. No trained model ships with this crate, so the decision
// itself is a pluggable strategy behind the `ClassificationStrategy` trait.
//
// Key architectural principles:
// 1.  **Injected Strategy**: callers hand the worker any `ClassificationStrategy`.
//     A real model slots in here without touching argument parsing or output.
// 2.  **Closed Label Set**: a strategy returns a `Label`, so it cannot invent a
//     class outside `{normal, pathological}`.
// 3.  **Bounded Confidence**: the confidence is a `Confidence`, which is always
//     inside `[0, 1]`.
// 4.  **Explicit Randomness**: the default `RandomClassifier` owns its random
//     source. Seed it and the decision is reproducible.

use image::{DynamicImage, GrayImage};
use rand::Rng;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::core_modules::confidence::{Confidence, ConfidenceError};

/// Model identifiers the orchestrator is known to offer.
pub const KNOWN_MODELS: [&str; 3] = [
    "mobilenetv2_default",
    "mobilenetv2_enhanced",
    "resnet50_custom",
];

pub fn is_known_model(model: &str) -> bool {
    KNOWN_MODELS.contains(&model)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Normal,
    Pathological,
}

impl Label {
    pub const ALL: [Label; 2] = [Label::Normal, Label::Pathological];

    pub fn as_str(self) -> &'static str {
        match self {
            Label::Normal => "normal",
            Label::Pathological => "pathological",
        }
    }
}

/// A label together with how strongly it was chosen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub label: Label,
    pub confidence: Confidence,
}

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("classifier has no labels to choose from")]
    NoLabels,
    #[error("invalid confidence range [{min}, {max}]")]
    InvalidRange { min: f64, max: f64 },
    #[error(transparent)]
    Confidence(#[from] ConfidenceError),
}

/// Maps `(image, mask, model_id)` to a label and confidence.
pub trait ClassificationStrategy {
    fn classify(
        &mut self,
        image: &DynamicImage,
        mask: &GrayImage,
        model: &str,
    ) -> Result<Classification, ClassifyError>;
}

/// Tunable behaviour of the default classifier.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub labels: Vec<Label>,
    pub min_confidence: f64,
    pub max_confidence: f64,
    /// Number of decimal digits the reported confidence is rounded to.
    pub decimals: u32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            labels: Label::ALL.to_vec(),
            min_confidence: 0.70,
            max_confidence: 0.99,
            decimals: 3,
        }
    }
}

/// Default strategy: a uniformly random label with a uniformly random confidence.
pub struct RandomClassifier<R: Rng> {
    config: ClassifierConfig,
    rng: R,
}

impl<R: Rng> RandomClassifier<R> {
    pub fn new(config: ClassifierConfig, rng: R) -> Self {
        Self { config, rng }
    }

    pub fn with_rng(rng: R) -> Self {
        Self::new(ClassifierConfig::default(), rng)
    }
}

impl<R: Rng> ClassificationStrategy for RandomClassifier<R> {
    fn classify(
        &mut self,
        _image: &DynamicImage,
        _mask: &GrayImage,
        model: &str,
    ) -> Result<Classification, ClassifyError> {
        let ClassifierConfig {
            labels,
            min_confidence: min,
            max_confidence: max,
            decimals,
        } = &self.config;
        if labels.is_empty() {
            return Err(ClassifyError::NoLabels);
        }
        if !(0.0..=1.0).contains(min) || !(0.0..=1.0).contains(max) || min > max {
            return Err(ClassifyError::InvalidRange { min: *min, max: *max });
        }

        let label = labels[self.rng.random_range(0..labels.len())];
        let raw = self.rng.random_range(*min..=*max);
        // Rounding can step just past a bound that is not itself a round number.
        let confidence = Confidence::rounded(raw, *decimals)?.value().clamp(*min, *max);
        let confidence = Confidence::new(confidence)?;

        debug!(model, label = label.as_str(), confidence = confidence.value(), "random classification");
        Ok(Classification { label, confidence })
    }
}
