// Usage: classify <image_path> <mask_path> <model_id>

use std::path::Path;

use anyhow::Context;
use image::GenericImageView;
use rand::SeedableRng;
use rand::rngs::StdRng;
use renal_vision::core_modules::classifier::is_known_model;
use renal_vision::core_modules::image_io::{load_gray, load_image};
use renal_vision::{ClassificationStrategy, Confidence, Label, RandomClassifier};
use serde::Serialize;
use tracing::{debug, warn};

use crate::protocol::{Invocation, Worker};

#[derive(Debug, Clone, Serialize)]
pub struct ClassifyOutput {
    pub classification: Label,
    pub confidence: Confidence,
    pub model: String,
}

pub struct ClassifyWorker<S: ClassificationStrategy> {
    strategy: S,
}

impl<S: ClassificationStrategy> ClassifyWorker<S> {
    pub fn new(strategy: S) -> Self {
        Self { strategy }
    }
}

impl ClassifyWorker<RandomClassifier<StdRng>> {
    /// The default random strategy seeded from the operating system.
    pub fn from_os_rng() -> Self {
        Self::new(RandomClassifier::with_rng(StdRng::from_os_rng()))
    }
}

impl<S: ClassificationStrategy> Worker for ClassifyWorker<S> {
    const NAME: &'static str = "classify";
    const MIN_ARGS: usize = 3;
    type Output = ClassifyOutput;

    fn run(&mut self, invocation: &mut Invocation) -> anyhow::Result<ClassifyOutput> {
        let image_path = Path::new(invocation.arg(0));
        let mask_path = Path::new(invocation.arg(1));
        let model = invocation.arg(2).to_string();

        let image = load_image(image_path).context("failed to load input image")?;
        let mask = load_gray(mask_path).context("failed to load mask")?;
        if image.dimensions() != mask.dimensions() {
            warn!(
                image = ?image.dimensions(),
                mask = ?mask.dimensions(),
                "mask size differs from image size"
            );
        }
        if !is_known_model(&model) {
            warn!(%model, "unknown model identifier, using the default strategy");
        }

        let result = self
            .strategy
            .classify(&image, &mask, &model)
            .context("classification failed")?;
        debug!(label = result.label.as_str(), confidence = result.confidence.value(), "classified");

        Ok(ClassifyOutput {
            classification: result.label,
            confidence: result.confidence,
            model,
        })
    }
}
