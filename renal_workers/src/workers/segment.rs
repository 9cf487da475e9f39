// Usage: segment <image_path> <output_mask_path>

use std::path::Path;

use anyhow::Context;
use renal_vision::core_modules::image_io::{load_image, save_gray};
use renal_vision::{CentralRegion, Confidence, SegmentationStrategy};
use serde::Serialize;
use tracing::debug;

use crate::protocol::{Invocation, Worker};

#[derive(Debug, Clone, Serialize)]
pub struct SegmentOutput {
    pub mask_path: String,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, Default)]
pub struct SegmentWorker<S: SegmentationStrategy = CentralRegion> {
    strategy: S,
}

impl<S: SegmentationStrategy> SegmentWorker<S> {
    pub fn new(strategy: S) -> Self {
        Self { strategy }
    }
}

impl<S: SegmentationStrategy> Worker for SegmentWorker<S> {
    const NAME: &'static str = "segment";
    const MIN_ARGS: usize = 2;
    type Output = SegmentOutput;

    fn run(&mut self, invocation: &mut Invocation) -> anyhow::Result<SegmentOutput> {
        let image_path = Path::new(invocation.arg(0));
        let mask_path = invocation.arg(1).to_string();

        let image = load_image(image_path).context("failed to load input image")?;
        let segmentation = self.strategy.segment(&image);
        save_gray(&segmentation.mask, Path::new(&mask_path)).context("failed to save mask")?;
        debug!(%mask_path, "mask written");

        Ok(SegmentOutput {
            mask_path,
            confidence: segmentation.confidence,
        })
    }
}
