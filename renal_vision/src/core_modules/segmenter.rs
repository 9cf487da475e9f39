// THEORY:
// The segmenter turns an input image into a binary region mask of exactly the same
// height and width, plus a scalar confidence. The interface (image in, mask and
// confidence out) is fixed; the algorithm behind it is a `SegmentationStrategy`.
//
// The default `CentralRegion` strategy marks the centre of the image: rows
// `[H/4, 3H/4)` and columns `[W/4, 3W/4)`, using integer division. For odd sizes
// this leaves the region one pixel closer to the top/left edge than to the
// bottom/right edge. Existing consumers depend on that exact rectangle, so the
// asymmetry is kept.

use image::{DynamicImage, GenericImageView, GrayImage, Luma};

use crate::core_modules::confidence::{Confidence, ConfidenceError};

pub const BACKGROUND: u8 = 0;
pub const REGION: u8 = 255;

/// A binary mask (pixels are `BACKGROUND` or `REGION`) and its confidence.
#[derive(Debug, Clone)]
pub struct Segmentation {
    pub mask: GrayImage,
    pub confidence: Confidence,
}

pub trait SegmentationStrategy {
    fn segment(&self, image: &DynamicImage) -> Segmentation;
}

#[derive(Debug, Clone)]
pub struct SegmenterConfig {
    /// Confidence reported with every mask.
    pub confidence: Confidence,
}

impl SegmenterConfig {
    pub fn with_confidence(confidence: f64) -> Result<Self, ConfidenceError> {
        Ok(Self {
            confidence: Confidence::new(confidence)?,
        })
    }
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            confidence: Confidence::saturating(0.9),
        }
    }
}

/// Marks the central half of each dimension as the region of interest.
#[derive(Debug, Clone, Default)]
pub struct CentralRegion {
    config: SegmenterConfig,
}

impl CentralRegion {
    pub fn new(config: SegmenterConfig) -> Self {
        Self { config }
    }

    /// Row and column ranges of the region for a `width` x `height` image.
    pub fn bounds(width: u32, height: u32) -> (std::ops::Range<u32>, std::ops::Range<u32>) {
        (height / 4..3 * height / 4, width / 4..3 * width / 4)
    }
}

impl SegmentationStrategy for CentralRegion {
    fn segment(&self, image: &DynamicImage) -> Segmentation {
        let (width, height) = image.dimensions();
        let (rows, cols) = Self::bounds(width, height);
        let mask = GrayImage::from_fn(width, height, |x, y| {
            if rows.contains(&y) && cols.contains(&x) {
                Luma([REGION])
            } else {
                Luma([BACKGROUND])
            }
        });
        Segmentation {
            mask,
            confidence: self.config.confidence,
        }
    }
}
