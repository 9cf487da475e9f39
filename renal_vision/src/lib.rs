// THEORY:
// This file is the entry point for the `renal_vision` library crate. It holds the
// analysis-stage contracts of the renal image workflow and nothing about how those
// stages are launched. The worker processes (`renal_workers`) are thin consumers
// that parse arguments, call into this crate, and print the result.
//
// The stages are independent and stateless:
// 1.  **Classification**: an image/mask pair becomes a label and a confidence.
// 2.  **Segmentation**: an image becomes a binary region mask of the same size.
// 3.  **MAT Mask Extraction**: the first array variable of a MATLAB file becomes a
//     greyscale mask, with an explicit random fallback when the file is unusable.
// 4.  **Report Synthesis**: a flat key/value object becomes a PDF document.
//
// Every place where a stage substitutes synthetic data for real data is modelled
// with `Outcome::Fallback`, so callers can always tell the two apart.

pub mod core_modules;
pub mod errors;

pub use crate::core_modules::classifier::{
    Classification, ClassificationStrategy, ClassifierConfig, Label, RandomClassifier,
};
pub use crate::core_modules::confidence::Confidence;
pub use crate::core_modules::mat_file::{MatClass, MatContainer, MatError, MatVariable};
pub use crate::core_modules::mat_mask::{ExtractedMask, ExtractConfig, extract_mask};
pub use crate::core_modules::outcome::{FallbackReason, Outcome};
pub use crate::core_modules::report::{ReportData, ReportLayout, ReportRenderer};
pub use crate::core_modules::segmenter::{
    CentralRegion, Segmentation, SegmentationStrategy, SegmenterConfig,
};
pub use crate::errors::VisionError;
