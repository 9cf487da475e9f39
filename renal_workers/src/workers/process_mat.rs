// THEORY:
// Usage: process_mat <mat_path> <output_image_path>
//
// A MAT file that cannot be used never fails the call: the stage writes a random
// fallback mask instead and still reports success. Only a failure to write the
// output image becomes an error envelope.

use std::path::Path;

use anyhow::Context;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use renal_vision::core_modules::image_io::save_gray;
use renal_vision::{ExtractConfig, Outcome, extract_mask};
use serde::Serialize;
use tracing::{debug, warn};

use crate::protocol::{Invocation, Worker};

#[derive(Debug, Clone, Serialize)]
pub struct ProcessMatOutput {
    pub mask_path: String,
    pub variables: Vec<String>,
}

pub struct ProcessMatWorker<R: Rng> {
    config: ExtractConfig,
    rng: R,
}

impl<R: Rng> ProcessMatWorker<R> {
    pub fn new(config: ExtractConfig, rng: R) -> Self {
        Self { config, rng }
    }
}

impl ProcessMatWorker<StdRng> {
    pub fn from_os_rng() -> Self {
        Self::new(ExtractConfig::default(), StdRng::from_os_rng())
    }
}

impl<R: Rng> Worker for ProcessMatWorker<R> {
    const NAME: &'static str = "process_mat";
    const MIN_ARGS: usize = 2;
    type Output = ProcessMatOutput;

    fn run(&mut self, invocation: &mut Invocation) -> anyhow::Result<ProcessMatOutput> {
        let mat_path = Path::new(invocation.arg(0));
        let mask_path = invocation.arg(1).to_string();

        let extracted = match extract_mask(mat_path, &self.config, &mut self.rng) {
            Outcome::Genuine(extracted) => {
                debug!(source = ?extracted.source, "mask taken from MAT variable");
                extracted
            }
            Outcome::Fallback { value, reason } => {
                warn!(%reason, "writing random fallback mask");
                value
            }
        };
        save_gray(&extracted.mask, Path::new(&mask_path)).context("failed to save mask")?;

        Ok(ProcessMatOutput {
            mask_path,
            variables: extracted.variables,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrupt_file_still_writes_a_mask() {
        let dir = tempfile::tempdir().unwrap();
        let mat = dir.path().join("corrupt.mat");
        let out = dir.path().join("nested/mask.png");
        std::fs::write(&mat, [0u8; 32]).unwrap();

        let mut worker = ProcessMatWorker::new(
            ExtractConfig {
                width: 12,
                height: 10,
                ..ExtractConfig::default()
            },
            StdRng::seed_from_u64(3),
        );
        let mut inv = Invocation::new(
            vec![
                mat.to_str().unwrap().to_string(),
                out.to_str().unwrap().to_string(),
            ],
            Box::new(std::io::empty()),
        );
        let result = worker.run(&mut inv).unwrap();
        assert!(result.variables.is_empty());
        let written = image::open(&out).unwrap();
        assert_eq!((written.width(), written.height()), (12, 10));
    }
}
