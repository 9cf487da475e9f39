// THEORY:
// Usage: generate_pdf <output_pdf_path>, with the report fields as a JSON object
// on standard input. Missing or unusable input never fails the call; it yields a
// report holding only the title.

use std::path::Path;

use anyhow::Context;
use renal_vision::{Outcome, ReportData, ReportRenderer};
use serde::Serialize;
use tracing::{debug, warn};

use crate::protocol::{Invocation, Worker};

#[derive(Debug, Clone, Serialize)]
pub struct GeneratePdfOutput {
    pub pdf_path: String,
}

#[derive(Debug, Clone, Default)]
pub struct GeneratePdfWorker {
    renderer: ReportRenderer,
}

impl GeneratePdfWorker {
    pub fn new(renderer: ReportRenderer) -> Self {
        Self { renderer }
    }
}

impl Worker for GeneratePdfWorker {
    const NAME: &'static str = "generate_pdf";
    const MIN_ARGS: usize = 1;
    type Output = GeneratePdfOutput;

    fn run(&mut self, invocation: &mut Invocation) -> anyhow::Result<GeneratePdfOutput> {
        let pdf_path = invocation.arg(0).to_string();

        // An unreadable stdin is treated like an empty one.
        let input = invocation.read_stdin_to_string().unwrap_or_else(|err| {
            warn!(error = %err, "failed to read standard input");
            String::new()
        });
        let data = match ReportData::from_json(&input) {
            Outcome::Genuine(data) => data,
            Outcome::Fallback { value, .. } => value,
        };

        self.renderer
            .write(&data, Path::new(&pdf_path))
            .context("failed to write report")?;
        debug!(%pdf_path, entries = data.len(), "report written");

        Ok(GeneratePdfOutput { pdf_path })
    }
}
