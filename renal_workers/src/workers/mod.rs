// One module per analysis stage. Each defines a `Worker` and the serialized
// shape of its success envelope.

pub mod classify;
pub mod generate_pdf;
pub mod process_mat;
pub mod segment;

pub use classify::{ClassifyOutput, ClassifyWorker};
pub use generate_pdf::{GeneratePdfOutput, GeneratePdfWorker};
pub use process_mat::{ProcessMatOutput, ProcessMatWorker};
pub use segment::{SegmentOutput, SegmentWorker};
