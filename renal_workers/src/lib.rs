// THEORY:
// `renal_workers` owns the process boundary of the renal analysis stages. Each
// binary in `src/bin` is a thin shell: it picks a stage from `workers`, and
// `protocol::run_main` does the rest (argument check, execution, one JSON line on
// standard output, exit status 0).
//
// The analysis itself lives in `renal_vision`; this crate only turns arguments
// into calls and calls into envelopes.

pub mod logging;
pub mod protocol;
pub mod workers;

pub use protocol::{Envelope, Invocation, Worker, execute, run_main};
