// THEORY:
// The worker protocol is the contract every stage process shares with the
// orchestrator that spawns it.
//
// 1.  **Input**: positional arguments, plus optional bytes on standard input.
// 2.  **Output**: exactly one JSON object on one line of standard output, printed
//     after every file the worker writes is complete.
// 3.  **Failure**: reported in the payload, never through the transport. An error
//     is the object `{"error": "<reason>"}` and the process still exits 0, so the
//     orchestrator must inspect the body, not the exit status.
// 4.  **Containment**: argument errors, input errors, output errors and even
//     panics inside a stage all end in an error envelope.
//
// Lines are formatted with `", "` and `": "` separators, which is the exact byte
// layout orchestrators have always received from these workers.

use std::fmt;
use std::io::{self, Read, Write};
use std::panic::{self, AssertUnwindSafe};

use serde::Serialize;
use serde::ser::Serializer;
use serde_json::ser::Formatter;
use serde_json::{Map, Value};
use tracing::{debug, error, warn};

pub const MISSING_ARGUMENTS: &str = "missing arguments";

/// Positional arguments and the standard input of one worker call.
pub struct Invocation {
    args: Vec<String>,
    stdin: Box<dyn Read>,
}

impl Invocation {
    pub fn new(args: Vec<String>, stdin: Box<dyn Read>) -> Self {
        Self { args, stdin }
    }

    /// Arguments from the process, without the program name. Arguments that
    /// are not valid UTF-8 are converted lossily.
    pub fn from_env() -> Self {
        let args = std::env::args_os()
            .skip(1)
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        Self::new(args, Box::new(io::stdin()))
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// The `index`th positional argument, 0-based.
    pub fn arg(&self, index: usize) -> &str {
        self.args.get(index).map(String::as_str).unwrap_or_default()
    }

    pub fn read_stdin_to_string(&mut self) -> io::Result<String> {
        let mut bytes = Vec::new();
        self.stdin.read_to_end(&mut bytes)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation").field("args", &self.args).finish_non_exhaustive()
    }
}

/// One analysis stage behind the protocol.
pub trait Worker {
    /// Name used in log lines.
    const NAME: &'static str;
    /// Positional arguments that must be present before `run` is called.
    const MIN_ARGS: usize;
    type Output: Serialize;

    fn run(&mut self, invocation: &mut Invocation) -> anyhow::Result<Self::Output>;
}

/// The single JSON object a worker prints.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Success(Map<String, Value>),
    Error(String),
}

impl Envelope {
    pub fn error(reason: impl Into<String>) -> Self {
        Envelope::Error(reason.into())
    }

    pub fn missing_arguments() -> Self {
        Envelope::error(MISSING_ARGUMENTS)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Envelope::Error(_))
    }

    /// Serializes to one line, without the trailing newline.
    pub fn to_line(&self) -> String {
        let mut buf = Vec::new();
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, SpacedFormatter);
        // Maps of JSON values with string keys always serialize.
        let _ = self.serialize(&mut ser);
        String::from_utf8(buf).unwrap_or_default()
    }

    pub fn write_line<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "{}", self.to_line())?;
        out.flush()
    }
}

impl Serialize for Envelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Envelope::Success(map) => map.serialize(serializer),
            Envelope::Error(reason) => {
                let mut map = Map::new();
                map.insert("error".to_string(), Value::String(reason.clone()));
                map.serialize(serializer)
            }
        }
    }
}

/// Compact JSON with a space after every `,` and `:`.
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_key<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }
}

/// Runs `worker` under the protocol and returns the envelope to print.
pub fn execute<W: Worker>(worker: &mut W, mut invocation: Invocation) -> Envelope {
    if invocation.args().len() < W::MIN_ARGS {
        warn!(
            worker = W::NAME,
            required = W::MIN_ARGS,
            given = invocation.args().len(),
            "missing arguments"
        );
        return Envelope::missing_arguments();
    }

    let result = panic::catch_unwind(AssertUnwindSafe(|| worker.run(&mut invocation)));
    match result {
        Ok(Ok(output)) => match serde_json::to_value(output) {
            Ok(Value::Object(map)) => {
                debug!(worker = W::NAME, "stage finished");
                Envelope::Success(map)
            }
            Ok(other) => {
                error!(worker = W::NAME, %other, "stage output is not an object");
                Envelope::error("worker produced a non-object result")
            }
            Err(err) => {
                error!(worker = W::NAME, error = %err, "stage output failed to serialize");
                Envelope::error(format!("failed to encode result: {err}"))
            }
        },
        Ok(Err(err)) => {
            error!(worker = W::NAME, error = %format!("{err:#}"), "stage failed");
            Envelope::error(format!("{err:#}"))
        }
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            error!(worker = W::NAME, %reason, "stage panicked");
            Envelope::error(format!("internal error: {reason}"))
        }
    }
}

/// Process entry point: run one worker against the real argv/stdin/stdout.
/// Always returns normally so the process exits 0.
pub fn run_main<W: Worker>(mut worker: W) {
    crate::logging::init_tracing();
    let envelope = execute(&mut worker, Invocation::from_env());
    let stdout = io::stdout();
    if let Err(err) = envelope.write_line(&mut stdout.lock()) {
        error!(worker = W::NAME, error = %err, "failed to write result envelope");
    }
}
