// THEORY:
// Report synthesis renders a flat key/value object into a PDF: a fixed title line,
// then one `"{key}: {value}"` line per entry, in the object's own key order.
//
// Key architectural principles:
// 1.  **Lenient Input**: the object arrives on standard input from an orchestrator
//     that may send nothing at all. Empty, malformed and non-object input all
//     decode to the empty object; the reason travels in `Outcome::Fallback`.
// 2.  **Ordered Data**: `ReportData` wraps an insertion-ordered JSON map, so the
//     render order is exactly the order the keys were written in.
// 3.  **Page Geometry**: the layout mirrors a classic A4 text report. Lines sit in
//     10 mm cells below a 10 mm top margin; when the next cell would cross the
//     20 mm bottom margin the text continues on a new page. Typical reports fit
//     on a single page.

use std::path::Path;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::core_modules::outcome::{FallbackReason, Outcome};
use crate::core_modules::pdf::{A4_HEIGHT, A4_WIDTH, PdfDocument, PdfPage, TextLine};
use crate::errors::VisionError;

/// Points per millimetre.
const MM: f64 = 72.0 / 25.4;

/// An insertion-ordered set of report entries.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReportData(Map<String, Value>);

impl ReportData {
    /// Decodes a JSON object, falling back to an empty report on any problem.
    pub fn from_json(input: &str) -> Outcome<Self> {
        if input.trim().is_empty() {
            return Self::fallback(FallbackReason::EmptyInput);
        }
        match serde_json::from_str::<Value>(input) {
            Ok(Value::Object(map)) => Outcome::Genuine(Self(map)),
            Ok(_) => Self::fallback(FallbackReason::NotAnObject),
            Err(err) => Self::fallback(FallbackReason::MalformedJson(err.to_string())),
        }
    }

    fn fallback(reason: FallbackReason) -> Outcome<Self> {
        warn!(%reason, "report input unusable, rendering an empty report");
        Outcome::Fallback {
            value: Self::default(),
            reason,
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `"{key}: {value}"` for every entry, in key order.
    pub fn lines(&self) -> Vec<String> {
        self.0
            .iter()
            .map(|(key, value)| format!("{key}: {}", display_value(value)))
            .collect()
    }
}

impl From<Map<String, Value>> for ReportData {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Renders a value the way report consumers have always seen it: strings
/// verbatim, everything else in literal notation (`True`, `None`,
/// `1.0`, `[1, 'a']`, `{'k': 2}`).
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => {
            let mut out = String::new();
            write_literal(other, &mut out);
            out
        }
    }
}

fn write_literal(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("None"),
        Value::Bool(true) => out.push_str("True"),
        Value::Bool(false) => out.push_str("False"),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => out.push_str(&float_literal(f)),
            _ => out.push_str(&n.to_string()),
        },
        Value::String(s) => out.push_str(&string_literal(s)),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_literal(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            out.push('{');
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(&string_literal(key));
                out.push_str(": ");
                write_literal(item, out);
            }
            out.push('}');
        }
    }
}

/// Shortest round-trip digits, positional for exponents in `[-4, 16)` and
/// scientific with a signed two-digit exponent otherwise.
fn float_literal(f: f64) -> String {
    if !f.is_finite() {
        return if f.is_nan() {
            "nan".to_string()
        } else if f > 0.0 {
            "inf".to_string()
        } else {
            "-inf".to_string()
        };
    }
    let sci = format!("{:e}", f.abs());
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    let sign = if f.is_sign_negative() { "-" } else { "" };

    if (-4..16).contains(&exp) {
        let body = if exp < 0 {
            format!("0.{}{digits}", "0".repeat((-exp - 1) as usize))
        } else {
            let int_len = exp as usize + 1;
            if digits.len() <= int_len {
                format!("{digits}{}.0", "0".repeat(int_len - digits.len()))
            } else {
                format!("{}.{}", &digits[..int_len], &digits[int_len..])
            }
        };
        format!("{sign}{body}")
    } else {
        let exp_sign = if exp < 0 { '-' } else { '+' };
        format!("{sign}{mantissa}e{exp_sign}{:02}", exp.abs())
    }
}

fn string_literal(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

/// Geometry and typography of a rendered report, in points.
#[derive(Debug, Clone)]
pub struct ReportLayout {
    pub title: String,
    pub title_size: f64,
    pub body_size: f64,
    pub page_width: f64,
    pub page_height: f64,
    pub margin: f64,
    /// Horizontal padding inside each text cell.
    pub cell_padding: f64,
    pub line_height: f64,
    /// Distance from the page bottom at which text breaks onto a new page.
    pub bottom_margin: f64,
    pub compress: bool,
}

impl Default for ReportLayout {
    fn default() -> Self {
        Self {
            title: "Renal Analysis Report".to_string(),
            title_size: 16.0,
            body_size: 12.0,
            page_width: A4_WIDTH,
            page_height: A4_HEIGHT,
            margin: 10.0 * MM,
            cell_padding: 1.0 * MM,
            line_height: 10.0 * MM,
            bottom_margin: 20.0 * MM,
            compress: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReportRenderer {
    layout: ReportLayout,
}

impl ReportRenderer {
    pub fn new(layout: ReportLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &ReportLayout {
        &self.layout
    }

    pub fn render(&self, data: &ReportData) -> PdfDocument {
        let layout = &self.layout;
        let mut doc = PdfDocument::new(layout.page_width, layout.page_height);
        doc.title = Some(layout.title.clone());
        doc.compress = layout.compress;

        let page_break_at = layout.page_height - layout.bottom_margin;
        let mut page = PdfPage::default();
        let mut cell_top = layout.margin;

        let title = std::iter::once((layout.title.clone(), layout.title_size));
        let body = data.lines().into_iter().map(|line| (line, layout.body_size));
        for (text, size) in title.chain(body) {
            if cell_top + layout.line_height > page_break_at && !page.lines.is_empty() {
                doc.pages.push(std::mem::take(&mut page));
                cell_top = layout.margin;
            }
            let baseline = cell_top + 0.5 * layout.line_height + 0.3 * size;
            page.lines.push(TextLine {
                x: layout.margin + layout.cell_padding,
                y: layout.page_height - baseline,
                size,
                text,
            });
            cell_top += layout.line_height;
        }
        doc.pages.push(page);

        debug!(entries = data.len(), pages = doc.pages.len(), "rendered report");
        doc
    }

    pub fn write(&self, data: &ReportData, path: &Path) -> Result<(), VisionError> {
        self.render(data).save(path)
    }
}
