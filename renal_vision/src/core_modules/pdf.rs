// THEORY:
// A minimal PDF 1.4 writer for text-only documents.
//
// Pages hold positioned lines of text in the base-14 Helvetica font, so no font
// program is embedded. Content streams are optionally Flate-compressed. Nothing
// time-dependent is written, so the same document always serializes to the same
// bytes.

use std::fmt::Write as _;
use std::io::Write;
use std::path::Path;

use flate2::Compression;
use flate2::write::ZlibEncoder;

use crate::core_modules::image_io::ensure_parent_dir;
use crate::errors::VisionError;

/// A4 in PostScript points.
pub const A4_WIDTH: f64 = 595.28;
pub const A4_HEIGHT: f64 = 841.89;

/// One line of text; `x`/`y` are the baseline origin in points from the bottom-left.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub x: f64,
    pub y: f64,
    pub size: f64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PdfPage {
    pub lines: Vec<TextLine>,
}

impl PdfPage {
    fn content_stream(&self) -> Vec<u8> {
        let mut ops = String::new();
        for line in &self.lines {
            let _ = writeln!(
                ops,
                "BT /F1 {} Tf {} {} Td ({}) Tj ET",
                number(line.size),
                number(line.x),
                number(line.y),
                escape_text(&line.text)
            );
        }
        ops.into_bytes()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PdfDocument {
    pub width: f64,
    pub height: f64,
    pub title: Option<String>,
    pub compress: bool,
    pub pages: Vec<PdfPage>,
}

impl PdfDocument {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            title: None,
            compress: true,
            pages: Vec::new(),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        // Object numbers: 1 catalog, 2 page tree, 3 font, 4 info, then a
        // (page, content) pair per page.
        let page_ids: Vec<usize> = (0..self.pages.len()).map(|i| 5 + 2 * i).collect();
        let mut objects: Vec<Vec<u8>> = Vec::with_capacity(4 + 2 * self.pages.len());

        objects.push(b"<< /Type /Catalog /Pages 2 0 R >>".to_vec());
        let kids: Vec<String> = page_ids.iter().map(|id| format!("{id} 0 R")).collect();
        objects.push(
            format!(
                "<< /Type /Pages /Kids [{}] /Count {} >>",
                kids.join(" "),
                page_ids.len()
            )
            .into_bytes(),
        );
        objects.push(
            b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
                .to_vec(),
        );
        let mut info = String::from("<< /Producer (renal_vision)");
        if let Some(title) = &self.title {
            let _ = write!(info, " /Title ({})", escape_text(title));
        }
        info.push_str(" >>");
        objects.push(info.into_bytes());

        for (page, &id) in self.pages.iter().zip(&page_ids) {
            objects.push(
                format!(
                    "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] \
                     /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
                    number(self.width),
                    number(self.height),
                    id + 1
                )
                .into_bytes(),
            );
            objects.push(self.stream_object(&page.content_stream()));
        }

        let mut out: Vec<u8> = b"%PDF-1.4\n%\xe2\xe3\xcf\xd3\n".to_vec();
        let mut offsets = Vec::with_capacity(objects.len());
        for (i, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj\n", i + 1).as_bytes());
            out.extend_from_slice(body);
            out.extend_from_slice(b"\nendobj\n");
        }

        let xref_at = out.len();
        let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
        for offset in offsets {
            let _ = write!(xref, "{offset:010} 00000 n \n");
        }
        let _ = write!(
            xref,
            "trailer\n<< /Size {} /Root 1 0 R /Info 4 0 R >>\nstartxref\n{xref_at}\n%%EOF\n",
            objects.len() + 1
        );
        out.extend_from_slice(xref.as_bytes());
        out
    }

    fn stream_object(&self, raw: &[u8]) -> Vec<u8> {
        let (data, filter) = match self.compress.then(|| deflate(raw)).flatten() {
            Some(packed) => (packed, " /Filter /FlateDecode"),
            None => (raw.to_vec(), ""),
        };
        let mut obj = format!("<< /Length {}{filter} >>\nstream\n", data.len()).into_bytes();
        obj.extend_from_slice(&data);
        obj.extend_from_slice(b"\nendstream");
        obj
    }

    /// Writes the document, creating missing parent directories and replacing
    /// any existing file.
    pub fn save(&self, path: &Path) -> Result<(), VisionError> {
        ensure_parent_dir(path)?;
        std::fs::write(path, self.to_bytes()).map_err(|source| VisionError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn deflate(raw: &[u8]) -> Option<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(raw).ok()?;
    encoder.finish().ok()
}

/// Formats a coordinate with at most two decimals and no trailing zeros.
fn number(value: f64) -> String {
    let s = format!("{value:.2}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" { "0".to_string() } else { s.to_string() }
}

/// Encodes text for a WinAnsi literal string: Latin-1 characters map to their
/// byte, delimiters are escaped, anything else becomes `?`.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            ' '..='~' => out.push(ch),
            '\t' | '\n' | '\r' => out.push(' '),
            '\u{a0}'..='\u{ff}' => {
                let _ = write!(out, "\\{:03o}", ch as u32);
            }
            _ => out.push('?'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(compress: bool) -> PdfDocument {
        let mut doc = PdfDocument::new(A4_WIDTH, A4_HEIGHT);
        doc.compress = compress;
        doc.title = Some("Report".into());
        doc.pages.push(PdfPage {
            lines: vec![TextLine {
                x: 31.19,
                y: 800.0,
                size: 16.0,
                text: "Hello (world)".into(),
            }],
        });
        doc
    }

    #[test]
    fn uncompressed_document_structure() {
        let bytes = sample(false).to_bytes();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.starts_with("%PDF-1.4\n"));
        assert!(text.trim_end().ends_with("%%EOF"));
        assert!(text.contains("/Count 1"));
        assert!(text.contains("BT /F1 16 Tf 31.19 800 Td (Hello \\(world\\)) Tj ET"));
        assert!(text.contains("/Title (Report)"));
    }

    #[test]
    fn xref_offsets_point_at_objects() {
        let bytes = sample(true).to_bytes();
        let tail_at = rfind(&bytes, b"startxref\n").unwrap() + 10;
        let tail = std::str::from_utf8(&bytes[tail_at..]).unwrap();
        let xref_at: usize = tail.lines().next().unwrap().parse().unwrap();
        let xref = std::str::from_utf8(&bytes[xref_at..]).unwrap();
        assert!(xref.starts_with("xref\n0 7\n"));

        for (i, entry) in xref.lines().skip(3).take(6).enumerate() {
            let offset: usize = entry[..10].parse().unwrap();
            assert!(
                bytes[offset..].starts_with(format!("{} 0 obj", i + 1).as_bytes()),
                "object {} not at {offset}",
                i + 1
            );
        }
    }

    #[test]
    fn compressed_stream_inflates_to_operators() {
        use flate2::read::ZlibDecoder;
        use std::io::Read;

        let doc = sample(true);
        let bytes = doc.to_bytes();
        let start = find(&bytes, b"stream\n").unwrap() + 7;
        let end = find(&bytes, b"\nendstream").unwrap();
        let mut inflated = String::new();
        ZlibDecoder::new(&bytes[start..end])
            .read_to_string(&mut inflated)
            .unwrap();
        assert_eq!(
            inflated,
            String::from_utf8(doc.pages[0].content_stream()).unwrap()
        );
    }

    #[test]
    fn serialization_is_deterministic() {
        assert_eq!(sample(true).to_bytes(), sample(true).to_bytes());
    }

    #[test]
    fn escapes_latin1_and_replaces_the_rest() {
        assert_eq!(escape_text("a\\b"), "a\\\\b");
        assert_eq!(escape_text("riñón"), "ri\\361\\363n");
        assert_eq!(escape_text("腎"), "?");
        assert_eq!(escape_text("a\tb"), "a b");
    }

    #[test]
    fn numbers_are_compact() {
        assert_eq!(number(16.0), "16");
        assert_eq!(number(28.346), "28.35");
        assert_eq!(number(0.5), "0.5");
        assert_eq!(number(-0.001), "0");
    }

    fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack.windows(needle.len()).position(|w| w == needle)
    }

    fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack.windows(needle.len()).rposition(|w| w == needle)
    }
}
