//! Blood test report reading.
//!
//! Text extraction is delegated to poppler's `pdftotext`; this module only
//! runs it and tidies the output for prompting.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

use crate::error::{BtaError, BtaResult};

/// Every PDF starts with this.
const PDF_MAGIC: &[u8] = b"%PDF-";

/// Reads a report file into plain text.
#[async_trait]
pub trait ReportReader: Send + Sync {
    async fn read(&self, path: &Path) -> BtaResult<String>;
}

/// [`ReportReader`] backed by the `pdftotext` binary.
#[derive(Debug, Clone)]
pub struct PdfToTextReader {
    program: PathBuf,
}

impl PdfToTextReader {
    pub fn new() -> Self {
        Self::with_program("pdftotext")
    }

    /// Use a specific `pdftotext` executable.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into() }
    }
}

impl Default for PdfToTextReader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReportReader for PdfToTextReader {
    async fn read(&self, path: &Path) -> BtaResult<String> {
        let output = Command::new(&self.program)
            .args(["-layout", "-enc", "UTF-8"])
            .arg(path)
            .arg("-")
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    BtaError::ToolUnavailable(format!(
                        "{} not found (install poppler-utils)",
                        self.program.display()
                    ))
                } else {
                    BtaError::Io(e)
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BtaError::ReportUnreadable(format!(
                "pdftotext failed: {}",
                stderr.trim()
            )));
        }

        let raw = String::from_utf8_lossy(&output.stdout);
        let text = normalize_report_text(&raw);
        debug!(path = %path.display(), chars = text.len(), "Extracted report text");

        if text.trim().is_empty() {
            return Err(BtaError::EmptyReport);
        }
        Ok(text)
    }
}

/// Tidy extracted text page by page.
///
/// Pages are separated by form feeds. Within a page, runs of blank lines
/// become a single line break and runs of spaces a single space; each page
/// ends with exactly one newline.
pub fn normalize_report_text(raw: &str) -> String {
    let mut report = String::with_capacity(raw.len());
    for page in raw.split('\x0c') {
        let page = collapse_spaces(&collapse_blank_lines(page));
        if page.trim().is_empty() {
            continue;
        }
        report.push_str(page.trim_matches('\n'));
        report.push('\n');
    }
    report
}

fn collapse_blank_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_blank = false;
    for line in text.lines() {
        let blank = line.trim().is_empty();
        if blank && previous_blank {
            continue;
        }
        if blank {
            out.push('\n');
        } else {
            out.push_str(line.trim_end());
            out.push('\n');
        }
        previous_blank = blank;
    }
    // A single blank line is still "\n\n" between two lines of text.
    out.replace("\n\n", "\n")
}

fn collapse_spaces(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_space = false;
    for c in text.chars() {
        if c == ' ' {
            if !previous_space {
                out.push(c);
            }
            previous_space = true;
        } else {
            out.push(c);
            previous_space = false;
        }
    }
    out
}

/// Cut `text` to at most `max_chars` bytes on a UTF-8 boundary.
pub fn truncate_report(text: &str, max_chars: usize) -> &str {
    if text.len() <= max_chars {
        return text;
    }
    let mut end = max_chars;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Whether `bytes` look like a PDF document.
pub fn is_pdf(bytes: &[u8]) -> bool {
    // Some generators emit a BOM or whitespace before the header.
    let start = bytes
        .iter()
        .take(1024)
        .position(|b| *b == b'%')
        .unwrap_or(usize::MAX);
    bytes.get(start..).is_some_and(|rest| rest.starts_with(PDF_MAGIC))
}
