//! Per-page accumulation
//!
//! [`PageWriter`] joins page bodies into one artifact. Each layout knows how
//! to glue consecutive pages together so the result reads as a single file:
//!
//! - `Csv`: the header line of the first page is kept, repeated headers on
//!   later pages are dropped
//! - `Lines`: pages are concatenated, newline-separated
//! - `Array`: inner elements of each page go into one `[...]`
//! - `Collection`: as `Array`, wrapped as `{"<dataset>":[...]}`

use super::writer::ByteSink;
use crate::error::{Error, Result};
use crate::types::OutputFormat;
use tracing::{debug, warn};

/// How page bodies are joined
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageLayout {
    /// CSV with one header line per page
    Csv,
    /// Newline-delimited records
    Lines,
    /// Top-level JSON array
    Array,
    /// JSON array under a named key
    Collection(String),
}

impl PageLayout {
    /// Layout for the pages requested for `format`
    pub fn for_format(format: OutputFormat, dataset_name: &str) -> Result<Self> {
        match format {
            OutputFormat::Csv => Ok(Self::Csv),
            OutputFormat::Jsonl => Ok(Self::Lines),
            OutputFormat::Jsona => Ok(Self::Array),
            OutputFormat::Json => Ok(Self::Collection(dataset_name.to_string())),
            OutputFormat::Parquet => Err(Error::invalid_value(
                "output_format",
                "parquet cannot be downloaded page by page",
            )),
        }
    }

    fn opening(&self) -> Result<String> {
        match self {
            Self::Array => Ok("[".to_string()),
            Self::Collection(name) => Ok(format!("{{{}:[", serde_json::to_string(name)?)),
            _ => Ok(String::new()),
        }
    }

    fn closing(&self) -> &'static str {
        match self {
            Self::Array => "]",
            Self::Collection(_) => "]}",
            _ => "",
        }
    }
}

/// Appends page bodies to a sink in arrival order
#[derive(Debug)]
pub struct PageWriter<S: ByteSink> {
    sink: S,
    layout: PageLayout,
    header: Option<String>,
    pages_written: u64,
    opened: bool,
    has_elements: bool,
    ends_with_newline: bool,
}

impl<S: ByteSink> PageWriter<S> {
    /// Wrap a freshly opened sink
    pub fn new(sink: S, layout: PageLayout) -> Self {
        Self {
            sink,
            layout,
            header: None,
            pages_written: 0,
            opened: false,
            has_elements: false,
            ends_with_newline: true,
        }
    }

    /// Layout in use
    pub fn layout(&self) -> &PageLayout {
        &self.layout
    }

    /// Pages accepted so far
    pub fn pages_written(&self) -> u64 {
        self.pages_written
    }

    /// Bytes written to the sink so far
    pub fn bytes_written(&self) -> u64 {
        self.sink.bytes_written()
    }

    /// Borrow the sink
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Release the sink
    pub fn into_inner(self) -> S {
        self.sink
    }

    /// Append one page and flush, so a later failure leaves exactly the
    /// pages written so far
    pub async fn write_page(&mut self, body: &str) -> Result<()> {
        match self.layout.clone() {
            PageLayout::Csv => self.write_csv(body).await?,
            PageLayout::Lines => self.write_lines(body).await?,
            PageLayout::Array | PageLayout::Collection(_) => self.write_elements(body).await?,
        }
        self.pages_written += 1;
        self.sink.flush().await?;
        debug!(
            "Appended page {} to {} ({} bytes total)",
            self.pages_written,
            self.sink.describe(),
            self.sink.bytes_written()
        );
        Ok(())
    }

    /// Close any open JSON structure and finish the sink
    pub async fn finish(&mut self) -> Result<u64> {
        if matches!(self.layout, PageLayout::Array | PageLayout::Collection(_)) {
            self.open().await?;
            let closing = self.layout.closing();
            self.sink.write(closing.as_bytes()).await?;
        }
        self.sink.finish().await
    }

    async fn write_csv(&mut self, body: &str) -> Result<()> {
        if body.is_empty() {
            return Ok(());
        }

        let (first_line, rest) = split_first_line(body);
        let remainder = if let Some(header) = &self.header {
            if same_line(header, first_line) {
                rest
            } else {
                warn!(
                    "Page {} does not start with the captured CSV header, appending it whole",
                    self.pages_written + 1
                );
                body
            }
        } else {
            self.header = Some(first_line.to_string());
            body
        };

        self.append_text(remainder).await
    }

    async fn write_lines(&mut self, body: &str) -> Result<()> {
        self.append_text(body).await
    }

    async fn write_elements(&mut self, body: &str) -> Result<()> {
        self.open().await?;

        let inner = array_inner(body)?;
        if inner.is_empty() {
            return Ok(());
        }
        if self.has_elements {
            self.sink.write(b",").await?;
        }
        self.sink.write(inner.as_bytes()).await?;
        self.has_elements = true;
        Ok(())
    }

    /// Newline-join `text` onto what is already in the sink
    async fn append_text(&mut self, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        if !self.ends_with_newline {
            self.sink.write(b"\n").await?;
        }
        self.sink.write(text.as_bytes()).await?;
        self.ends_with_newline = text.ends_with('\n');
        Ok(())
    }

    async fn open(&mut self) -> Result<()> {
        if !self.opened {
            let opening = self.layout.opening()?;
            self.sink.write(opening.as_bytes()).await?;
            self.opened = true;
        }
        Ok(())
    }
}

/// First line including its terminator, and everything after it
fn split_first_line(body: &str) -> (&str, &str) {
    match body.find('\n') {
        Some(idx) => body.split_at(idx + 1),
        None => (body, ""),
    }
}

fn same_line(a: &str, b: &str) -> bool {
    a.trim_end_matches(['\r', '\n']) == b.trim_end_matches(['\r', '\n'])
}

/// Elements of a JSON array body with the outer brackets removed
fn array_inner(body: &str) -> Result<&str> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Ok("");
    }
    trimmed
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .map(str::trim)
        .ok_or_else(|| Error::decode("page body is not a JSON array"))
}

#[cfg(test)]
mod helper_tests {
    use super::*;

    #[test]
    fn test_split_first_line() {
        assert_eq!(split_first_line("a,b\n1,2\n"), ("a,b\n", "1,2\n"));
        assert_eq!(split_first_line("a,b"), ("a,b", ""));
        assert_eq!(split_first_line("a,b\r\n1"), ("a,b\r\n", "1"));
    }

    #[test]
    fn test_array_inner() {
        assert_eq!(array_inner(" [ {\"a\":1} ]\n").unwrap(), "{\"a\":1}");
        assert_eq!(array_inner("[]").unwrap(), "");
        assert_eq!(array_inner("").unwrap(), "");
        assert!(array_inner("{\"a\":1}").is_err());
    }
}
