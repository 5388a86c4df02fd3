//! Per-tick report output.
//!
//! The reporter hands every committed [`WorldSnapshot`] to a
//! [`ReportSink`] during its epilogue. A failing sink never stops the
//! simulation; the reporter logs the error and carries on.

use std::io::Write;

use verdant_types::WorldSnapshot;

use crate::config::ReportFormat;

/// Errors a sink can report back to the reporter.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// Writing to the underlying stream failed.
    #[error("report write failed: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Serializing the snapshot failed.
    #[error("report serialization failed: {source}")]
    Json {
        /// The underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

/// Destination for per-tick reports.
///
/// Sinks are moved onto the reporter's thread, hence the `Send` bound.
pub trait ReportSink: Send {
    /// Emit the report for one committed tick.
    fn report(&mut self, snapshot: &WorldSnapshot) -> Result<(), ReportError>;
}

/// Discards every report.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpSink;

impl ReportSink for NoOpSink {
    fn report(&mut self, _snapshot: &WorldSnapshot) -> Result<(), ReportError> {
        Ok(())
    }
}

/// Keeps every report in memory.
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    reports: Vec<WorldSnapshot>,
}

impl CollectingSink {
    /// Create an empty sink.
    pub const fn new() -> Self {
        Self {
            reports: Vec::new(),
        }
    }

    /// Reports received so far, oldest first.
    pub fn reports(&self) -> &[WorldSnapshot] {
        &self.reports
    }

    /// Consume the sink and return its reports.
    pub fn into_reports(self) -> Vec<WorldSnapshot> {
        self.reports
    }
}

impl ReportSink for CollectingSink {
    fn report(&mut self, snapshot: &WorldSnapshot) -> Result<(), ReportError> {
        self.reports.push(*snapshot);
        Ok(())
    }
}

/// Writes the multi-line text block, separated by blank lines.
#[derive(Debug)]
pub struct TextSink<W> {
    writer: W,
}

impl<W: Write + Send> TextSink<W> {
    /// Wrap a writer.
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Return the wrapped writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> ReportSink for TextSink<W> {
    fn report(&mut self, snapshot: &WorldSnapshot) -> Result<(), ReportError> {
        writeln!(self.writer, "{snapshot}\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Writes one JSON object per line.
#[derive(Debug)]
pub struct JsonLinesSink<W> {
    writer: W,
}

impl<W: Write + Send> JsonLinesSink<W> {
    /// Wrap a writer.
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Return the wrapped writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> ReportSink for JsonLinesSink<W> {
    fn report(&mut self, snapshot: &WorldSnapshot) -> Result<(), ReportError> {
        serde_json::to_writer(&mut self.writer, snapshot)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Build the sink for `format` around `writer`.
pub fn sink_for<W>(format: ReportFormat, writer: W) -> Box<dyn ReportSink>
where
    W: Write + Send + 'static,
{
    match format {
        ReportFormat::Text => Box::new(TextSink::new(writer)),
        ReportFormat::Json => Box::new(JsonLinesSink::new(writer)),
    }
}
