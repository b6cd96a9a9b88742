//! File ingestion: the producer half of the pipeline.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::mem;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::LoaderConfig;
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::host::LoadHost;
use crate::lexer::{PrimitiveRecord, Segmenter};

/// One input to a load.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneSource {
    /// A scene file on disk.
    File(PathBuf),
    /// Scene text already in memory, with a label used in diagnostics.
    Text {
        /// Label shown in diagnostics.
        label: String,
        /// Scene text.
        text: String,
    },
}

impl SceneSource {
    /// In-memory source.
    pub fn text(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Text {
            label: label.into(),
            text: text.into(),
        }
    }

    /// Label used in diagnostics and record locations.
    pub fn label(&self) -> String {
        match self {
            SceneSource::File(path) => path.display().to_string(),
            SceneSource::Text { label, .. } => label.clone(),
        }
    }
}

impl From<PathBuf> for SceneSource {
    fn from(path: PathBuf) -> Self {
        SceneSource::File(path)
    }
}

/// Result of an ingestion run.
#[derive(Debug, Default)]
pub struct IngestReport {
    /// Reference warnings and unreadable-source errors, in order.
    pub diagnostics: Vec<Diagnostic>,
    /// Non-skipped lines looked at.
    pub lines_read: usize,
    /// Records emitted.
    pub records: usize,
    /// External references skipped.
    pub references: usize,
    /// Stopped because the host asked to cancel.
    pub cancelled: bool,
}

/// Line iterator that replaces invalid UTF-8 instead of failing on it.
struct LossyLines<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R: BufRead> LossyLines<R> {
    fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
        }
    }
}

impl<R: BufRead> Iterator for LossyLines<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                if self.buf.last() == Some(&b'\n') {
                    self.buf.pop();
                    if self.buf.last() == Some(&b'\r') {
                        self.buf.pop();
                    }
                }
                let line = match String::from_utf8(mem::take(&mut self.buf)) {
                    Ok(line) => line,
                    Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
                };
                Some(Ok(line))
            }
            Err(err) => Some(Err(err)),
        }
    }
}

enum Flow {
    Continue,
    Stop,
}

/// Reads sources line by line and emits raw primitive records.
pub struct FileIngestor<'a> {
    config: &'a LoaderConfig,
    host: &'a dyn LoadHost,
    report: IngestReport,
    polled: usize,
}

impl<'a> FileIngestor<'a> {
    /// Create an ingestor.
    pub fn new(config: &'a LoaderConfig, host: &'a dyn LoadHost) -> Self {
        Self {
            config,
            host,
            report: IngestReport::default(),
            polled: 0,
        }
    }

    /// Ingest every source in order.
    ///
    /// `emit` receives each record; returning false stops ingestion (the
    /// consumer has gone away).
    pub fn run<F>(mut self, sources: &[SceneSource], mut emit: F) -> IngestReport
    where
        F: FnMut(PrimitiveRecord) -> bool,
    {
        for source in sources {
            let label: Arc<str> = Arc::from(source.label());
            let flow = match source {
                SceneSource::File(path) => match File::open(path) {
                    Ok(file) => {
                        log::debug!("Reading {}", label);
                        self.ingest(label, LossyLines::new(BufReader::new(file)), &mut emit)
                    }
                    Err(err) => {
                        self.unreadable(&label, &err);
                        Flow::Continue
                    }
                },
                SceneSource::Text { text, .. } => {
                    let lines = text.lines().map(|l| Ok(l.to_string()));
                    self.ingest(label, lines, &mut emit)
                }
            };
            if let Flow::Stop = flow {
                break;
            }
        }

        log::info!(
            "Ingested {} lines into {} records ({} references skipped{})",
            self.report.lines_read,
            self.report.records,
            self.report.references,
            if self.report.cancelled { ", cancelled" } else { "" }
        );
        self.report
    }

    fn ingest<I, F>(&mut self, label: Arc<str>, lines: I, emit: &mut F) -> Flow
    where
        I: Iterator<Item = io::Result<String>>,
        F: FnMut(PrimitiveRecord) -> bool,
    {
        let mut segmenter =
            Segmenter::new(Arc::clone(&label), self.config.reference_marker.clone());

        for (index, line) in lines.enumerate() {
            if self.poll_cancelled() {
                segmenter.discard();
                return Flow::Stop;
            }

            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    // The open record is incomplete; records flushed before it stand.
                    segmenter.discard();
                    self.unreadable(&label, &err);
                    return Flow::Continue;
                }
            };

            let line_no = index + 1;
            let step = segmenter.push_line(line_no, &line);
            if !crate::lexer::is_skipped_line(&line) {
                self.report.lines_read += 1;
            }
            if step.orphan {
                log::debug!("{}:{}: continuation line with no open record", label, line_no);
            }
            if let Some(reference) = step.reference {
                self.report.references += 1;
                let message = format!(
                    "{}:{}: unsupported external reference skipped: {}",
                    reference.source, reference.line, reference.text
                );
                log::debug!("{}", message);
                self.report
                    .diagnostics
                    .push(Diagnostic::warning(DiagnosticKind::UnsupportedReference, message));
            }
            if let Some(record) = step.flushed {
                if !self.send(record, emit) {
                    return Flow::Stop;
                }
            }
        }

        if self.host.is_cancelled() {
            self.cancel();
            return Flow::Stop;
        }
        if let Some(record) = segmenter.finish() {
            if !self.send(record, emit) {
                return Flow::Stop;
            }
        }
        Flow::Continue
    }

    fn send<F>(&mut self, record: PrimitiveRecord, emit: &mut F) -> bool
    where
        F: FnMut(PrimitiveRecord) -> bool,
    {
        if emit(record) {
            self.report.records += 1;
            true
        } else {
            log::debug!("Record consumer closed, stopping ingestion");
            false
        }
    }

    fn poll_cancelled(&mut self) -> bool {
        let due = self.polled % self.config.poll_interval == 0;
        self.polled += 1;
        if due && self.host.is_cancelled() {
            self.cancel();
            return true;
        }
        false
    }

    fn cancel(&mut self) {
        if !self.report.cancelled {
            log::info!("Ingestion cancelled after {} records", self.report.records);
            self.report.cancelled = true;
            self.host.abort();
        }
    }

    fn unreadable(&mut self, label: &str, err: &io::Error) {
        let message = format!("cannot read {}: {}", label, err);
        log::debug!("{}", message);
        self.report
            .diagnostics
            .push(Diagnostic::error(DiagnosticKind::UnreadableSource, message));
    }
}
