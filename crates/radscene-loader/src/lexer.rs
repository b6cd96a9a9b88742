//! Line classification and record segmentation.
//!
//! Scene text has no explicit record delimiters. A record starts at a header
//! line (`<modifier> <type> <name>`) and runs until the next header, with the
//! argument counts and values on continuation lines in between. Headers are
//! recognised by letter presence: any alphabetic character other than `e`/`E`
//! makes a header, so exponents like `1.0e-05` stay continuation data.

use std::sync::Arc;

/// True for lines the segmenter never looks at: blank lines and comments.
pub fn is_skipped_line(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.is_empty() || trimmed.starts_with('#')
}

/// True if the line starts a new record.
pub fn is_header_line(line: &str) -> bool {
    line.chars().any(|c| c.is_alphabetic() && c != 'e' && c != 'E')
}

/// True if a header line points at external geometry.
pub fn is_reference_line(line: &str, marker: &str) -> bool {
    line.contains(marker)
}

/// Classification of a single input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass {
    /// Blank or comment.
    Skip,
    /// Starts a new record.
    Header,
    /// Header carrying the external-reference marker.
    Reference,
    /// Argument data for the current record.
    Continuation,
}

/// Classify a line given the external-reference marker.
pub fn classify_line(line: &str, marker: &str) -> LineClass {
    if is_skipped_line(line) {
        LineClass::Skip
    } else if !is_header_line(line) {
        LineClass::Continuation
    } else if is_reference_line(line, marker) {
        LineClass::Reference
    } else {
        LineClass::Header
    }
}

/// Raw text of one primitive, whitespace-joined across its lines.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveRecord {
    /// Header and continuation lines joined by single spaces, trimmed.
    pub text: String,
    /// Label of the source the record came from.
    pub source: Arc<str>,
    /// 1-based line number of the header.
    pub line: usize,
}

/// A header that referenced external geometry and was skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalReference {
    /// The header line, trimmed.
    pub text: String,
    /// Label of the source.
    pub source: Arc<str>,
    /// 1-based line number.
    pub line: usize,
}

/// Segmenter state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmenterState {
    /// No record is open.
    Idle,
    /// A header has been seen and continuation lines are being collected.
    AccumulatingBody,
}

/// What a single line did to the segmenter.
#[derive(Debug, Default, PartialEq)]
pub struct SegmentStep {
    /// A record completed by this line.
    pub flushed: Option<PrimitiveRecord>,
    /// The line was an external reference.
    pub reference: Option<ExternalReference>,
    /// The line was continuation data with no open record.
    pub orphan: bool,
}

#[derive(Debug)]
struct Pending {
    text: String,
    line: usize,
}

/// Two-state record segmenter for one source.
#[derive(Debug)]
pub struct Segmenter {
    source: Arc<str>,
    marker: String,
    pending: Option<Pending>,
}

impl Segmenter {
    /// Create a segmenter for the named source.
    pub fn new(source: Arc<str>, marker: impl Into<String>) -> Self {
        Self {
            source,
            marker: marker.into(),
            pending: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> SegmenterState {
        match self.pending {
            Some(_) => SegmenterState::AccumulatingBody,
            None => SegmenterState::Idle,
        }
    }

    /// Feed one line (1-based `line_no`).
    pub fn push_line(&mut self, line_no: usize, line: &str) -> SegmentStep {
        let mut step = SegmentStep::default();
        match classify_line(line, &self.marker) {
            LineClass::Skip => {}
            LineClass::Header => {
                step.flushed = self.flush();
                self.pending = Some(Pending {
                    text: line.trim().to_string(),
                    line: line_no,
                });
            }
            LineClass::Reference => {
                step.flushed = self.flush();
                step.reference = Some(ExternalReference {
                    text: line.trim().to_string(),
                    source: Arc::clone(&self.source),
                    line: line_no,
                });
            }
            LineClass::Continuation => match self.pending.as_mut() {
                Some(pending) => {
                    pending.text.push(' ');
                    pending.text.push_str(line);
                }
                None => step.orphan = true,
            },
        }
        step
    }

    /// End of input: flush whatever is open.
    pub fn finish(mut self) -> Option<PrimitiveRecord> {
        self.flush()
    }

    /// Drop the open record without emitting it.
    pub fn discard(&mut self) {
        self.pending = None;
    }

    fn flush(&mut self) -> Option<PrimitiveRecord> {
        let pending = self.pending.take()?;
        Some(PrimitiveRecord {
            text: pending.text.trim().to_string(),
            source: Arc::clone(&self.source),
            line: pending.line,
        })
    }
}
