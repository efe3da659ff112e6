use std::fmt::Display;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Invalid mapping: {0}")]
    InvalidMapping(String),
    #[error("Processing error: {0}")]
    Processing(String),
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),
    #[error("Run cancelled before completion")]
    Cancelled,
}

/// Category of a non-fatal issue collected during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssueKind {
    /// The record could not produce its own subject and contributed nothing.
    RecordRejected,
    /// A single field or template instantiation was skipped.
    FieldWarning,
    /// A later record reused an earlier record's primary key and was merged into it.
    DuplicatePrimaryKey,
}

impl Display for IssueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssueKind::RecordRejected => write!(f, "record rejected"),
            IssueKind::FieldWarning => write!(f, "field warning"),
            IssueKind::DuplicatePrimaryKey => write!(f, "duplicate primary key"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingMessage {
    pub kind: IssueKind,
    pub message: String,
    /// Column the issue was raised for, when it is tied to one.
    pub source: Option<String>,
    /// 1-based data row number.
    pub row: Option<usize>,
}

impl ProcessingMessage {
    pub fn new(
        kind: IssueKind,
        message: impl Into<String>,
        source: Option<String>,
        row: Option<usize>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source,
            row,
        }
    }

    pub fn warning(message: impl Into<String>, source: Option<&str>, row: usize) -> Self {
        Self::new(
            IssueKind::FieldWarning,
            message,
            source.map(str::to_string),
            Some(row),
        )
    }

    pub fn rejected(message: impl Into<String>, row: usize) -> Self {
        Self::new(IssueKind::RecordRejected, message, None, Some(row))
    }
}

impl Display for ProcessingMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}", self.kind)?;
        if let Some(row) = self.row {
            write!(f, ", Row: {}", row)?;
        }
        if let Some(source) = &self.source {
            write!(f, ", Column: {}", source)?;
        }
        write!(f, "] {}", self.message)
    }
}

/// Run report: every non-fatal issue raised while processing, plus counters.
#[derive(Debug, Default, Clone)]
pub struct RunReport {
    messages: Vec<ProcessingMessage>,
    records_seen: usize,
    records_projected: usize,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: ProcessingMessage) {
        self.messages.push(message);
    }

    pub fn add_warning(&mut self, message: impl Into<String>, source: Option<String>) {
        self.messages.push(ProcessingMessage::new(
            IssueKind::FieldWarning,
            message,
            source,
            None,
        ));
    }

    pub(crate) fn record_seen(&mut self) {
        self.records_seen += 1;
    }

    pub(crate) fn record_projected(&mut self) {
        self.records_projected += 1;
    }

    pub fn records_seen(&self) -> usize {
        self.records_seen
    }

    pub fn records_projected(&self) -> usize {
        self.records_projected
    }

    pub fn messages(&self) -> &[ProcessingMessage] {
        &self.messages
    }

    pub fn of_kind(&self, kind: IssueKind) -> impl Iterator<Item = &ProcessingMessage> {
        self.messages.iter().filter(move |m| m.kind == kind)
    }

    pub fn rejected(&self) -> Vec<&ProcessingMessage> {
        self.of_kind(IssueKind::RecordRejected).collect()
    }

    pub fn warnings(&self) -> Vec<&ProcessingMessage> {
        self.of_kind(IssueKind::FieldWarning).collect()
    }

    pub fn duplicates(&self) -> Vec<&ProcessingMessage> {
        self.of_kind(IssueKind::DuplicatePrimaryKey).collect()
    }

    pub fn has_rejections(&self) -> bool {
        self.messages
            .iter()
            .any(|m| m.kind == IssueKind::RecordRejected)
    }

    pub fn is_clean(&self) -> bool {
        self.messages.is_empty()
    }

    /// Emit every collected message through `tracing`.
    pub fn log(&self) {
        for message in &self.messages {
            match message.kind {
                IssueKind::RecordRejected => tracing::error!("{}", message),
                IssueKind::FieldWarning => tracing::warn!("{}", message),
                IssueKind::DuplicatePrimaryKey => tracing::info!("{}", message),
            }
        }
        tracing::info!(
            "Records seen: {}, projected: {}, rejected: {}, warnings: {}",
            self.records_seen,
            self.records_projected,
            self.rejected().len(),
            self.warnings().len()
        );
    }
}

#[derive(Debug)]
pub enum ProcessingOutcome {
    Success,
    SuccessWithWarnings(Vec<ProcessingMessage>),
    Failure {
        rejected: Vec<ProcessingMessage>,
        warnings: Vec<ProcessingMessage>,
    },
}

impl ProcessingOutcome {
    pub fn from_report(report: &RunReport) -> Self {
        if report.is_clean() {
            ProcessingOutcome::Success
        } else if report.has_rejections() {
            ProcessingOutcome::Failure {
                rejected: report.rejected().into_iter().cloned().collect(),
                warnings: report
                    .messages()
                    .iter()
                    .filter(|m| m.kind != IssueKind::RecordRejected)
                    .cloned()
                    .collect(),
            }
        } else {
            ProcessingOutcome::SuccessWithWarnings(report.messages().to_vec())
        }
    }
}
