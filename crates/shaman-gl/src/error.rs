//! Errors reported by the assembly pipeline and the program store.

use std::fmt;

use shaman_common::{SourceError, Stage};
use thiserror::Error;

/// Closed classification of every failure the crate reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    LocationOutOfBounds,
    LocationNotEmpty,
    LocationEmpty,
    SourceOpenFailed(Stage),
    SourceIoFailed(Stage),
    SourceMissing(Stage),
    StageCompileFailed(Stage),
    LinkFailed,
    ValidateFailed,
}

impl ErrorKind {
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::LocationOutOfBounds => "location-out-of-bounds",
            ErrorKind::LocationNotEmpty => "location-not-empty",
            ErrorKind::LocationEmpty => "location-empty",
            ErrorKind::SourceOpenFailed(_) => "source-open-failed",
            ErrorKind::SourceIoFailed(_) => "source-io-failed",
            ErrorKind::SourceMissing(_) => "source-missing",
            ErrorKind::StageCompileFailed(_) => "stage-compile-failed",
            ErrorKind::LinkFailed => "link-failed",
            ErrorKind::ValidateFailed => "validate-failed",
        }
    }

    /// Stage the failure is attributed to, if any.
    pub fn stage(self) -> Option<Stage> {
        match self {
            ErrorKind::SourceOpenFailed(stage)
            | ErrorKind::SourceIoFailed(stage)
            | ErrorKind::SourceMissing(stage)
            | ErrorKind::StageCompileFailed(stage) => Some(stage),
            _ => None,
        }
    }

    /// Stable integer status. 0 is reserved for success; 1..=11 follow the
    /// classic numbering, the remaining kinds come after.
    pub fn code(self) -> i32 {
        use Stage::*;
        match self {
            ErrorKind::LocationOutOfBounds => 1,
            ErrorKind::LocationNotEmpty => 2,
            ErrorKind::LocationEmpty => 3,
            ErrorKind::SourceOpenFailed(Vertex) => 4,
            ErrorKind::SourceOpenFailed(Fragment) => 5,
            ErrorKind::SourceIoFailed(Vertex) => 6,
            ErrorKind::SourceIoFailed(Fragment) => 7,
            ErrorKind::StageCompileFailed(Vertex) => 8,
            ErrorKind::StageCompileFailed(Fragment) => 9,
            ErrorKind::LinkFailed => 10,
            ErrorKind::ValidateFailed => 11,
            ErrorKind::SourceMissing(Vertex) => 12,
            ErrorKind::SourceMissing(Fragment) => 13,
            ErrorKind::SourceMissing(Geometry) => 14,
            ErrorKind::SourceOpenFailed(Geometry) => 15,
            ErrorKind::SourceIoFailed(Geometry) => 16,
            ErrorKind::StageCompileFailed(Geometry) => 17,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.stage() {
            Some(stage) => write!(f, "{} ({})", self.name(), stage),
            None => f.write_str(self.name()),
        }
    }
}

fn log_suffix(log: &Option<String>) -> String {
    match log {
        Some(text) => format!(": {}", text.trim_end()),
        None => String::new(),
    }
}

/// Errors that can occur while assembling or storing a program.
#[derive(Debug, Error)]
pub enum ShamanError {
    #[error("location ({table}, {row}) is outside the {tables}x{rows} store")]
    LocationOutOfBounds {
        table: usize,
        row: usize,
        tables: usize,
        rows: usize,
    },
    #[error("location ({table}, {row}) already holds a program")]
    LocationNotEmpty { table: usize, row: usize },
    #[error("location ({table}, {row}) holds no program")]
    LocationEmpty { table: usize, row: usize },
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("{stage} shader compile error{}", log_suffix(log))]
    StageCompile { stage: Stage, log: Option<String> },
    #[error("program link error{}", log_suffix(log))]
    Link { log: Option<String> },
    #[error("program validation error{}", log_suffix(log))]
    Validate { log: Option<String> },
}

impl ShamanError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ShamanError::LocationOutOfBounds { .. } => ErrorKind::LocationOutOfBounds,
            ShamanError::LocationNotEmpty { .. } => ErrorKind::LocationNotEmpty,
            ShamanError::LocationEmpty { .. } => ErrorKind::LocationEmpty,
            ShamanError::Source(SourceError::Open { stage, .. }) => ErrorKind::SourceOpenFailed(*stage),
            ShamanError::Source(SourceError::Io { stage, .. }) => ErrorKind::SourceIoFailed(*stage),
            ShamanError::Source(SourceError::Missing { stage }) => ErrorKind::SourceMissing(*stage),
            ShamanError::StageCompile { stage, .. } => ErrorKind::StageCompileFailed(*stage),
            ShamanError::Link { .. } => ErrorKind::LinkFailed,
            ShamanError::Validate { .. } => ErrorKind::ValidateFailed,
        }
    }

    /// Driver diagnostic captured at failure time. Advisory only.
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            ShamanError::StageCompile { log, .. }
            | ShamanError::Link { log }
            | ShamanError::Validate { log } => log.as_deref(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ShamanError>;
