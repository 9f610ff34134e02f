//! Error types for archive data file access.
//!
//! Every failure the engine can produce is a variant of [`ArchiveError`]. The
//! variants fall into four families that callers usually treat differently:
//!
//! - **I/O** ([`ArchiveError::Io`], [`ArchiveError::Closed`]): an external
//!   precondition failed (missing file, unreadable file, handle already closed).
//! - **Out of range** ([`ArchiveError::RowNotFound`],
//!   [`ArchiveError::RowNotFoundById`]): a lookup found nothing. Callers can
//!   use these for "does row N exist" checks.
//! - **Inconsistent archive** ([`ArchiveError::ColumnOutOfRange`],
//!   [`ArchiveError::MalformedLine`], [`ArchiveError::UnenclosedLineBreak`]):
//!   the schema references a column that a line does not have, or a line
//!   cannot be split without losing data.
//! - **Precondition** ([`ArchiveError::NotAnExtension`],
//!   [`ArchiveError::NotACore`], [`ArchiveError::MissingCoreId`]): the caller
//!   asked for an index that makes no sense for the file.
//!
//! Schema and configuration problems are reported as
//! [`ArchiveError::InvalidSchema`], [`ArchiveError::UnknownEncoding`] and
//! [`ArchiveError::Layout`].

use std::path::PathBuf;
use thiserror::Error;

/// Errors from data file access, row materialization, indexing and joins.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The file could not be opened, read or seeked.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The data file was closed and can no longer be read.
    #[error("data file {} is closed", path.display())]
    Closed { path: PathBuf },

    /// No data row at `position` (0-based, header lines excluded).
    #[error("no row at position {position} in {} ({row_count} rows)", path.display())]
    RowNotFound {
        path: PathBuf,
        position: usize,
        row_count: usize,
    },

    /// No core row carries the requested id.
    #[error("no core row with id {id:?} in {}", path.display())]
    RowNotFoundById { path: PathBuf, id: String },

    /// The schema references a column beyond the fields present on a line.
    #[error(
        "archive invalid: {term} references column {column} but row {position} only has {available} fields"
    )]
    ColumnOutOfRange {
        term: String,
        column: usize,
        available: usize,
        position: usize,
    },

    /// The field splitter rejected a line.
    #[error("malformed line at row {position}: {source}")]
    MalformedLine {
        position: usize,
        #[source]
        source: csv::Error,
    },

    /// A line break outside an enclosed field would cut the line short.
    #[error("archive invalid: line break in an unenclosed field of row {position}")]
    UnenclosedLineBreak { position: usize },

    /// A link-key index was requested for a core data file.
    #[error("link-key index is only available for extension data files ({})", path.display())]
    NotAnExtension { path: PathBuf },

    /// A core-id index was requested for an extension data file.
    #[error("core-id index is only available for core data files ({})", path.display())]
    NotACore { path: PathBuf },

    /// A core file without an id column was asked to take part in a join.
    #[error("core data file {} declares no id column", path.display())]
    MissingCoreId { path: PathBuf },

    /// The schema itself is malformed.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// The schema names an encoding label that is not recognized.
    #[error("unknown encoding label: {0:?}")]
    UnknownEncoding(String),

    /// An archive layout document could not be loaded.
    #[error("invalid archive layout: {0}")]
    Layout(String),
}

impl ArchiveError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// `true` for lookups that simply found nothing.
    #[must_use]
    pub fn is_out_of_range(&self) -> bool {
        matches!(self, Self::RowNotFound { .. } | Self::RowNotFoundById { .. })
    }

    /// `true` when the archive content disagrees with its schema.
    #[must_use]
    pub fn is_inconsistent(&self) -> bool {
        matches!(
            self,
            Self::ColumnOutOfRange { .. }
                | Self::MalformedLine { .. }
                | Self::UnenclosedLineBreak { .. }
        )
    }

    /// `true` for calling-contract violations.
    #[must_use]
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::NotAnExtension { .. } | Self::NotACore { .. } | Self::MissingCoreId { .. }
        )
    }

    /// `true` for I/O failures, including reads from a closed file.
    #[must_use]
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::Closed { .. })
    }
}

/// Result type for archive operations.
pub type Result<T> = std::result::Result<T, ArchiveError>;
