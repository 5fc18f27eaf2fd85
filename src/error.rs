use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReclsError {
    #[error("general failure: {0}")]
    GenericFailure(String),

    // Navigation
    #[error("search has no current entry")]
    NoCurrentEntry,

    #[error("no more data")]
    NoMoreData,

    // Setup
    #[error("invalid directory: {}", .0.display())]
    InvalidDirectory(PathBuf),

    #[error("invalid search type")]
    InvalidSearchType,

    #[error("invalid pattern: {0}")]
    InvalidPattern(String),

    // Resources
    #[error("out of memory")]
    OutOfMemory,

    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    // Property access
    #[error("index {index} out of range (count {count})")]
    IndexOutOfRange { index: usize, count: usize },
}

impl ReclsError {
    /// The abstract kind of this error, for code-style reporting.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::GenericFailure(_)         => ErrorKind::GenericFailure,
            Self::NoCurrentEntry            => ErrorKind::NoCurrentEntry,
            Self::NoMoreData                => ErrorKind::NoMoreData,
            Self::InvalidDirectory(_)       => ErrorKind::InvalidDirectory,
            Self::InvalidSearchType         => ErrorKind::InvalidSearchType,
            Self::InvalidPattern(_)         => ErrorKind::InvalidPattern,
            Self::OutOfMemory               => ErrorKind::OutOfMemory,
            Self::NotImplemented(_)         => ErrorKind::NotImplemented,
            Self::IndexOutOfRange { .. }    => ErrorKind::IndexOutOfRange,
        }
    }

    /// The path this error occurred at, if applicable.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::InvalidDirectory(p) => Some(p),
            _ => None,
        }
    }

    /// Whether this is the normal end-of-enumeration signal.
    ///
    /// `NoMoreData` terminates a search; callers that drive enumeration
    /// treat it as success rather than as a failure.
    pub fn is_end_of_data(&self) -> bool {
        matches!(self, Self::NoMoreData)
    }
}

/// Code-level classification of every outcome a search can report,
/// including success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Ok,
    GenericFailure,
    NoCurrentEntry,
    InvalidDirectory,
    NoMoreData,
    OutOfMemory,
    NotImplemented,
    InvalidSearchType,
    InvalidPattern,
    IndexOutOfRange,
}

impl ErrorKind {
    /// Fixed, non-localised description of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok                => "the operation completed successfully",
            Self::GenericFailure    => "general failure",
            Self::NoCurrentEntry    => "search has no current entry",
            Self::InvalidDirectory  => "the given directory was not found or is invalid",
            Self::NoMoreData        => "no more data",
            Self::OutOfMemory       => "out of memory",
            Self::NotImplemented    => "not implemented",
            Self::InvalidSearchType => "invalid search type",
            Self::InvalidPattern    => "invalid search pattern",
            Self::IndexOutOfRange   => "index out of range",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of an operation's outcome: `Ok` on success, the error's kind otherwise.
pub fn kind_of<T>(result: &Result<T, ReclsError>) -> ErrorKind {
    match result {
        Ok(_)  => ErrorKind::Ok,
        Err(e) => e.kind(),
    }
}
