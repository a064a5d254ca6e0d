//! Error types for SmartCat
//!
//! Every fatal failure of a copy maps to one [`CatError`] variant naming the
//! operation that failed. Metadata lookups and access hints have their own
//! failure types that never become a `CatError`.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for SmartCat operations
#[derive(Error, Debug)]
pub enum CatError {
    /// Bad invocation, detected before the copy starts
    #[error("usage: {0}")]
    Usage(String),

    /// The source path could not be opened
    #[error("open '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The aligned buffer could not be allocated
    #[error("allocate {size} bytes: {reason}")]
    Allocation { size: usize, reason: String },

    /// Reading from the source failed
    #[error("read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing to the destination failed
    #[error("write: {source}")]
    Write {
        #[source]
        source: std::io::Error,
    },

    /// Closing the source handle failed
    #[error("close '{path}': {source}")]
    Release {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The operation a [`CatError`] originates from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Argument validation
    Usage,
    /// Opening the source
    Open,
    /// Acquiring the buffer
    Allocate,
    /// Reading the source
    Read,
    /// Writing the destination
    Write,
    /// Releasing the source handle
    Close,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Usage => "usage",
            Self::Open => "open",
            Self::Allocate => "allocate",
            Self::Read => "read",
            Self::Write => "write",
            Self::Close => "close",
        };
        f.write_str(name)
    }
}

impl CatError {
    /// Create an open error with path context
    pub fn open(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Open {
            path: path.into(),
            source,
        }
    }

    /// Create a read error with path context
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Create a write error
    pub fn write(source: std::io::Error) -> Self {
        Self::Write { source }
    }

    /// Create a release (close) error with path context
    pub fn release(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Release {
            path: path.into(),
            source,
        }
    }

    /// Create an allocation error
    pub fn allocation(size: usize, reason: impl Into<String>) -> Self {
        Self::Allocation {
            size,
            reason: reason.into(),
        }
    }

    /// Create a usage error
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }

    /// Which operation failed
    pub fn operation(&self) -> Operation {
        match self {
            Self::Usage(_) => Operation::Usage,
            Self::Open { .. } => Operation::Open,
            Self::Allocation { .. } => Operation::Allocate,
            Self::Read { .. } => Operation::Read,
            Self::Write { .. } => Operation::Write,
            Self::Release { .. } => Operation::Close,
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        1
    }

    /// Get the path associated with this error, if any
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Open { path, .. } | Self::Read { path, .. } | Self::Release { path, .. } => {
                Some(path)
            }
            _ => None,
        }
    }

    /// Underlying OS error, if any
    pub fn io_error(&self) -> Option<&std::io::Error> {
        match self {
            Self::Open { source, .. }
            | Self::Read { source, .. }
            | Self::Write { source }
            | Self::Release { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Result type alias for SmartCat operations
pub type Result<T> = std::result::Result<T, CatError>;

/// Extension trait for tagging `std::io::Result` with the failed operation
pub trait IoResultExt<T> {
    /// Map the error into [`CatError::Open`]
    fn or_open(self, path: impl Into<PathBuf>) -> Result<T>;
    /// Map the error into [`CatError::Read`]
    fn or_read(self, path: impl Into<PathBuf>) -> Result<T>;
    /// Map the error into [`CatError::Write`]
    fn or_write(self) -> Result<T>;
    /// Map the error into [`CatError::Release`]
    fn or_release(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn or_open(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| CatError::open(path, e))
    }

    fn or_read(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| CatError::read(path, e))
    }

    fn or_write(self) -> Result<T> {
        self.map_err(CatError::write)
    }

    fn or_release(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| CatError::release(path, e))
    }
}
