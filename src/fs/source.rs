//! Source file handle
//!
//! [`SourceDescriptor`] owns the read-only handle being copied. It is released
//! exactly once, either explicitly through [`CopySource::release`], which
//! reports close failures, or by `Drop` on an unwinding path.

use crate::error::{IoResultExt, Result};
use crate::fs::advice::{self, AdviceError};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Something the copy loop can read from
///
/// Implemented by [`SourceDescriptor`] for real files. Tests substitute their
/// own sources to inject failures and observe release.
pub trait CopySource: Read {
    /// Path used in diagnostics
    fn path(&self) -> &Path;

    /// Preferred I/O block size as reported by filesystem metadata
    ///
    /// The raw value is returned unvalidated; sizing decides whether to use it.
    fn block_size(&self) -> io::Result<i64>;

    /// Best-effort hint that the whole source will be read sequentially
    fn advise_sequential(&self) -> std::result::Result<(), AdviceError> {
        Err(AdviceError::Unsupported)
    }

    /// Close the handle, surfacing any error the OS reports
    fn release(self) -> io::Result<()>
    where
        Self: Sized;
}

/// An open, read-only file plus the path it came from
#[derive(Debug)]
pub struct SourceDescriptor {
    path: PathBuf,
    file: File,
}

impl SourceDescriptor {
    /// Open `path` for reading
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).or_open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }
}

impl Read for SourceDescriptor {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl CopySource for SourceDescriptor {
    fn path(&self) -> &Path {
        &self.path
    }

    #[cfg(unix)]
    fn block_size(&self) -> io::Result<i64> {
        use std::os::unix::fs::MetadataExt;

        let blksize = self.file.metadata()?.blksize();
        // Values beyond i64 are as invalid as negative ones
        Ok(i64::try_from(blksize).unwrap_or(-1))
    }

    #[cfg(not(unix))]
    fn block_size(&self) -> io::Result<i64> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "filesystem block size is not available on this platform",
        ))
    }

    fn advise_sequential(&self) -> std::result::Result<(), AdviceError> {
        advice::advise_sequential(&self.file)
    }

    #[cfg(unix)]
    fn release(self) -> io::Result<()> {
        use nix::errno::Errno;
        use std::os::unix::io::IntoRawFd;

        let fd = self.file.into_raw_fd();
        match nix::unistd::close(fd) {
            // The descriptor is gone even when close is interrupted
            Ok(()) | Err(Errno::EINTR) => Ok(()),
            Err(e) => Err(io::Error::from(e)),
        }
    }

    #[cfg(not(unix))]
    fn release(self) -> io::Result<()> {
        drop(self.file);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_open_and_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("input.txt");
        File::create(&path).unwrap().write_all(b"hello").unwrap();

        let mut source = SourceDescriptor::open(&path).unwrap();
        assert_eq!(source.path(), path.as_path());

        let mut content = String::new();
        source.read_to_string(&mut content).unwrap();
        assert_eq!(content, "hello");

        source.release().unwrap();
    }

    #[test]
    fn test_open_missing_path() {
        let dir = TempDir::new().unwrap();
        let err = SourceDescriptor::open(dir.path().join("missing")).unwrap_err();

        assert_eq!(err.operation(), crate::error::Operation::Open);
        assert_eq!(err.io_error().unwrap().kind(), io::ErrorKind::NotFound);
    }

    #[cfg(unix)]
    #[test]
    fn test_block_size_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("input.bin");
        File::create(&path).unwrap();

        let source = SourceDescriptor::open(&path).unwrap();
        assert!(source.block_size().unwrap() > 0);
        source.release().unwrap();
    }
}
