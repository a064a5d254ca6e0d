//! Sequential access hints
//!
//! Advice is purely a performance hint. Nothing here returns a [`CatError`],
//! so a failed hint cannot abort a copy.
//!
//! [`CatError`]: crate::error::CatError

use crate::fs::CopySource;
use std::fs::File;
use std::io;
use thiserror::Error;

/// Why an access hint could not be applied
#[derive(Error, Debug)]
pub enum AdviceError {
    /// The OS rejected the advice
    #[error("posix_fadvise: {0}")]
    Os(#[source] io::Error),

    /// The platform has no advice primitive
    #[error("access hints are not supported on this platform")]
    Unsupported,
}

/// Advise the kernel that `file` will be read sequentially from start to end
#[cfg(any(target_os = "linux", target_os = "android", target_os = "freebsd"))]
pub fn advise_sequential(file: &File) -> Result<(), AdviceError> {
    use std::os::unix::io::AsRawFd;

    // offset 0, len 0 covers the whole file
    let ret = unsafe { libc::posix_fadvise(file.as_raw_fd(), 0, 0, libc::POSIX_FADV_SEQUENTIAL) };

    // posix_fadvise returns the error number instead of setting errno
    if ret != 0 {
        return Err(AdviceError::Os(io::Error::from_raw_os_error(ret)));
    }

    Ok(())
}

/// Advise the kernel that `file` will be read sequentially from start to end
#[cfg(not(any(target_os = "linux", target_os = "android", target_os = "freebsd")))]
pub fn advise_sequential(_file: &File) -> Result<(), AdviceError> {
    Err(AdviceError::Unsupported)
}

/// Apply the sequential hint to `source`, reporting failure through tracing
///
/// Returns whether the hint was accepted.
pub fn advise<S: CopySource + ?Sized>(source: &S) -> bool {
    match source.advise_sequential() {
        Ok(()) => {
            tracing::debug!("Sequential access hint applied to {:?}", source.path());
            true
        }
        Err(AdviceError::Unsupported) => {
            tracing::debug!("Sequential access hint unsupported for {:?}", source.path());
            false
        }
        Err(e) => {
            tracing::warn!("Access hint for {:?} failed: {}", source.path(), e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(target_os = "linux")]
    #[test]
    fn test_advise_regular_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(advise_sequential(file.as_file()).is_ok());
    }

    #[test]
    fn test_error_message() {
        let err = AdviceError::Os(io::Error::from_raw_os_error(29));
        assert!(err.to_string().starts_with("posix_fadvise"));
    }
}
