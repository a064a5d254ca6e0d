//! Unbuffered standard output
//!
//! `std::io::Stdout` is line buffered, which would split or coalesce writes
//! behind our back. [`RawStdout`] writes straight to the stdout descriptor so
//! every `write` call is one syscall and partial writes surface to the caller.

#[cfg(unix)]
use std::fs::File;
use std::io::{self, Write};

/// Direct handle to the process's standard output
#[derive(Debug)]
pub struct RawStdout {
    #[cfg(unix)]
    inner: File,
    #[cfg(not(unix))]
    inner: io::Stdout,
}

impl RawStdout {
    /// Duplicate the stdout descriptor into an owned, unbuffered handle
    #[cfg(unix)]
    pub fn open() -> io::Result<Self> {
        use std::os::fd::AsFd;

        let fd = io::stdout().as_fd().try_clone_to_owned()?;
        Ok(Self {
            inner: File::from(fd),
        })
    }

    /// Fall back to the standard stream where descriptors are unavailable
    #[cfg(not(unix))]
    pub fn open() -> io::Result<Self> {
        Ok(Self {
            inner: io::stdout(),
        })
    }
}

impl Write for RawStdout {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
