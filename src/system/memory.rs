//! Virtual memory page size detection
//!
//! The page size is the minimum unit every I/O buffer is aligned to and sized
//! in. When the OS cannot report it, [`DEFAULT_PAGE_SIZE`] is used.

use serde::{Deserialize, Serialize};

/// Page size assumed when the system does not report one
pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// Where a page size value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSizeSource {
    /// Reported by the operating system
    System,
    /// The system query failed or returned nonsense
    Fallback,
}

/// Memory page information
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    /// Page size in bytes, always a power of two
    pub size: usize,
    /// Origin of `size`
    pub source: PageSizeSource,
}

impl PageInfo {
    /// Query the running system
    pub fn detect() -> Self {
        Self::from_raw(query_page_size())
    }

    /// Validate a raw value, substituting [`DEFAULT_PAGE_SIZE`] when it is
    /// absent, non-positive or not a power of two.
    pub fn from_raw(raw: Option<i64>) -> Self {
        match raw {
            Some(n) if n > 0 && (n as u64).is_power_of_two() => Self {
                size: n as usize,
                source: PageSizeSource::System,
            },
            _ => Self {
                size: DEFAULT_PAGE_SIZE,
                source: PageSizeSource::Fallback,
            },
        }
    }
}

/// System page size in bytes, falling back to [`DEFAULT_PAGE_SIZE`]
pub fn page_size() -> usize {
    PageInfo::detect().size
}

#[cfg(unix)]
fn query_page_size() -> Option<i64> {
    use nix::unistd::{sysconf, SysconfVar};

    match sysconf(SysconfVar::PAGE_SIZE) {
        Ok(Some(n)) => Some(i64::from(n)),
        Ok(None) => None,
        Err(e) => {
            tracing::debug!("sysconf(PAGE_SIZE) failed: {}", e);
            None
        }
    }
}

#[cfg(not(unix))]
fn query_page_size() -> Option<i64> {
    None
}
