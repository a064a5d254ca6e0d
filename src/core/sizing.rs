//! Buffer sizing policy
//!
//! The buffer size is `max(page, block) * scale_factor`, where `block` is the
//! file's preferred I/O size when it is a positive power of two and the page
//! size otherwise. The file length never enters into it.

use crate::config::SizingConfig;
use crate::fs::CopySource;
use crate::system::PageInfo;
use serde::{Deserialize, Serialize};
use std::io;

/// Inputs to a buffer size decision, derived once per copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizingParameters {
    /// System page size
    pub page_size: usize,
    /// Validated filesystem block size, `None` when unused or invalid
    pub block_size: Option<usize>,
    /// Multiplier applied to the base unit
    pub scale_factor: usize,
}

impl SizingParameters {
    /// Larger of the page size and the validated block size
    pub fn base_unit(&self) -> usize {
        self.block_size
            .map_or(self.page_size, |block| block.max(self.page_size))
    }

    /// Buffer size in bytes
    ///
    /// Always a positive multiple of `base_unit()`. A scale factor that would
    /// overflow is clamped so the result still fits in an allocation layout.
    pub fn buffer_size(&self) -> usize {
        let base = self.base_unit();
        let max_scale = (isize::MAX as usize) / base;
        let scale = self.scale_factor.clamp(1, max_scale.max(1));

        if scale != self.scale_factor {
            tracing::debug!(
                "Scale factor {} clamped to {} for base unit {}",
                self.scale_factor,
                scale,
                base
            );
        }

        base * scale
    }
}

/// Validate a raw block size query against the page size
///
/// A failed query, a non-positive value or a value that is not a power of two
/// is replaced by the page size.
pub fn validate_block_size(raw: io::Result<i64>, page_size: usize) -> usize {
    match raw {
        Ok(n) if n > 0 && (n as u64).is_power_of_two() => match usize::try_from(n) {
            Ok(size) => size,
            Err(_) => page_size,
        },
        Ok(n) => {
            tracing::debug!("Ignoring invalid filesystem block size {}", n);
            page_size
        }
        Err(e) => {
            tracing::debug!("Block size query failed, using page size: {}", e);
            page_size
        }
    }
}

/// Computes buffer sizes from a [`SizingConfig`] and the system page size
#[derive(Debug, Clone, Copy)]
pub struct SizingPolicy {
    config: SizingConfig,
    page_size: usize,
}

impl SizingPolicy {
    /// Create a policy using the detected system page size
    pub fn new(config: SizingConfig) -> Self {
        Self::with_page_size(config, PageInfo::detect().size)
    }

    /// Create a policy with an explicit page size
    pub fn with_page_size(config: SizingConfig, page_size: usize) -> Self {
        let page_size = PageInfo::from_raw(i64::try_from(page_size).ok()).size;
        Self { config, page_size }
    }

    /// Page size this policy aligns to
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Derive the sizing parameters for `source`
    pub fn parameters<S: CopySource + ?Sized>(&self, source: &S) -> SizingParameters {
        let block_size = if self.config.use_block_size_alignment {
            Some(validate_block_size(source.block_size(), self.page_size))
        } else {
            None
        };

        SizingParameters {
            page_size: self.page_size,
            block_size,
            scale_factor: self.config.scale_factor.max(1),
        }
    }

    /// Buffer size in bytes to use for `source`
    pub fn compute_buffer_size<S: CopySource + ?Sized>(&self, source: &S) -> usize {
        self.parameters(source).buffer_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Read;
    use std::path::Path;

    /// Source that only reports a block size
    struct Meta(io::Result<i64>);

    impl Read for Meta {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Ok(0)
        }
    }

    impl CopySource for Meta {
        fn path(&self) -> &Path {
            Path::new("meta")
        }

        fn block_size(&self) -> io::Result<i64> {
            match &self.0 {
                Ok(n) => Ok(*n),
                Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
            }
        }

        fn release(self) -> io::Result<()> {
            Ok(())
        }
    }

    fn config(scale_factor: usize, use_block_size_alignment: bool) -> SizingConfig {
        SizingConfig {
            scale_factor,
            use_block_size_alignment,
        }
    }

    #[test]
    fn test_page_only() {
        let policy = SizingPolicy::with_page_size(config(1, false), 4096);
        assert_eq!(policy.compute_buffer_size(&Meta(Ok(65536))), 4096);
    }

    #[test]
    fn test_block_larger_than_page() {
        let policy = SizingPolicy::with_page_size(config(1, true), 4096);
        assert_eq!(policy.compute_buffer_size(&Meta(Ok(65536))), 65536);

        let policy = SizingPolicy::with_page_size(config(128, true), 4096);
        assert_eq!(policy.compute_buffer_size(&Meta(Ok(65536))), 65536 * 128);
    }

    #[test]
    fn test_block_smaller_than_page() {
        let policy = SizingPolicy::with_page_size(config(2, true), 16384);
        assert_eq!(policy.compute_buffer_size(&Meta(Ok(512))), 32768);
    }

    #[test]
    fn test_invalid_block_sizes_fall_back() {
        let policy = SizingPolicy::with_page_size(config(128, true), 4096);

        for raw in [0, -1, 3000, 4097] {
            assert_eq!(policy.compute_buffer_size(&Meta(Ok(raw))), 4096 * 128);
        }

        let failed = Meta(Err(io::Error::new(io::ErrorKind::Other, "stat failed")));
        let params = policy.parameters(&failed);
        assert_eq!(params.block_size, Some(4096));
        assert_eq!(params.buffer_size(), 4096 * 128);
    }

    #[test]
    fn test_bad_page_size_uses_default() {
        let policy = SizingPolicy::with_page_size(config(1, false), 0);
        assert_eq!(policy.page_size(), crate::system::DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_huge_scale_is_clamped() {
        let params = SizingParameters {
            page_size: 4096,
            block_size: None,
            scale_factor: usize::MAX,
        };
        let size = params.buffer_size();
        assert!(size <= isize::MAX as usize);
        assert_eq!(size % 4096, 0);
    }

    proptest! {
        #[test]
        fn prop_size_is_multiple_of_page_and_block(
            page_shift in 9u32..17,
            block in prop_oneof![(0u32..24).prop_map(|s| 1i64 << s), -8192i64..70000],
            scale in 1usize..256,
        ) {
            let page = 1usize << page_shift;
            let policy = SizingPolicy::with_page_size(config(scale, true), page);
            let params = policy.parameters(&Meta(Ok(block)));
            let size = params.buffer_size();

            prop_assert!(size >= page);
            prop_assert_eq!(size % page, 0);
            if block > 0 && (block as u64).is_power_of_two() {
                prop_assert_eq!(size % block as usize, 0);
            }
        }
    }
}
