//! # SmartCat - Page-Aligned File Output
//!
//! SmartCat copies a single file to standard output, verbatim, using a read
//! buffer that is aligned to the memory page size and sized from the page
//! size, the file's preferred I/O block size and a configurable scale factor.
//!
//! ## Features
//!
//! - **Sizing Policy**: `max(page, block) * scale_factor`, with invalid block
//!   sizes falling back to the page size
//! - **Aligned Buffers**: native aligned allocation or over-allocate-and-offset,
//!   both behind one owning type
//! - **Robust Copy Loop**: short reads, short writes and interrupted calls are
//!   handled as normal control flow
//! - **Guaranteed Release**: buffer and source handle released exactly once on
//!   every path
//! - **Access Hints**: best-effort sequential read-ahead advice
//!
//! ## Quick Start
//!
//! ```no_run
//! use smartcat::core::cat_file;
//! use std::path::Path;
//!
//! let stats = cat_file(Path::new("/var/log/syslog")).unwrap();
//! eprintln!("Copied {} bytes", stats.bytes_copied);
//! ```
//!
//! ## Custom Strategy
//!
//! ```no_run
//! use smartcat::config::{AllocStrategy, CatConfig, Preset};
//! use smartcat::core::CatEngine;
//! use std::path::Path;
//!
//! let mut config = CatConfig::for_preset("/data/big.img", Preset::Scaled);
//! config.sizing.scale_factor = 32;
//! config.alloc = AllocStrategy::Native;
//!
//! let engine = CatEngine::new(&config);
//! let mut sink = Vec::new();
//! let stats = engine.copy_path(Path::new("/data/big.img"), &mut sink).unwrap();
//! stats.print_summary();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod core;
pub mod error;
pub mod fs;
pub mod system;

// Re-export commonly used types
pub use config::{AllocStrategy, CatConfig, Preset, SizingConfig};
pub use core::{CatEngine, CopyStats};
pub use error::{CatError, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    //! Convenient re-exports for common usage
    //!
    //! ```no_run
    //! use smartcat::prelude::*;
    //! ```

    pub use crate::config::{AllocStrategy, CatConfig, Preset, SizingConfig};
    pub use crate::core::{
        cat_file, AlignedBuffer, BufferAllocator, CatEngine, CopyState, CopyStats, SizingPolicy,
        Transfer,
    };
    pub use crate::error::{CatError, Result};
    pub use crate::fs::{CopySource, SourceDescriptor};
    pub use crate::system::page_size;
}
