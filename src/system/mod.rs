//! System resource detection module
//!
//! Provides the memory page size that buffer sizing and alignment build on.

mod memory;

pub use memory::*;
