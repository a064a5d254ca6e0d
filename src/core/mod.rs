//! Core copy engine module
//!
//! Provides buffer sizing, page-aligned buffer allocation and the
//! read/write loop that moves a file to its destination.

mod buffer;
mod copier;
mod sizing;

pub use buffer::*;
pub use copier::*;
pub use sizing::*;
