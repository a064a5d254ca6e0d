//! File system operations module
//!
//! Source handles, access hints and the raw stdout destination used by the
//! copy engine.

pub mod advice;
mod source;
mod stdout;

pub use advice::{advise, AdviceError};
pub use source::*;
pub use stdout::RawStdout;
