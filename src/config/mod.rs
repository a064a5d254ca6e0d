//! Configuration module for SmartCat
//!
//! Provides CLI arguments, strategy presets and runtime settings.

mod settings;

pub use settings::*;
