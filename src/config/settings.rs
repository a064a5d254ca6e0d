//! Configuration settings for SmartCat
//!
//! Defines the CLI arguments, the strategy presets and the runtime
//! configuration handed to the copy engine.

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Scale factor applied to the page/block size by the tuned strategies
///
/// An empirically chosen value; treat it as a tunable
/// default rather than a proven optimum.
pub const DEFAULT_SCALE_FACTOR: usize = 128;

/// SmartCat - copy one file to stdout with page-aligned, block-sized buffers
#[derive(Parser, Debug, Clone)]
#[command(name = "smartcat")]
#[command(author = "SmartCopy Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Copy a file to stdout using page-aligned, block-size aware buffers")]
#[command(long_about = r#"
SmartCat copies a single file to standard output verbatim. The read buffer is
aligned to the memory page size and sized from the page size, the file's
preferred I/O block size and a scale factor.

Presets:
  page     one page per read
  block    max(page, block) per read
  scaled   128 x max(page, block), offset-aligned allocation
  tuned    128 x max(page, block), native aligned allocation, sequential hint

Examples:
  smartcat file.bin > copy.bin
  smartcat --preset page file.txt
  smartcat --scale-factor 32 --stats=json big.img > /dev/null
"#)]
pub struct CliArgs {
    /// File to copy to standard output
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Buffer sizing and allocation preset
    #[arg(long, value_enum, default_value = "tuned", value_name = "PRESET")]
    pub preset: Preset,

    /// Multiply the page/block size by this factor (overrides the preset)
    #[arg(long, value_name = "N")]
    pub scale_factor: Option<usize>,

    /// Aligned allocation strategy (overrides the preset)
    #[arg(long, value_enum, value_name = "STRATEGY")]
    pub alloc: Option<AllocStrategy>,

    /// Ignore the filesystem block size and size buffers from the page size alone
    #[arg(long)]
    pub no_block_align: bool,

    /// Issue a sequential access hint (overrides the preset)
    #[arg(long, conflicts_with = "no_advise")]
    pub advise: bool,

    /// Skip the sequential access hint (overrides the preset)
    #[arg(long)]
    pub no_advise: bool,

    /// Print a copy summary to stderr when done
    #[arg(
        long,
        value_enum,
        value_name = "FORMAT",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "text"
    )]
    pub stats: Option<StatsFormat>,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (only errors are reported)
    #[arg(short = 'q', long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl CliArgs {
    /// Log filter directive for the requested verbosity
    pub fn log_filter(&self) -> &'static str {
        if self.quiet {
            return "error";
        }

        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

/// Buffer strategy preset
///
/// Each preset is a point in the sizing/allocation space; every one of them
/// runs through the same copy engine.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// One page per read
    Page,
    /// max(page, filesystem block) per read
    Block,
    /// 128 x max(page, block), offset-aligned allocation
    Scaled,
    /// 128 x max(page, block), native aligned allocation, sequential hint
    #[default]
    Tuned,
}

impl Preset {
    /// Sizing parameters for this preset
    pub fn sizing(&self) -> SizingConfig {
        match self {
            Self::Page => SizingConfig {
                scale_factor: 1,
                use_block_size_alignment: false,
            },
            Self::Block => SizingConfig {
                scale_factor: 1,
                use_block_size_alignment: true,
            },
            Self::Scaled | Self::Tuned => SizingConfig {
                scale_factor: DEFAULT_SCALE_FACTOR,
                use_block_size_alignment: true,
            },
        }
    }

    /// Allocation strategy for this preset
    pub fn alloc(&self) -> AllocStrategy {
        match self {
            Self::Tuned => AllocStrategy::Native,
            _ => AllocStrategy::Offset,
        }
    }

    /// Whether this preset issues the sequential access hint
    pub fn advise(&self) -> bool {
        matches!(self, Self::Tuned)
    }

    /// Get human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Page => "page",
            Self::Block => "block",
            Self::Scaled => "scaled",
            Self::Tuned => "tuned",
        }
    }
}

/// How a page-aligned buffer is obtained
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AllocStrategy {
    /// Ask the allocator for page alignment directly
    #[default]
    Native,
    /// Over-allocate by one page and offset to the first page boundary
    Offset,
}

impl AllocStrategy {
    /// Get human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::Offset => "offset",
        }
    }
}

/// Buffer sizing configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizingConfig {
    /// Multiplier applied to the base unit, at least 1
    pub scale_factor: usize,
    /// Take the filesystem block size into account when it is valid
    pub use_block_size_alignment: bool,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Preset::default().sizing()
    }
}

impl SizingConfig {
    /// Check the configuration is usable
    pub fn validate(&self) -> Result<(), String> {
        if self.scale_factor == 0 {
            return Err("scale factor must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Summary output format
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatsFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON format
    Json,
}

/// Runtime configuration derived from CLI args
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatConfig {
    /// File to copy
    pub path: PathBuf,
    /// Buffer sizing
    pub sizing: SizingConfig,
    /// Aligned allocation strategy
    pub alloc: AllocStrategy,
    /// Issue the sequential access hint
    pub advise: bool,
    /// Print a summary after the copy
    #[serde(skip)]
    pub stats: Option<StatsFormat>,
}

impl Default for CatConfig {
    fn default() -> Self {
        Self::for_preset(PathBuf::new(), Preset::default())
    }
}

impl CatConfig {
    /// Configuration reproducing `preset` for `path`
    pub fn for_preset(path: impl Into<PathBuf>, preset: Preset) -> Self {
        Self {
            path: path.into(),
            sizing: preset.sizing(),
            alloc: preset.alloc(),
            advise: preset.advise(),
            stats: None,
        }
    }

    /// Create config from CLI args
    pub fn from_cli(args: &CliArgs) -> Result<Self, String> {
        let mut config = Self::for_preset(&args.path, args.preset);

        if let Some(scale) = args.scale_factor {
            config.sizing.scale_factor = scale;
        }
        if args.no_block_align {
            config.sizing.use_block_size_alignment = false;
        }
        if let Some(alloc) = args.alloc {
            config.alloc = alloc;
        }
        if args.advise {
            config.advise = true;
        }
        if args.no_advise {
            config.advise = false;
        }
        config.stats = args.stats;

        config
            .sizing
            .validate()
            .map_err(|e| format!("Invalid scale factor: {}", e))?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<CliArgs, clap::Error> {
        CliArgs::try_parse_from(std::iter::once("smartcat").chain(args.iter().copied()))
    }

    #[test]
    fn test_default_is_tuned() {
        let args = parse(&["file.bin"]).unwrap();
        let config = CatConfig::from_cli(&args).unwrap();

        assert_eq!(config.path, PathBuf::from("file.bin"));
        assert_eq!(config.sizing.scale_factor, DEFAULT_SCALE_FACTOR);
        assert!(config.sizing.use_block_size_alignment);
        assert_eq!(config.alloc, AllocStrategy::Native);
        assert!(config.advise);
        assert!(config.stats.is_none());
    }

    #[test]
    fn test_presets() {
        assert_eq!(Preset::Page.sizing().scale_factor, 1);
        assert!(!Preset::Page.sizing().use_block_size_alignment);
        assert!(Preset::Block.sizing().use_block_size_alignment);
        assert_eq!(Preset::Scaled.alloc(), AllocStrategy::Offset);
        assert!(!Preset::Scaled.advise());
        assert_eq!(Preset::Tuned.name(), "tuned");
    }

    #[test]
    fn test_overrides() {
        let args = parse(&[
            "--preset",
            "page",
            "--scale-factor",
            "8",
            "--alloc",
            "native",
            "--advise",
            "--stats=json",
            "f",
        ])
        .unwrap();
        let config = CatConfig::from_cli(&args).unwrap();

        assert_eq!(config.sizing.scale_factor, 8);
        assert_eq!(config.alloc, AllocStrategy::Native);
        assert!(config.advise);
        assert_eq!(config.stats, Some(StatsFormat::Json));

        let args = parse(&["--no-block-align", "--no-advise", "--stats", "f"]).unwrap();
        let config = CatConfig::from_cli(&args).unwrap();
        assert!(!config.sizing.use_block_size_alignment);
        assert!(!config.advise);
        assert_eq!(config.stats, Some(StatsFormat::Text));
    }

    #[test]
    fn test_zero_scale_factor_rejected() {
        let args = parse(&["--scale-factor", "0", "f"]).unwrap();
        assert!(CatConfig::from_cli(&args).is_err());
    }

    #[test]
    fn test_argument_count() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["a", "b"]).is_err());
        assert!(parse(&["--advise", "--no-advise", "a"]).is_err());
    }

    #[test]
    fn test_log_filter() {
        assert_eq!(parse(&["f"]).unwrap().log_filter(), "warn");
        assert_eq!(parse(&["-vv", "f"]).unwrap().log_filter(), "debug");
        assert_eq!(parse(&["-q", "f"]).unwrap().log_filter(), "error");
    }
}
