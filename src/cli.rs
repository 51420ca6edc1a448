use clap::Parser;
use std::path::PathBuf;

// Build version with stack info
const VERSION_INFO: &str = const_format::concatcp!(
    env!("CARGO_PKG_VERSION"), "\n",
    "Decode: image crate (PNG, JPEG, TIFF, TGA)\n",
    "Target: ", std::env::consts::ARCH, "-", std::env::consts::OS
);

/// Garment texture compositor
#[derive(Parser, Debug)]
#[command(author, version = VERSION_INFO, about, long_about = None)]
pub struct Args {
    /// Place an image on a region, as REGION=FILE (repeatable)
    #[arg(short = 'p', long = "place", value_name = "REGION=FILE")]
    pub place: Vec<String>,

    /// Apply a named preset to a region, as REGION=PRESET (repeatable)
    #[arg(short = 'P', long = "preset", value_name = "REGION=PRESET")]
    pub preset: Vec<String>,

    /// Session options JSON (regions, presets, fabric); built-in T-shirt
    /// layout when omitted
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Base fabric color as R,G,B (0-255 each)
    #[arg(long = "color", value_name = "R,G,B")]
    pub color: Option<String>,

    /// Weave pattern: plain, twill or rib
    #[arg(long = "weave", value_name = "WEAVE")]
    pub weave: Option<String>,

    /// Composite canvas size in pixels (square)
    #[arg(short = 's', long = "size", value_name = "N")]
    pub size: Option<usize>,

    /// Output path for the composite texture
    #[arg(short = 'o', long = "out", value_name = "FILE", default_value = "composite.png")]
    pub out: PathBuf,

    /// Also write the bump layer here
    #[arg(short = 'b', long = "bump", value_name = "FILE")]
    pub bump: Option<PathBuf>,

    /// Dump the effective session options as JSON and exit
    #[arg(long = "dump-config", value_name = "FILE")]
    pub dump_config: Option<PathBuf>,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,
}

impl Args {
    /// Split a REGION=VALUE pair.
    pub fn split_pair(pair: &str) -> anyhow::Result<(&str, &str)> {
        pair.split_once('=')
            .ok_or_else(|| anyhow::anyhow!("Expected REGION=VALUE, got '{}'", pair))
    }

    pub fn log_level(&self) -> log::LevelFilter {
        match self.verbosity {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}
